use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::store::{deep_merge, Document, DocumentStore, StoreError};

/// In-process document store. Used for local development (`DOCUMENT_STORE=memory`)
/// and as the store double in tests.
#[derive(Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<(String, String), Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces a document wholesale.
    #[cfg(test)]
    pub async fn insert(&self, collection: &str, id: &str, document: Document) {
        self.documents
            .write()
            .await
            .insert(key(collection, id), document);
    }

    #[cfg(test)]
    pub async fn document_count(&self) -> usize {
        self.documents.read().await.len()
    }
}

fn key(collection: &str, id: &str) -> (String, String) {
    (collection.to_string(), id.to_string())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        Ok(self.documents.read().await.get(&key(collection, id)).cloned())
    }

    async fn set_merge(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError> {
        let mut documents = self.documents.write().await;
        let document = documents.entry(key(collection, id)).or_default();
        deep_merge(document, fields);
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError> {
        let mut documents = self.documents.write().await;
        let document = documents
            .get_mut(&key(collection, id))
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        for (field, value) in fields {
            document.insert(field, value);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let store = MemoryStore::new();
        assert!(store.get("users", "nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_merge_creates_then_merges() {
        let store = MemoryStore::new();
        store.set_merge("users", "u1", doc(json!({"name": "Ada", "skills": []}))).await.unwrap();
        store.set_merge("users", "u1", doc(json!({"targetRole": "SRE"}))).await.unwrap();

        let stored = store.get("users", "u1").await.unwrap().unwrap();
        assert_eq!(stored["name"], "Ada");
        assert_eq!(stored["targetRole"], "SRE");
    }

    #[tokio::test]
    async fn test_update_requires_existing_document() {
        let store = MemoryStore::new();
        let err = store
            .update("users", "ghost", doc(json!({"questProgress": {}})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert_eq!(store.document_count().await, 0);
    }

    #[tokio::test]
    async fn test_update_replaces_only_named_fields() {
        let store = MemoryStore::new();
        store.insert("users", "u1", doc(json!({"name": "Ada", "questProgress": {"day": 1, "xp": 5}}))).await;
        store.update("users", "u1", doc(json!({"questProgress": {"day": 2}}))).await.unwrap();

        let stored = store.get("users", "u1").await.unwrap().unwrap();
        assert_eq!(stored["name"], "Ada");
        assert_eq!(stored["questProgress"], json!({"day": 2}));
    }
}
