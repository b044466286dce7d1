//! Document store collaborator.
//!
//! A single collection keyed by user ID holds profile documents. The store does not
//! enforce any schema; callers serialize their own shapes into a [`Document`].

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub mod firestore;
pub mod memory;
pub mod postgres;
mod value;

pub use firestore::FirestoreStore;
pub use memory::MemoryStore;
pub use postgres::PgDocumentStore;

/// Collection holding one profile document per user ID.
pub const USERS_COLLECTION: &str = "users";

/// Top-level fields of a stored document.
pub type Document = Map<String, Value>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Document {collection}/{id} does not exist")]
    NotFound { collection: String, id: String },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Store API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Malformed document: {0}")]
    Malformed(String),
}

impl StoreError {
    pub fn not_found(collection: &str, id: &str) -> Self {
        StoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Malformed(e.to_string())
    }
}

/// Get / merge-write / partial-update access to a document collection.
///
/// Carried in `AppState` and `SessionManager` as `Arc<dyn DocumentStore>`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Reads a document. `Ok(None)` means the document does not exist.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Merge-write: creates the document if absent, otherwise deep-merges `fields`
    /// into it, leaving fields that are not supplied untouched.
    async fn set_merge(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError>;

    /// Partial update of the supplied top-level fields.
    /// Fails with [`StoreError::NotFound`] when the document does not exist.
    async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError>;

    fn name(&self) -> &'static str;
}

/// Deep-merges `patch` into `target`. Nested objects merge key by key; every other
/// value (arrays included) replaces what was there.
pub fn deep_merge(target: &mut Document, patch: Document) {
    for (key, value) in patch {
        let Value::Object(incoming) = value else {
            target.insert(key, value);
            continue;
        };
        if let Some(Value::Object(existing)) = target.get_mut(&key) {
            deep_merge(existing, incoming);
            continue;
        }
        target.insert(key, Value::Object(incoming));
    }
}

/// Converts a serializable value into top-level document fields.
pub fn to_document<T: serde::Serialize>(value: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Malformed(format!(
            "expected an object, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_deep_merge_keeps_untouched_fields() {
        let mut target = doc(json!({"name": "Ada", "skills": ["rust"], "questProgress": {"day": 2}}));
        deep_merge(&mut target, doc(json!({"name": "Ada L."})));
        assert_eq!(target["name"], "Ada L.");
        assert_eq!(target["skills"], json!(["rust"]));
        assert_eq!(target["questProgress"], json!({"day": 2}));
    }

    #[test]
    fn test_deep_merge_recurses_into_objects() {
        let mut target = doc(json!({"questProgress": {"day": 2, "xp": 40}}));
        deep_merge(&mut target, doc(json!({"questProgress": {"xp": 90}})));
        assert_eq!(target["questProgress"], json!({"day": 2, "xp": 90}));
    }

    #[test]
    fn test_deep_merge_replaces_arrays() {
        let mut target = doc(json!({"skills": ["rust", "go"]}));
        deep_merge(&mut target, doc(json!({"skills": ["sql"]})));
        assert_eq!(target["skills"], json!(["sql"]));
    }

    #[test]
    fn test_to_document_rejects_non_objects() {
        assert!(matches!(to_document(&vec![1, 2]), Err(StoreError::Malformed(_))));
    }
}
