//! Read and partial-update helpers for `users/{uid}` documents.

use tracing::info;

use crate::models::user::{QuestProgress, UserProfile, QUEST_PROGRESS_FIELD};
use crate::store::{Document, DocumentStore, StoreError, USERS_COLLECTION};

pub mod handlers;

/// Returns the stored profile, or `None` when the document does not exist.
/// Store failures are returned unchanged. Every stored field is kept, whatever its type.
pub async fn get_user_profile(
    store: &dyn DocumentStore,
    id: &str,
) -> Result<Option<UserProfile>, StoreError> {
    let document = store.get(USERS_COLLECTION, id).await?;
    Ok(document.map(UserProfile::from_fields))
}

/// Replaces the `questProgress` field of an existing document. Other fields are untouched.
/// Fails with [`StoreError::NotFound`] when the document does not exist.
pub async fn update_user_quest_progress(
    store: &dyn DocumentStore,
    id: &str,
    progress: QuestProgress,
) -> Result<(), StoreError> {
    let mut fields = Document::new();
    fields.insert(QUEST_PROGRESS_FIELD.to_string(), progress.0);
    store.update(USERS_COLLECTION, id, fields).await?;
    info!("Updated quest progress for {id}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        let doc = json!({"name": "Ada", "skills": ["rust"], "questProgress": {"day": 1}});
        store
            .insert(USERS_COLLECTION, "u1", doc.as_object().cloned().unwrap())
            .await;
        store
    }

    #[tokio::test]
    async fn test_get_missing_profile_is_none() {
        let store = MemoryStore::new();
        assert!(get_user_profile(&store, "ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_profile_reads_document() {
        let store = seeded().await;
        let profile = get_user_profile(&store, "u1").await.unwrap().unwrap();
        assert_eq!(profile.name, "Ada");
        assert_eq!(profile.extra[QUEST_PROGRESS_FIELD], json!({"day": 1}));
    }

    #[tokio::test]
    async fn test_loosely_typed_document_is_still_read() {
        let store = MemoryStore::new();
        let doc = json!({"name": "Ada", "skills": "rust", "avatar": null, "targetRole": {"primary": "SRE"}});
        store
            .insert(USERS_COLLECTION, "u1", doc.as_object().cloned().unwrap())
            .await;
        let profile = get_user_profile(&store, "u1").await.unwrap().unwrap();
        assert_eq!(profile.name, "Ada");
        assert_eq!(profile.skills, vec!["rust".to_string()]);
        assert_eq!(profile.extra["targetRole"], json!({"primary": "SRE"}));
    }

    #[tokio::test]
    async fn test_quest_progress_update_touches_only_that_field() {
        let store = seeded().await;
        update_user_quest_progress(&store, "u1", QuestProgress(json!({"day": 5, "xp": 120})))
            .await
            .unwrap();

        let stored = store.get(USERS_COLLECTION, "u1").await.unwrap().unwrap();
        assert_eq!(stored["name"], "Ada");
        assert_eq!(stored["skills"], json!(["rust"]));
        assert_eq!(stored[QUEST_PROGRESS_FIELD], json!({"day": 5, "xp": 120}));
    }

    #[tokio::test]
    async fn test_quest_progress_update_never_creates() {
        let store = MemoryStore::new();
        let err = update_user_quest_progress(&store, "ghost", QuestProgress(json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert_eq!(store.document_count().await, 0);
    }
}
