use async_trait::async_trait;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::store::{deep_merge, Document, DocumentStore, StoreError};

/// Document store on a single Postgres `documents` table with a JSONB body.
///
/// Merge-writes are read-modify-write inside a transaction holding the row lock.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn into_document(value: Value, collection: &str, id: &str) -> Result<Document, StoreError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Malformed(format!(
            "{collection}/{id} holds {other}, not an object"
        ))),
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let row: Option<(Json<Value>,)> =
            sqlx::query_as("SELECT data FROM documents WHERE collection = $1 AND id = $2")
                .bind(collection)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(Json(data),)| into_document(data, collection, id))
            .transpose()
    }

    async fn set_merge(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let existing: Option<(Json<Value>,)> = sqlx::query_as(
            "SELECT data FROM documents WHERE collection = $1 AND id = $2 FOR UPDATE",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let mut document = match existing {
            Some((Json(data),)) => into_document(data, collection, id)?,
            None => Document::new(),
        };
        deep_merge(&mut document, fields);

        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, data, updated_at)
            VALUES ($1, $2, $3, now())
            ON CONFLICT (collection, id)
            DO UPDATE SET data = EXCLUDED.data, updated_at = now()
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(Json(Value::Object(document)))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError> {
        // Top-level replacement of the named fields: `||` on JSONB objects does exactly that.
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET data = data || $3, updated_at = now()
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(Json(Value::Object(fields)))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(collection, id));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
