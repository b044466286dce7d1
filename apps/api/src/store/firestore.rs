//! Firestore over its REST API (v1).

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::auth::IdTokenSource;
use crate::store::value::{decode_fields, encode_fields, leaf_field_paths, quote_segment};
use crate::store::{Document, DocumentStore, StoreError};

const FIRESTORE_API_URL: &str = "https://firestore.googleapis.com/v1";

#[derive(Debug, Deserialize)]
struct FirestoreDocument {
    fields: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct FirestoreError {
    error: FirestoreErrorBody,
}

#[derive(Debug, Deserialize)]
struct FirestoreErrorBody {
    message: String,
}

/// Document store backed by Cloud Firestore.
///
/// Requests carry the signed-in user's ID token when one is available so that
/// security rules see the same identity the web SDK would present.
#[derive(Clone)]
pub struct FirestoreStore {
    client: Client,
    api_key: String,
    documents_url: String,
    tokens: Option<Arc<dyn IdTokenSource>>,
}

impl FirestoreStore {
    pub fn new(
        client: Client,
        project_id: &str,
        api_key: String,
        tokens: Option<Arc<dyn IdTokenSource>>,
    ) -> Self {
        Self {
            client,
            api_key,
            documents_url: format!(
                "{FIRESTORE_API_URL}/projects/{project_id}/databases/(default)/documents"
            ),
            tokens,
        }
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{collection}/{id}", self.documents_url)
    }

    async fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder, StoreError> {
        let request = request.query(&[("key", self.api_key.as_str())]);
        let token = match &self.tokens {
            Some(tokens) => tokens
                .id_token()
                .await
                .map_err(|e| StoreError::PermissionDenied(e.to_string()))?,
            None => None,
        };
        Ok(match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        })
    }

    async fn patch(
        &self,
        collection: &str,
        id: &str,
        fields: &Document,
        mask: &[String],
        must_exist: bool,
    ) -> Result<(), StoreError> {
        let mut query: Vec<(&str, &str)> = mask
            .iter()
            .map(|path| ("updateMask.fieldPaths", path.as_str()))
            .collect();
        if must_exist {
            query.push(("currentDocument.exists", "true"));
        }

        let request = self
            .client
            .patch(self.document_url(collection, id))
            .query(&query)
            .json(&json!({ "fields": encode_fields(fields) }));
        let response = self.authorize(request).await?.send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::not_found(collection, id));
        }
        check_status(response).await?;
        debug!("Firestore PATCH {collection}/{id} ({} field paths)", mask.len());
        Ok(())
    }
}

async fn check_status(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<FirestoreError>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);
    if status == StatusCode::FORBIDDEN || status == StatusCode::UNAUTHORIZED {
        return Err(StoreError::PermissionDenied(message));
    }
    Err(StoreError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let request = self.client.get(self.document_url(collection, id));
        let response = self.authorize(request).await?.send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let document: FirestoreDocument = check_status(response).await?.json().await?;
        decode_fields(document.fields.as_ref()).map(Some)
    }

    async fn set_merge(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError> {
        let mask = leaf_field_paths(&fields);
        if mask.is_empty() {
            // An empty mask would overwrite the whole document; only create it if absent.
            if self.get(collection, id).await?.is_none() {
                self.patch(collection, id, &fields, &[], false).await?;
            }
            return Ok(());
        }
        self.patch(collection, id, &fields, &mask, false).await
    }

    async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError> {
        let mask: Vec<String> = fields.keys().map(|k| quote_segment(k)).collect();
        self.patch(collection, id, &fields, &mask, true).await
    }

    fn name(&self) -> &'static str {
        "firestore"
    }
}
