use std::sync::Arc;

use crate::llm_client::TextGenerator;
use crate::session::SessionManager;
use crate::store::DocumentStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub llm: Arc<dyn TextGenerator>,
    /// Backend selected by `DOCUMENT_STORE`.
    pub store: Arc<dyn DocumentStore>,
    pub session: Arc<SessionManager>,
}
