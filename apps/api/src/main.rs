mod auth;
mod config;
mod db;
mod errors;
mod generation;
mod llm_client;
mod models;
mod profile;
mod routes;
mod session;
mod state;
mod store;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::persistence::TokenFile;
use crate::auth::{FirebaseAuth, IdTokenSource};
use crate::config::{Config, StoreBackend};
use crate::db::{create_pool, ensure_schema};
use crate::llm_client::GeminiClient;
use crate::routes::build_router;
use crate::session::SessionManager;
use crate::state::AppState;
use crate::store::{DocumentStore, FirestoreStore, MemoryStore, PgDocumentStore};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting PathPilot API v{}", env!("CARGO_PKG_VERSION"));
    config.warn_missing_vendor_keys();

    let http = reqwest::Client::new();

    // Auth provider, with the persisted session restored if there is one
    let persistence = config.auth_persistence_path.clone().map(TokenFile::new);
    let auth = Arc::new(FirebaseAuth::new(
        http.clone(),
        config.firebase_api_key.clone(),
        config.firebase_auth_domain.as_deref(),
        persistence,
    ));
    match auth.restore().await {
        Ok(Some(user)) => info!("Session restored for {}", user.uid),
        Ok(None) => info!("No persisted session"),
        Err(e) => warn!("Could not restore persisted session: {e}"),
    }

    let store = build_store(&config, http.clone(), auth.clone()).await?;
    info!("Document store initialized ({})", store.name());

    let llm = Arc::new(GeminiClient::new(
        http,
        config.gemini_api_key.clone(),
        config.gemini_max_attempts,
    ));
    info!(
        "LLM client initialized (model: {}, max attempts: {})",
        llm_client::MODEL,
        config.gemini_max_attempts
    );

    let session = SessionManager::start(auth, store.clone());

    let state = AppState {
        llm,
        store,
        session,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs the document store selected by `DOCUMENT_STORE`.
async fn build_store(
    config: &Config,
    http: reqwest::Client,
    tokens: Arc<dyn IdTokenSource>,
) -> Result<Arc<dyn DocumentStore>> {
    let store: Arc<dyn DocumentStore> = match config.document_store {
        StoreBackend::Firestore => Arc::new(FirestoreStore::new(
            http,
            &config.firebase_project_id,
            config.firebase_api_key.clone(),
            Some(tokens),
        )),
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is required when DOCUMENT_STORE=postgres")?;
            let pool = create_pool(url).await?;
            ensure_schema(&pool).await?;
            Arc::new(PgDocumentStore::new(pool))
        }
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    };
    Ok(store)
}
