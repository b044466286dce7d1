//! External authentication collaborator.
//!
//! The auth provider owns the identity; this crate only reacts to its state changes.
//! Every subscriber receives the current state first, then every later change in order.

use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

pub mod firebase;
pub mod persistence;

pub use firebase::FirebaseAuth;

/// Identity fields the auth provider exposes for a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub uid: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    SignedIn(AuthUser),
    SignedOut,
}

impl AuthState {
    pub fn user(&self) -> Option<&AuthUser> {
        match self {
            AuthState::SignedIn(user) => Some(user),
            AuthState::SignedOut => None,
        }
    }
}

/// Result of the front end's interactive IdP sign-in (e.g. the Google popup),
/// exchanged here for a provider session.
#[derive(Debug, Clone, Deserialize)]
pub struct SignInCredential {
    #[serde(default = "default_provider")]
    pub provider_id: String,
    pub id_token: Option<String>,
    pub access_token: Option<String>,
}

fn default_provider() -> String {
    "google.com".to_string()
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Auth API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    #[error("No user is signed in")]
    NotSignedIn,

    #[error("Session persistence error: {0}")]
    Persistence(#[from] std::io::Error),
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self, credential: SignInCredential) -> Result<AuthUser, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    fn current_user(&self) -> Option<AuthUser>;

    /// Opens a new notification stream. The current state is delivered immediately.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<AuthState>;
}

/// Supplies the signed-in user's ID token for authorizing store requests.
#[async_trait]
pub trait IdTokenSource: Send + Sync {
    async fn id_token(&self) -> Result<Option<String>, AuthError>;
}

/// Current auth state plus its subscribers, updated under one lock so a new
/// subscriber can never miss or duplicate a transition.
pub struct AuthStateHub {
    inner: Mutex<HubInner>,
}

struct HubInner {
    state: AuthState,
    listeners: Vec<mpsc::UnboundedSender<AuthState>>,
}

impl Default for AuthStateHub {
    fn default() -> Self {
        Self {
            inner: Mutex::new(HubInner {
                state: AuthState::SignedOut,
                listeners: Vec::new(),
            }),
        }
    }
}

impl AuthStateHub {
    fn lock(&self) -> std::sync::MutexGuard<'_, HubInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn current(&self) -> AuthState {
        self.lock().state.clone()
    }

    /// Records a new state and notifies every live subscriber. Closed streams are dropped.
    pub fn set(&self, state: AuthState) {
        let mut inner = self.lock();
        inner.state = state.clone();
        inner.listeners.retain(|tx| tx.send(state.clone()).is_ok());
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<AuthState> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        if tx.send(inner.state.clone()).is_ok() {
            inner.listeners.push(tx);
        }
        rx
    }
}
