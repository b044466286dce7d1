//! Session adapter: mirrors the auth provider's identity into a local user profile.
//!
//! One listener task consumes auth notifications strictly in order. Each signed-in
//! notification bootstraps a profile from the document store before the next
//! notification is looked at. Observers either watch [`SessionState`] or subscribe
//! to [`SessionEvent`] transitions.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::auth::{AuthError, AuthProvider, AuthState, SignInCredential};
use crate::models::user::UserProfile;
use crate::store::{to_document, DocumentStore, StoreError, USERS_COLLECTION};

pub mod bootstrap;
pub mod handlers;
#[cfg(test)]
pub(crate) mod testing;

use bootstrap::bootstrap_profile;

const EVENT_CAPACITY: usize = 32;

/// What the UI renders from: still loading, or the current user (if any).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    pub loading: bool,
    pub user: Option<UserProfile>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            loading: true,
            user: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    SignedIn(UserProfile),
    SignedOut,
}

struct Shared {
    store: Arc<dyn DocumentStore>,
    state: watch::Sender<SessionState>,
    events: broadcast::Sender<SessionEvent>,
}

impl Shared {
    fn set_user(&self, user: Option<UserProfile>) {
        self.state.send_modify(|state| state.user = user);
    }

    async fn handle(&self, notification: AuthState) {
        let (user, event) = match notification {
            AuthState::SignedIn(identity) => {
                info!("Auth state changed: signed in as {}", identity.uid);
                let profile = bootstrap_profile(self.store.as_ref(), &identity).await;
                (Some(profile.clone()), SessionEvent::SignedIn(profile))
            }
            AuthState::SignedOut => {
                info!("Auth state changed: signed out");
                (None, SessionEvent::SignedOut)
            }
        };

        // Sending fails only when nobody is subscribed.
        let _ = self.events.send(event);
        self.state.send_modify(|state| {
            state.user = user;
            state.loading = false;
        });
    }
}

async fn listen(shared: Arc<Shared>, mut notifications: mpsc::UnboundedReceiver<AuthState>) {
    while let Some(notification) = notifications.recv().await {
        shared.handle(notification).await;
    }
    debug!("Auth notification stream closed");
}

pub struct SessionManager {
    auth: Arc<dyn AuthProvider>,
    shared: Arc<Shared>,
    listener: JoinHandle<()>,
}

impl SessionManager {
    /// Subscribes to `auth` and starts processing its notifications.
    /// Must be called from within a Tokio runtime.
    pub fn start(auth: Arc<dyn AuthProvider>, store: Arc<dyn DocumentStore>) -> Arc<Self> {
        let (state, _) = watch::channel(SessionState::default());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let shared = Arc::new(Shared {
            store,
            state,
            events,
        });

        let listener = tokio::spawn(listen(shared.clone(), auth.subscribe()));
        Arc::new(Self {
            auth,
            shared,
            listener,
        })
    }

    /// Exchanges an IdP credential for a session. The profile arrives through the
    /// auth notification, not through this call.
    pub async fn login(&self, credential: SignInCredential) -> Result<(), AuthError> {
        match self.auth.sign_in(credential).await {
            Ok(_) => Ok(()),
            Err(e) => {
                error!("Login failed: {e}");
                Err(e)
            }
        }
    }

    /// Signs out. Failures are logged and otherwise ignored; local state is only
    /// cleared when the sign-out succeeded.
    pub async fn logout(&self) {
        match self.auth.sign_out().await {
            Ok(()) => self.shared.set_user(None),
            Err(e) => error!("Logout failed: {e}"),
        }
    }

    /// Merge-writes `profile` to the signed-in user's document, then adopts it locally.
    /// Does nothing when no one is signed in.
    pub async fn update_profile(&self, profile: UserProfile) -> Result<(), StoreError> {
        let Some(identity) = self.auth.current_user() else {
            debug!("update_profile ignored: no active session");
            return Ok(());
        };

        let fields = to_document(&profile)?;
        if let Err(e) = self
            .shared
            .store
            .set_merge(USERS_COLLECTION, &identity.uid, fields)
            .await
        {
            error!("Error updating profile: {e}");
            return Err(e);
        }

        self.shared.set_user(Some(profile));
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        self.shared.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.shared.state.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    /// Resolves once the first auth notification has been fully processed.
    pub async fn wait_until_ready(&self) -> SessionState {
        let mut rx = self.watch();
        let ready = rx.wait_for(|state| !state.loading).await.map(|s| s.clone());
        ready.unwrap_or_else(|_| self.state())
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.listener.abort();
    }
}
