//! Auth and store doubles shared by the session and route tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{mpsc, watch};

use crate::auth::{AuthError, AuthProvider, AuthState, AuthStateHub, AuthUser, SignInCredential};
use crate::store::{Document, DocumentStore, MemoryStore, StoreError, USERS_COLLECTION};

pub fn identity(uid: &str) -> AuthUser {
    AuthUser {
        uid: uid.to_string(),
        display_name: Some("Ada Lovelace".to_string()),
        email: Some(format!("{uid}@example.com")),
        photo_url: None,
    }
}

/// Auth provider that signs in whichever uid is passed as the ID token.
#[derive(Default)]
pub struct FakeAuth {
    hub: AuthStateHub,
    fail_sign_in: AtomicBool,
    fail_sign_out: AtomicBool,
}

impl FakeAuth {
    pub fn signed_in(user: AuthUser) -> Self {
        let auth = Self::default();
        auth.hub.set(AuthState::SignedIn(user));
        auth
    }

    pub fn credential(uid: &str) -> SignInCredential {
        SignInCredential {
            provider_id: "google.com".to_string(),
            id_token: Some(uid.to_string()),
            access_token: None,
        }
    }

    pub fn fail_sign_in(&self, fail: bool) {
        self.fail_sign_in.store(fail, Ordering::SeqCst);
    }

    pub fn fail_sign_out(&self, fail: bool) {
        self.fail_sign_out.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl AuthProvider for FakeAuth {
    async fn sign_in(&self, credential: SignInCredential) -> Result<AuthUser, AuthError> {
        if self.fail_sign_in.load(Ordering::SeqCst) {
            return Err(AuthError::Api {
                status: 400,
                message: "INVALID_IDP_RESPONSE".to_string(),
            });
        }
        let uid = credential
            .id_token
            .ok_or_else(|| AuthError::InvalidCredential("missing id_token".to_string()))?;
        let user = identity(&uid);
        self.hub.set(AuthState::SignedIn(user.clone()));
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(AuthError::Api {
                status: 503,
                message: "unavailable".to_string(),
            });
        }
        self.hub.set(AuthState::SignedOut);
        Ok(())
    }

    fn current_user(&self) -> Option<AuthUser> {
        self.hub.current().user().cloned()
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<AuthState> {
        self.hub.subscribe()
    }
}

/// Memory store that can fail or stall on demand and counts successful writes.
pub struct FlakyStore {
    inner: MemoryStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
    reads_open: watch::Sender<bool>,
}

impl Default for FlakyStore {
    fn default() -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            writes: AtomicUsize::new(0),
            reads_open: watch::channel(true).0,
        }
    }
}

impl FlakyStore {
    pub async fn seed(&self, uid: &str, document: Value) {
        let document = document.as_object().cloned().unwrap_or_default();
        self.inner.insert(USERS_COLLECTION, uid, document).await;
    }

    pub async fn document(&self, uid: &str) -> Option<Document> {
        self.inner.get(USERS_COLLECTION, uid).await.unwrap()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Reads block until [`FlakyStore::release_reads`] is called.
    pub fn hold_reads(&self) {
        self.reads_open.send_replace(false);
    }

    pub fn release_reads(&self) {
        self.reads_open.send_replace(true);
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn write_guard(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::PermissionDenied("writes disabled".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let mut open = self.reads_open.subscribe();
        let _ = open.wait_for(|open| *open).await;
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Api {
                status: 503,
                message: "unavailable".to_string(),
            });
        }
        self.inner.get(collection, id).await
    }

    async fn set_merge(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError> {
        self.write_guard()?;
        self.inner.set_merge(collection, id, fields).await?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError> {
        self.write_guard()?;
        self.inner.update(collection, id, fields).await?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "flaky"
    }
}
