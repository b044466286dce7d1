//! Firebase Authentication over the Identity Toolkit and Secure Token REST APIs.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, Response, Url};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::auth::persistence::TokenFile;
use crate::auth::{
    AuthError, AuthProvider, AuthState, AuthStateHub, AuthUser, IdTokenSource, SignInCredential,
};

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const SECURE_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1/token";
/// ID tokens are refreshed this long before they actually expire.
const REFRESH_MARGIN_SECS: i64 = 60;
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInWithIdpResponse {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
    id_token: String,
    refresh_token: String,
    expires_in: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleApiError {
    error: GoogleApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GoogleApiErrorBody {
    message: String,
}

#[derive(Debug, Clone)]
struct TokenSet {
    id_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

impl TokenSet {
    fn new(id_token: String, refresh_token: String, expires_in: Option<&str>) -> Self {
        let lifetime = expires_in
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        Self {
            id_token,
            refresh_token,
            expires_at: Utc::now() + Duration::seconds(lifetime),
        }
    }

    fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(REFRESH_MARGIN_SECS) >= self.expires_at
    }
}

/// The Firebase Auth client. One instance per process, constructed in `main`.
pub struct FirebaseAuth {
    client: Client,
    api_key: String,
    request_uri: String,
    hub: AuthStateHub,
    tokens: Mutex<Option<TokenSet>>,
    persistence: Option<TokenFile>,
}

impl FirebaseAuth {
    pub fn new(
        client: Client,
        api_key: String,
        auth_domain: Option<&str>,
        persistence: Option<TokenFile>,
    ) -> Self {
        let request_uri = match auth_domain {
            Some(domain) => format!("https://{domain}/__/auth/handler"),
            None => "http://localhost".to_string(),
        };
        Self {
            client,
            api_key,
            request_uri,
            hub: AuthStateHub::default(),
            tokens: Mutex::new(None),
            persistence,
        }
    }

    /// Re-establishes a persisted session, if any. Returns the restored user.
    pub async fn restore(&self) -> Result<Option<AuthUser>, AuthError> {
        let Some(file) = &self.persistence else {
            return Ok(None);
        };
        let Some(refresh_token) = file.load().await? else {
            return Ok(None);
        };

        let tokens = self.refresh(&refresh_token).await?;
        let user = self.lookup(&tokens.id_token).await?;
        self.persist(&tokens.refresh_token).await;
        *self.tokens.lock().await = Some(tokens);

        info!("Restored persisted session for {}", user.uid);
        self.hub.set(AuthState::SignedIn(user.clone()));
        Ok(Some(user))
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{IDENTITY_TOOLKIT_URL}/accounts:{method}")
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, AuthError> {
        let response = self
            .client
            .post(SECURE_TOKEN_URL)
            .query(&[("key", self.api_key.as_str())])
            .form(&[("grant_type", "refresh_token"), ("refresh_token", refresh_token)])
            .send()
            .await?;
        let body: RefreshResponse = parse_response(response).await?;
        debug!("ID token refreshed");
        Ok(TokenSet::new(
            body.id_token,
            body.refresh_token,
            body.expires_in.as_deref(),
        ))
    }

    async fn lookup(&self, id_token: &str) -> Result<AuthUser, AuthError> {
        let response = self
            .client
            .post(self.endpoint("lookup"))
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({ "idToken": id_token }))
            .send()
            .await?;
        let body: LookupResponse = parse_response(response).await?;
        let user = body.users.into_iter().next().ok_or(AuthError::NotSignedIn)?;
        Ok(AuthUser {
            uid: user.local_id,
            display_name: user.display_name,
            email: user.email,
            photo_url: user.photo_url,
        })
    }

    async fn persist(&self, refresh_token: &str) {
        if let Some(file) = &self.persistence {
            if let Err(e) = file.save(refresh_token).await {
                warn!("Failed to persist auth session: {e}");
            }
        }
    }
}

/// Builds the `postBody` Identity Toolkit expects for an IdP credential.
fn idp_post_body(credential: &SignInCredential) -> Result<String, AuthError> {
    let (param, token) = match (&credential.id_token, &credential.access_token) {
        (Some(token), _) => ("id_token", token),
        (None, Some(token)) => ("access_token", token),
        (None, None) => {
            return Err(AuthError::InvalidCredential(
                "an id_token or access_token is required".to_string(),
            ))
        }
    };
    let url = Url::parse_with_params(
        "http://localhost/",
        &[(param, token.as_str()), ("providerId", credential.provider_id.as_str())],
    )
    .map_err(|e| AuthError::InvalidCredential(e.to_string()))?;
    Ok(url.query().unwrap_or_default().to_string())
}

async fn parse_response<T: DeserializeOwned>(response: Response) -> Result<T, AuthError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<GoogleApiError>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        return Err(AuthError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response.json().await?)
}

#[async_trait]
impl AuthProvider for FirebaseAuth {
    async fn sign_in(&self, credential: SignInCredential) -> Result<AuthUser, AuthError> {
        let post_body = idp_post_body(&credential)?;
        let response = self
            .client
            .post(self.endpoint("signInWithIdp"))
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({
                "postBody": post_body,
                "requestUri": self.request_uri,
                "returnIdpCredential": true,
                "returnSecureToken": true,
            }))
            .send()
            .await?;
        let body: SignInWithIdpResponse = parse_response(response).await?;

        let tokens = TokenSet::new(body.id_token, body.refresh_token, body.expires_in.as_deref());
        self.persist(&tokens.refresh_token).await;
        *self.tokens.lock().await = Some(tokens);

        let user = AuthUser {
            uid: body.local_id,
            display_name: body.display_name,
            email: body.email,
            photo_url: body.photo_url,
        };
        info!("Signed in {} via {}", user.uid, credential.provider_id);
        self.hub.set(AuthState::SignedIn(user.clone()));
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.tokens.lock().await.take();
        if let Some(file) = &self.persistence {
            if let Err(e) = file.clear().await {
                warn!("Failed to clear persisted auth session: {e}");
            }
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

#[async_trait]
impl IdTokenSource for FirebaseAuth {
    async fn id_token(&self) -> Result<Option<String>, AuthError> {
        let mut tokens = self.tokens.lock().await;
        let Some(current) = tokens.as_ref() else {
            return Ok(None);
        };
        if current.needs_refresh(Utc::now()) {
            let refreshed = self.refresh(&current.refresh_token).await?;
            self.persist(&refreshed.refresh_token).await;
            *tokens = Some(refreshed);
        }
        Ok(tokens.as_ref().map(|t| t.id_token.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential(id_token: Option<&str>, access_token: Option<&str>) -> SignInCredential {
        SignInCredential {
            provider_id: "google.com".to_string(),
            id_token: id_token.map(String::from),
            access_token: access_token.map(String::from),
        }
    }

    #[test]
    fn test_post_body_prefers_id_token() {
        let body = idp_post_body(&credential(Some("abc.def"), Some("ya29"))).unwrap();
        assert_eq!(body, "id_token=abc.def&providerId=google.com");
    }

    #[test]
    fn test_post_body_falls_back_to_access_token() {
        let body = idp_post_body(&credential(None, Some("ya29+x"))).unwrap();
        assert_eq!(body, "access_token=ya29%2Bx&providerId=google.com");
    }

    #[test]
    fn test_post_body_requires_a_token() {
        assert!(matches!(
            idp_post_body(&credential(None, None)),
            Err(AuthError::InvalidCredential(_))
        ));
    }

    #[test]
    fn test_token_refresh_margin() {
        let tokens = TokenSet::new("id".into(), "rt".into(), Some("3600"));
        let now = Utc::now();
        assert!(!tokens.needs_refresh(now));
        assert!(tokens.needs_refresh(now + Duration::seconds(3600 - 30)));
    }

    #[test]
    fn test_unparseable_lifetime_uses_default() {
        let before = Utc::now();
        let tokens = TokenSet::new("id".into(), "rt".into(), Some("soon"));
        assert!(tokens.expires_at >= before + Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS));
    }

    #[test]
    fn test_sign_in_response_parses() {
        let body = r#"{
            "federatedId": "https://accounts.google.com/1234",
            "providerId": "google.com",
            "localId": "uid-1",
            "email": "ada@example.com",
            "displayName": "Ada Lovelace",
            "photoUrl": "https://example.com/ada.png",
            "idToken": "id-token",
            "refreshToken": "refresh-token",
            "expiresIn": "3600"
        }"#;
        let parsed: SignInWithIdpResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.local_id, "uid-1");
        assert_eq!(parsed.display_name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(parsed.expires_in.as_deref(), Some("3600"));
    }

    #[tokio::test]
    async fn test_signed_out_client_has_no_token() {
        let auth = FirebaseAuth::new(Client::new(), "key".into(), None, None);
        assert_eq!(auth.id_token().await.unwrap(), None);
        assert!(auth.current_user().is_none());
    }

    #[tokio::test]
    async fn test_sign_out_notifies_and_clears_persisted_token() {
        let dir = tempfile::tempdir().unwrap();
        let file = TokenFile::new(dir.path().join("refresh_token"));
        file.save("rt").await.unwrap();

        let auth = FirebaseAuth::new(Client::new(), "key".into(), Some("demo.firebaseapp.com"), Some(file.clone()));
        let mut rx = auth.subscribe();
        assert_eq!(rx.recv().await, Some(AuthState::SignedOut));

        auth.sign_out().await.unwrap();
        assert_eq!(rx.recv().await, Some(AuthState::SignedOut));
        assert_eq!(file.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_restore_without_persistence_is_noop() {
        let auth = FirebaseAuth::new(Client::new(), "key".into(), None, None);
        assert_eq!(auth.restore().await.unwrap(), None);
    }
}
