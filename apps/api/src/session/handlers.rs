use std::time::Duration;

use axum::{extract::State, Json};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

use crate::auth::SignInCredential;
use crate::errors::AppError;
use crate::models::user::UserProfile;
use crate::session::{SessionEvent, SessionState};
use crate::state::AppState;

/// How long a login request waits for the signed-in profile to be bootstrapped.
const LOGIN_SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

/// GET /api/v1/session
pub async fn handle_get_session(State(state): State<AppState>) -> Json<SessionState> {
    Json(state.session.state())
}

/// POST /api/v1/session/login
///
/// Responds once the new identity's profile is loaded (or the wait times out).
pub async fn handle_login(
    State(state): State<AppState>,
    Json(credential): Json<SignInCredential>,
) -> Result<Json<SessionState>, AppError> {
    if credential.id_token.is_none() && credential.access_token.is_none() {
        return Err(AppError::Validation(
            "id_token or access_token is required".to_string(),
        ));
    }

    let mut events = state.session.subscribe();
    state.session.login(credential).await?;

    match tokio::time::timeout(LOGIN_SETTLE_TIMEOUT, wait_for_sign_in(&mut events)).await {
        Ok(true) => {}
        Ok(false) => warn!("Session events closed before the profile was loaded"),
        Err(_) => warn!("Login succeeded but the profile was not loaded in time"),
    }

    Ok(Json(state.session.state()))
}

/// Waits for the next `SignedIn` event. A lagged receiver skips ahead instead of
/// giving up; returns false only once the channel is closed.
async fn wait_for_sign_in(events: &mut broadcast::Receiver<SessionEvent>) -> bool {
    loop {
        match events.recv().await {
            Ok(SessionEvent::SignedIn(_)) => return true,
            Ok(SessionEvent::SignedOut) => {}
            Err(RecvError::Lagged(skipped)) => {
                warn!("Login wait skipped {skipped} session events");
            }
            Err(RecvError::Closed) => return false,
        }
    }
}

/// POST /api/v1/session/logout
pub async fn handle_logout(State(state): State<AppState>) -> Json<SessionState> {
    state.session.logout().await;
    Json(state.session.state())
}

/// PUT /api/v1/session/profile
///
/// Without an active session nothing is written and the unchanged state is returned.
pub async fn handle_update_profile(
    State(state): State<AppState>,
    Json(profile): Json<UserProfile>,
) -> Result<Json<SessionState>, AppError> {
    state.session.update_profile(profile).await?;
    Ok(Json(state.session.state()))
}
