use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::errors::AppError;
use crate::models::user::{QuestProgress, UserProfile};
use crate::profile::{get_user_profile, update_user_quest_progress};
use crate::state::AppState;

/// GET /api/v1/users/:id/profile
pub async fn handle_get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserProfile>, AppError> {
    let profile = get_user_profile(state.store.as_ref(), &user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {user_id} not found")))?;
    Ok(Json(profile))
}

/// PATCH /api/v1/users/:id/quest-progress
pub async fn handle_update_quest_progress(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(progress): Json<QuestProgress>,
) -> Result<StatusCode, AppError> {
    update_user_quest_progress(state.store.as_ref(), &user_id, progress).await?;
    Ok(StatusCode::NO_CONTENT)
}
