pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post, put},
    Router,
};

use crate::generation::handlers as ai;
use crate::generation::resume_file::MAX_RESUME_BYTES;
use crate::profile::handlers as profile;
use crate::session::handlers as session;
use crate::state::AppState;

/// Room for the non-file form fields next to a maximal resume upload.
const UPLOAD_BODY_LIMIT: usize = MAX_RESUME_BYTES + 256 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Session
        .route("/api/v1/session", get(session::handle_get_session))
        .route("/api/v1/session/login", post(session::handle_login))
        .route("/api/v1/session/logout", post(session::handle_logout))
        .route("/api/v1/session/profile", put(session::handle_update_profile))
        // Profile documents
        .route("/api/v1/users/:id/profile", get(profile::handle_get_profile))
        .route(
            "/api/v1/users/:id/quest-progress",
            patch(profile::handle_update_quest_progress),
        )
        // AI
        .route("/api/v1/ai/roadmap", post(ai::handle_roadmap))
        .route("/api/v1/ai/career-advice", post(ai::handle_career_advice))
        .route("/api/v1/ai/prep-plan", post(ai::handle_prep_plan))
        .route("/api/v1/ai/daily-quests", post(ai::handle_daily_quests))
        .route("/api/v1/ai/ats-analysis", post(ai::handle_ats_analysis))
        .route(
            "/api/v1/ai/ats-analysis/upload",
            post(ai::handle_ats_upload).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/api/v1/ai/resume-chat", post(ai::handle_resume_chat))
        .with_state(state)
}
