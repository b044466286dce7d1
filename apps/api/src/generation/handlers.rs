//! Axum route handlers for the AI endpoints.

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::generation::advice::{get_career_advice, ChatMessage};
use crate::generation::ats::{analyze_resume_ats, chat_with_resume, AtsAnalysis, AtsRequest};
use crate::generation::quests::{generate_daily_quests, generate_prep_plan, DailyQuest, PrepPlan};
use crate::generation::resume_file::{extract_resume_text, ResumeFormat};
use crate::generation::roadmap::{generate_dynamic_roadmap, RoadmapData};
use crate::models::user::UserProfile;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RoadmapRequest {
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct CareerAdviceRequest {
    pub messages: Vec<ChatMessage>,
    /// Falls back to the signed-in user's profile when omitted.
    pub user_profile: Option<UserProfile>,
}

#[derive(Debug, Deserialize)]
pub struct PrepPlanRequest {
    pub target_role: String,
    pub days: u32,
    #[serde(default = "default_level")]
    pub current_level: String,
}

#[derive(Debug, Deserialize)]
pub struct DailyQuestsRequest {
    pub target_role: String,
    pub day_number: u32,
    #[serde(default = "default_level")]
    pub current_level: String,
}

#[derive(Debug, Deserialize)]
pub struct ResumeChatRequest {
    #[serde(default)]
    pub chat_history: Vec<ChatMessage>,
    pub ats_analysis: AtsAnalysis,
    pub user_message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub reply: String,
}

fn default_level() -> String {
    "Beginner".to_string()
}

fn require(value: &str, field: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/ai/roadmap
pub async fn handle_roadmap(
    State(state): State<AppState>,
    Json(request): Json<RoadmapRequest>,
) -> Result<Json<RoadmapData>, AppError> {
    require(&request.role, "role")?;
    let roadmap = generate_dynamic_roadmap(state.llm.as_ref(), &request.role).await?;
    Ok(Json(roadmap))
}

/// POST /api/v1/ai/career-advice
pub async fn handle_career_advice(
    State(state): State<AppState>,
    Json(request): Json<CareerAdviceRequest>,
) -> Result<Json<ChatReply>, AppError> {
    let profile = match request.user_profile {
        Some(profile) => profile,
        None => state.session.state().user.unwrap_or_default(),
    };
    let reply = get_career_advice(state.llm.clone(), &request.messages, &profile).await?;
    Ok(Json(ChatReply { reply }))
}

/// POST /api/v1/ai/prep-plan
pub async fn handle_prep_plan(
    State(state): State<AppState>,
    Json(request): Json<PrepPlanRequest>,
) -> Result<Json<PrepPlan>, AppError> {
    require(&request.target_role, "target_role")?;
    if request.days == 0 {
        return Err(AppError::Validation("days must be at least 1".to_string()));
    }
    let plan = generate_prep_plan(
        state.llm.as_ref(),
        &request.target_role,
        request.days,
        &request.current_level,
    )
    .await?;
    Ok(Json(plan))
}

/// POST /api/v1/ai/daily-quests
pub async fn handle_daily_quests(
    State(state): State<AppState>,
    Json(request): Json<DailyQuestsRequest>,
) -> Result<Json<Vec<DailyQuest>>, AppError> {
    require(&request.target_role, "target_role")?;
    let quests = generate_daily_quests(
        state.llm.as_ref(),
        &request.target_role,
        request.day_number,
        &request.current_level,
    )
    .await?;
    Ok(Json(quests))
}

/// POST /api/v1/ai/ats-analysis
pub async fn handle_ats_analysis(
    State(state): State<AppState>,
    Json(request): Json<AtsRequest>,
) -> Result<Json<AtsAnalysis>, AppError> {
    require(&request.target_role, "target_role")?;
    let analysis = analyze_resume_ats(state.llm.as_ref(), &request).await?;
    Ok(Json(analysis))
}

/// POST /api/v1/ai/ats-analysis/upload
///
/// Multipart form: `resume` (PDF or plain text file), `target_role`, and optional
/// `job_description`, `current_level`, `industry`.
pub async fn handle_ats_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<AtsAnalysis>, AppError> {
    let request = read_ats_upload(multipart).await?;
    require(&request.target_role, "target_role")?;
    let analysis = analyze_resume_ats(state.llm.as_ref(), &request).await?;
    Ok(Json(analysis))
}

async fn read_ats_upload(mut multipart: Multipart) -> Result<AtsRequest, AppError> {
    let mut request = AtsRequest::default();
    let mut resume_text = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "resume" => {
                let content_type = field.content_type().map(str::to_string);
                let file_name = field.file_name().map(str::to_string);
                let data = field.bytes().await.map_err(bad_multipart)?;
                let format =
                    ResumeFormat::detect(content_type.as_deref(), file_name.as_deref(), &data)
                        .ok_or_else(|| {
                            AppError::Validation(
                                "resume must be a PDF or plain text file".to_string(),
                            )
                        })?;
                resume_text = Some(extract_resume_text(format, data).await?);
            }
            "target_role" => request.target_role = field.text().await.map_err(bad_multipart)?,
            "job_description" => {
                request.job_description = Some(field.text().await.map_err(bad_multipart)?)
            }
            "current_level" => {
                request.current_level = Some(field.text().await.map_err(bad_multipart)?)
            }
            "industry" => request.industry = Some(field.text().await.map_err(bad_multipart)?),
            _ => (),
        }
    }

    request.resume_text =
        Some(resume_text.ok_or_else(|| AppError::Validation("resume file is required".to_string()))?);
    Ok(request)
}

fn bad_multipart(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::Validation(format!("invalid multipart body: {e}"))
}

/// POST /api/v1/ai/resume-chat
pub async fn handle_resume_chat(
    State(state): State<AppState>,
    Json(request): Json<ResumeChatRequest>,
) -> Result<Json<ChatReply>, AppError> {
    require(&request.user_message, "user_message")?;
    let reply = chat_with_resume(
        state.llm.clone(),
        &request.chat_history,
        &request.ats_analysis,
        &request.user_message,
    )
    .await?;
    Ok(Json(ChatReply { reply }))
}
