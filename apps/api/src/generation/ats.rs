//! Resume analysis against applicant-tracking-system criteria, and the follow-up chat.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::generation::advice::ChatMessage;
use crate::generation::prompts::{
    with_json_only, ATS_PROMPT_TEMPLATE, RESUME_CHAT_MESSAGE_TEMPLATE, RESUME_CHAT_SYSTEM,
};
use crate::llm_client::{
    parse_json_or_default, ChatSession, GenerationRequest, LlmError, Schema, TextGenerator,
};

/// Everything known about the resume and the role it targets.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AtsRequest {
    /// Structured resume data as the UI holds it.
    #[serde(default)]
    pub resume_data: Value,
    pub target_role: String,
    pub job_description: Option<String>,
    pub current_level: Option<String>,
    pub industry: Option<String>,
    /// Plain text extracted from an uploaded resume file.
    #[serde(skip)]
    pub resume_text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AtsAnalysis {
    #[serde(default)]
    pub ats_score: AtsScore,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub missing_keywords: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AtsScore {
    #[serde(default)]
    pub total: f64,
    /// Per-dimension sub-scores (keyword_match, formatting, ...).
    #[serde(flatten)]
    pub breakdown: Map<String, Value>,
}

pub fn ats_schema() -> Schema {
    let list = || Schema::array(Schema::string());
    Schema::object(
        [
            (
                "ats_score",
                Schema::object(
                    [
                        ("total", Schema::number().describe("Overall score from 0 to 100")),
                        ("keyword_match", Schema::number()),
                        ("formatting", Schema::number()),
                        ("impact", Schema::number()),
                        ("skills_alignment", Schema::number()),
                    ],
                    ["total"],
                ),
            ),
            ("strengths", list()),
            ("weaknesses", list()),
            ("missing_keywords", list()),
            ("suggestions", list()),
        ],
        ["ats_score", "strengths", "weaknesses", "missing_keywords", "suggestions"],
    )
}

fn build_ats_prompt(request: &AtsRequest) -> String {
    let mut context = String::new();
    if let Some(level) = request.current_level.as_deref().filter(|s| !s.is_empty()) {
        context.push_str(&format!(" The candidate is at {level} level."));
    }
    if let Some(industry) = request.industry.as_deref().filter(|s| !s.is_empty()) {
        context.push_str(&format!(" Target industry: {industry}."));
    }
    if let Some(jd) = request.job_description.as_deref().filter(|s| !s.trim().is_empty()) {
        context.push_str(&format!("\n\nJOB DESCRIPTION:\n{}", jd.trim()));
    }

    let resume_text = match request.resume_text.as_deref() {
        Some(text) if !text.trim().is_empty() => {
            format!("\nRESUME FILE TEXT:\n{}\n", text.trim())
        }
        _ => String::new(),
    };

    let prompt = ATS_PROMPT_TEMPLATE
        .replace("{target_role}", &request.target_role)
        .replace("{context}", &context)
        .replace("{resume_json}", &request.resume_data.to_string())
        .replace("{resume_text}", &resume_text);
    with_json_only(prompt)
}

/// Scores a resume for the target role. An empty answer yields an empty analysis.
pub async fn analyze_resume_ats(
    llm: &dyn TextGenerator,
    request: &AtsRequest,
) -> Result<AtsAnalysis, LlmError> {
    let generation = GenerationRequest::prompt(build_ats_prompt(request)).with_schema(ats_schema());
    let response = llm.generate(generation).await?;
    parse_json_or_default(response.text())
}

/// Answers a question about an ATS analysis in a fresh resume-assistant session.
/// Prior chat turns are accepted but not forwarded; the analysis' total score is.
pub async fn chat_with_resume(
    llm: Arc<dyn TextGenerator>,
    _chat_history: &[ChatMessage],
    analysis: &AtsAnalysis,
    user_message: &str,
) -> Result<String, LlmError> {
    let message = RESUME_CHAT_MESSAGE_TEMPLATE
        .replace("{user_message}", user_message)
        .replace("{ats_total}", &analysis.ats_score.total.to_string());

    let mut chat = ChatSession::new(llm, RESUME_CHAT_SYSTEM);
    chat.send_message(message).await
}
