//! Career-advice chat.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::generation::prompts::CAREER_ADVICE_SYSTEM;
use crate::llm_client::{ChatSession, LlmError, TextGenerator};
use crate::models::user::UserProfile;

/// One message of a UI-side conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Answers the latest message of `history` in a fresh advisor session.
///
/// Only the last message reaches the model; earlier turns are not forwarded.
pub async fn get_career_advice(
    llm: Arc<dyn TextGenerator>,
    history: &[ChatMessage],
    profile: &UserProfile,
) -> Result<String, LlmError> {
    let last = history
        .last()
        .ok_or_else(|| LlmError::InvalidRequest("chat history is empty".to_string()))?;

    debug!(
        "Career advice for '{}' ({}), {} messages of history",
        profile.target_role,
        profile.current_level,
        history.len()
    );

    let mut chat = ChatSession::new(llm, CAREER_ADVICE_SYSTEM);
    chat.send_message(last.content.clone()).await
}
