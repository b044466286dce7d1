//! Short-lived conversational sessions: a fixed system instruction plus the turns
//! exchanged through this session only.

use std::sync::Arc;

use tracing::debug;

use crate::llm_client::{Content, GenerationRequest, LlmError, TextGenerator};

pub struct ChatSession {
    llm: Arc<dyn TextGenerator>,
    system_instruction: String,
    history: Vec<Content>,
}

impl ChatSession {
    pub fn new(llm: Arc<dyn TextGenerator>, system_instruction: impl Into<String>) -> Self {
        Self {
            llm,
            system_instruction: system_instruction.into(),
            history: Vec::new(),
        }
    }

    /// Sends one user message with every earlier turn of this session and returns
    /// the reply text (empty when the model produced none).
    pub async fn send_message(&mut self, message: impl Into<String>) -> Result<String, LlmError> {
        let mut contents = self.history.clone();
        contents.push(Content::user(message));

        let request = GenerationRequest {
            contents: contents.clone(),
            ..Default::default()
        }
        .with_system(self.system_instruction.clone());
        let reply = self.llm.generate(request).await?.text.unwrap_or_default();
        debug!("Chat turn {} answered ({} chars)", contents.len(), reply.len());

        // A failed turn leaves the history untouched.
        contents.push(Content::model(reply.clone()));
        self.history = contents;
        Ok(reply)
    }

    #[cfg(test)]
    pub fn history(&self) -> &[Content] {
        &self.history
    }
}
