//! Test doubles for the generation endpoint.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm_client::{GenerationRequest, GenerationResponse, LlmError, TextGenerator};

/// Answers every request with the same text and records what it was sent.
pub struct CannedLlm {
    reply: Option<String>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl CannedLlm {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Some(text.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A model that produced no text part at all.
    pub fn silent() -> Self {
        Self {
            reply: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> GenerationRequest {
        self.requests().pop().expect("no request was sent")
    }
}

#[async_trait]
impl TextGenerator for CannedLlm {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
        self.requests.lock().unwrap().push(request);
        Ok(GenerationResponse {
            text: self.reply.clone(),
        })
    }
}

/// Fails every request the way an unreachable endpoint would.
pub struct DownLlm;

#[async_trait]
impl TextGenerator for DownLlm {
    async fn generate(&self, _request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
        Err(LlmError::Api {
            status: 503,
            message: "backend unavailable".to_string(),
        })
    }
}
