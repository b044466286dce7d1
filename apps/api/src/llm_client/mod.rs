/// LLM Client: the single point of entry for all Gemini API calls in PathPilot.
///
/// No other module calls the Generative Language API directly.
///
/// Model: gemini-1.5-flash-001 (fixed, not configurable)
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod chat;
pub mod prompts;
pub mod schema;

pub use chat::ChatSession;
pub use schema::Schema;

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
/// The model used for all LLM calls in PathPilot.
pub const MODEL: &str = "gemini-1.5-flash-001";
const JSON_MIME_TYPE: &str = "application/json";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// One turn of a conversation, in the role vocabulary the API uses ("user" | "model").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: String,
}

impl Content {
    pub fn user(text: impl Into<String>) -> Self {
        Self::with_role("user", text)
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self::with_role("model", text)
    }

    fn with_role(role: &str, text: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            parts: vec![Part { text: text.into() }],
        }
    }
}

/// What a caller asks the model for.
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub contents: Vec<Content>,
    pub system_instruction: Option<String>,
    /// Ask for `application/json` output.
    pub json_output: bool,
    /// Output-shape constraint enforced at generation time. Implies `json_output`.
    pub response_schema: Option<Schema>,
}

impl GenerationRequest {
    pub fn prompt(text: impl Into<String>) -> Self {
        Self {
            contents: vec![Content::user(text)],
            ..Default::default()
        }
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.json_output = true;
        self.response_schema = Some(schema);
        self
    }

    pub fn with_system(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }
}

/// The model's answer. `text` is absent when the model produced no text part.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationResponse {
    pub text: Option<String>,
}

impl GenerationResponse {
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

/// The hosted generation endpoint. Carried as `Arc<dyn TextGenerator>`.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: &'a [Content],
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig<'a>>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction<'a> {
    parts: [TextPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_mime_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<&'a Schema>,
}

impl<'a> GeminiRequest<'a> {
    fn from_request(request: &'a GenerationRequest) -> Self {
        Self {
            contents: &request.contents,
            system_instruction: request.system_instruction.as_deref().map(|text| {
                SystemInstruction {
                    parts: [TextPart { text }],
                }
            }),
            generation_config: request.json_output.then(|| GenerationConfig {
                response_mime_type: JSON_MIME_TYPE,
                response_schema: request.response_schema.as_ref(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
}

impl GeminiResponse {
    /// Concatenated text of the first candidate's parts.
    pub fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        if parts.is_empty() {
            return None;
        }
        Some(parts.iter().map(|p| p.text.as_str()).collect())
    }
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

/// The single LLM client used by all services in PathPilot.
/// Wraps `generateContent` with optional retry on 429/5xx.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    max_attempts: u32,
}

impl GeminiClient {
    pub fn new(client: Client, api_key: String, max_attempts: u32) -> Self {
        Self {
            client,
            base_url: GEMINI_API_URL.to_string(),
            api_key,
            max_attempts: max_attempts.max(1),
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    /// Makes a raw call to the Gemini API, returning the full response object.
    /// Retries on 429 (rate limit) and 5xx responses with exponential backoff while
    /// attempts remain; the default of one attempt means no retry. Transport errors
    /// are returned immediately.
    pub async fn call(&self, request: &GenerationRequest) -> Result<GeminiResponse, LlmError> {
        let url = format!("{}/{MODEL}:generateContent", self.base_url);
        let body = GeminiRequest::from_request(request);

        let mut attempt = 1;
        loop {
            let response = self
                .client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .json(&body)
                .send()
                .await?;

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                if attempt >= self.max_attempts {
                    return Err(LlmError::Api {
                        status: status.as_u16(),
                        message: body,
                    });
                }
                let delay = backoff(attempt);
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<GeminiError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let gemini_response: GeminiResponse = response.json().await?;

            if let Some(usage) = &gemini_response.usage_metadata {
                debug!(
                    "LLM call succeeded: prompt_tokens={}, candidate_tokens={}",
                    usage.prompt_token_count, usage.candidates_token_count
                );
            }

            return Ok(gemini_response);
        }
    }
}

/// Delay before retry number `attempt`: 1s, 2s, 4s, ... capped at 32s.
fn backoff(attempt: u32) -> std::time::Duration {
    std::time::Duration::from_millis(1000 * (1 << (attempt - 1).min(5)))
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
        let response = self.call(&request).await?;
        Ok(GenerationResponse {
            text: response.text(),
        })
    }
}

/// Parses model output as JSON, falling back to `T::default()` when the model
/// returned no text at all. Non-empty text that is not valid JSON is an error.
pub fn parse_json_or_default<T: DeserializeOwned + Default>(
    text: Option<&str>,
) -> Result<T, LlmError> {
    let text = text.map(strip_json_fences).unwrap_or_default();
    if text.is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(text).map_err(LlmError::Parse)
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_parse_json_or_default_on_missing_text() {
        let parsed: Vec<Value> = parse_json_or_default(None).unwrap();
        assert!(parsed.is_empty());
        let parsed: Value = parse_json_or_default(Some("   ")).unwrap();
        assert_eq!(parsed, Value::Null);
    }

    #[test]
    fn test_parse_json_or_default_propagates_malformed() {
        let result: Result<Vec<Value>, _> = parse_json_or_default(Some("not json"));
        assert!(matches!(result, Err(LlmError::Parse(_))));
    }

    #[test]
    fn test_request_body_shape() {
        let request = GenerationRequest::prompt("hello")
            .with_system("be brief")
            .with_schema(Schema::object([("answer", Schema::string())], ["answer"]));
        let body = serde_json::to_value(GeminiRequest::from_request(&request)).unwrap();

        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be brief");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "OBJECT");
    }

    #[test]
    fn test_plain_request_omits_generation_config() {
        let request = GenerationRequest::prompt("hello");
        let body = serde_json::to_value(GeminiRequest::from_request(&request)).unwrap();
        assert!(body.get("generationConfig").is_none());
        assert!(body.get("systemInstruction").is_none());
    }

    #[test]
    fn test_response_text_joins_parts() {
        let response: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": "{\"a\":"}, {"text": "1}"}]}}],
            "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 4}
        }))
        .unwrap();
        assert_eq!(response.text().as_deref(), Some("{\"a\":1}"));
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        assert_eq!(backoff(1).as_millis(), 1000);
        assert_eq!(backoff(2).as_millis(), 2000);
        assert_eq!(backoff(3).as_millis(), 4000);
        assert_eq!(backoff(40).as_millis(), 32000);
    }

    #[tokio::test]
    async fn test_transport_error_is_not_retried() {
        // Nothing listens on port 1, so every connect is refused at once.
        let client = GeminiClient::new(Client::new(), "key".to_string(), 3)
            .with_base_url("http://127.0.0.1:1/v1beta/models");
        let started = std::time::Instant::now();

        let err = client.call(&GenerationRequest::prompt("hi")).await.unwrap_err();

        assert!(matches!(err, LlmError::Http(_)));
        // A single retry would already have slept for a full second.
        assert!(started.elapsed() < std::time::Duration::from_millis(900));
    }

    #[test]
    fn test_response_without_candidates_has_no_text() {
        let response: GeminiResponse = serde_json::from_value(json!({"candidates": []})).unwrap();
        assert_eq!(response.text(), None);
    }
}
