//! OpenAI-compatible chat-completions client with an explicit API key.
//!
//! Used when [`crate::ReportConfig::api_key`] is set. Works against any
//! server that speaks the `/chat/completions` wire format (OpenAI, Azure
//! proxies, vLLM, LiteLLM, Ollama's `/v1` endpoint).

use crate::error::ModelError;
use crate::pipeline::llm::{Completion, CompletionModel, CompletionSettings};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub struct ChatCompletionsModel {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl ChatCompletionsModel {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatRequestMessage<'a>>,
    temperature: f32,
    max_tokens: usize,
}

#[derive(Debug, Serialize)]
struct ChatRequestMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

/// Map a non-success HTTP status to a [`ModelError`].
///
/// 408, 429 and 5xx are worth retrying; everything else (401, 403, 400, 404)
/// will fail the same way again.
fn classify_status(status: StatusCode, body: &str) -> ModelError {
    let detail = format!("HTTP {}: {}", status.as_u16(), body.trim());
    if status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
    {
        ModelError::Transient(detail)
    } else {
        ModelError::Permanent(detail)
    }
}

fn parse_response(body: &str) -> Result<Completion, ModelError> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| ModelError::Transient(format!("malformed completion response: {e}")))?;
    let text = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| ModelError::Transient("completion response has no content".into()))?;
    let (input_tokens, output_tokens) = parsed
        .usage
        .map(|u| (u.prompt_tokens, u.completion_tokens))
        .unwrap_or((0, 0));
    Ok(Completion {
        text,
        input_tokens,
        output_tokens,
    })
}

#[async_trait]
impl CompletionModel for ChatCompletionsModel {
    async fn complete(
        &self,
        prompt: &str,
        settings: &CompletionSettings,
    ) -> Result<Completion, ModelError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatRequestMessage {
                role: "user",
                content: prompt,
            }],
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ModelError::Transient(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ModelError::Transient(e.to_string()))?;
        debug!("{} → HTTP {} ({} bytes)", self.endpoint(), status, body.len());

        if !status.is_success() {
            return Err(classify_status(status, &body));
        }
        parse_response(&body)
    }

    fn name(&self) -> String {
        self.model.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_base_url() {
        let m = ChatCompletionsModel::new("http://localhost:8080/v1/", "k", "m");
        assert_eq!(m.endpoint(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn request_serialises_to_wire_format() {
        let request = ChatRequest {
            model: "gpt-4.1-nano",
            messages: vec![ChatRequestMessage {
                role: "user",
                content: "Summarize this",
            }],
            temperature: 0.0,
            max_tokens: 256,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4.1-nano");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "Summarize this");
        assert_eq!(json["max_tokens"], 256);
    }

    #[test]
    fn parses_content_and_usage() {
        let body = r##"{"choices":[{"message":{"role":"assistant","content":"# Overview"}}],
                       "usage":{"prompt_tokens":12,"completion_tokens":3}}"##;
        let c = parse_response(body).unwrap();
        assert_eq!(c.text, "# Overview");
        assert_eq!(c.input_tokens, 12);
        assert_eq!(c.output_tokens, 3);
    }

    #[test]
    fn missing_usage_counts_zero() {
        let body = r#"{"choices":[{"message":{"content":"hi"}}]}"#;
        let c = parse_response(body).unwrap();
        assert_eq!((c.input_tokens, c.output_tokens), (0, 0));
    }

    #[test]
    fn empty_choices_is_an_error() {
        assert!(parse_response(r#"{"choices":[]}"#).is_err());
        assert!(parse_response("not json").is_err());
    }

    #[test]
    fn status_classification() {
        assert!(classify_status(StatusCode::TOO_MANY_REQUESTS, "").is_retryable());
        assert!(classify_status(StatusCode::BAD_GATEWAY, "").is_retryable());
        assert!(!classify_status(StatusCode::UNAUTHORIZED, "bad key").is_retryable());
        assert!(!classify_status(StatusCode::BAD_REQUEST, "").is_retryable());
        assert!(classify_status(StatusCode::UNAUTHORIZED, "bad key")
            .to_string()
            .contains("401"));
    }
}
