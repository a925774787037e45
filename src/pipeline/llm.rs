//! LLM capability: the [`CompletionModel`] seam plus the retry/timeout loop.
//!
//! The summarizer never talks to a provider SDK directly. It sees a single
//! operation, `complete(prompt) → text`, so tests can substitute a scripted
//! model and production code can pick between an `edgequake_llm` provider
//! ([`ProviderModel`]) and the plain chat-completions client in
//! [`crate::pipeline::openai`].
//!
//! ## Retry Strategy
//!
//! Every call is bounded by `timeout_secs`. Transient failures and timeouts
//! are retried with exponential backoff (`backoff_ms * 2^(attempt-1)`): with
//! 500 ms base and 3 retries the waits are 500 ms → 1 s → 2 s. Permanent
//! failures (bad key, malformed request) end the loop immediately.

use crate::error::{ModelError, ReportError};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// Sampling parameters passed with every call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionSettings {
    pub temperature: f32,
    pub max_tokens: usize,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            max_tokens: 1024,
        }
    }
}

/// Text returned by one LLM call plus its token accounting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl Completion {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// `complete(prompt) → text`, network-bound and fallible.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        settings: &CompletionSettings,
    ) -> Result<Completion, ModelError>;

    /// Label used in logs.
    fn name(&self) -> String {
        "completion-model".to_string()
    }
}

/// Adapter from an `edgequake_llm` provider to [`CompletionModel`].
pub struct ProviderModel {
    provider: Arc<dyn LLMProvider>,
    label: String,
}

impl ProviderModel {
    pub fn new(provider: Arc<dyn LLMProvider>, label: impl Into<String>) -> Self {
        Self {
            provider,
            label: label.into(),
        }
    }
}

#[async_trait]
impl CompletionModel for ProviderModel {
    async fn complete(
        &self,
        prompt: &str,
        settings: &CompletionSettings,
    ) -> Result<Completion, ModelError> {
        let messages = vec![ChatMessage::user(prompt)];
        let options = CompletionOptions {
            temperature: Some(settings.temperature),
            max_tokens: Some(settings.max_tokens),
            ..Default::default()
        };

        // edgequake-llm does not expose a retryability flag; treat every
        // provider error as transient and let the attempt budget bound it.
        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| ModelError::Transient(format!("{}", e)))?;

        Ok(Completion {
            text: response.content,
            input_tokens: response.prompt_tokens as u64,
            output_tokens: response.completion_tokens as u64,
        })
    }

    fn name(&self) -> String {
        self.label.clone()
    }
}

/// Timeout and backoff parameters for [`complete_with_retry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_ms: u64,
    pub timeout_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_ms: 500,
            timeout_secs: 60,
        }
    }
}

impl RetryPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_millis(self.backoff_ms.saturating_mul(factor))
    }
}

/// Run one LLM call under the retry policy.
///
/// `stage` ("map", "collapse", "reduce") is carried into logs and into the
/// returned error so callers can tell which phase failed.
pub async fn complete_with_retry(
    model: &dyn CompletionModel,
    prompt: &str,
    settings: &CompletionSettings,
    policy: &RetryPolicy,
    stage: &str,
) -> Result<Completion, ReportError> {
    let start = Instant::now();
    let mut last_err: Option<ReportError> = None;

    for attempt in 0..=policy.max_retries {
        if attempt > 0 {
            let backoff = policy.backoff(attempt);
            warn!(
                "{}: retry {}/{} after {}ms",
                stage,
                attempt,
                policy.max_retries,
                backoff.as_millis()
            );
            sleep(backoff).await;
        }

        let call = model.complete(prompt, settings);
        match timeout(Duration::from_secs(policy.timeout_secs), call).await {
            Ok(Ok(completion)) => {
                debug!(
                    stage,
                    model = %model.name(),
                    input_tokens = completion.input_tokens,
                    output_tokens = completion.output_tokens,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "LLM call succeeded"
                );
                return Ok(completion);
            }
            Ok(Err(e)) => {
                warn!("{}: attempt {} failed: {}", stage, attempt + 1, e);
                let retryable = e.is_retryable();
                last_err = Some(ReportError::LlmInvocation {
                    stage: stage.to_string(),
                    message: e.to_string(),
                });
                if !retryable {
                    break;
                }
            }
            Err(_) => {
                warn!(
                    "{}: attempt {} timed out after {}s",
                    stage,
                    attempt + 1,
                    policy.timeout_secs
                );
                last_err = Some(ReportError::Timeout {
                    stage: format!("{stage} LLM call"),
                    secs: policy.timeout_secs,
                });
            }
        }
    }

    Err(last_err.unwrap_or_else(|| ReportError::Internal("LLM retry loop made no attempt".into())))
}
