//! Configuration types for report generation.
//!
//! All pipeline behaviour is controlled through [`ReportConfig`], built via
//! its [`ReportConfigBuilder`]. Everything the pipeline needs from the
//! outside world (where reports are stored, which LLM to call and with what
//! credentials, how prompts are chosen) is an explicit field here; nothing is
//! read from the process environment unless the caller leaves the LLM
//! selection fields empty.

use crate::error::ReportError;
use crate::pipeline::llm::{CompletionModel, CompletionSettings, RetryPolicy};
use crate::progress::ProgressCallback;
use crate::prompts::{BuiltinPrompts, PromptSelector};
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Model used when a provider is named or auto-detected without a model.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Base URL of the OpenAI-compatible chat-completions endpoint used with an
/// explicit [`ReportConfig::api_key`].
pub const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";

/// Configuration for a report generation run.
///
/// # Example
/// ```rust
/// use pdf_report::ReportConfig;
///
/// let config = ReportConfig::builder()
///     .output_dir("reports")
///     .concurrency(8)
///     .model("gpt-4.1-mini")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ReportConfig {
    /// Directory rendered reports are published into. Default: `generated`.
    pub output_dir: PathBuf,

    /// LLM model identifier. If None, uses [`DEFAULT_MODEL`].
    pub model: Option<String>,

    /// LLM provider name for `edgequake_llm::ProviderFactory`
    /// (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed edgequake provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Pre-constructed completion model. Takes precedence over every other
    /// LLM field; this is how tests substitute a fake model.
    pub completion_model: Option<Arc<dyn CompletionModel>>,

    /// API key for the OpenAI-compatible chat-completions endpoint.
    pub api_key: Option<String>,

    /// Base URL used together with `api_key`. Default: [`DEFAULT_API_BASE_URL`].
    pub api_base_url: String,

    /// Sampling temperature. Default: 0.0.
    ///
    /// Summaries should restate the source, not embellish it.
    pub temperature: f32,

    /// Maximum tokens the LLM may generate per call. Default: 1024.
    pub max_tokens: usize,

    /// Retries per LLM call on a transient failure. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled after each attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-LLM-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Budget for the whole pipeline in seconds; 0 disables it. Default: 600.
    pub pipeline_timeout_secs: u64,

    /// Number of concurrent map-phase LLM calls. Default: 4.
    pub concurrency: usize,

    /// Pages longer than this many characters are split before the map
    /// phase. Default: 4000.
    pub chunk_chars: usize,

    /// When the joined map summaries exceed this many characters they are
    /// condensed in groups before the final combine call. Default: 12000.
    pub max_combine_chars: usize,

    /// Prompt-selection strategy. Default: [`BuiltinPrompts`].
    pub prompts: Arc<dyn PromptSelector>,

    /// Optional progress observer.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("generated"),
            model: None,
            provider_name: None,
            provider: None,
            completion_model: None,
            api_key: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            temperature: 0.0,
            max_tokens: 1024,
            max_retries: 3,
            retry_backoff_ms: 500,
            api_timeout_secs: 60,
            pipeline_timeout_secs: 600,
            concurrency: 4,
            chunk_chars: 4000,
            max_combine_chars: 12_000,
            prompts: Arc::new(BuiltinPrompts),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ReportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportConfig")
            .field("output_dir", &self.output_dir)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field(
                "completion_model",
                &self.completion_model.as_ref().map(|m| m.name()),
            )
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base_url", &self.api_base_url)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("pipeline_timeout_secs", &self.pipeline_timeout_secs)
            .field("concurrency", &self.concurrency)
            .field("chunk_chars", &self.chunk_chars)
            .field("max_combine_chars", &self.max_combine_chars)
            .finish()
    }
}

impl ReportConfig {
    /// Create a new builder for `ReportConfig`.
    pub fn builder() -> ReportConfigBuilder {
        ReportConfigBuilder {
            config: Self::default(),
        }
    }

    pub(crate) fn completion_settings(&self) -> CompletionSettings {
        CompletionSettings {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    pub(crate) fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            backoff_ms: self.retry_backoff_ms,
            timeout_secs: self.api_timeout_secs,
        }
    }
}

/// Builder for [`ReportConfig`].
pub struct ReportConfigBuilder {
    config: ReportConfig,
}

impl ReportConfigBuilder {
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn completion_model(mut self, model: Arc<dyn CompletionModel>) -> Self {
        self.config.completion_model = Some(model);
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn pipeline_timeout_secs(mut self, secs: u64) -> Self {
        self.config.pipeline_timeout_secs = secs;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn chunk_chars(mut self, n: usize) -> Self {
        self.config.chunk_chars = n;
        self
    }

    pub fn max_combine_chars(mut self, n: usize) -> Self {
        self.config.max_combine_chars = n;
        self
    }

    pub fn prompts(mut self, selector: Arc<dyn PromptSelector>) -> Self {
        self.config.prompts = selector;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ReportConfig, ReportError> {
        let c = &self.config;
        if c.output_dir.as_os_str().is_empty() {
            return Err(ReportError::InvalidConfig(
                "Output directory must not be empty".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(ReportError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.api_timeout_secs == 0 {
            return Err(ReportError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        if c.chunk_chars < 200 {
            return Err(ReportError::InvalidConfig(format!(
                "chunk_chars must be ≥ 200, got {}",
                c.chunk_chars
            )));
        }
        if c.max_combine_chars < c.chunk_chars {
            return Err(ReportError::InvalidConfig(format!(
                "max_combine_chars ({}) must be ≥ chunk_chars ({})",
                c.max_combine_chars, c.chunk_chars
            )));
        }
        if c.api_key.as_deref().is_some_and(|k| k.trim().is_empty()) {
            return Err(ReportError::InvalidConfig("api_key must not be blank".into()));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ReportConfig::default();
        assert_eq!(c.output_dir, PathBuf::from("generated"));
        assert_eq!(c.temperature, 0.0);
        assert_eq!(c.max_retries, 3);
        assert_eq!(c.concurrency, 4);
        assert_eq!(c.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn builder_clamps() {
        let c = ReportConfig::builder()
            .concurrency(0)
            .temperature(5.0)
            .build()
            .unwrap();
        assert_eq!(c.concurrency, 1);
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn builder_trims_base_url() {
        let c = ReportConfig::builder()
            .api_base_url("http://localhost:11434/v1/")
            .build()
            .unwrap();
        assert_eq!(c.api_base_url, "http://localhost:11434/v1");
    }

    #[test]
    fn build_rejects_tiny_chunks() {
        let err = ReportConfig::builder().chunk_chars(10).build().unwrap_err();
        assert!(matches!(err, ReportError::InvalidConfig(_)));
    }

    #[test]
    fn build_rejects_combine_budget_below_chunk() {
        let err = ReportConfig::builder()
            .chunk_chars(5000)
            .max_combine_chars(1000)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("max_combine_chars"));
    }

    #[test]
    fn build_rejects_blank_api_key() {
        assert!(ReportConfig::builder().api_key("  ").build().is_err());
    }

    #[test]
    fn debug_redacts_api_key() {
        let c = ReportConfig::builder().api_key("sk-secret").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("sk-secret"));
        assert!(dbg.contains("<redacted>"));
    }
}
