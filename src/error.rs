//! Error types for the pdf-report library.
//!
//! Two error types reflect two different scopes:
//!
//! * [`ReportError`]: **Fatal** for the whole request. Every pipeline stage
//!   fails fast: the first error aborts report generation and is returned
//!   from [`crate::generate_report`] with its [`ErrorKind`] attached.
//!
//! * [`ModelError`]: the outcome of a *single* LLM call. The retry loop in
//!   [`crate::pipeline::llm`] inspects it to decide whether another attempt
//!   is worthwhile, and converts the final failure into a `ReportError`.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf-report library.
#[derive(Debug, Error)]
pub enum ReportError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// An input file is missing, unreadable, not a PDF, or cannot be parsed.
    #[error("Unreadable document '{path}': {detail}")]
    UnreadableDocument { path: PathBuf, detail: String },

    /// The requested report type is not one of `sales`, `news`, `content`.
    #[error("Unsupported report type '{value}'\nExpected one of: sales, news, content.")]
    InvalidReportType { value: String },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// An LLM call failed during the map, collapse, or reduce stage.
    #[error("LLM invocation failed during {stage}: {message}")]
    LlmInvocation { stage: String, message: String },

    /// An LLM call or the whole pipeline exceeded its time budget.
    #[error("{stage} timed out after {secs}s")]
    Timeout { stage: String, secs: u64 },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Layout or PDF serialisation failed.
    #[error("Report rendering failed: {detail}")]
    RenderFailure { detail: String },

    /// The rendered report could not be written to the report store.
    #[error("Failed to store report at '{path}': {source}")]
    StorageFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No stored report exists for the given identifier.
    #[error("Report '{id}' not found")]
    ReportNotFound { id: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of a [`ReportError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    UnreadableDocument,
    InvalidReportType,
    ProviderNotConfigured,
    LlmInvocation,
    Timeout,
    RenderFailure,
    Storage,
    NotFound,
    Configuration,
    Internal,
}

impl ReportError {
    /// The kind of failure, independent of its details.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReportError::UnreadableDocument { .. } => ErrorKind::UnreadableDocument,
            ReportError::InvalidReportType { .. } => ErrorKind::InvalidReportType,
            ReportError::ProviderNotConfigured { .. } => ErrorKind::ProviderNotConfigured,
            ReportError::InvalidConfig(_) => ErrorKind::Configuration,
            ReportError::LlmInvocation { .. } => ErrorKind::LlmInvocation,
            ReportError::Timeout { .. } => ErrorKind::Timeout,
            ReportError::RenderFailure { .. } => ErrorKind::RenderFailure,
            ReportError::StorageFailed { .. } => ErrorKind::Storage,
            ReportError::ReportNotFound { .. } => ErrorKind::NotFound,
            ReportError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// `true` when the caller's input was at fault (4xx-equivalent),
    /// `false` when the system failed (5xx-equivalent).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::UnreadableDocument
                | ErrorKind::InvalidReportType
                | ErrorKind::NotFound
                | ErrorKind::Configuration
        )
    }

    pub(crate) fn unreadable(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        ReportError::UnreadableDocument {
            path: path.into(),
            detail: detail.into(),
        }
    }
}

/// Failure of a single LLM call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModelError {
    /// Network blip, rate limit, 5xx: another attempt may succeed.
    #[error("{0}")]
    Transient(String),

    /// Authentication failure or malformed request: retrying will not help.
    #[error("{0}")]
    Permanent(String),
}

impl ModelError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ModelError::Transient(_))
    }
}
