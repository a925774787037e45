//! # pdf-report
//!
//! Summarise PDF documents with a large language model and publish the
//! summary as a styled PDF report.
//!
//! ## Why map-reduce?
//!
//! A long document rarely fits in one prompt, and even when it does a single
//! call tends to over-weight the first pages. Instead every chunk of text is
//! summarised on its own (the *map* phase, run concurrently), and the partial
//! summaries are combined in source order by one final call (the *reduce*
//! phase). When the partial summaries are themselves too long they are
//! condensed in rounds first.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF(s)
//!  │
//!  ├─ 1. Input    check each path is a readable PDF
//!  ├─ 2. Extract  page text via lopdf (CPU-bound, spawn_blocking)
//!  ├─ 3. Map      one LLM call per chunk, bounded concurrency
//!  ├─ 4. Reduce   one combine call over the ordered partial summaries
//!  ├─ 5. Format   cleanup, then one styled block per line
//!  ├─ 6. Render   A4 PDF with banner, footer and page numbers (printpdf)
//!  └─ 7. Publish  atomic write to {output_dir}/{uuid}.pdf
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_report::{generate_report, ReportConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / EDGEQUAKE_LLM_PROVIDER
//!     let config = ReportConfig::default();
//!     let report = generate_report(&["q3-sales.pdf"], "sales", &config).await?;
//!     println!("{} → {}", report.id, report.path.display());
//!     eprintln!("{} LLM calls, {} tokens in",
//!         report.stats.llm_calls,
//!         report.stats.total_input_tokens);
//!     Ok(())
//! }
//! ```
//!
//! ## Report Types
//!
//! | Type      | Title             | Focus                                   |
//! |-----------|-------------------|-----------------------------------------|
//! | `sales`   | Sales Analysis    | figures, trends, products, regions      |
//! | `news`    | News Summary      | events, actors, dates, outcomes         |
//! | `content` | Content Summary   | main ideas and conclusions              |
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `reportgen` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf-report = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod generate;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ReportConfig, ReportConfigBuilder};
pub use error::{ErrorKind, ModelError, ReportError};
pub use generate::{generate_report, generate_report_from_bytes, generate_report_sync, ReportGenerator};
pub use output::{FormattedBlock, PageSegment, Report, ReportDocument, ReportStats, StyleTag};
pub use pipeline::extract::{LopdfExtractor, TextExtractor};
pub use pipeline::format::format_summary;
pub use pipeline::llm::{Completion, CompletionModel, CompletionSettings};
pub use pipeline::render::{PdfReportRenderer, ReportRenderer};
pub use progress::{NoopProgressCallback, ProgressCallback, ReportProgressCallback};
pub use prompts::{BuiltinPrompts, PromptPair, PromptSelector, ReportType};
pub use store::ReportStore;
