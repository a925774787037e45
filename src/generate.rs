//! Report generation entry points.
//!
//! One call runs the whole pipeline for one set of input PDFs:
//!
//! ```text
//! parse type ─▶ validate+extract ─▶ resolve LLM ─▶ map ─▶ collapse* ─▶ reduce
//!            ─▶ cleanup ─▶ format ─▶ render ─▶ publish ─▶ Report
//! ```
//!
//! Every stage fails fast. Nothing is written to the report store unless
//! every earlier stage succeeded, and input files are never modified.

use crate::config::ReportConfig;
use crate::error::ReportError;
use crate::output::{Report, ReportDocument, ReportStats};
use crate::pipeline::extract::{self, LopdfExtractor, TextExtractor};
use crate::pipeline::llm::{CompletionModel, ProviderModel};
use crate::pipeline::openai::ChatCompletionsModel;
use crate::pipeline::render::{self, PdfReportRenderer, ReportRenderer};
use crate::pipeline::summarize::{Summarizer, SummarizerOptions};
use crate::pipeline::{format, postprocess};
use crate::prompts::ReportType;
use crate::store::ReportStore;
use chrono::{DateTime, Local};
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Generate a report from PDF files on disk.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `paths`: one or more PDF files, summarised in the given order
/// * `report_type`: `"sales"`, `"news"` or `"content"` (case-insensitive)
/// * `config`: generation configuration
///
/// # Errors
/// Returns the first failure of any stage; see [`ReportError`]. An unknown
/// `report_type` is rejected before any file is read or any LLM is called.
pub async fn generate_report<P: AsRef<Path>>(
    paths: &[P],
    report_type: &str,
    config: &ReportConfig,
) -> Result<Report, ReportError> {
    ReportGenerator::new(config.clone())
        .generate(paths, report_type)
        .await
}

/// Generate a report from in-memory PDF documents.
///
/// Each document is written to a managed [`tempfile`] that is removed when
/// this function returns, whether it succeeds or not.
pub async fn generate_report_from_bytes(
    documents: &[Vec<u8>],
    report_type: &str,
    config: &ReportConfig,
) -> Result<Report, ReportError> {
    // Reject a bad type before writing anything to disk.
    report_type.parse::<ReportType>()?;

    let mut files = Vec::with_capacity(documents.len());
    for bytes in documents {
        let mut tmp = tempfile::Builder::new()
            .prefix("report-input-")
            .suffix(".pdf")
            .tempfile()
            .map_err(|e| ReportError::Internal(format!("tempfile: {e}")))?;
        tmp.write_all(bytes)
            .map_err(|e| ReportError::Internal(format!("tempfile write: {e}")))?;
        files.push(tmp);
    }

    let paths: Vec<&Path> = files.iter().map(|f| f.path()).collect();
    // `files` is dropped (and the temp files deleted) when this returns
    generate_report(&paths, report_type, config).await
}

/// Synchronous wrapper around [`generate_report`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_report_sync<P: AsRef<Path>>(
    paths: &[P],
    report_type: &str,
    config: &ReportConfig,
) -> Result<Report, ReportError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ReportError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(generate_report(paths, report_type, config))
}

/// Pipeline runner with replaceable extraction and rendering backends.
pub struct ReportGenerator {
    config: ReportConfig,
    extractor: Arc<dyn TextExtractor>,
    renderer: Arc<dyn ReportRenderer>,
}

impl ReportGenerator {
    pub fn new(config: ReportConfig) -> Self {
        Self {
            config,
            extractor: Arc::new(LopdfExtractor),
            renderer: Arc::new(PdfReportRenderer),
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn ReportRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Run the pipeline under the configured overall time budget.
    ///
    /// The budget covers everything up to and including rendering. Publishing
    /// happens after it, so a report is either stored and returned or never
    /// written at all.
    pub async fn generate<P: AsRef<Path>>(
        &self,
        paths: &[P],
        report_type: &str,
    ) -> Result<Report, ReportError> {
        let total_start = Instant::now();
        let secs = self.config.pipeline_timeout_secs;
        let produce = self.produce(paths, report_type);
        let rendered = if secs == 0 {
            produce.await?
        } else {
            match timeout(Duration::from_secs(secs), produce).await {
                Ok(result) => result?,
                Err(_) => {
                    warn!("Report generation exceeded {}s; aborting", secs);
                    return Err(ReportError::Timeout {
                        stage: "pipeline".into(),
                        secs,
                    });
                }
            }
        };
        self.publish(rendered, total_start).await
    }

    /// Every stage before publishing: parse, extract, summarise, format, render.
    async fn produce<P: AsRef<Path>>(
        &self,
        paths: &[P],
        report_type: &str,
    ) -> Result<RenderedReport, ReportError> {
        let config = &self.config;

        // ── Step 1: Report type ──────────────────────────────────────────────
        let report_type: ReportType = report_type.parse()?;
        info!(
            "Generating {} report from {} file(s)",
            report_type,
            paths.len()
        );

        // ── Step 2: Validate and extract ─────────────────────────────────────
        let extract_start = Instant::now();
        let owned: Vec<PathBuf> = paths.iter().map(|p| p.as_ref().to_path_buf()).collect();
        let segments =
            extract::extract_segments(Arc::clone(&self.extractor), owned, config.chunk_chars)
                .await?;
        let extract_duration_ms = extract_start.elapsed().as_millis() as u64;
        info!(
            "Extracted {} segments in {}ms",
            segments.len(),
            extract_duration_ms
        );
        if let Some(ref cb) = config.progress_callback {
            cb.on_extraction_complete(paths.len(), segments.len());
        }

        // ── Step 3: Resolve the model ────────────────────────────────────────
        let model = resolve_model(config).await?;
        debug!("Using completion model '{}'", model.name());

        // ── Step 4: Map, collapse, reduce ────────────────────────────────────
        let prompts = config.prompts.select(report_type);
        let llm_start = Instant::now();
        let options = SummarizerOptions {
            concurrency: config.concurrency,
            max_combine_chars: config.max_combine_chars,
            settings: config.completion_settings(),
            retry: config.retry_policy(),
        };
        let outcome = Summarizer::new(model, options)
            .with_progress(config.progress_callback.clone())
            .summarize(&segments, &prompts)
            .await?;
        let llm_duration_ms = llm_start.elapsed().as_millis() as u64;

        // ── Step 5: Cleanup and format ───────────────────────────────────────
        let summary = postprocess::clean_summary(&outcome.text);
        let blocks = format::format_summary(&summary);
        if blocks.is_empty() {
            warn!("Summary is empty after cleanup; the report will contain only its title");
        }

        // ── Step 6: Render ───────────────────────────────────────────────────
        let generated_at = Local::now();
        let document = ReportDocument::new(prompts.title.clone(), generated_at, blocks);
        let render_start = Instant::now();
        let bytes = render::render_report(Arc::clone(&self.renderer), document).await?;
        let render_duration_ms = render_start.elapsed().as_millis() as u64;

        let stats = ReportStats {
            source_files: paths.len(),
            segments: segments.len(),
            llm_calls: outcome.llm_calls,
            collapse_rounds: outcome.collapse_rounds,
            total_input_tokens: outcome.input_tokens,
            total_output_tokens: outcome.output_tokens,
            extract_duration_ms,
            llm_duration_ms,
            render_duration_ms,
            total_duration_ms: 0,
        };

        Ok(RenderedReport {
            report_type,
            title: prompts.title,
            generated_at,
            bytes,
            stats,
        })
    }

    // ── Step 7: Publish ──────────────────────────────────────────────────────
    async fn publish(
        &self,
        rendered: RenderedReport,
        total_start: Instant,
    ) -> Result<Report, ReportError> {
        let config = &self.config;
        let id = Uuid::new_v4();
        let size = rendered.bytes.len();

        // Failing to write the artifact is a failure to produce the report.
        let path = ReportStore::new(&config.output_dir)
            .publish(id, rendered.bytes)
            .await
            .map_err(|e| match e {
                ReportError::StorageFailed { path, source } => ReportError::RenderFailure {
                    detail: format!("cannot write report to '{}': {}", path.display(), source),
                },
                other => other,
            })?;

        let mut stats = rendered.stats;
        stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

        info!(
            "Report {} complete: {} LLM calls, {} bytes, {}ms total",
            id, stats.llm_calls, size, stats.total_duration_ms
        );
        if let Some(ref cb) = config.progress_callback {
            cb.on_report_complete(id.to_string(), size);
        }

        Ok(Report {
            id,
            path,
            report_type: rendered.report_type,
            title: rendered.title,
            generated_at: rendered.generated_at,
            stats,
        })
    }
}

/// A rendered report waiting to be published.
struct RenderedReport {
    report_type: ReportType,
    title: String,
    generated_at: DateTime<Local>,
    bytes: Vec<u8>,
    stats: ReportStats,
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn model_label(config: &ReportConfig) -> String {
    config
        .model
        .clone()
        .unwrap_or_else(|| crate::config::DEFAULT_MODEL.to_string())
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, ReportError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ReportError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

fn wrap_provider(provider: Arc<dyn LLMProvider>, label: String) -> Arc<dyn CompletionModel> {
    Arc::new(ProviderModel::new(provider, label))
}

/// Resolve the completion model, from most-specific to least-specific.
///
/// 1. **Completion model** (`config.completion_model`): used as-is; this is
///    how tests and custom integrations plug in.
/// 2. **Pre-built provider** (`config.provider`): an `edgequake_llm`
///    provider the caller configured entirely.
/// 3. **Named provider + model** (`config.provider_name`): built through
///    [`ProviderFactory::create_llm_provider`], which reads the provider's
///    API key from the environment.
/// 4. **Explicit API key** (`config.api_key`): plain chat-completions
///    client against `config.api_base_url`.
/// 5. **Environment**: `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL` when both
///    are set, then `OPENAI_API_KEY`, then [`ProviderFactory::from_env`]
///    auto-detection.
async fn resolve_model(config: &ReportConfig) -> Result<Arc<dyn CompletionModel>, ReportError> {
    if let Some(ref model) = config.completion_model {
        return Ok(Arc::clone(model));
    }

    if let Some(ref provider) = config.provider {
        return Ok(wrap_provider(Arc::clone(provider), model_label(config)));
    }

    if let Some(ref name) = config.provider_name {
        let model = model_label(config);
        let provider = create_provider(name, &model)?;
        return Ok(wrap_provider(provider, format!("{name}/{model}")));
    }

    if let Some(ref key) = config.api_key {
        return Ok(Arc::new(ChatCompletionsModel::new(
            &config.api_base_url,
            key,
            model_label(config),
        )));
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            let provider = create_provider(&prov, &model)?;
            return Ok(wrap_provider(provider, format!("{prov}/{model}")));
        }
    }

    // An OpenAI key wins over other keys found in the environment.
    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = model_label(config);
            let provider = create_provider("openai", &model)?;
            return Ok(wrap_provider(provider, format!("openai/{model}")));
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ReportError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, pass --api-key, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(wrap_provider(llm_provider, "auto".to_string()))
}
