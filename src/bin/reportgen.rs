//! CLI binary for pdf-report.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ReportConfig`, runs the pipeline, and manages the report store.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pdf_report::{
    generate_report, ProgressCallback, ReportConfig, ReportProgressCallback, ReportStore,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner while extracting, then a chunk counter for the map phase.
/// Chunks complete out of order when `--concurrency > 1`; the bar only
/// counts them.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        Self::with_bar(ProgressBar::new(0))
    }

    fn with_bar(bar: ProgressBar) -> Arc<Self> {
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Extracting");
        bar.set_message("Reading PDFs…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl CliProgressCallback {
    /// Clear the bar when generation fails so the error is printed cleanly.
    fn abandon(&self) {
        self.bar.finish_and_clear();
    }
}

impl ReportProgressCallback for CliProgressCallback {
    fn on_extraction_complete(&self, files: usize, segments: usize) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("{files} file(s) → {segments} text chunks"))
        ));
    }

    fn on_map_start(&self, total_chunks: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} chunks  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);
        self.bar.set_length(total_chunks as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Summarising");
        self.bar.reset_eta();
    }

    fn on_chunk_complete(&self, index: usize, _total: usize, summary_len: usize) {
        self.bar
            .set_message(dim(&format!("chunk {} → {summary_len} chars", index + 1)));
        self.bar.inc(1);
    }

    fn on_collapse_round(&self, round: usize, summaries: usize) {
        self.bar.println(format!(
            "  {} condensing {summaries} partial summaries (round {round})",
            cyan("↻")
        ));
    }

    fn on_reduce_start(&self, summaries: usize) {
        self.bar.set_prefix("Combining");
        self.bar
            .set_message(format!("{summaries} partial summaries"));
    }

    fn on_report_complete(&self, _report_id: String, _bytes: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Sales analysis of one document (prints the report id)
  reportgen generate --type sales q3-results.pdf

  # News summary of several documents into a custom folder
  reportgen generate --type news -o reports/ a.pdf b.pdf c.pdf

  # Use a specific model through an OpenAI-compatible server
  reportgen generate --type content --api-base http://localhost:11434/v1 \
      --api-key ollama --model llama3.1 notes.pdf

  # Where is report <ID>?  Delete it when done.
  reportgen path 0b6f6d1c-3c1e-4d7a-9a55-2f0f4b0f4a3e
  reportgen remove 0b6f6d1c-3c1e-4d7a-9a55-2f0f4b0f4a3e

REPORT TYPES:
  sales     "Sales Analysis"   figures, trends, products, regions
  news      "News Summary"     events, actors, dates, outcomes
  content   "Content Summary"  main ideas and conclusions

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key (also used for --api-key)
  ANTHROPIC_API_KEY       Anthropic API key (with --provider anthropic)
  GEMINI_API_KEY          Google Gemini API key (with --provider gemini)
  EDGEQUAKE_LLM_PROVIDER  Provider used when nothing else is configured
  EDGEQUAKE_MODEL         Model ID
  REPORTGEN_OUTPUT_DIR    Report folder (default: generated)
"#;

/// Summarise PDF documents into styled PDF reports.
#[derive(Parser, Debug)]
#[command(
    name = "reportgen",
    version,
    about = "Summarise PDF documents into styled PDF reports using LLMs",
    long_about = "Extract the text of one or more PDF documents, summarise it with a \
map-reduce LLM prompt (sales, news or general content), and publish the summary as a \
styled A4 PDF report. Supports OpenAI, Anthropic, Google Gemini, Ollama and any \
OpenAI-compatible endpoint.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "REPORTGEN_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the result.
    #[arg(short, long, global = true, env = "REPORTGEN_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a report and print its id.
    Generate(GenerateArgs),
    /// Print the file path of a stored report.
    Path(StoreArgs),
    /// Delete a stored report.
    Remove(StoreArgs),
    /// List stored report ids.
    List(ListArgs),
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Input PDF files, summarised in the given order.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Report type: sales, news, or content.
    #[arg(short = 't', long = "type", env = "REPORTGEN_TYPE")]
    report_type: String,

    /// Folder the report is published into.
    #[arg(short, long, env = "REPORTGEN_OUTPUT_DIR", default_value = "generated")]
    output_dir: PathBuf,

    /// LLM model ID (e.g. gpt-4.1-nano, gpt-4.1-mini, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(
        long,
        env = "EDGEQUAKE_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set.\n\
          Supported: openai, anthropic, gemini, azure, ollama."
    )]
    provider: Option<String>,

    /// API key for an OpenAI-compatible chat-completions endpoint.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Base URL of the chat-completions endpoint used with --api-key.
    #[arg(long, env = "REPORTGEN_API_BASE")]
    api_base: Option<String>,

    /// Number of concurrent map-phase LLM calls.
    #[arg(short, long, env = "REPORTGEN_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "REPORTGEN_TEMPERATURE", default_value_t = 0.0)]
    temperature: f32,

    /// Max LLM output tokens per call.
    #[arg(long, env = "REPORTGEN_MAX_TOKENS", default_value_t = 1024)]
    max_tokens: usize,

    /// Retries per LLM call on transient failure.
    #[arg(long, env = "REPORTGEN_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Per-call LLM timeout in seconds.
    #[arg(long, env = "REPORTGEN_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Overall time budget in seconds (0 disables).
    #[arg(long, env = "REPORTGEN_TIMEOUT", default_value_t = 600)]
    timeout: u64,

    /// Print the full Report as JSON instead of just the id.
    #[arg(long, env = "REPORTGEN_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "REPORTGEN_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(Args, Debug)]
struct StoreArgs {
    /// Report id printed by `reportgen generate`.
    id: String,

    /// Folder reports are published into.
    #[arg(short, long, env = "REPORTGEN_OUTPUT_DIR", default_value = "generated")]
    output_dir: PathBuf,
}

#[derive(Args, Debug)]
struct ListArgs {
    /// Folder reports are published into.
    #[arg(short, long, env = "REPORTGEN_OUTPUT_DIR", default_value = "generated")]
    output_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = match &cli.command {
        Command::Generate(args) => !cli.quiet && !args.no_progress && !args.json,
        _ => false,
    };
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Generate(args) => {
            let progress = show_progress.then(CliProgressCallback::new);
            run_generate(args, progress, cli.quiet).await
        }
        Command::Path(args) => {
            let store = ReportStore::new(&args.output_dir);
            let path = store
                .locate(&args.id)
                .with_context(|| format!("No report '{}' in {}", args.id, args.output_dir.display()))?;
            println!("{}", path.display());
            Ok(())
        }
        Command::Remove(args) => {
            let store = ReportStore::new(&args.output_dir);
            store
                .remove(&args.id)
                .with_context(|| format!("Failed to remove report '{}'", args.id))?;
            if !cli.quiet {
                eprintln!("{} removed {}", green("✔"), args.id);
            }
            Ok(())
        }
        Command::List(args) => {
            let store = ReportStore::new(&args.output_dir);
            for id in store.list().context("Failed to list reports")? {
                println!("{id}");
            }
            Ok(())
        }
    }
}

async fn run_generate(
    args: GenerateArgs,
    progress: Option<Arc<CliProgressCallback>>,
    quiet: bool,
) -> Result<()> {
    let progress_cb: Option<ProgressCallback> = progress
        .clone()
        .map(|cb| cb as Arc<dyn ReportProgressCallback>);

    let result = match build_config(&args, progress_cb) {
        Ok(config) => generate_report(&args.inputs, &args.report_type, &config)
            .await
            .context("Report generation failed"),
        Err(e) => Err(e),
    };
    let report = match result {
        Ok(report) => report,
        Err(e) => {
            if let Some(cb) = &progress {
                cb.abandon();
            }
            return Err(e);
        }
    };

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
        return Ok(());
    }

    println!("{}", report.id);
    if !quiet {
        eprintln!(
            "{}  {}  {} LLM calls  {}ms  →  {}",
            green("✔"),
            bold(&report.title),
            report.stats.llm_calls,
            report.stats.total_duration_ms,
            bold(&report.path.display().to_string()),
        );
        eprintln!(
            "   {} tokens in  /  {} tokens out",
            dim(&report.stats.total_input_tokens.to_string()),
            dim(&report.stats.total_output_tokens.to_string()),
        );
    }
    Ok(())
}

/// Map CLI args to `ReportConfig`.
fn build_config(args: &GenerateArgs, progress: Option<ProgressCallback>) -> Result<ReportConfig> {
    let mut builder = ReportConfig::builder()
        .output_dir(&args.output_dir)
        .concurrency(args.concurrency)
        .temperature(args.temperature)
        .max_tokens(args.max_tokens)
        .max_retries(args.max_retries)
        .api_timeout_secs(args.api_timeout)
        .pipeline_timeout_secs(args.timeout);

    if let Some(ref model) = args.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider);
    }
    // A named provider reads its own key; only use the raw key without one.
    if args.provider.is_none() {
        if let Some(key) = args.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            builder = builder.api_key(key);
        }
    }
    if let Some(ref base) = args.api_base {
        builder = builder.api_base_url(base);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
