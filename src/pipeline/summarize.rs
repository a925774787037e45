//! Map-reduce summarization over extracted segments.
//!
//! ```text
//! segments ──map──▶ partial summaries ──collapse*──▶ ≤ budget ──reduce──▶ summary
//! ```
//!
//! The map phase runs up to `concurrency` calls at once. Results arrive in
//! completion order and are re-sorted by segment index before anything is
//! concatenated, so the final text always follows source order.
//!
//! When the joined partial summaries are too long for a single combine call,
//! collapse rounds condense runs of consecutive summaries with the combine
//! template until they fit. A round that cannot merge anything ends the
//! loop and the reduce call receives whatever remains.

use crate::error::ReportError;
use crate::output::PageSegment;
use crate::pipeline::llm::{complete_with_retry, Completion, CompletionModel, CompletionSettings, RetryPolicy};
use crate::progress::ProgressCallback;
use crate::prompts::PromptPair;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Separator between partial summaries in a combine prompt.
const SUMMARY_SEPARATOR: &str = "\n\n";

/// Tuning knobs for [`Summarizer`].
#[derive(Debug, Clone)]
pub struct SummarizerOptions {
    pub concurrency: usize,
    pub max_combine_chars: usize,
    pub settings: CompletionSettings,
    pub retry: RetryPolicy,
}

impl Default for SummarizerOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            max_combine_chars: 12_000,
            settings: CompletionSettings::default(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Final summary text plus call accounting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryOutcome {
    pub text: String,
    pub llm_calls: usize,
    pub collapse_rounds: usize,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl SummaryOutcome {
    fn record(&mut self, completion: &Completion) {
        self.llm_calls += 1;
        self.input_tokens += completion.input_tokens;
        self.output_tokens += completion.output_tokens;
    }
}

pub struct Summarizer {
    model: Arc<dyn CompletionModel>,
    options: SummarizerOptions,
    progress: Option<ProgressCallback>,
}

impl Summarizer {
    pub fn new(model: Arc<dyn CompletionModel>, options: SummarizerOptions) -> Self {
        Self {
            model,
            options,
            progress: None,
        }
    }

    pub fn with_progress(mut self, callback: Option<ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Summarize `segments` (already in source order) with `prompts`.
    ///
    /// Fails on the first LLM error; no partial summary is returned.
    pub async fn summarize(
        &self,
        segments: &[PageSegment],
        prompts: &PromptPair,
    ) -> Result<SummaryOutcome, ReportError> {
        if segments.is_empty() {
            return Err(ReportError::Internal("no segments to summarize".into()));
        }

        let mut outcome = SummaryOutcome::default();

        let mut summaries = self.map(segments, prompts, &mut outcome).await?;
        info!(
            "Map phase: {} segments → {} summaries ({} chars)",
            segments.len(),
            summaries.len(),
            joined_len(&summaries)
        );

        summaries = self.collapse(summaries, prompts, &mut outcome).await?;

        if let Some(ref cb) = self.progress {
            cb.on_reduce_start(summaries.len());
        }
        let prompt = prompts.render_combine(&summaries.join(SUMMARY_SEPARATOR));
        let completion = self.call(&prompt, "reduce").await?;
        outcome.record(&completion);
        outcome.text = completion.text;

        debug!(
            "Summarization done: {} calls, {} collapse rounds",
            outcome.llm_calls, outcome.collapse_rounds
        );
        Ok(outcome)
    }

    async fn call(&self, prompt: &str, stage: &str) -> Result<Completion, ReportError> {
        complete_with_retry(
            &*self.model,
            prompt,
            &self.options.settings,
            &self.options.retry,
            stage,
        )
        .await
    }

    async fn map(
        &self,
        segments: &[PageSegment],
        prompts: &PromptPair,
        outcome: &mut SummaryOutcome,
    ) -> Result<Vec<String>, ReportError> {
        let total = segments.len();
        if let Some(ref cb) = self.progress {
            cb.on_map_start(total);
        }

        let mut results: Vec<(usize, Completion)> =
            stream::iter(segments.iter().enumerate().map(|(index, segment)| {
                let prompt = prompts.render_map(&segment.text);
                async move {
                    let completion = self.call(&prompt, "map").await?;
                    if let Some(ref cb) = self.progress {
                        cb.on_chunk_complete(index, total, completion.text.len());
                    }
                    Ok::<_, ReportError>((index, completion))
                }
            }))
            .buffer_unordered(self.options.concurrency.max(1))
            .try_collect()
            .await?;

        results.sort_by_key(|(index, _)| *index);
        Ok(results
            .into_iter()
            .map(|(_, completion)| {
                outcome.record(&completion);
                completion.text
            })
            .collect())
    }

    async fn collapse(
        &self,
        mut summaries: Vec<String>,
        prompts: &PromptPair,
        outcome: &mut SummaryOutcome,
    ) -> Result<Vec<String>, ReportError> {
        let budget = self.options.max_combine_chars;

        while summaries.len() > 1 && joined_len(&summaries) > budget {
            let groups = group_consecutive(&summaries, budget);
            if groups.len() >= summaries.len() {
                warn!(
                    "Cannot condense {} summaries under {} chars; reducing as-is",
                    summaries.len(),
                    budget
                );
                break;
            }

            outcome.collapse_rounds += 1;
            if let Some(ref cb) = self.progress {
                cb.on_collapse_round(outcome.collapse_rounds, summaries.len());
            }
            info!(
                "Collapse round {}: {} summaries → {} groups",
                outcome.collapse_rounds,
                summaries.len(),
                groups.len()
            );

            let mut condensed: Vec<(usize, Option<Completion>, String)> =
                stream::iter(groups.into_iter().enumerate().map(|(index, group)| {
                    async move {
                        if group.len() == 1 {
                            return Ok::<_, ReportError>((index, None, group[0].clone()));
                        }
                        let prompt = prompts.render_combine(&group.join(SUMMARY_SEPARATOR));
                        let completion = self.call(&prompt, "collapse").await?;
                        let text = completion.text.clone();
                        Ok((index, Some(completion), text))
                    }
                }))
                .buffer_unordered(self.options.concurrency.max(1))
                .try_collect()
                .await?;

            condensed.sort_by_key(|(index, _, _)| *index);
            summaries = condensed
                .into_iter()
                .map(|(_, completion, text)| {
                    if let Some(ref c) = completion {
                        outcome.record(c);
                    }
                    text
                })
                .collect();
        }

        Ok(summaries)
    }
}

/// Length of `summaries` once joined with [`SUMMARY_SEPARATOR`].
fn joined_len(summaries: &[String]) -> usize {
    let text: usize = summaries.iter().map(String::len).sum();
    text + SUMMARY_SEPARATOR.len() * summaries.len().saturating_sub(1)
}

/// Partition `summaries` into runs of consecutive items whose joined length
/// stays within `budget`. An item longer than the budget forms its own group.
fn group_consecutive(summaries: &[String], budget: usize) -> Vec<&[String]> {
    let mut groups = Vec::new();
    let mut start = 0;
    let mut len = 0;

    for (i, summary) in summaries.iter().enumerate() {
        let added = if i == start {
            summary.len()
        } else {
            SUMMARY_SEPARATOR.len() + summary.len()
        };
        if i > start && len + added > budget {
            groups.push(&summaries[start..i]);
            start = i;
            len = summary.len();
        } else {
            len += added;
        }
    }
    if start < summaries.len() {
        groups.push(&summaries[start..]);
    }
    groups
}
