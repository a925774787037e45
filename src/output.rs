//! Data types flowing through the report pipeline and returned to callers.

use crate::prompts::ReportType;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// One unit of extracted text and where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSegment {
    /// Index of the input file in the caller's path list (0-based).
    pub source: usize,
    /// Page number within that file (1-based).
    pub page: usize,
    /// Chunk index within the page (0-based); non-zero only for split pages.
    pub chunk: usize,
    pub text: String,
}

/// Presentation role of a [`FormattedBlock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StyleTag {
    Title,
    Section,
    Subsection,
    Subsubsection,
    Bullet,
    Body,
}

impl StyleTag {
    pub const ALL: [StyleTag; 6] = [
        StyleTag::Title,
        StyleTag::Section,
        StyleTag::Subsection,
        StyleTag::Subsubsection,
        StyleTag::Bullet,
        StyleTag::Body,
    ];

    /// Position in [`StyleTag::ALL`]; used to index the renderer's style table.
    pub fn index(self) -> usize {
        self as usize
    }
}

/// One styled, ready-to-render unit of report content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedBlock {
    pub text: String,
    pub style: StyleTag,
}

impl FormattedBlock {
    pub fn new(text: impl Into<String>, style: StyleTag) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

/// Everything the renderer needs for one report.
///
/// The first block is always the report title; the formatted summary
/// follows in source order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportDocument {
    pub title: String,
    pub generated_at: DateTime<Local>,
    blocks: Vec<FormattedBlock>,
}

impl ReportDocument {
    pub fn new(
        title: impl Into<String>,
        generated_at: DateTime<Local>,
        content: Vec<FormattedBlock>,
    ) -> Self {
        let title = title.into();
        let mut blocks = Vec::with_capacity(content.len() + 1);
        blocks.push(FormattedBlock::new(title.clone(), StyleTag::Title));
        blocks.extend(content);
        Self {
            title,
            generated_at,
            blocks,
        }
    }

    pub fn blocks(&self) -> &[FormattedBlock] {
        &self.blocks
    }
}

/// Counters and timings for one report generation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportStats {
    pub source_files: usize,
    pub segments: usize,
    pub llm_calls: usize,
    pub collapse_rounds: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub extract_duration_ms: u64,
    pub llm_duration_ms: u64,
    pub render_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// A stored report. The `id` is the only handle callers need to keep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub path: PathBuf,
    pub report_type: ReportType,
    pub title: String,
    pub generated_at: DateTime<Local>,
    pub stats: ReportStats,
}
