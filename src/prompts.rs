//! Prompt templates for map-reduce summarization.
//!
//! Every report type owns a title and two templates: the *map* template is
//! applied to each extracted segment on its own, the *combine* template to
//! the ordered concatenation of the map outputs. Both templates contain
//! exactly one [`PLACEHOLDER`] where the text is inserted.
//!
//! Centralising the prompts here keeps them inspectable by unit tests and
//! lets callers swap the whole catalogue through [`PromptSelector`] without
//! touching the summarizer.

use crate::error::ReportError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Text-insertion marker used by every template.
pub const PLACEHOLDER: &str = "{text}";

/// Selects which prompt pair (and report title) is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    Sales,
    News,
    Content,
}

impl ReportType {
    pub const ALL: [ReportType; 3] = [ReportType::Sales, ReportType::News, ReportType::Content];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Sales => "sales",
            ReportType::News => "news",
            ReportType::Content => "content",
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportType {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sales" => Ok(ReportType::Sales),
            "news" => Ok(ReportType::News),
            "content" => Ok(ReportType::Content),
            _ => Err(ReportError::InvalidReportType {
                value: s.to_string(),
            }),
        }
    }
}

/// Title plus map/combine templates for one report type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub title: String,
    pub map_template: String,
    pub combine_template: String,
}

impl PromptPair {
    pub fn new(
        title: impl Into<String>,
        map_template: impl Into<String>,
        combine_template: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            map_template: map_template.into(),
            combine_template: combine_template.into(),
        }
    }

    /// Map-phase prompt for one segment.
    pub fn render_map(&self, text: &str) -> String {
        fill(&self.map_template, text)
    }

    /// Combine-phase prompt for the joined intermediate summaries.
    pub fn render_combine(&self, text: &str) -> String {
        fill(&self.combine_template, text)
    }
}

// Single replacement: inserted text may itself contain the marker.
fn fill(template: &str, text: &str) -> String {
    match template.find(PLACEHOLDER) {
        Some(pos) => {
            let mut out = String::with_capacity(template.len() + text.len());
            out.push_str(&template[..pos]);
            out.push_str(text);
            out.push_str(&template[pos + PLACEHOLDER.len()..]);
            out
        }
        None => format!("{template}\n\n{text}"),
    }
}

/// Strategy for turning a [`ReportType`] into a [`PromptPair`].
pub trait PromptSelector: Send + Sync {
    fn select(&self, report_type: ReportType) -> PromptPair;
}

/// The built-in prompt catalogue.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinPrompts;

impl PromptSelector for BuiltinPrompts {
    fn select(&self, report_type: ReportType) -> PromptPair {
        match report_type {
            ReportType::Sales => PromptPair::new("Sales Analysis", SALES_MAP, SALES_COMBINE),
            ReportType::News => PromptPair::new("News Summary", NEWS_MAP, NEWS_COMBINE),
            ReportType::Content => {
                PromptPair::new("Content Summary", CONTENT_MAP, CONTENT_COMBINE)
            }
        }
    }
}

const SALES_MAP: &str = r###"Write a summary of this chunk of text that focuses on the numerical figures of the report and their contributions.

{text}"###;

const SALES_COMBINE: &str = r###"Write a sales report from the following text delimited by triple backquotes.
Return your response as bullet points that focus on the numerical figures in the report, such as overall sales, generated income and revenue.

Formatting rules:
- Start with a single heading line beginning with "# ".
- Put every bullet point on its own line, starting with "- ".
- Limit the response to at most 15 bullet points.
- Do not wrap the response in code fences.

```{text}```

BULLET POINT SUMMARY:"###;

const NEWS_MAP: &str = r###"Summarize the news content in this chunk of text. Keep the key events, the people and organisations involved, dates, and places.

{text}"###;

const NEWS_COMBINE: &str = r###"Write a news summary from the following text delimited by triple backquotes.
Group related items into stories. For each story write a heading line starting with "# ", one or two short paragraphs of narrative, and the key facts as bullet points.

Formatting rules:
- Headings start with "# " and sit on their own line.
- Every bullet point sits on its own line and starts with "- ".
- Separate paragraphs with a single newline.
- Do not wrap the response in code fences.

```{text}```"###;

const CONTENT_MAP: &str = r###"Summarize the main ideas, arguments, and conclusions in this chunk of text.

{text}"###;

const CONTENT_COMBINE: &str = r###"Write a structured content summary of the following text delimited by triple backquotes.
Break the material down by theme: one section per theme, with the most important themes first.

Formatting rules:
- Start each theme with a heading line beginning with "# ".
- Use "## " headings for sub-themes when a theme has distinct parts.
- Write each key point as a bullet on its own line, starting with "- ".
- Use at most 6 bullet points per theme.
- Do not wrap the response in code fences.

```{text}```"###;
