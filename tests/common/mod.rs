//! Shared fixtures for integration tests: tiny text PDFs built with lopdf,
//! a scripted completion model, and a renderer that records its input.

#![allow(dead_code)]

use async_trait::async_trait;
use lopdf::dictionary;
use lopdf::{Document, Object, Stream};
use pdf_report::{
    BuiltinPrompts, Completion, CompletionModel, CompletionSettings, ModelError, PdfReportRenderer,
    PromptPair, PromptSelector, ReportDocument, ReportError, ReportRenderer, ReportType,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Build a PDF with one page per entry of `pages`. An empty string yields a
/// page with no text.
pub fn make_pdf(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.4");

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let pages_id = doc.new_object_id();

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = if text.is_empty() {
            String::new()
        } else {
            format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET")
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

pub fn write_pdf(dir: &Path, name: &str, pages: &[&str]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, make_pdf(pages)).unwrap();
    path
}

/// Builtin titles with marker templates, so the model can tell map calls
/// from combine calls.
pub struct MarkerPrompts;

impl PromptSelector for MarkerPrompts {
    fn select(&self, report_type: ReportType) -> PromptPair {
        let title = BuiltinPrompts.select(report_type).title;
        PromptPair::new(title, "MAP:{text}", "COMBINE:{text}")
    }
}

pub const FINAL_SUMMARY: &str =
    "# Overview\nTotal revenue increased.\n- Revenue: $5M\n- Costs: $2M";

/// Scripted model for [`MarkerPrompts`].
///
/// Map calls answer `- <first word of the chunk>`; a map call whose chunk
/// mentions `fail_on` fails permanently. Combine calls record their prompt
/// and answer [`FINAL_SUMMARY`], or fail permanently when `fail_combine` is
/// set. `delay_first` makes chunks that start with
/// `A` slow so completion order differs from source order.
pub struct ScriptedModel {
    pub calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
    pub fail_on: Option<&'static str>,
    pub fail_combine: bool,
    pub delay: Option<Duration>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(vec![]),
            fail_on: None,
            fail_combine: false,
            delay: None,
        }
    }

    pub fn failing_on(marker: &'static str) -> Self {
        Self {
            fail_on: Some(marker),
            ..Self::new()
        }
    }

    pub fn failing_combine() -> Self {
        Self {
            fail_combine: true,
            ..Self::new()
        }
    }

    pub fn sleeping(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn combine_prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.starts_with("COMBINE:"))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CompletionModel for ScriptedModel {
    async fn complete(
        &self,
        prompt: &str,
        _settings: &CompletionSettings,
    ) -> Result<Completion, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(chunk) = prompt.strip_prefix("MAP:") {
            if let Some(marker) = self.fail_on {
                if chunk.contains(marker) {
                    return Err(ModelError::Permanent("quota exceeded".into()));
                }
            }
            let first = chunk.split_whitespace().next().unwrap_or("").to_string();
            if first.starts_with('A') {
                tokio::time::sleep(Duration::from_millis(30)).await;
            }
            return Ok(Completion {
                text: format!("- {first}"),
                input_tokens: 20,
                output_tokens: 4,
            });
        }

        if self.fail_combine {
            return Err(ModelError::Permanent("model overloaded".into()));
        }
        Ok(Completion {
            text: FINAL_SUMMARY.to_string(),
            input_tokens: 40,
            output_tokens: 16,
        })
    }

    fn name(&self) -> String {
        "scripted".into()
    }
}

/// Keeps every document it is asked to render, then renders it for real.
pub struct RecordingRenderer {
    pub documents: Mutex<Vec<ReportDocument>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self {
            documents: Mutex::new(vec![]),
        }
    }

    pub fn last(&self) -> ReportDocument {
        self.documents.lock().unwrap().last().cloned().unwrap()
    }
}

impl ReportRenderer for RecordingRenderer {
    fn render(&self, document: &ReportDocument) -> Result<Vec<u8>, ReportError> {
        self.documents.lock().unwrap().push(document.clone());
        PdfReportRenderer.render(document)
    }
}

/// Renders for real, but takes `delay` of wall-clock time first.
pub struct SlowRenderer {
    pub delay: Duration,
}

impl ReportRenderer for SlowRenderer {
    fn render(&self, document: &ReportDocument) -> Result<Vec<u8>, ReportError> {
        std::thread::sleep(self.delay);
        PdfReportRenderer.render(document)
    }
}

pub fn files_in(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}
