//! Text extraction: turn input PDFs into an ordered list of [`PageSegment`]s.
//!
//! Extraction is CPU-bound and synchronous (lopdf parses the whole object
//! graph), so [`extract_segments`] runs it in `spawn_blocking` to keep the
//! Tokio worker threads free.
//!
//! Ordering is input-file order, then page order, then chunk order. Any file
//! that cannot be parsed aborts the whole extraction; there is no
//! partial-results mode.

use crate::error::ReportError;
use crate::output::PageSegment;
use crate::pipeline::input;
use lopdf::Document;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Source of page-level text for one document.
pub trait TextExtractor: Send + Sync {
    /// Return `(page_number, text)` pairs in page order; page numbers are
    /// 1-based.
    fn extract(&self, path: &Path) -> Result<Vec<(usize, String)>, ReportError>;
}

/// [`TextExtractor`] backed by lopdf's content-stream text decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfExtractor;

impl TextExtractor for LopdfExtractor {
    fn extract(&self, path: &Path) -> Result<Vec<(usize, String)>, ReportError> {
        let document = Document::load(path)
            .map_err(|e| ReportError::unreadable(path, format!("cannot parse PDF: {e}")))?;

        let pages = document.get_pages();
        if pages.is_empty() {
            return Err(ReportError::unreadable(path, "document has no pages"));
        }

        let mut out = Vec::with_capacity(pages.len());
        for &page_number in pages.keys() {
            let text = document.extract_text(&[page_number]).map_err(|e| {
                ReportError::unreadable(path, format!("page {page_number}: {e}"))
            })?;
            out.push((page_number as usize, text));
        }

        debug!("Extracted {} pages from {}", out.len(), path.display());
        Ok(out)
    }
}

/// Validate, extract, and chunk every input file.
pub async fn extract_segments(
    extractor: Arc<dyn TextExtractor>,
    paths: Vec<PathBuf>,
    chunk_chars: usize,
) -> Result<Vec<PageSegment>, ReportError> {
    tokio::task::spawn_blocking(move || extract_segments_blocking(&*extractor, &paths, chunk_chars))
        .await
        .map_err(|e| ReportError::Internal(format!("Extraction task panicked: {}", e)))?
}

fn extract_segments_blocking(
    extractor: &dyn TextExtractor,
    paths: &[PathBuf],
    chunk_chars: usize,
) -> Result<Vec<PageSegment>, ReportError> {
    input::validate_all(paths)?;

    let mut segments = Vec::new();
    for (source, path) in paths.iter().enumerate() {
        let pages = extractor.extract(path)?;
        let before = segments.len();
        for (page, text) in pages {
            if text.trim().is_empty() {
                continue;
            }
            for (chunk, piece) in split_text(&text, chunk_chars).into_iter().enumerate() {
                segments.push(PageSegment {
                    source,
                    page,
                    chunk,
                    text: piece,
                });
            }
        }
        info!(
            "{}: {} segments",
            path.display(),
            segments.len() - before
        );
    }

    if segments.is_empty() {
        let path = paths.first().cloned().unwrap_or_default();
        return Err(ReportError::unreadable(
            path,
            "no extractable text in any input document",
        ));
    }
    Ok(segments)
}

/// Split `text` into pieces of at most `max_chars` characters.
///
/// Prefers to break at a paragraph break, then a line break, then a space;
/// falls back to a hard split when a window contains none of them. Pieces
/// are trimmed and empty pieces are dropped.
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut pieces = Vec::new();
    let mut rest = text.trim();

    while !rest.is_empty() {
        let limit = match rest.char_indices().nth(max_chars) {
            Some((byte_idx, _)) => byte_idx,
            None => {
                pieces.push(rest.to_string());
                break;
            }
        };

        let window = &rest[..limit];
        let split = [window.rfind("\n\n"), window.rfind('\n'), window.rfind(' ')]
            .into_iter()
            .flatten()
            .find(|&i| i > 0)
            .unwrap_or(limit);

        let piece = rest[..split].trim();
        if !piece.is_empty() {
            pieces.push(piece.to_string());
        }
        rest = rest[split..].trim_start();
    }

    pieces
}
