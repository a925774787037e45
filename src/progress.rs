//! Progress-callback trait for report generation events.
//!
//! Inject an [`Arc<dyn ReportProgressCallback>`] via
//! [`crate::config::ReportConfigBuilder::progress_callback`] to receive
//! events as the pipeline moves through extraction, the map phase, the
//! reduce phase, and rendering.
//!
//! # Example
//!
//! ```rust
//! use pdf_report::{ReportConfig, ReportProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     chunks: AtomicUsize,
//! }
//!
//! impl ReportProgressCallback for CountingCallback {
//!     fn on_chunk_complete(&self, index: usize, total: usize, summary_len: usize) {
//!         let done = self.chunks.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("chunk {index} ({done}/{total}) → {summary_len} chars");
//!     }
//! }
//!
//! let config = ReportConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { chunks: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline as it generates a report.
///
/// All methods default to no-ops. Map-phase events may arrive concurrently
/// and out of order when `concurrency > 1`, so implementations must protect
/// shared state with `Mutex` or atomics.
pub trait ReportProgressCallback: Send + Sync {
    /// Text extraction finished for all input files.
    fn on_extraction_complete(&self, files: usize, segments: usize) {
        let _ = (files, segments);
    }

    /// The map phase is about to summarise `total_chunks` segments.
    fn on_map_start(&self, total_chunks: usize) {
        let _ = total_chunks;
    }

    /// One segment was summarised. `index` is 0-based in source order.
    fn on_chunk_complete(&self, index: usize, total: usize, summary_len: usize) {
        let _ = (index, total, summary_len);
    }

    /// Intermediate summaries are being condensed because they exceed the
    /// combine budget.
    fn on_collapse_round(&self, round: usize, summaries: usize) {
        let _ = (round, summaries);
    }

    /// The final combine call is about to be sent.
    fn on_reduce_start(&self, summaries: usize) {
        let _ = summaries;
    }

    /// The report was rendered and published.
    fn on_report_complete(&self, report_id: String, bytes: usize) {
        let _ = (report_id, bytes);
    }
}

/// A no-op implementation; the default when no callback is configured.
pub struct NoopProgressCallback;

impl ReportProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ReportConfig`].
pub type ProgressCallback = Arc<dyn ReportProgressCallback>;
