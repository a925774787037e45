//! Pipeline stages for PDF-to-report generation.
//!
//! Each submodule implements one transformation step and is tested on its
//! own. The LLM, extraction, and rendering steps sit behind traits
//! ([`llm::CompletionModel`], [`extract::TextExtractor`],
//! [`render::ReportRenderer`]) so they can be swapped without touching the
//! rest.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ summarize ──▶ postprocess ──▶ format ──▶ render
//! (check)   (lopdf)     (map/reduce)  (cleanup)      (styles)   (printpdf)
//! ```
//!
//! 1. [`input`]: check every path is a readable PDF before doing work
//! 2. [`extract`]: page text via lopdf, split into bounded chunks; runs in
//!    `spawn_blocking`
//! 3. [`summarize`]: map each chunk, collapse if needed, reduce once; the
//!    only stage with network I/O (through [`llm`] / [`openai`])
//! 4. [`postprocess`]: deterministic cleanup of the model's answer
//! 5. [`format`]: one styled block per summary line
//! 6. [`render`]: wrap, paginate, and draw the A4 report

pub mod extract;
pub mod format;
pub mod input;
pub mod llm;
pub mod openai;
pub mod postprocess;
pub mod render;
pub mod summarize;
