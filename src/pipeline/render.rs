//! Report rendering: lay out formatted blocks and draw them with printpdf.
//!
//! Rendering is split in two:
//!
//! 1. [`layout`] is pure. It wraps every block to the content width and
//!    assigns each line a page and a baseline. Tests exercise pagination
//!    without producing a PDF.
//! 2. [`PdfReportRenderer`] draws the page chrome (navy banner with the
//!    report heading and timestamp, navy footer with the page number) and
//!    the laid-out lines using the built-in Helvetica family, so no font
//!    files are needed at runtime.
//!
//! ## Why spawn_blocking?
//!
//! printpdf builds the whole document in memory and serialises it in one
//! synchronous call. [`render_report`] moves that onto the blocking pool so
//! large reports do not stall Tokio worker threads.
//!
//! ## Page geometry (A4, millimetres, origin bottom-left)
//!
//! ```text
//! 297 ┌──────────────────────────┐
//!     │ banner (1.5 in)          │
//!     ├──────────────────────────┤ ← CONTENT_TOP_MM
//!     │  1 in │ content │ 1 in   │
//!     ├──────────────────────────┤ ← CONTENT_BOTTOM_MM
//!     │ footer (0.5 in)          │
//!   0 └──────────────────────────┘
//! ```

use crate::error::ReportError;
use crate::output::{FormattedBlock, ReportDocument, StyleTag};
use once_cell::sync::Lazy;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfLayerReference, Rect, Rgb,
};
use std::collections::BTreeSet;
use std::io::BufWriter;
use std::sync::Arc;
use tracing::{debug, warn};

pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;

const INCH_MM: f32 = 25.4;
const PT_MM: f32 = INCH_MM / 72.0;

const BANNER_HEIGHT_MM: f32 = 1.5 * INCH_MM;
const FOOTER_HEIGHT_MM: f32 = 0.5 * INCH_MM;
const SIDE_MARGIN_MM: f32 = INCH_MM;
/// Gap between the banner/footer and the content area.
const CONTENT_GAP_MM: f32 = 0.5 * INCH_MM;

pub const CONTENT_TOP_MM: f32 = PAGE_HEIGHT_MM - BANNER_HEIGHT_MM - CONTENT_GAP_MM;
pub const CONTENT_BOTTOM_MM: f32 = FOOTER_HEIGHT_MM + CONTENT_GAP_MM;
const CONTENT_WIDTH_MM: f32 = PAGE_WIDTH_MM - 2.0 * SIDE_MARGIN_MM;

pub const BANNER_HEADING: &str = "Generated Report";

const NAVY: (f32, f32, f32) = (0x1e as f32 / 255.0, 0x3d as f32 / 255.0, 0x59 as f32 / 255.0);
const WHITE: (f32, f32, f32) = (1.0, 1.0, 1.0);
const INK: (f32, f32, f32) = (0.1, 0.1, 0.1);
const SLATE: (f32, f32, f32) = (0.25, 0.3, 0.35);

// ── Style table ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontFace {
    Regular,
    Bold,
}

/// Rendering parameters for one [`StyleTag`]. Sizes are in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockStyle {
    pub font: FontFace,
    pub size_pt: f32,
    pub leading_pt: f32,
    pub space_before_pt: f32,
    pub space_after_pt: f32,
    pub indent_mm: f32,
    pub color: (f32, f32, f32),
}

impl BlockStyle {
    /// Approximate number of characters of `text` that fit on one line.
    ///
    /// Uses an average glyph width relative to the font size. Capitals are
    /// much wider than lowercase in Helvetica, so mostly-uppercase text
    /// gets the wider factor; good enough for word wrapping, not for
    /// justification.
    pub fn chars_per_line(&self, text: &str) -> usize {
        let glyph_factor = match (self.font, is_mostly_uppercase(text)) {
            (FontFace::Regular, false) => 0.5,
            (FontFace::Bold, false) => 0.55,
            (FontFace::Regular, true) => 0.68,
            (FontFace::Bold, true) => 0.74,
        };
        let width_pt = (CONTENT_WIDTH_MM - self.indent_mm) / PT_MM;
        ((width_pt / (self.size_pt * glyph_factor)) as usize).max(10)
    }
}

fn is_mostly_uppercase(text: &str) -> bool {
    let (upper, letters) = text
        .chars()
        .filter(|c| c.is_alphabetic())
        .fold((0usize, 0usize), |(u, l), c| (u + c.is_uppercase() as usize, l + 1));
    letters > 0 && upper * 2 > letters
}

/// Built once, read-only afterwards. Indexed by [`StyleTag::index`].
pub static STYLE_TABLE: Lazy<[BlockStyle; 6]> = Lazy::new(|| {
    let mut table = [BlockStyle {
        font: FontFace::Regular,
        size_pt: 11.0,
        leading_pt: 16.0,
        space_before_pt: 6.0,
        space_after_pt: 6.0,
        indent_mm: 0.0,
        color: INK,
    }; 6];

    table[StyleTag::Title.index()] = BlockStyle {
        font: FontFace::Bold,
        size_pt: 24.0,
        leading_pt: 30.0,
        space_before_pt: 0.0,
        space_after_pt: 18.0,
        indent_mm: 0.0,
        color: NAVY,
    };
    table[StyleTag::Section.index()] = BlockStyle {
        font: FontFace::Bold,
        size_pt: 16.0,
        leading_pt: 20.0,
        space_before_pt: 24.0,
        space_after_pt: 12.0,
        indent_mm: 0.0,
        color: NAVY,
    };
    table[StyleTag::Subsection.index()] = BlockStyle {
        font: FontFace::Bold,
        size_pt: 14.0,
        leading_pt: 18.0,
        space_before_pt: 18.0,
        space_after_pt: 8.0,
        indent_mm: 0.0,
        color: NAVY,
    };
    table[StyleTag::Subsubsection.index()] = BlockStyle {
        font: FontFace::Bold,
        size_pt: 12.0,
        leading_pt: 16.0,
        space_before_pt: 12.0,
        space_after_pt: 6.0,
        indent_mm: 0.0,
        color: SLATE,
    };
    table[StyleTag::Bullet.index()] = BlockStyle {
        font: FontFace::Regular,
        size_pt: 11.0,
        leading_pt: 16.0,
        space_before_pt: 2.0,
        space_after_pt: 2.0,
        indent_mm: 6.0,
        color: INK,
    };
    table
});

pub fn style_for(tag: StyleTag) -> &'static BlockStyle {
    &STYLE_TABLE[tag.index()]
}

// ── Layout ───────────────────────────────────────────────────────────────────

/// One wrapped line with its position on the page.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    pub style: StyleTag,
    /// Index of the block this line came from.
    pub block: usize,
    pub x_mm: f32,
    pub baseline_mm: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    /// 1-based.
    pub number: usize,
    pub lines: Vec<PlacedLine>,
}

/// Wrap and paginate `blocks`. Always returns at least one page.
pub fn layout(blocks: &[FormattedBlock]) -> Vec<PageLayout> {
    let mut pages = vec![PageLayout {
        number: 1,
        lines: Vec::new(),
    }];
    let mut cursor = CONTENT_TOP_MM;

    for (block_index, block) in blocks.iter().enumerate() {
        let style = style_for(block.style);
        let leading = style.leading_pt * PT_MM;

        let at_page_top = pages.last().map(|p| p.lines.is_empty()).unwrap_or(true);
        if !at_page_top {
            cursor -= style.space_before_pt * PT_MM;
        }

        for text in wrap_text(&block.text, style.chars_per_line(&block.text)) {
            if cursor - leading < CONTENT_BOTTOM_MM {
                let number = pages.len() + 1;
                pages.push(PageLayout {
                    number,
                    lines: Vec::new(),
                });
                cursor = CONTENT_TOP_MM;
            }
            let baseline_mm = cursor - style.size_pt * PT_MM;
            cursor -= leading;
            if let Some(page) = pages.last_mut() {
                page.lines.push(PlacedLine {
                    text,
                    style: block.style,
                    block: block_index,
                    x_mm: SIDE_MARGIN_MM + style.indent_mm,
                    baseline_mm,
                });
            }
        }

        cursor -= style.space_after_pt * PT_MM;
    }

    pages
}

/// Greedy word wrap to at most `width` characters per line. Words longer
/// than `width` are split.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(width);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        if word.is_empty() {
            continue;
        }

        let needed = if current_len == 0 { word.len() } else { current_len + 1 + word.len() };
        if needed > width {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.extend(word.iter());
        current_len += word.len();
    }

    if current_len > 0 {
        lines.push(current);
    }
    lines
}

// ── Encoding ─────────────────────────────────────────────────────────────────

/// Characters outside Latin-1 that WinAnsiEncoding still covers.
const WIN_ANSI_EXTRAS: &str = "€‚ƒ„…†‡ˆ‰Š‹ŒŽ‘’“”•–—˜™š›œžŸ";

/// Stand-in for characters the built-in fonts cannot draw.
pub const REPLACEMENT_CHAR: char = '?';

/// Whether the built-in Helvetica fonts (WinAnsiEncoding) can draw `c`.
pub fn is_win_ansi(c: char) -> bool {
    matches!(c, ' '..='~' | '\u{a0}'..='\u{ff}') || WIN_ANSI_EXTRAS.contains(c)
}

/// Replace characters the built-in fonts would silently drop.
///
/// Returns the drawable text and how many characters were replaced.
pub fn to_win_ansi(text: &str) -> (String, usize) {
    let mut replaced = 0;
    let out = text
        .chars()
        .map(|c| {
            if is_win_ansi(c) {
                c
            } else {
                replaced += 1;
                REPLACEMENT_CHAR
            }
        })
        .collect();
    (out, replaced)
}

// ── Renderer ────────────────────────────────────────────────────────────────

/// Turns a [`ReportDocument`] into bytes.
pub trait ReportRenderer: Send + Sync {
    fn render(&self, document: &ReportDocument) -> Result<Vec<u8>, ReportError>;
}

/// A4 PDF renderer with the navy banner/footer page template.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfReportRenderer;

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

impl Fonts {
    fn get(&self, face: FontFace) -> &IndirectFontRef {
        match face {
            FontFace::Regular => &self.regular,
            FontFace::Bold => &self.bold,
        }
    }
}

fn render_err(what: &str, e: impl std::fmt::Display) -> ReportError {
    ReportError::RenderFailure {
        detail: format!("{what}: {e}"),
    }
}

fn fill(layer: &PdfLayerReference, (r, g, b): (f32, f32, f32)) {
    layer.set_fill_color(Color::Rgb(Rgb::new(r, g, b, None)));
}

fn draw_chrome(layer: &PdfLayerReference, fonts: &Fonts, stamp: &str, page_number: usize) {
    fill(layer, NAVY);
    layer.add_rect(Rect::new(
        Mm(0.0),
        Mm(PAGE_HEIGHT_MM - BANNER_HEIGHT_MM),
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
    ));
    layer.add_rect(Rect::new(
        Mm(0.0),
        Mm(0.0),
        Mm(PAGE_WIDTH_MM),
        Mm(FOOTER_HEIGHT_MM),
    ));

    fill(layer, WHITE);
    layer.use_text(
        BANNER_HEADING,
        22.0,
        Mm(SIDE_MARGIN_MM),
        Mm(PAGE_HEIGHT_MM - BANNER_HEIGHT_MM / 2.0),
        &fonts.bold,
    );
    layer.use_text(
        stamp,
        10.0,
        Mm(SIDE_MARGIN_MM),
        Mm(PAGE_HEIGHT_MM - BANNER_HEIGHT_MM / 2.0 - 9.0),
        &fonts.regular,
    );
    layer.use_text(
        format!("Page {page_number}"),
        8.0,
        Mm(PAGE_WIDTH_MM - SIDE_MARGIN_MM - 10.0),
        Mm(FOOTER_HEIGHT_MM / 2.0 - 1.0),
        &fonts.regular,
    );
}

impl ReportRenderer for PdfReportRenderer {
    fn render(&self, document: &ReportDocument) -> Result<Vec<u8>, ReportError> {
        let pages = layout(document.blocks());
        let stamp = format!(
            "Generated on: {}",
            document.generated_at.format("%Y-%m-%d %H:%M")
        );

        let (doc, first_page, first_layer) = PdfDocument::new(
            &document.title,
            Mm(PAGE_WIDTH_MM),
            Mm(PAGE_HEIGHT_MM),
            "Layer 1",
        );
        let fonts = Fonts {
            regular: doc
                .add_builtin_font(BuiltinFont::Helvetica)
                .map_err(|e| render_err("PDF font error", e))?,
            bold: doc
                .add_builtin_font(BuiltinFont::HelveticaBold)
                .map_err(|e| render_err("PDF font error", e))?,
        };

        let mut unencodable = 0usize;
        let mut unencodable_blocks = BTreeSet::new();
        for page in &pages {
            let (page_index, layer_index) = if page.number == 1 {
                (first_page, first_layer)
            } else {
                doc.add_page(
                    Mm(PAGE_WIDTH_MM),
                    Mm(PAGE_HEIGHT_MM),
                    format!("Layer {}", page.number),
                )
            };
            let layer = doc.get_page(page_index).get_layer(layer_index);

            draw_chrome(&layer, &fonts, &stamp, page.number);
            for line in &page.lines {
                let style = style_for(line.style);
                let (text, replaced) = to_win_ansi(&line.text);
                if replaced > 0 {
                    unencodable += replaced;
                    unencodable_blocks.insert(line.block);
                }
                fill(&layer, style.color);
                layer.use_text(
                    text,
                    style.size_pt,
                    Mm(line.x_mm),
                    Mm(line.baseline_mm),
                    fonts.get(style.font),
                );
            }
        }

        if unencodable > 0 {
            warn!(
                "{} character(s) in {} block(s) cannot be drawn with the built-in fonts; replaced with '{}' (first block: {:?})",
                unencodable,
                unencodable_blocks.len(),
                REPLACEMENT_CHAR,
                unencodable_blocks.iter().next()
            );
        }

        let mut buf = BufWriter::new(Vec::new());
        doc.save(&mut buf)
            .map_err(|e| render_err("PDF save error", e))?;
        let bytes = buf
            .into_inner()
            .map_err(|e| render_err("PDF buffer error", e))?;

        debug!("Rendered {} pages, {} bytes", pages.len(), bytes.len());
        Ok(bytes)
    }
}

/// Run `renderer` on the blocking pool.
pub async fn render_report(
    renderer: Arc<dyn ReportRenderer>,
    document: ReportDocument,
) -> Result<Vec<u8>, ReportError> {
    tokio::task::spawn_blocking(move || renderer.render(&document))
        .await
        .map_err(|e| ReportError::Internal(format!("Render task panicked: {}", e)))?
}
