//! Paged PDF writer over `printpdf` builtin fonts.
//!
//! Lays out text top-down on US Letter pages, wrapping paragraphs and
//! starting a new page whenever the cursor reaches the bottom margin.

use std::io::BufWriter;

use printpdf::{
    BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point,
};

const PAGE_WIDTH_MM: f32 = 215.9;
const PAGE_HEIGHT_MM: f32 = 279.4;
const MARGIN_MM: f32 = 20.0;
const BULLET_INDENT_MM: f32 = 5.0;

const TITLE_SIZE: f32 = 16.0;
const HEADING_SIZE: f32 = 12.0;
const BODY_SIZE: f32 = 10.0;

const PT_TO_MM: f32 = 0.3528;
/// Average Helvetica glyph width as a fraction of the font size.
const AVG_GLYPH_EM: f32 = 0.5;

#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("PDF font error: {0}")]
    Font(String),
    #[error("PDF save error: {0}")]
    Save(String),
}

pub struct PdfWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    /// Baseline of the next line, in mm from the page bottom.
    y: f32,
    pages: usize,
}

impl PdfWriter {
    pub fn new(document_title: &str) -> Result<Self, PdfError> {
        let (doc, page, layer) = PdfDocument::new(
            document_title,
            Mm(PAGE_WIDTH_MM),
            Mm(PAGE_HEIGHT_MM),
            "Layer 1",
        );
        let layer = doc.get_page(page).get_layer(layer);
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| PdfError::Font(e.to_string()))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| PdfError::Font(e.to_string()))?;

        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            y: PAGE_HEIGHT_MM - MARGIN_MM,
            pages: 1,
        })
    }

    pub fn page_count(&self) -> usize {
        self.pages
    }

    pub fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(
            Mm(PAGE_WIDTH_MM),
            Mm(PAGE_HEIGHT_MM),
            format!("Layer {}", self.pages + 1),
        );
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT_MM - MARGIN_MM;
        self.pages += 1;
    }

    pub fn title(&mut self, text: &str) {
        self.write_block(text, TITLE_SIZE, true, 0.0);
        self.space(4.0);
    }

    pub fn heading(&mut self, text: &str) {
        self.space(2.0);
        self.write_block(text, HEADING_SIZE, true, 0.0);
        self.space(1.0);
    }

    /// Body text; embedded newlines start new lines, blank lines are kept.
    pub fn paragraph(&mut self, text: &str) {
        self.write_block(text, BODY_SIZE, false, 0.0);
        self.space(2.0);
    }

    /// A `label: value` line with the label in bold.
    pub fn field(&mut self, label: &str, value: &str) {
        self.write_block(label, BODY_SIZE, true, 0.0);
        self.paragraph(value);
    }

    pub fn bullet(&mut self, text: &str) {
        self.write_block(&format!("- {text}"), BODY_SIZE, false, BULLET_INDENT_MM);
    }

    /// Full-width horizontal line under the cursor.
    pub fn rule(&mut self) {
        self.ensure_room(3.0);
        let y = self.y + 2.0;
        let line = Line {
            points: vec![
                (Point::new(Mm(MARGIN_MM), Mm(y)), false),
                (Point::new(Mm(PAGE_WIDTH_MM - MARGIN_MM), Mm(y)), false),
            ],
            is_closed: false,
        };
        self.layer.set_outline_thickness(0.5);
        self.layer.add_line(line);
        self.y -= 3.0;
    }

    pub fn space(&mut self, mm: f32) {
        self.y -= mm;
    }

    pub fn finish(self) -> Result<Vec<u8>, PdfError> {
        let mut buf = BufWriter::new(Vec::new());
        self.doc
            .save(&mut buf)
            .map_err(|e| PdfError::Save(e.to_string()))?;
        buf.into_inner()
            .map_err(|e| PdfError::Save(format!("buffer error: {e}")))
    }

    fn write_block(&mut self, text: &str, size: f32, bold: bool, indent: f32) {
        let line_height = size * PT_TO_MM * 1.4;
        let max_chars = chars_per_line(size, indent);
        let font = if bold { self.bold.clone() } else { self.regular.clone() };

        for raw_line in text.lines() {
            for line in wrap_text(&sanitize(raw_line), max_chars) {
                self.ensure_room(line_height);
                self.y -= line_height;
                self.layer
                    .use_text(line, size, Mm(MARGIN_MM + indent), Mm(self.y), &font);
            }
        }
    }

    fn ensure_room(&mut self, needed: f32) {
        if self.y - needed < MARGIN_MM {
            self.new_page();
        }
    }
}

fn chars_per_line(size: f32, indent: f32) -> usize {
    let usable = PAGE_WIDTH_MM - 2.0 * MARGIN_MM - indent;
    let glyph = size * PT_TO_MM * AVG_GLYPH_EM;
    (usable / glyph).floor().max(10.0) as usize
}

/// Builtin fonts only cover Latin-1; map common typography and drop the rest.
fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2013}' | '\u{2014}' => '-',
            '\u{2022}' | '\u{00B7}' => '-',
            '\t' => ' ',
            c if (c as u32) < 0x20 => ' ',
            c if (c as u32) <= 0xFF => c,
            _ => '?',
        })
        .collect()
}

/// Greedy word wrap. Words longer than a line are split.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        if current_len + word.len() + 1 > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current_len += word.len();
        current.extend(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
