//! PDF layout of plan blocks using printpdf's built-in Helvetica faces.

use printpdf::{
    BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerIndex,
    PdfLayerReference, PdfPageIndex,
};
use tracing::debug;

use crate::error::RenderError;

use super::DocumentRenderer;
use super::markdown::{Block, parse_blocks};

/// Points → millimetres.
const PT_TO_MM: f32 = 0.3528;
/// Average Helvetica glyph width as a fraction of the font size.
const AVG_GLYPH_EM: f32 = 0.5;
const LINE_SPACING: f32 = 1.35;

/// Page geometry and type sizes for the plan PDF.
#[derive(Debug, Clone)]
pub struct PdfLayout {
    pub page_width_mm: f32,
    pub page_height_mm: f32,
    pub margin_mm: f32,
    pub body_size: f32,
    pub table_size: f32,
}

impl Default for PdfLayout {
    fn default() -> Self {
        // A4 portrait
        Self {
            page_width_mm: 210.0,
            page_height_mm: 297.0,
            margin_mm: 18.0,
            body_size: 10.5,
            table_size: 8.5,
        }
    }
}

/// Renders markdown plans to PDF.
#[derive(Debug, Clone, Default)]
pub struct PdfRenderer {
    layout: PdfLayout,
}

impl PdfRenderer {
    pub fn new(layout: PdfLayout) -> Self {
        Self { layout }
    }
}

impl DocumentRenderer for PdfRenderer {
    fn render(&self, markup: &str, title: &str) -> Result<Vec<u8>, RenderError> {
        let blocks = parse_blocks(markup);
        if blocks.is_empty() {
            return Err(RenderError::EmptyDocument);
        }

        let mut writer = PageWriter::new(title, self.layout.clone())?;
        for block in &blocks {
            writer.block(block);
        }
        let pages = writer.pages.len();
        let lowest_mm = writer.lowest;
        let bytes = writer.finish()?;
        debug!(
            blocks = blocks.len(),
            pages,
            lowest_mm,
            bytes = bytes.len(),
            "Rendered plan PDF"
        );
        Ok(bytes)
    }
}

fn pdf_error(e: impl std::fmt::Display) -> RenderError {
    RenderError::Pdf(e.to_string())
}

/// Characters WinAnsiEncoding places in 0x80..=0x9F.
const WIN_ANSI_EXTRAS: &[char] = &[
    '\u{20AC}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{017D}', '\u{2018}',
    '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}', '\u{02DC}',
    '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{017E}', '\u{0178}',
];

/// Whether the built-in fonts (WinAnsiEncoding) can show `c`.
fn is_win_ansi(c: char) -> bool {
    matches!(c, ' '..='~' | '\u{00A0}'..='\u{00FF}') || WIN_ANSI_EXTRAS.contains(&c)
}

/// Restrict text to what the built-in fonts can show. Near misses are
/// substituted, anything else (emoji, CJK) is dropped.
fn to_pdf_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\n' => out.push('\n'),
            '\t' => out.push(' '),
            c if is_win_ansi(c) => out.push(c),
            '\u{2212}' | '\u{2010}' | '\u{2011}' => out.push('-'),
            '\u{2032}' => out.push('\''),
            '\u{2033}' => out.push('"'),
            '\u{25E6}' | '\u{25AA}' | '\u{25B8}' | '\u{25CF}' => out.push('\u{2022}'),
            _ => {}
        }
    }
    out
}

/// Wrap `text` to `width_mm` at `size` points, one entry per output line.
fn wrap_to_width(text: &str, size: f32, width_mm: f32) -> Vec<String> {
    let glyph_mm = size * PT_TO_MM * AVG_GLYPH_EM;
    let columns = ((width_mm / glyph_mm).floor() as usize).max(1);
    let clean = to_pdf_text(text);
    let mut lines = Vec::new();
    for paragraph in clean.split('\n') {
        if paragraph.trim().is_empty() {
            continue;
        }
        lines.extend(
            textwrap::wrap(paragraph.trim(), columns)
                .into_iter()
                .map(|l| l.into_owned()),
        );
    }
    lines
}

fn line_height(size: f32) -> f32 {
    size * PT_TO_MM * LINE_SPACING
}

fn heading_size(level: u8) -> f32 {
    match level {
        1 => 18.0,
        2 => 14.0,
        3 => 12.0,
        _ => 11.0,
    }
}

struct PageWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    pages: Vec<(PdfPageIndex, PdfLayerIndex)>,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    mono: IndirectFontRef,
    layout: PdfLayout,
    /// Baseline of the next line, measured from the bottom edge.
    cursor: f32,
    /// Lowest baseline drawn so far.
    lowest: f32,
}

impl PageWriter {
    fn new(title: &str, layout: PdfLayout) -> Result<Self, RenderError> {
        let (doc, page, layer_index) = PdfDocument::new(
            to_pdf_text(title),
            Mm(layout.page_width_mm),
            Mm(layout.page_height_mm),
            "Layer 1",
        );
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(pdf_error)?;
        let mono = doc.add_builtin_font(BuiltinFont::Courier).map_err(pdf_error)?;
        let layer = doc.get_page(page).get_layer(layer_index);
        let cursor = layout.page_height_mm - layout.margin_mm;

        Ok(Self {
            doc,
            layer,
            pages: vec![(page, layer_index)],
            regular,
            bold,
            mono,
            layout,
            cursor,
            lowest: f32::MAX,
        })
    }

    fn content_width(&self) -> f32 {
        self.layout.page_width_mm - 2.0 * self.layout.margin_mm
    }

    /// Bottom limit for content; leaves room for the page footer.
    fn floor(&self) -> f32 {
        self.layout.margin_mm + 6.0
    }

    fn new_page(&mut self) {
        let (page, layer_index) = self.doc.add_page(
            Mm(self.layout.page_width_mm),
            Mm(self.layout.page_height_mm),
            "Layer 1",
        );
        self.layer = self.doc.get_page(page).get_layer(layer_index);
        self.pages.push((page, layer_index));
        self.cursor = self.layout.page_height_mm - self.layout.margin_mm;
    }

    fn ensure_space(&mut self, height: f32) {
        if self.cursor - height < self.floor() {
            self.new_page();
        }
    }

    fn gap(&mut self, mm: f32) {
        self.cursor -= mm;
    }

    fn text_at(&mut self, text: &str, size: f32, x: f32, y: f32, font: &IndirectFontRef) {
        self.lowest = self.lowest.min(y);
        self.layer.use_text(text, size, Mm(x), Mm(y), font);
    }

    fn lines(&mut self, lines: &[String], size: f32, indent: f32, font: Font) {
        let height = line_height(size);
        let x = self.layout.margin_mm + indent;
        for line in lines {
            self.ensure_space(height);
            self.cursor -= height;
            let face = self.font(font).clone();
            self.text_at(line, size, x, self.cursor, &face);
        }
    }

    fn font(&self, font: Font) -> &IndirectFontRef {
        match font {
            Font::Regular => &self.regular,
            Font::Bold => &self.bold,
            Font::Mono => &self.mono,
        }
    }

    fn block(&mut self, block: &Block) {
        let body = self.layout.body_size;
        let width = self.content_width();
        match block {
            Block::Heading { level, text } => {
                let size = heading_size(*level);
                let lines = wrap_to_width(text, size, width);
                // Keep a heading together with at least one following line.
                self.ensure_space(line_height(size) * lines.len() as f32 + line_height(body) + 3.0);
                self.gap(3.0);
                self.lines(&lines, size, 0.0, Font::Bold);
                self.gap(1.5);
            }
            Block::Paragraph(text) => {
                let lines = wrap_to_width(text, body, width);
                self.lines(&lines, body, 0.0, Font::Regular);
                self.gap(2.0);
            }
            Block::ListItem {
                depth,
                marker,
                text,
            } => {
                let indent = 5.0 * (*depth as f32 + 1.0);
                let lines = wrap_to_width(text, body, width - indent);
                let Some((first, rest)) = lines.split_first() else {
                    return;
                };
                let height = line_height(body);
                self.ensure_space(height);
                self.cursor -= height;
                let marker_x = self.layout.margin_mm + indent - 4.5;
                let text_x = self.layout.margin_mm + indent;
                let font = self.regular.clone();
                self.text_at(marker, body, marker_x, self.cursor, &font);
                self.text_at(first, body, text_x, self.cursor, &font);
                self.lines(rest, body, indent, Font::Regular);
                self.gap(0.8);
            }
            Block::Table { header, rows } => self.table(header, rows),
            Block::Code(code) => {
                let size = body - 1.0;
                let lines = wrap_to_width(code, size, width - 4.0);
                self.lines(&lines, size, 4.0, Font::Mono);
                self.gap(2.0);
            }
            Block::Rule => {
                let size = body;
                let glyph = size * PT_TO_MM * AVG_GLYPH_EM;
                let dashes = "-".repeat(((width / glyph) as usize).max(1));
                self.lines(&[dashes], size, 0.0, Font::Regular);
                self.gap(2.0);
            }
        }
    }

    fn table(&mut self, header: &[String], rows: &[Vec<String>]) {
        let columns = rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(header.len()))
            .max()
            .unwrap_or(0);
        if columns == 0 {
            return;
        }

        let size = self.layout.table_size;
        let padding = 1.5;
        let column_width = self.content_width() / columns as f32;

        self.gap(2.0);
        if !header.is_empty() {
            self.table_row(header, columns, column_width, padding, size, Font::Bold);
        }
        for row in rows {
            let fits = self.row_height(row, column_width, padding, size);
            if self.cursor - fits < self.floor() {
                self.new_page();
                if !header.is_empty() {
                    self.table_row(header, columns, column_width, padding, size, Font::Bold);
                }
            }
            self.table_row(row, columns, column_width, padding, size, Font::Regular);
        }
        self.gap(2.0);
    }

    fn row_height(&self, row: &[String], column_width: f32, padding: f32, size: f32) -> f32 {
        let tallest = row
            .iter()
            .map(|cell| wrap_to_width(cell, size, column_width - 2.0 * padding).len())
            .max()
            .unwrap_or(1)
            .max(1);
        tallest as f32 * line_height(size) + 2.0 * padding
    }

    /// Whole table lines that still fit above the floor on this page.
    fn row_lines_fitting(&self, padding: f32, size: f32) -> usize {
        let room = self.cursor - 2.0 * padding - self.floor();
        if room <= 0.0 {
            0
        } else {
            (room / line_height(size)).floor() as usize
        }
    }

    /// Draw one table row. A row taller than the remaining page continues on
    /// the next page.
    fn table_row(
        &mut self,
        row: &[String],
        columns: usize,
        column_width: f32,
        padding: f32,
        size: f32,
        font: Font,
    ) {
        let cells: Vec<Vec<String>> = (0..columns)
            .map(|index| {
                row.get(index)
                    .map(|cell| wrap_to_width(cell, size, column_width - 2.0 * padding))
                    .unwrap_or_default()
            })
            .collect();
        let tallest = cells.iter().map(Vec::len).max().unwrap_or(0).max(1);
        let face = self.font(font).clone();
        let step = line_height(size);

        let mut start = 0;
        while start < tallest {
            let mut fitting = self.row_lines_fitting(padding, size);
            if fitting == 0 {
                self.new_page();
                fitting = self.row_lines_fitting(padding, size).max(1);
            }
            let end = (start + fitting).min(tallest);
            if end < tallest {
                debug!(lines = tallest, "Table row split across pages");
            }

            let top = self.cursor - padding;
            for (index, lines) in cells.iter().enumerate() {
                let x = self.layout.margin_mm + index as f32 * column_width + padding;
                let mut y = top;
                for line in lines.iter().take(end).skip(start) {
                    y -= step;
                    self.text_at(line, size, x, y, &face);
                }
            }
            self.cursor -= padding + (end - start) as f32 * step;
            start = end;
            if start < tallest {
                self.new_page();
            }
        }
        self.cursor -= padding;
    }

    /// Stamp page numbers and serialize.
    fn finish(self) -> Result<Vec<u8>, RenderError> {
        let total = self.pages.len();
        let size = 8.0;
        let x = self.layout.page_width_mm / 2.0 - 8.0;
        let y = self.layout.margin_mm / 2.0;
        for (number, (page, layer)) in self.pages.iter().enumerate() {
            let layer = self.doc.get_page(*page).get_layer(*layer);
            layer.use_text(
                format!("Page {} of {}", number + 1, total),
                size,
                Mm(x),
                Mm(y),
                &self.regular,
            );
        }
        self.doc.save_to_bytes().map_err(pdf_error)
    }
}

#[derive(Debug, Clone, Copy)]
enum Font {
    Regular,
    Bold,
    Mono,
}
