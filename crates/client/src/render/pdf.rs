//! Minimal PDF 1.4 writer.
//!
//! Produces uncompressed single-revision documents using the three standard
//! Helvetica faces with WinAnsi encoding, so no font data is ever embedded.
//! Coordinates are in millimetres with the origin at the top-left corner of
//! an A4 page; conversion to PDF user space happens when operators are
//! emitted.

use std::io::Write;

use chrono::{DateTime, Utc};

use super::RenderError;

/// A4 page width in millimetres.
pub const PAGE_WIDTH_MM: f32 = 210.0;

/// A4 page height in millimetres.
pub const PAGE_HEIGHT_MM: f32 = 297.0;

/// Points per millimetre.
const PT_PER_MM: f32 = 72.0 / 25.4;

const PAGE_WIDTH_PT: f32 = PAGE_WIDTH_MM * PT_PER_MM;
const PAGE_HEIGHT_PT: f32 = PAGE_HEIGHT_MM * PT_PER_MM;

/// Border stroke width in millimetres.
const LINE_WIDTH_MM: f32 = 0.2;

/// Objects written before the first page: catalog, page tree, three fonts, info.
const FIXED_OBJECTS: usize = 6;
const CATALOG_ID: usize = 1;
const PAGES_ID: usize = 2;
const INFO_ID: usize = 6;

/// Glyph advance widths for ASCII 32..=126, in 1/1000 em (Adobe AFM metrics).
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Width assumed for glyphs outside the ASCII table.
const FALLBACK_WIDTH: u16 = 556;

/// Standard Type 1 faces available without embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
}

impl Font {
    const ALL: [Font; 3] = [Font::Helvetica, Font::HelveticaBold, Font::HelveticaOblique];

    fn base_name(self) -> &'static str {
        match self {
            Font::Helvetica => "Helvetica",
            Font::HelveticaBold => "Helvetica-Bold",
            Font::HelveticaOblique => "Helvetica-Oblique",
        }
    }

    fn resource_name(self) -> &'static str {
        match self {
            Font::Helvetica => "F1",
            Font::HelveticaBold => "F2",
            Font::HelveticaOblique => "F3",
        }
    }

    fn char_width(self, c: char) -> u16 {
        let table = match self {
            Font::Helvetica | Font::HelveticaOblique => &HELVETICA_WIDTHS,
            Font::HelveticaBold => &HELVETICA_BOLD_WIDTHS,
        };
        (c as usize)
            .checked_sub(32)
            .and_then(|i| table.get(i))
            .copied()
            .unwrap_or(FALLBACK_WIDTH)
    }

    /// Rendered width of `text` at `size_pt`, in millimetres.
    pub fn text_width(self, text: &str, size_pt: f32) -> f32 {
        let units: u32 = text.chars().map(|c| u32::from(self.char_width(c))).sum();
        units as f32 * size_pt / 1000.0 / PT_PER_MM
    }
}

/// RGB fill or stroke colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const WHITE: Rgb = Rgb(255, 255, 255);

    fn components(self) -> String {
        let c = |v: u8| f32::from(v) / 255.0;
        format!("{:.3} {:.3} {:.3}", c(self.0), c(self.1), c(self.2))
    }
}

/// Drawing operations for one page.
#[derive(Debug, Default, Clone)]
pub struct Page {
    ops: String,
}

impl Page {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill a rectangle whose top-left corner is at `(x, y)`.
    pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgb) {
        self.ops.push_str(&format!("{} rg\n{} re f\n", color.components(), rect(x, y, w, h)));
    }

    /// Stroke a black rectangle outline.
    pub fn stroke_rect(&mut self, x: f32, y: f32, w: f32, h: f32) {
        self.ops.push_str(&format!(
            "{:.2} w {} RG\n{} re S\n",
            LINE_WIDTH_MM * PT_PER_MM,
            Rgb::BLACK.components(),
            rect(x, y, w, h)
        ));
    }

    /// Draw `text` with its baseline starting at `(x, baseline)`.
    pub fn text(&mut self, x: f32, baseline: f32, font: Font, size_pt: f32, color: Rgb, text: &str) {
        self.ops.push_str(&format!(
            "BT /{} {:.2} Tf {} rg {:.2} {:.2} Td ({}) Tj ET\n",
            font.resource_name(),
            size_pt,
            color.components(),
            x * PT_PER_MM,
            PAGE_HEIGHT_PT - baseline * PT_PER_MM,
            encode_text(text)
        ));
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// `re` operands for a top-left anchored rectangle in millimetres.
fn rect(x: f32, y: f32, w: f32, h: f32) -> String {
    format!(
        "{:.2} {:.2} {:.2} {:.2}",
        x * PT_PER_MM,
        PAGE_HEIGHT_PT - (y + h) * PT_PER_MM,
        w * PT_PER_MM,
        h * PT_PER_MM
    )
}

/// Encode text as the body of a PDF literal string in WinAnsi.
///
/// Latin-1 characters are written as octal escapes; anything beyond Latin-1
/// is replaced with `?` and control characters with a space.
pub fn encode_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            ' '..='~' => out.push(c),
            '\u{a0}'..='\u{ff}' => out.push_str(&format!("\\{:03o}", c as u32)),
            c if c.is_control() => out.push(' '),
            _ => out.push('?'),
        }
    }
    out
}

/// A document under construction.
#[derive(Debug, Clone)]
pub struct Document {
    title: String,
    created: DateTime<Utc>,
    pages: Vec<Page>,
}

impl Document {
    pub fn new(title: impl Into<String>, created: DateTime<Utc>) -> Self {
        Self { title: title.into(), created, pages: Vec::new() }
    }

    /// Append a finished page.
    pub fn push_page(&mut self, page: Page) {
        self.pages.push(page);
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Serialize the document.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::Layout` if no page was added.
    pub fn finish(self) -> Result<Vec<u8>, RenderError> {
        if self.pages.is_empty() {
            return Err(RenderError::Layout("document has no pages".into()));
        }

        let mut writer = ObjectWriter::new()?;

        let page_ids: Vec<usize> = (0..self.pages.len()).map(|i| FIXED_OBJECTS + 1 + i * 2).collect();

        writer.object(CATALOG_ID, &format!("<< /Type /Catalog /Pages {PAGES_ID} 0 R >>"))?;

        let kids: Vec<String> = page_ids.iter().map(|id| format!("{id} 0 R")).collect();
        writer.object(
            PAGES_ID,
            &format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids.join(" "), page_ids.len()),
        )?;

        for (i, font) in Font::ALL.iter().enumerate() {
            writer.object(
                PAGES_ID + 1 + i,
                &format!(
                    "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
                    font.base_name()
                ),
            )?;
        }

        writer.object(
            INFO_ID,
            &format!(
                "<< /Title ({}) /Producer (strep) /CreationDate (D:{}Z) >>",
                encode_text(&self.title),
                self.created.format("%Y%m%d%H%M%S")
            ),
        )?;

        let fonts: Vec<String> =
            Font::ALL.iter().enumerate().map(|(i, f)| format!("/{} {} 0 R", f.resource_name(), PAGES_ID + 1 + i)).collect();

        for (page, page_id) in self.pages.iter().zip(&page_ids) {
            let content_id = page_id + 1;
            writer.object(
                *page_id,
                &format!(
                    "<< /Type /Page /Parent {PAGES_ID} 0 R /MediaBox [0 0 {PAGE_WIDTH_PT:.2} {PAGE_HEIGHT_PT:.2}] \
                     /Resources << /Font << {} >> >> /Contents {content_id} 0 R >>",
                    fonts.join(" ")
                ),
            )?;
            writer.stream(content_id, page.ops.as_bytes())?;
        }

        writer.finish(INFO_ID)
    }
}

/// Tracks byte offsets of numbered objects for the cross-reference table.
struct ObjectWriter {
    buf: Vec<u8>,
    offsets: Vec<(usize, usize)>,
}

impl ObjectWriter {
    fn new() -> Result<Self, RenderError> {
        let mut buf = Vec::new();
        buf.write_all(b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n")?;
        Ok(Self { buf, offsets: Vec::new() })
    }

    fn object(&mut self, id: usize, body: &str) -> Result<(), RenderError> {
        self.offsets.push((id, self.buf.len()));
        write!(self.buf, "{id} 0 obj\n{body}\nendobj\n")?;
        Ok(())
    }

    fn stream(&mut self, id: usize, data: &[u8]) -> Result<(), RenderError> {
        self.offsets.push((id, self.buf.len()));
        write!(self.buf, "{id} 0 obj\n<< /Length {} >>\nstream\n", data.len())?;
        self.buf.write_all(data)?;
        self.buf.write_all(b"\nendstream\nendobj\n")?;
        Ok(())
    }

    fn finish(mut self, info_id: usize) -> Result<Vec<u8>, RenderError> {
        self.offsets.sort_unstable();
        let size = self.offsets.len() + 1;

        // Object ids are contiguous from 1, so the table is a single section.
        if self.offsets.iter().enumerate().any(|(i, (id, _))| *id != i + 1) {
            return Err(RenderError::Layout("object ids are not contiguous".into()));
        }

        let xref_offset = self.buf.len();
        write!(self.buf, "xref\n0 {size}\n0000000000 65535 f \n")?;
        for (_, offset) in &self.offsets {
            write!(self.buf, "{offset:010} 00000 n \n")?;
        }
        write!(
            self.buf,
            "trailer\n<< /Size {size} /Root {CATALOG_ID} 0 R /Info {info_id} 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n"
        )?;

        Ok(self.buf)
    }
}
