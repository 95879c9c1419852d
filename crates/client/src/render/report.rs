use chrono::{DateTime, Utc};
use strep_core::domain::Student;

use super::pdf::{Document, Font, PAGE_HEIGHT_MM, Page, Rgb};
use super::{RenderError, ReportRenderer};

const MARGIN: f32 = 10.0;
const CONTENT_WIDTH: f32 = 190.0;
const LABEL_WIDTH: f32 = 60.0;
const VALUE_WIDTH: f32 = CONTENT_WIDTH - LABEL_WIDTH;
/// Horizontal padding inside a cell.
const CELL_PADDING: f32 = 1.0;

const ROW_HEIGHT: f32 = 7.0;
const SECTION_HEIGHT: f32 = 8.0;
const SECTION_GAP: f32 = 5.0;

/// Top of the footer block, measured from the page top.
const FOOTER_TOP: f32 = PAGE_HEIGHT_MM - 30.0;

const TITLE_COLOR: Rgb = Rgb(44, 62, 80);
const MUTED_COLOR: Rgb = Rgb(127, 140, 141);
const SECTION_FILL: Rgb = Rgb(52, 152, 219);
const LABEL_FILL: Rgb = Rgb(236, 240, 241);

const NOT_AVAILABLE: &str = "N/A";

/// A4 student report rendered with the built-in PDF writer.
#[derive(Debug, Clone, Default)]
pub struct PdfReportRenderer;

impl PdfReportRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Render with an explicit generation time.
    pub fn render_at(&self, student: &Student, now: DateTime<Utc>) -> Result<Vec<u8>, RenderError> {
        let mut layout = Layout::new();

        layout.centered(10.0, Font::HelveticaBold, 18.0, TITLE_COLOR, "Student Report");
        layout.gap(5.0);
        let generated = format!("Generated on: {}", now.format("%B %-d, %Y at %-I:%M %p UTC"));
        layout.centered(6.0, Font::Helvetica, 10.0, MUTED_COLOR, &generated);
        layout.gap(10.0);

        for (i, section) in sections(student).iter().enumerate() {
            if i > 0 {
                layout.gap(SECTION_GAP);
            }
            layout.section(section.title);
            for (label, value) in &section.rows {
                layout.row(label, value);
            }
        }

        layout.footer(&[
            "This is an auto-generated report from the Student Management System".to_string(),
            format!("Report ID: SR-{}-{}", student.id, now.timestamp()),
        ]);

        let mut doc = Document::new(format!("Student Report {}", student.id), now);
        for page in layout.into_pages() {
            doc.push_page(page);
        }

        let pages = doc.page_count();
        let bytes = doc.finish()?;
        tracing::debug!(student_id = student.id, pages, bytes = bytes.len(), "rendered report");
        Ok(bytes)
    }
}

impl ReportRenderer for PdfReportRenderer {
    fn render(&self, student: &Student) -> Result<Vec<u8>, RenderError> {
        self.render_at(student, Utc::now())
    }
}

struct Section {
    title: &'static str,
    rows: Vec<(&'static str, String)>,
}

fn sections(s: &Student) -> Vec<Section> {
    vec![
        Section {
            title: "Personal Information",
            rows: vec![
                ("Student ID", s.id.to_string()),
                ("Full Name", or_na(&s.name)),
                ("Email", or_na(&s.email)),
                ("Date of Birth", format_date(&s.dob)),
                ("Gender", or_na(&s.gender)),
                ("Phone", or_na(&s.phone)),
                ("System Access", if s.system_access { "Active" } else { "Inactive" }.to_string()),
            ],
        },
        Section {
            title: "Academic Information",
            rows: vec![
                ("Class", or_na(&s.class)),
                ("Section", or_na(&s.section)),
                ("Roll Number", if s.roll == 0 { NOT_AVAILABLE.to_string() } else { s.roll.to_string() }),
                ("Admission Date", format_date(&s.admission_date)),
                ("Added By", or_na(&s.reporter_name)),
            ],
        },
        Section {
            title: "Parent Information",
            rows: vec![
                ("Father's Name", or_na(&s.father_name)),
                ("Father's Phone", or_na(&s.father_phone)),
                ("Mother's Name", or_na(&s.mother_name)),
                ("Mother's Phone", or_na(&s.mother_phone)),
            ],
        },
        Section {
            title: "Guardian Information",
            rows: vec![
                ("Guardian Name", or_na(&s.guardian_name)),
                ("Guardian Phone", or_na(&s.guardian_phone)),
                ("Relationship", or_na(&s.relation_of_guardian)),
            ],
        },
        Section {
            title: "Address Information",
            rows: vec![
                ("Current Address", or_na(&s.current_address)),
                ("Permanent Address", or_na(&s.permanent_address)),
            ],
        },
    ]
}

fn or_na(value: &str) -> String {
    if value.is_empty() { NOT_AVAILABLE.to_string() } else { value.to_string() }
}

/// RFC 3339 timestamps become "January 2, 2006"; anything else is shown as-is.
fn format_date(value: &str) -> String {
    if value.is_empty() {
        return NOT_AVAILABLE.to_string();
    }
    match DateTime::parse_from_rfc3339(value) {
        Ok(date) => date.format("%B %-d, %Y").to_string(),
        Err(e) => {
            tracing::warn!(date = value, error = %e, "failed to parse date");
            value.to_string()
        }
    }
}

/// Shorten `text` with an ellipsis until it fits in `max_width` millimetres.
fn fit(text: &str, font: Font, size_pt: f32, max_width: f32) -> String {
    if font.text_width(text, size_pt) <= max_width {
        return text.to_string();
    }
    let mut chars: Vec<char> = text.chars().collect();
    while !chars.is_empty() {
        chars.pop();
        let candidate: String = chars.iter().collect::<String>() + "...";
        if font.text_width(&candidate, size_pt) <= max_width {
            return candidate;
        }
    }
    "...".to_string()
}

/// Baseline for text vertically centred in a cell.
fn baseline(top: f32, height: f32, size_pt: f32) -> f32 {
    top + height / 2.0 + 0.3 * size_pt * 25.4 / 72.0
}

/// Top-to-bottom cursor that breaks onto a new page when a block would run
/// into the footer area.
struct Layout {
    pages: Vec<Page>,
    page: Page,
    y: f32,
}

impl Layout {
    fn new() -> Self {
        Self { pages: Vec::new(), page: Page::new(), y: MARGIN }
    }

    fn reserve(&mut self, height: f32) {
        if self.y + height > FOOTER_TOP && !self.page.is_empty() {
            let full = std::mem::take(&mut self.page);
            self.pages.push(full);
            self.y = MARGIN;
        }
    }

    fn gap(&mut self, height: f32) {
        self.y += height;
    }

    fn centered(&mut self, height: f32, font: Font, size: f32, color: Rgb, text: &str) {
        self.reserve(height);
        self.draw_centered(height, font, size, color, text);
    }

    fn draw_centered(&mut self, height: f32, font: Font, size: f32, color: Rgb, text: &str) {
        let text = fit(text, font, size, CONTENT_WIDTH);
        let x = MARGIN + (CONTENT_WIDTH - font.text_width(&text, size)) / 2.0;
        self.page.text(x, baseline(self.y, height, size), font, size, color, &text);
        self.y += height;
    }

    fn section(&mut self, title: &str) {
        // Keep a heading together with its first row.
        self.reserve(SECTION_HEIGHT + ROW_HEIGHT);
        self.cell(MARGIN, CONTENT_WIDTH, SECTION_HEIGHT, Font::HelveticaBold, 14.0, SECTION_FILL, Rgb::WHITE, title);
        self.y += SECTION_HEIGHT;
    }

    fn row(&mut self, label: &str, value: &str) {
        self.reserve(ROW_HEIGHT);
        self.cell(MARGIN, LABEL_WIDTH, ROW_HEIGHT, Font::HelveticaBold, 11.0, LABEL_FILL, Rgb::BLACK, label);
        self.cell(MARGIN + LABEL_WIDTH, VALUE_WIDTH, ROW_HEIGHT, Font::Helvetica, 11.0, Rgb::WHITE, Rgb::BLACK, value);
        self.y += ROW_HEIGHT;
    }

    #[allow(clippy::too_many_arguments)]
    fn cell(&mut self, x: f32, w: f32, h: f32, font: Font, size: f32, fill: Rgb, color: Rgb, text: &str) {
        self.page.fill_rect(x, self.y, w, h, fill);
        self.page.stroke_rect(x, self.y, w, h);
        let text = fit(text, font, size, w - 2.0 * CELL_PADDING);
        self.page.text(x + CELL_PADDING, baseline(self.y, h, size), font, size, color, &text);
    }

    /// Footer lines at the bottom of the last page.
    fn footer(&mut self, lines: &[String]) {
        if self.y > FOOTER_TOP {
            let full = std::mem::take(&mut self.page);
            self.pages.push(full);
        }
        self.y = FOOTER_TOP;
        for line in lines {
            self.draw_centered(5.0, Font::HelveticaOblique, 8.0, MUTED_COLOR, line);
        }
    }

    fn into_pages(mut self) -> Vec<Page> {
        if !self.page.is_empty() {
            self.pages.push(self.page);
        }
        self.pages
    }
}
