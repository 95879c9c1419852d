//! Student report rendering.
//!
//! [`ReportRenderer`] turns a student snapshot into PDF bytes. The default
//! implementation, [`PdfReportRenderer`], lays out an A4 report with the
//! standard Helvetica fonts through the small writer in [`pdf`].

pub mod pdf;
mod report;

pub use report::PdfReportRenderer;

use strep_core::domain::Student;
use thiserror::Error;

/// Errors that can occur during report rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Writing the document buffer failed.
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),

    /// The document layout could not be produced.
    #[error("layout failed: {0}")]
    Layout(String),
}

impl From<RenderError> for strep_core::Error {
    fn from(err: RenderError) -> Self {
        strep_core::Error::RenderFailed(err.to_string())
    }
}

/// Renders a student snapshot into a document.
///
/// Rendering is CPU-bound; callers on an async runtime should run it on a
/// blocking thread.
pub trait ReportRenderer: Send + Sync {
    fn render(&self, student: &Student) -> Result<Vec<u8>, RenderError>;
}
