//! Client code for the student report service.
//!
//! This crate provides the upstream backend client (with retry) and the PDF
//! report renderer used by the server.

pub mod backend;
pub mod render;

pub use backend::{BackendClient, BackendConfig, BackendError, StudentSource};
pub use render::{PdfReportRenderer, RenderError, ReportRenderer};
