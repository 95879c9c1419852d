//! Core types and shared functionality for the student report service.
//!
//! This crate provides:
//! - The file-backed report cache (fingerprints, index, store, sweeper)
//! - The student snapshot type
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod domain;
pub mod error;

pub use cache::{DisabledCache, FileCache, ReportCache};
pub use config::AppConfig;
pub use domain::Student;
pub use error::Error;
