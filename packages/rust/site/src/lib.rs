//! Site data export for servicedata.
//!
//! Builds the records and summary at build time, writes them as JSON data
//! files the static site generator picks up along with the scraper run
//! logbooks, copies the raw CSV into the published tree, and records what
//! was written in a manifest.

pub mod export;
pub mod verify;

pub use export::{ExportResult, export_site_data};
pub use verify::{VerifyReport, verify_export};
