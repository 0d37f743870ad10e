//! Shared types, error model, and configuration for servicedata.
//!
//! This crate is the foundation depended on by all other servicedata crates.
//! It provides:
//! - [`ServiceDataError`] — the unified error type
//! - Domain types ([`Record`], [`SummaryEntry`], [`LoadOutcome`], [`BuildManifest`])
//! - The [`DataProvider`] and [`DataEvents`] traits
//! - Configuration ([`AppConfig`], [`ExportConfig`], config loading)

pub mod config;
pub mod error;
pub mod provider;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CONFIG_FILE_NAME, ExportConfig, ExportSection, LoadedConfig, PassthroughConfig,
    RunsConfig, RunsExportConfig, SourceConfig, init_config, load_config, load_config_from, load_config_in,
};
pub use error::{Result, ServiceDataError};
pub use provider::{DataEvents, DataProvider, SilentEvents, TracingEvents};
pub use types::{
    BuildId, BuildManifest, CURRENT_SCHEMA_VERSION, FileMeta, LoadOutcome, Record, RunsMeta,
    SourceMeta, SummaryEntry,
};
