//! Check an existing export against its manifest.

use std::path::Path;

use tracing::{debug, warn};

use servicedata_csv::read_source;
use servicedata_shared::{
    BuildManifest, CURRENT_SCHEMA_VERSION, ExportConfig, FileMeta, Result, ServiceDataError,
};

use crate::export::sha256_hex;

/// What [`verify_export`] found.
#[derive(Debug, Clone)]
pub struct VerifyReport {
    /// The manifest that was checked.
    pub manifest: BuildManifest,
    /// The source CSV differs from the one the export was built from.
    pub stale: bool,
    /// The manifest records a passthrough copy, but passthrough is disabled
    /// in the current config, so the copy was not checked.
    pub passthrough_unchecked: bool,
}

/// Verify that the export described by `config` is intact.
///
/// Every data file listed in the manifest (and the passthrough copy, if one
/// was recorded) must exist with the recorded SHA-256. A source CSV that has
/// changed since the export is reported as stale, not as an error.
pub fn verify_export(config: &ExportConfig) -> Result<VerifyReport> {
    let manifest_path = config.manifest_path();
    if !manifest_path.exists() {
        return Err(ServiceDataError::validation(format!(
            "missing {}",
            config.manifest_file
        )));
    }

    let content = std::fs::read_to_string(&manifest_path)
        .map_err(|e| ServiceDataError::io(&manifest_path, e))?;
    let manifest: BuildManifest = serde_json::from_str(&content).map_err(|e| {
        ServiceDataError::validation(format!("invalid {}: {e}", config.manifest_file))
    })?;

    if manifest.schema_version != CURRENT_SCHEMA_VERSION {
        return Err(ServiceDataError::validation(format!(
            "unsupported schema_version: {} (expected {})",
            manifest.schema_version, CURRENT_SCHEMA_VERSION
        )));
    }

    for file in &manifest.files {
        check_file(&config.export_dir.join(&file.filename), file)?;
    }

    let mut passthrough_unchecked = false;
    match (&manifest.passthrough, &config.passthrough_target) {
        (Some(meta), Some(target)) => check_file(target, meta)?,
        (Some(meta), None) => {
            warn!(
                file = %meta.filename,
                "export recorded a passthrough copy but passthrough is disabled; not checked"
            );
            passthrough_unchecked = true;
        }
        (None, _) => {}
    }

    let current = read_source(&config.csv_path)?.map(|bytes| sha256_hex(&bytes));
    let stale = current != manifest.source.sha256;
    debug!(stale, "export verified");

    Ok(VerifyReport {
        manifest,
        stale,
        passthrough_unchecked,
    })
}

fn check_file(path: &Path, meta: &FileMeta) -> Result<()> {
    let bytes = std::fs::read(path).map_err(|e| ServiceDataError::io(path, e))?;
    if sha256_hex(&bytes) != meta.sha256 {
        return Err(ServiceDataError::validation(format!(
            "{} does not match its recorded checksum",
            path.display()
        )));
    }
    Ok(())
}
