//! Build-time export of provider output into the site tree.
//!
//! Produces, under the configured export directory:
//! ```text
//! <export_dir>/
//! ├── services.json            (records)
//! ├── servicesSummary.json     (summary table)
//! ├── logbooks.json            (run logbooks, when run reports exist)
//! ├── failing.json             (councils whose latest run failed)
//! └── servicesManifest.json    (build manifest)
//! ```
//! and, when passthrough is enabled, a verbatim copy of the CSV at the
//! configured download path.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use servicedata_csv::{RECORDS_PROVIDER_NAME, read_source, records_from_bytes};
use servicedata_runs::collect_logbooks;
use servicedata_shared::{
    BuildId, BuildManifest, CURRENT_SCHEMA_VERSION, DataEvents, ExportConfig, FileMeta, Result,
    RunsExportConfig, RunsMeta, ServiceDataError, SourceMeta,
};
use servicedata_summary::{SUMMARY_PROVIDER_NAME, summarize_records};

/// Output from a successful export.
#[derive(Debug, Clone)]
pub struct ExportResult {
    /// Directory the data files were written to.
    pub export_dir: PathBuf,
    /// Path of the written manifest.
    pub manifest_path: PathBuf,
    /// The manifest that was written.
    pub manifest: BuildManifest,
}

impl ExportResult {
    /// Whether the source CSV was absent (all outputs empty).
    pub fn source_missing(&self) -> bool {
        !self.manifest.source.present
    }
}

/// Write the records, summary, run logbooks, passthrough copy and manifest.
///
/// The source CSV is read once; records, summary, checksum and passthrough
/// copy all come from the same bytes. A missing source CSV is not an error:
/// empty data files are written and the passthrough copy is skipped.
#[instrument(skip_all, fields(source = %config.csv_path.display(), out = %config.export_dir.display()))]
pub fn export_site_data(config: &ExportConfig, events: &dyn DataEvents) -> Result<ExportResult> {
    std::fs::create_dir_all(&config.export_dir)
        .map_err(|e| ServiceDataError::io(&config.export_dir, e))?;

    let source_bytes = read_source(&config.csv_path)?;
    let records = match &source_bytes {
        Some(bytes) => records_from_bytes(&config.csv_path, bytes, events),
        None => {
            events.source_missing(&config.csv_path);
            Vec::new()
        }
    };
    let summary = summarize_records(&records);

    let mut files = vec![
        write_data(&config.export_dir, RECORDS_PROVIDER_NAME, &records)?,
        write_data(&config.export_dir, SUMMARY_PROVIDER_NAME, &summary)?,
    ];

    let source = source_meta(&config.csv_path, source_bytes.as_deref());

    let passthrough = match (&config.passthrough_target, &source_bytes) {
        (Some(target), Some(bytes)) => Some(copy_passthrough(target, bytes)?),
        (Some(target), None) => {
            warn!(target = %target.display(), "source CSV missing, skipping passthrough copy");
            None
        }
        (None, _) => None,
    };

    let runs = match &config.runs {
        Some(runs_config) => export_runs(&config.export_dir, runs_config, &mut files)?,
        None => None,
    };

    let manifest = BuildManifest {
        schema_version: CURRENT_SCHEMA_VERSION,
        build_id: BuildId::new(),
        generated_at: Utc::now(),
        tool_version: config.tool_version.clone(),
        source,
        record_count: records.len(),
        summary_count: summary.len(),
        files,
        passthrough,
        runs,
    };

    let manifest_path = config.manifest_path();
    write_json(&manifest_path, &manifest)?;

    info!(
        build_id = %manifest.build_id,
        records = manifest.record_count,
        summary_entries = manifest.summary_count,
        "site data export complete"
    );

    Ok(ExportResult {
        export_dir: config.export_dir.clone(),
        manifest_path,
        manifest,
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Write logbooks and failing scrapers; skipped when there are no run reports.
fn export_runs(
    dir: &Path,
    config: &RunsExportConfig,
    files: &mut Vec<FileMeta>,
) -> Result<Option<RunsMeta>> {
    let runs = collect_logbooks(config)?;
    if runs.is_empty() {
        warn!(dir = %config.reports_dir.display(), "no run reports found, skipping logbooks");
        return Ok(None);
    }

    files.push(write_json(&dir.join(&config.logbooks_file), &runs.logbooks)?);
    files.push(write_json(&dir.join(&config.failing_file), &runs.failing)?);

    Ok(Some(RunsMeta {
        reports_read: runs.reports_read,
        council_count: runs.logbooks.len(),
        failing_count: runs.failing.len(),
    }))
}

/// Write `<name>.json` into `dir`.
fn write_data<T: Serialize>(dir: &Path, name: &str, items: &[T]) -> Result<FileMeta> {
    write_json(&dir.join(format!("{name}.json")), items)
}

/// Write a pretty-printed JSON file atomically (temp file, then rename).
pub(crate) fn write_json<T: Serialize + ?Sized>(path: &Path, data: &T) -> Result<FileMeta> {
    let json = serde_json::to_string_pretty(data)?;
    write_atomic(path, json.as_bytes())
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<FileMeta> {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            ServiceDataError::validation(format!("not a file path: {}", path.display()))
        })?;
    let temp = path.with_file_name(format!(".{filename}.tmp"));

    std::fs::write(&temp, bytes).map_err(|e| ServiceDataError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| ServiceDataError::io(path, e))?;

    debug!(path = %path.display(), size = bytes.len(), "wrote file");

    Ok(FileMeta {
        filename,
        sha256: sha256_hex(bytes),
        size_bytes: bytes.len() as u64,
    })
}

/// Copy the raw CSV bytes to `target`, creating parent directories.
fn copy_passthrough(target: &Path, bytes: &[u8]) -> Result<FileMeta> {
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ServiceDataError::io(parent, e))?;
    }
    let meta = write_atomic(target, bytes)?;
    info!(target = %target.display(), "copied services CSV for download");
    Ok(meta)
}

fn source_meta(path: &Path, bytes: Option<&[u8]>) -> SourceMeta {
    SourceMeta {
        path: path.display().to_string(),
        present: bytes.is_some(),
        sha256: bytes.map(sha256_hex),
        size_bytes: bytes.map(|b| b.len() as u64),
    }
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use servicedata_shared::{Record, RunsConfig, SilentEvents, SummaryEntry};

    use super::*;

    const FIXTURE: &str = "../../../fixtures/csv/services.fixture.csv";
    const RUNS_FIXTURE: &str = "../../../fixtures/runs";

    /// Counts source events.
    #[derive(Default)]
    struct CountingEvents {
        missing: Cell<usize>,
        loaded: Cell<usize>,
    }

    impl DataEvents for CountingEvents {
        fn source_missing(&self, _path: &Path) {
            self.missing.set(self.missing.get() + 1);
        }
        fn source_loaded(&self, _path: &Path, _records: usize) {
            self.loaded.set(self.loaded.get() + 1);
        }
        fn unbalanced_quotes(&self, _path: &Path, _line: usize) {}
    }

    fn runs_fixture_config() -> RunsExportConfig {
        let runs = RunsConfig {
            artifacts_dir: RUNS_FIXTURE.into(),
            ..Default::default()
        };
        RunsExportConfig::resolve(&runs, Path::new("."))
    }

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("sd-export-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Site layout with the fixture copied to `_data/services.csv`.
    fn make_config(root: &Path, with_source: bool) -> ExportConfig {
        let data_dir = root.join("_data");
        std::fs::create_dir_all(&data_dir).unwrap();
        if with_source {
            std::fs::copy(FIXTURE, data_dir.join("services.csv")).unwrap();
        }
        ExportConfig {
            csv_path: data_dir.join("services.csv"),
            export_dir: data_dir,
            manifest_file: "servicesManifest.json".into(),
            passthrough_target: Some(root.join("_site/downloads/services.csv")),
            runs: None,
            tool_version: "0.1.0-test".into(),
        }
    }

    fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> T {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn export_writes_data_files() {
        let tmp = temp_dir();
        let config = make_config(&tmp, true);

        let result = export_site_data(&config, &SilentEvents).unwrap();

        let records: Vec<Record> = read_json(&tmp.join("_data/services.json"));
        assert_eq!(records.len(), 6);
        assert_eq!(records[0].get("council_id"), Some("ABE"));

        let summary: Vec<SummaryEntry> = read_json(&tmp.join("_data/servicesSummary.json"));
        assert_eq!(summary.len(), 4);
        assert_eq!(summary[0].service_name, "Bin collections");

        assert_eq!(result.manifest.record_count, 6);
        assert_eq!(result.manifest.summary_count, 4);
        assert!(!result.source_missing());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn export_writes_manifest() {
        let tmp = temp_dir();
        let config = make_config(&tmp, true);

        let result = export_site_data(&config, &SilentEvents).unwrap();

        let manifest: BuildManifest = read_json(&result.manifest_path);
        assert_eq!(manifest.schema_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(manifest.build_id, result.manifest.build_id);
        assert_eq!(manifest.files.len(), 2);
        assert_eq!(manifest.files[0].filename, "services.json");
        assert_eq!(manifest.files[1].filename, "servicesSummary.json");
        assert_eq!(manifest.files[0].sha256.len(), 64);

        let raw = std::fs::read(FIXTURE).unwrap();
        assert_eq!(manifest.source.sha256, Some(sha256_hex(&raw)));
        assert_eq!(manifest.source.size_bytes, Some(raw.len() as u64));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn passthrough_copies_verbatim() {
        let tmp = temp_dir();
        let config = make_config(&tmp, true);

        let result = export_site_data(&config, &SilentEvents).unwrap();

        let copied = std::fs::read(tmp.join("_site/downloads/services.csv")).unwrap();
        assert_eq!(copied, std::fs::read(FIXTURE).unwrap());
        let meta = result.manifest.passthrough.expect("passthrough recorded");
        assert_eq!(meta.filename, "services.csv");
        assert_eq!(Some(meta.sha256), result.manifest.source.sha256);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn passthrough_disabled_writes_nothing() {
        let tmp = temp_dir();
        let mut config = make_config(&tmp, true);
        config.passthrough_target = None;

        let result = export_site_data(&config, &SilentEvents).unwrap();

        assert!(!tmp.join("_site").exists());
        assert!(result.manifest.passthrough.is_none());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_source_exports_empty_data() {
        let tmp = temp_dir();
        let config = make_config(&tmp, false);

        let result = export_site_data(&config, &SilentEvents).expect("missing source is not fatal");

        assert!(result.source_missing());
        let records: Vec<Record> = read_json(&tmp.join("_data/services.json"));
        let summary: Vec<SummaryEntry> = read_json(&tmp.join("_data/servicesSummary.json"));
        assert!(records.is_empty());
        assert!(summary.is_empty());
        assert!(result.manifest.passthrough.is_none());
        assert!(result.manifest.source.sha256.is_none());
        assert!(!tmp.join("_site/downloads/services.csv").exists());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn export_is_repeatable_and_leaves_no_temp_files() {
        let tmp = temp_dir();
        let config = make_config(&tmp, true);

        let first = export_site_data(&config, &SilentEvents).unwrap();
        let second = export_site_data(&config, &SilentEvents).unwrap();

        assert_ne!(first.manifest.build_id, second.manifest.build_id);
        assert_eq!(first.manifest.files, second.manifest.files);

        for entry in std::fs::read_dir(tmp.join("_data")).unwrap() {
            let name = entry.unwrap().file_name().to_string_lossy().to_string();
            assert!(!name.starts_with('.'), "temp file left behind: {name}");
        }

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn source_is_read_once_per_export() {
        let tmp = temp_dir();
        let config = make_config(&tmp, true);
        let events = CountingEvents::default();

        export_site_data(&config, &events).unwrap();
        assert_eq!(events.loaded.get(), 1);
        assert_eq!(events.missing.get(), 0);

        let tmp_missing = temp_dir();
        let config = make_config(&tmp_missing, false);
        let events = CountingEvents::default();

        export_site_data(&config, &events).unwrap();
        assert_eq!(events.missing.get(), 1);
        assert_eq!(events.loaded.get(), 0);

        let _ = std::fs::remove_dir_all(&tmp);
        let _ = std::fs::remove_dir_all(&tmp_missing);
    }

    #[test]
    fn data_files_match_recorded_source() {
        let tmp = temp_dir();
        let config = make_config(&tmp, true);

        let result = export_site_data(&config, &SilentEvents).unwrap();

        // Records written and the recorded hash describe the same bytes.
        let raw = std::fs::read(&config.csv_path).unwrap();
        let records: Vec<Record> = read_json(&tmp.join("_data/services.json"));
        let expected = records_from_bytes(&config.csv_path, &raw, &SilentEvents);
        assert_eq!(records, expected);
        assert_eq!(result.manifest.source.sha256, Some(sha256_hex(&raw)));
        assert_eq!(result.manifest.record_count, expected.len());
        assert_eq!(
            result.manifest.summary_count,
            summarize_records(&expected).len()
        );

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn export_writes_run_logbooks() {
        let tmp = temp_dir();
        let mut config = make_config(&tmp, true);
        config.runs = Some(runs_fixture_config());

        let result = export_site_data(&config, &SilentEvents).unwrap();

        let logbooks: Vec<servicedata_runs::LogBook> = read_json(&tmp.join("_data/logbooks.json"));
        assert_eq!(logbooks.len(), 3);
        let failing: Vec<servicedata_runs::FailingScraper> =
            read_json(&tmp.join("_data/failing.json"));
        assert_eq!(failing.len(), 2);

        let names: Vec<&str> = result
            .manifest
            .files
            .iter()
            .map(|f| f.filename.as_str())
            .collect();
        assert_eq!(
            names,
            vec![
                "services.json",
                "servicesSummary.json",
                "logbooks.json",
                "failing.json"
            ]
        );
        let runs = result.manifest.runs.expect("runs recorded");
        assert_eq!(runs.reports_read, 2);
        assert_eq!(runs.council_count, 3);
        assert_eq!(runs.failing_count, 2);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_run_reports_skip_logbooks() {
        let tmp = temp_dir();
        let mut config = make_config(&tmp, true);
        let mut runs = runs_fixture_config();
        runs.reports_dir = tmp.join("run-artifacts/run-reports");
        config.runs = Some(runs);

        let result = export_site_data(&config, &SilentEvents).unwrap();

        assert!(result.manifest.runs.is_none());
        assert_eq!(result.manifest.files.len(), 2);
        assert!(!tmp.join("_data/logbooks.json").exists());
        assert!(!tmp.join("_data/failing.json").exists());

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
