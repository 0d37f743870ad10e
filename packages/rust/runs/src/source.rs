//! Read run reports and RunLogs from a local copy of the artifacts bucket.
//!
//! Layout:
//! ```text
//! <artifacts_dir>/
//! ├── run-reports/*.json   (one report per scheduled run)
//! └── <runlog keys>        (paths named by the reports)
//! ```
//! Unreadable reports and RunLogs are logged and skipped, never fatal.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use servicedata_shared::{Result, ServiceDataError};
use tracing::{debug, instrument, warn};

use crate::types::{RunLog, RunReport};

/// Load the newest `limit` run reports in `reports_dir`, newest first.
///
/// Recency is the file modification time, ties broken by file name. A
/// missing directory gives no reports.
#[instrument(skip_all, fields(dir = %reports_dir.display(), limit = limit))]
pub fn load_reports(reports_dir: &Path, limit: usize) -> Result<Vec<RunReport>> {
    let entries = match std::fs::read_dir(reports_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!(dir = %reports_dir.display(), "run reports directory not found");
            return Ok(Vec::new());
        }
        Err(e) => return Err(ServiceDataError::io(reports_dir, e)),
    };

    let mut files: Vec<(SystemTime, PathBuf)> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ServiceDataError::io(reports_dir, e))?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let modified = entry
            .metadata()
            .and_then(|m| m.modified())
            .map_err(|e| ServiceDataError::io(&path, e))?;
        files.push((modified, path));
    }

    files.sort_by(|a, b| b.cmp(a));
    files.truncate(limit);

    let reports: Vec<RunReport> = files
        .iter()
        .filter_map(|(_, path)| read_json::<RunReport>(path))
        .collect();

    debug!(found = files.len(), loaded = reports.len(), "run reports loaded");
    Ok(reports)
}

/// Load the RunLog of every failed scraper run in `reports`, keyed by RunLog key.
///
/// Keys resolve against `artifacts_dir`. Missing or invalid RunLogs are
/// skipped with a warning.
#[instrument(skip_all, fields(dir = %artifacts_dir.display()))]
pub fn load_runlogs(artifacts_dir: &Path, reports: &[RunReport]) -> HashMap<String, RunLog> {
    let mut runlogs = HashMap::new();

    for key in reports
        .iter()
        .flat_map(|r| &r.scrapers)
        .filter_map(|s| s.runlog_key())
    {
        if runlogs.contains_key(key) {
            continue;
        }
        if let Some(runlog) = read_json::<RunLog>(&artifacts_dir.join(key)) {
            runlogs.insert(key.to_string(), runlog);
        }
    }

    debug!(loaded = runlogs.len(), "runlogs loaded");
    runlogs
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!(path = %path.display(), "file not found");
            return None;
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot read file");
            return None;
        }
    };

    match serde_json::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "invalid JSON, skipping");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::time::Duration;

    use super::*;

    const FIXTURE_DIR: &str = "../../../fixtures/runs";

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("sd-runs-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_report(dir: &Path, name: &str, council: &str, age_secs: u64) {
        let path = dir.join(name);
        std::fs::write(
            &path,
            format!(r#"{{"scrapers": [{{"council": "{council}", "status": "ok"}}]}}"#),
        )
        .unwrap();
        let modified = SystemTime::now() - Duration::from_secs(age_secs);
        File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(modified)
            .unwrap();
    }

    fn first_council(report: &RunReport) -> &str {
        report.scrapers[0].council.as_deref().unwrap()
    }

    #[test]
    fn missing_directory_has_no_reports() {
        let tmp = temp_dir();
        let reports = load_reports(&tmp.join("run-reports"), 10).unwrap();
        assert!(reports.is_empty());
        std::fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn newest_reports_first_and_limited() {
        let tmp = temp_dir();
        write_report(&tmp, "a.json", "OLDEST", 300);
        write_report(&tmp, "b.json", "NEWEST", 10);
        write_report(&tmp, "c.json", "MIDDLE", 100);
        std::fs::write(tmp.join("notes.txt"), "not a report").unwrap();

        let reports = load_reports(&tmp, 2).unwrap();
        let councils: Vec<&str> = reports.iter().map(first_council).collect();
        assert_eq!(councils, vec!["NEWEST", "MIDDLE"]);

        std::fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn invalid_report_is_skipped() {
        let tmp = temp_dir();
        write_report(&tmp, "good.json", "ABE", 10);
        std::fs::write(tmp.join("bad.json"), "{not json").unwrap();

        let reports = load_reports(&tmp, 10).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(first_council(&reports[0]), "ABE");

        std::fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn fixture_runlogs_load_for_failed_runs_only() {
        let root = Path::new(FIXTURE_DIR);
        let reports = load_reports(&root.join("run-reports"), 10).unwrap();
        assert_eq!(reports.len(), 2);

        let runlogs = load_runlogs(root, &reports);
        // BIR's RunLog file is absent, CAR succeeded.
        assert_eq!(runlogs.len(), 1);
        let log = &runlogs["run-logs/ABE.json"];
        assert_eq!(log.duration_seconds, Some(42.0));
        assert!(log.error.as_deref().unwrap().starts_with("Traceback"));
    }
}
