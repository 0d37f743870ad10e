//! Run report input types and logbook output types.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Input: run reports and RunLogs
// ---------------------------------------------------------------------------

/// One run report: the outcome of every scraper in a single scheduled run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    #[serde(default)]
    pub scrapers: Vec<ScraperRun>,
}

/// A single scraper's entry in a run report.
///
/// Reports are produced by another system, so every field is optional and
/// unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScraperRun {
    #[serde(default)]
    pub council: Option<String>,
    /// `"failed"`, `"disabled"` or a success status.
    #[serde(default)]
    pub status: Option<String>,
    /// HTTP status of the failing request, when there was one.
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    /// Key of the detailed RunLog, relative to the artifacts root.
    #[serde(default)]
    pub runlog_s3_key: Option<String>,
}

impl ScraperRun {
    /// Whether the scraper reported a failure.
    pub fn failed(&self) -> bool {
        self.status.as_deref() == Some(STATUS_FAILED)
    }

    /// RunLog key worth fetching: only failed runs carry useful logs.
    pub fn runlog_key(&self) -> Option<&str> {
        if self.failed() {
            self.runlog_s3_key.as_deref().filter(|k| !k.is_empty())
        } else {
            None
        }
    }
}

/// Status string a failed scraper reports.
pub const STATUS_FAILED: &str = "failed";

/// Detailed log of one failed scraper run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunLog {
    #[serde(default)]
    pub error_message: Option<String>,
    /// Full error output, usually a traceback.
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
}

// ---------------------------------------------------------------------------
// Output: logbooks
// ---------------------------------------------------------------------------

/// One scraper run as shown on the site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRun {
    /// 0 for success or disabled, 429 for rate limiting, 1 for any other failure.
    pub status_code: u16,
    pub start: Option<String>,
    /// Short error message.
    pub errors: String,
    /// Full log text from the RunLog.
    pub log_text: String,
    pub end: Option<String>,
    /// Run time in seconds.
    pub duration: f64,
}

impl LogRun {
    /// Calendar date of the run start, if it parses.
    ///
    /// Accepts RFC 3339 timestamps and naive `YYYY-MM-DDTHH:MM:SS[.f]` ones.
    pub fn run_date(&self) -> Option<NaiveDate> {
        let start = self.start.as_deref()?;
        if let Ok(dt) = DateTime::parse_from_rfc3339(start) {
            return Some(dt.date_naive());
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(start, "%Y-%m-%dT%H:%M:%S%.f") {
            return Some(dt.date());
        }
        NaiveDate::parse_from_str(start, "%Y-%m-%d").ok()
    }

    /// Whether this run counts as a failure.
    pub fn is_failure(&self) -> bool {
        self.status_code != 0
    }
}

/// Recent runs for one council, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogBook {
    pub council_id: String,
    /// No runs were found for this council.
    pub missing: bool,
    pub log_runs: Vec<LogRun>,
}

/// A council whose most recent run failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailingScraper {
    pub council_id: String,
    pub missing: bool,
    pub latest_run: LogRun,
}
