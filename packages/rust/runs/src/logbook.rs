//! Turn run reports into per-council logbooks.
//!
//! Everything here is pure: the reports and RunLogs are loaded elsewhere
//! ([`crate::source`]) and passed in.

use std::collections::{BTreeMap, HashMap};

use crate::types::{FailingScraper, LogBook, LogRun, RunLog, RunReport, ScraperRun};

/// Most runs kept per council.
pub const MAX_RUNS_PER_COUNCIL: usize = 20;

/// Status code recorded for a rate-limited scraper.
pub const STATUS_RATE_LIMITED: u16 = 429;

impl LogRun {
    /// Build a run from a report entry, preferring RunLog details when present.
    pub fn from_scraper(run: &ScraperRun, runlog: Option<&RunLog>) -> Self {
        let status_code = match (run.failed(), run.status_code) {
            (true, Some(STATUS_RATE_LIMITED)) => STATUS_RATE_LIMITED,
            (true, _) => 1,
            (false, _) => 0,
        };
        let reported_error = run.error.clone().unwrap_or_default();

        match runlog {
            Some(log) => Self {
                status_code,
                start: log
                    .start_time
                    .clone()
                    .filter(|s| !s.is_empty())
                    .or_else(|| run.start_time.clone()),
                errors: log.error_message.clone().unwrap_or(reported_error),
                log_text: log.error.clone().unwrap_or_default(),
                end: log.end_time.clone(),
                duration: log.duration_seconds.unwrap_or(0.0),
            },
            None => Self {
                status_code,
                start: run.start_time.clone(),
                errors: reported_error,
                log_text: String::new(),
                end: None,
                duration: 0.0,
            },
        }
    }

    /// Sort key: runs without a start time sort as the empty string.
    fn start_key(&self) -> &str {
        self.start.as_deref().unwrap_or("")
    }
}

impl LogBook {
    /// Logbook for `council_id` from already-built runs.
    ///
    /// Runs are ordered newest first (missing start times last, ties keep
    /// their input order) and capped at [`MAX_RUNS_PER_COUNCIL`].
    pub fn new(council_id: impl Into<String>, mut log_runs: Vec<LogRun>) -> Self {
        log_runs.sort_by(|a, b| b.start_key().cmp(a.start_key()));
        log_runs.truncate(MAX_RUNS_PER_COUNCIL);
        Self {
            council_id: council_id.into(),
            missing: log_runs.is_empty(),
            log_runs,
        }
    }

    /// The newest run, if any.
    pub fn latest_run(&self) -> Option<&LogRun> {
        self.log_runs.first()
    }
}

/// Build one logbook per council seen in `reports`, sorted by council id.
///
/// `runlogs` maps RunLog keys to their parsed content; entries without a
/// loaded RunLog fall back to the report's own fields. Councils with no
/// runs are left out.
pub fn build_logbooks(reports: &[RunReport], runlogs: &HashMap<String, RunLog>) -> Vec<LogBook> {
    let mut runs_by_council: BTreeMap<&str, Vec<LogRun>> = BTreeMap::new();

    for report in reports {
        for scraper in &report.scrapers {
            let Some(council) = scraper.council.as_deref().filter(|c| !c.is_empty()) else {
                continue;
            };
            let runlog = scraper.runlog_key().and_then(|key| runlogs.get(key));
            runs_by_council
                .entry(council)
                .or_default()
                .push(LogRun::from_scraper(scraper, runlog));
        }
    }

    runs_by_council
        .into_iter()
        .map(|(council, runs)| LogBook::new(council, runs))
        .filter(|book| !book.log_runs.is_empty())
        .collect()
}

/// Councils whose latest run failed, in logbook order.
pub fn failing(logbooks: &[LogBook]) -> Vec<FailingScraper> {
    logbooks
        .iter()
        .filter(|book| !book.missing)
        .filter_map(|book| {
            let latest = book.latest_run()?;
            latest.is_failure().then(|| FailingScraper {
                council_id: book.council_id.clone(),
                missing: false,
                latest_run: latest.clone(),
            })
        })
        .collect()
}
