//! Scraper run logbooks.
//!
//! Reads the scheduled run reports (and, for failed runs, the detailed
//! RunLogs) from a local copy of the artifacts bucket and turns them into:
//! - one [`LogBook`] per council with its most recent runs, newest first
//! - the list of [`FailingScraper`]s whose latest run did not succeed
//!
//! The site exports both as JSON next to the services data.

pub mod logbook;
pub mod source;
pub mod types;

use servicedata_shared::{Result, RunsExportConfig};
use tracing::{info, instrument};

pub use logbook::{MAX_RUNS_PER_COUNCIL, STATUS_RATE_LIMITED, build_logbooks, failing};
pub use source::{load_reports, load_runlogs};
pub use types::{FailingScraper, LogBook, LogRun, RunLog, RunReport, STATUS_FAILED, ScraperRun};

/// Logbooks built from one pass over the run artifacts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunLogbooks {
    /// Number of run reports that were read.
    pub reports_read: usize,
    pub logbooks: Vec<LogBook>,
    pub failing: Vec<FailingScraper>,
}

impl RunLogbooks {
    /// No run reports were available.
    pub fn is_empty(&self) -> bool {
        self.reports_read == 0
    }
}

/// Load reports and RunLogs per `config` and build the logbooks.
#[instrument(skip_all, fields(reports = %config.reports_dir.display()))]
pub fn collect_logbooks(config: &RunsExportConfig) -> Result<RunLogbooks> {
    let reports = load_reports(&config.reports_dir, config.report_limit)?;
    let runlogs = load_runlogs(&config.artifacts_dir, &reports);

    let logbooks = build_logbooks(&reports, &runlogs);
    let failing = failing(&logbooks);

    info!(
        reports = reports.len(),
        councils = logbooks.len(),
        failing = failing.len(),
        "run logbooks built"
    );

    Ok(RunLogbooks {
        reports_read: reports.len(),
        logbooks,
        failing,
    })
}
