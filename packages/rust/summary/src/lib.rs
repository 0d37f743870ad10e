//! Services summary: record counts per (`service_name`, `cms_type`).
//!
//! The output is a flat list sorted by service name, then CMS type, so a
//! template can iterate it directly and emit a heading whenever the service
//! name changes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use servicedata_csv::ServicesCsv;
use servicedata_shared::{DataEvents, DataProvider, Record, Result, SummaryEntry, TracingEvents};
use tracing::{debug, instrument};

/// Data key the site generator uses for the summary.
pub const SUMMARY_PROVIDER_NAME: &str = "servicesSummary";

/// Field holding the service name.
pub const SERVICE_NAME_FIELD: &str = "service_name";

/// Field holding the CMS type.
pub const CMS_TYPE_FIELD: &str = "cms_type";

/// Count records per (`service_name`, `cms_type`) pair.
///
/// A record without either field counts under `""`. Ordering is by Unicode
/// scalar value, service name first. This differs from UTF-16 code unit
/// order only when comparing characters above U+FFFF with ones in
/// U+E000..=U+FFFF: here the supplementary-plane character sorts last.
pub fn summarize_records(records: &[Record]) -> Vec<SummaryEntry> {
    let mut counts: BTreeMap<(&str, &str), usize> = BTreeMap::new();

    for record in records {
        let key = (
            record.field_or_empty(SERVICE_NAME_FIELD),
            record.field_or_empty(CMS_TYPE_FIELD),
        );
        *counts.entry(key).or_default() += 1;
    }

    counts
        .into_iter()
        .map(|((service_name, cms_type), count)| SummaryEntry {
            service_name: service_name.to_string(),
            cms_type: cms_type.to_string(),
            count,
        })
        .collect()
}

/// The summary data provider, built on [`ServicesCsv`].
#[derive(Debug, Clone)]
pub struct ServicesSummary<E = TracingEvents> {
    source: ServicesCsv<E>,
}

impl ServicesSummary {
    /// Summary of the CSV at `path`, logging through `tracing`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_events(path, TracingEvents)
    }
}

impl<E: DataEvents> ServicesSummary<E> {
    /// Summary of the CSV at `path`, reporting to a caller-supplied observer.
    pub fn with_events(path: impl Into<PathBuf>, events: E) -> Self {
        Self {
            source: ServicesCsv::with_events(path, events),
        }
    }

    /// Source path.
    pub fn path(&self) -> &Path {
        self.source.path()
    }

    /// Re-read the CSV and summarize it. A missing file gives an empty list.
    #[instrument(skip_all, fields(path = %self.path().display()))]
    pub fn summarize(&self) -> Result<Vec<SummaryEntry>> {
        let records = self.source.load()?;
        let summary = summarize_records(&records);
        debug!(
            records = records.len(),
            entries = summary.len(),
            "services summarized"
        );
        Ok(summary)
    }
}

impl<E: DataEvents> DataProvider for ServicesSummary<E> {
    type Item = SummaryEntry;

    fn name(&self) -> &str {
        SUMMARY_PROVIDER_NAME
    }

    fn provide(&self) -> Result<Vec<SummaryEntry>> {
        self.summarize()
    }
}
