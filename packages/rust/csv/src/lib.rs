//! Services CSV reader.
//!
//! Loads the services CSV from the site's data directory and turns it into
//! an ordered list of [`Record`]s, one per non-blank data line. The first
//! non-blank line is the header. A missing file is not an error: it yields
//! [`LoadOutcome::Missing`] and a [`DataEvents::source_missing`] event.
//!
//! Malformed rows never fail. Short rows are padded with `""`, long rows are
//! truncated to the header, and unbalanced quotes are reported as events.

mod scanner;

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use servicedata_shared::{
    DataEvents, DataProvider, LoadOutcome, Record, Result, ServiceDataError, TracingEvents,
};
use tracing::instrument;

pub use scanner::{ScannedLine, scan_line};

/// Data key the site generator uses for the records.
pub const RECORDS_PROVIDER_NAME: &str = "services";

/// Byte-order mark some spreadsheet exports prepend.
const BOM: char = '\u{feff}';

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parsed CSV content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedCsv {
    /// Field names from the header line, in column order.
    pub header: Vec<String>,
    /// Data rows in input order.
    pub records: Vec<Record>,
    /// 1-based line numbers that ended inside a quoted field.
    pub unbalanced_lines: Vec<usize>,
}

/// Parse CSV text. Blank lines are skipped; empty input has no header.
pub fn parse_csv(content: &str) -> ParsedCsv {
    let content = content.strip_prefix(BOM).unwrap_or(content);
    let mut parsed = ParsedCsv::default();
    let mut have_header = false;

    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let scanned = scan_line(line);
        if scanned.unbalanced {
            parsed.unbalanced_lines.push(idx + 1);
        }

        if have_header {
            parsed
                .records
                .push(Record::from_row(&parsed.header, scanned.fields));
        } else {
            parsed.header = scanned.fields;
            have_header = true;
        }
    }

    parsed
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Read the raw bytes of `path`, or `None` if it does not exist.
pub fn read_source(path: &Path) -> Result<Option<Vec<u8>>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ServiceDataError::io(path, e)),
    }
}

/// Load records from `path`, reporting through `events`.
///
/// Invalid UTF-8 is replaced rather than rejected.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn read_records(path: &Path, events: &dyn DataEvents) -> Result<LoadOutcome> {
    let Some(bytes) = read_source(path)? else {
        events.source_missing(path);
        return Ok(LoadOutcome::Missing {
            path: path.to_path_buf(),
        });
    };

    Ok(LoadOutcome::Loaded {
        records: records_from_bytes(path, &bytes, events),
    })
}

/// Parse raw CSV bytes already read from `path`, reporting through `events`.
///
/// Lets a caller that needs the bytes for something else (checksums, a
/// verbatim copy) build records from the same read.
pub fn records_from_bytes(path: &Path, bytes: &[u8], events: &dyn DataEvents) -> Vec<Record> {
    let content = String::from_utf8_lossy(bytes);
    let parsed = parse_csv(&content);

    for line in &parsed.unbalanced_lines {
        events.unbalanced_quotes(path, *line);
    }
    events.source_loaded(path, parsed.records.len());

    parsed.records
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// The records data provider: one [`Record`] per CSV data line.
#[derive(Debug, Clone)]
pub struct ServicesCsv<E = TracingEvents> {
    path: PathBuf,
    events: E,
}

impl ServicesCsv {
    /// Provider for `path`, logging through `tracing`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_events(path, TracingEvents)
    }
}

impl<E: DataEvents> ServicesCsv<E> {
    /// Provider for `path`, reporting to a caller-supplied observer.
    pub fn with_events(path: impl Into<PathBuf>, events: E) -> Self {
        Self {
            path: path.into(),
            events,
        }
    }

    /// Source path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file fresh and say whether it was there.
    pub fn load_outcome(&self) -> Result<LoadOutcome> {
        read_records(&self.path, &self.events)
    }

    /// Read the file fresh. A missing file gives an empty list.
    pub fn load(&self) -> Result<Vec<Record>> {
        Ok(self.load_outcome()?.into_records())
    }
}

impl<E: DataEvents> DataProvider for ServicesCsv<E> {
    type Item = Record;

    fn name(&self) -> &str {
        RECORDS_PROVIDER_NAME
    }

    fn provide(&self) -> Result<Vec<Record>> {
        self.load()
    }
}
