//! Core domain types for services data.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current schema version for the build manifest format.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One parsed data row: field name to field value.
///
/// Serializes as a plain JSON object. Field order is not significant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(BTreeMap<String, String>);

impl Record {
    /// Zip `values` positionally onto `header`.
    ///
    /// Missing trailing values become `""`; values past the header are
    /// dropped. A repeated header name keeps the later column's value.
    pub fn from_row(header: &[String], values: Vec<String>) -> Self {
        let mut values = values.into_iter();
        let fields = header
            .iter()
            .map(|name| (name.clone(), values.next().unwrap_or_default()))
            .collect();
        Self(fields)
    }

    /// Value of `field`, if the header had that column.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Value of `field`, or `""` when the column is absent.
    pub fn field_or_empty(&self, field: &str) -> &str {
        self.get(field).unwrap_or("")
    }

    /// Field names present in this record, sorted.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the record has no fields at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

// ---------------------------------------------------------------------------
// SummaryEntry
// ---------------------------------------------------------------------------

/// Count of records sharing one (`service_name`, `cms_type`) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryEntry {
    pub service_name: String,
    pub cms_type: String,
    /// Always at least 1.
    pub count: usize,
}

// ---------------------------------------------------------------------------
// LoadOutcome
// ---------------------------------------------------------------------------

/// Result of reading the services CSV.
///
/// A missing file is an expected, non-fatal outcome rather than an error.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// The file was read and parsed.
    Loaded { records: Vec<Record> },
    /// The file does not exist.
    Missing { path: PathBuf },
}

impl LoadOutcome {
    /// Records, or an empty list when the file was missing.
    pub fn into_records(self) -> Vec<Record> {
        match self {
            Self::Loaded { records } => records,
            Self::Missing { .. } => Vec::new(),
        }
    }

    /// Whether the source file was absent.
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing { .. })
    }
}

// ---------------------------------------------------------------------------
// BuildId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one export run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildId(pub Uuid);

impl BuildId {
    /// Generate a new time-sortable build identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for BuildId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BuildId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for BuildId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// BuildManifest
// ---------------------------------------------------------------------------

/// The manifest written next to the exported data files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildManifest {
    /// Schema version for forward compatibility.
    pub schema_version: u32,
    /// Unique identifier for this export.
    pub build_id: BuildId,
    /// When the export ran.
    pub generated_at: DateTime<Utc>,
    /// Tool version that produced the export.
    pub tool_version: String,
    /// The CSV the data came from.
    pub source: SourceMeta,
    /// Number of records exported.
    pub record_count: usize,
    /// Number of summary entries exported.
    pub summary_count: usize,
    /// Data files written by this export.
    #[serde(default)]
    pub files: Vec<FileMeta>,
    /// Where the raw CSV was copied, if it was.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passthrough: Option<FileMeta>,
    /// Run logbook export, if run reports were found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runs: Option<RunsMeta>,
}

/// Run logbook counts for one export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunsMeta {
    pub reports_read: usize,
    pub council_count: usize,
    pub failing_count: usize,
}

/// Source CSV metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMeta {
    /// Path the CSV was read from.
    pub path: String,
    /// Whether the file existed.
    pub present: bool,
    /// SHA-256 of the raw bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}

/// Metadata for one written file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMeta {
    pub filename: String,
    pub sha256: String,
    pub size_bytes: u64,
}
