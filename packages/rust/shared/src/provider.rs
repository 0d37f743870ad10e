//! The data provider contract consumed by the site generator.

use std::path::Path;

use serde::Serialize;

use crate::error::Result;

/// A no-argument source of template data.
///
/// Every call recomputes from scratch. Implementations read files and emit
/// events, nothing else.
pub trait DataProvider {
    /// One element of the provided sequence.
    type Item: Serialize;

    /// Data key the site generator knows this provider by.
    fn name(&self) -> &str;

    /// Produce the data.
    fn provide(&self) -> Result<Vec<Self::Item>>;
}

/// Observer for noteworthy loader events.
///
/// Callers pick where these go; nothing is written to a global stream
/// unless the caller chooses [`TracingEvents`].
pub trait DataEvents {
    /// The source file does not exist; an empty result is substituted.
    fn source_missing(&self, path: &Path);
    /// The source file was parsed.
    fn source_loaded(&self, path: &Path, records: usize);
    /// A line ended inside a quoted field. `line` is 1-based.
    fn unbalanced_quotes(&self, path: &Path, line: usize);
}

impl<T: DataEvents + ?Sized> DataEvents for &T {
    fn source_missing(&self, path: &Path) {
        (**self).source_missing(path);
    }

    fn source_loaded(&self, path: &Path, records: usize) {
        (**self).source_loaded(path, records);
    }

    fn unbalanced_quotes(&self, path: &Path, line: usize) {
        (**self).unbalanced_quotes(path, line);
    }
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEvents;

impl DataEvents for TracingEvents {
    fn source_missing(&self, path: &Path) {
        tracing::warn!(path = %path.display(), "services CSV not found, returning empty data");
    }

    fn source_loaded(&self, path: &Path, records: usize) {
        tracing::debug!(path = %path.display(), records, "services CSV loaded");
    }

    fn unbalanced_quotes(&self, path: &Path, line: usize) {
        tracing::debug!(path = %path.display(), line, "line ends inside a quoted field");
    }
}

/// Discards every event, for headless/test usage.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentEvents;

impl DataEvents for SilentEvents {
    fn source_missing(&self, _path: &Path) {}
    fn source_loaded(&self, _path: &Path, _records: usize) {}
    fn unbalanced_quotes(&self, _path: &Path, _line: usize) {}
}
