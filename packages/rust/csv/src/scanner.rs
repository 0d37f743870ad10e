//! Quote-aware field scanner for a single CSV line.
//!
//! A two-state machine:
//! - `Unquoted`: `,` ends the current field, `"` enters `Quoted`.
//! - `Quoted`: `,` is literal, `"` returns to `Unquoted`.
//!
//! Quote characters are never part of a field. There is no `""` escape, so a
//! literal `"` cannot be represented; `"a""b"` scans as `ab`. Every field is
//! trimmed of surrounding whitespace.

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Scanner state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Unquoted,
    Quoted,
}

/// Fields of one scanned line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedLine {
    /// Trimmed fields, always at least one.
    pub fields: Vec<String>,
    /// The line ended inside a quoted field.
    ///
    /// Fields are returned exactly as the state machine produced them; no
    /// attempt is made to repair the line.
    pub unbalanced: bool,
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

/// Split `line` into fields.
pub fn scan_line(line: &str) -> ScannedLine {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut state = ScanState::Unquoted;

    for ch in line.chars() {
        state = match (state, ch) {
            (ScanState::Unquoted, '"') => ScanState::Quoted,
            (ScanState::Quoted, '"') => ScanState::Unquoted,
            (ScanState::Unquoted, ',') => {
                fields.push(current.trim().to_string());
                current.clear();
                ScanState::Unquoted
            }
            (state, ch) => {
                current.push(ch);
                state
            }
        };
    }

    fields.push(current.trim().to_string());

    ScannedLine {
        fields,
        unbalanced: state == ScanState::Quoted,
    }
}
