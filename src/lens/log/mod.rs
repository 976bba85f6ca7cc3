//! Access-log parsing lens
//!
//! Turns the raw text of an access log into [`LogEntry`] records. A valid
//! line has exactly three whitespace-separated fields:
//!
//! ```text
//! 10.0.0.1 2024-01-01 10:00:00
//! ```
//!
//! Blank lines are skipped silently. Lines with the wrong number of fields or
//! an unparseable timestamp are skipped too, but each one is reported through
//! a [`DiagnosticCallback`] so the caller can surface it.
//!
//! # Example
//!
//! ```rust
//! use iptally::lens::log::{DiagnosticCallback, LogDiagnostic, LogParser};
//! use std::sync::{Arc, Mutex};
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = seen.clone();
//! let callback: DiagnosticCallback = Arc::new(move |diag: LogDiagnostic| {
//!     if let Ok(mut v) = sink.lock() {
//!         v.push(diag);
//!     }
//! });
//!
//! let parser = LogParser::new();
//! let parsed = parser.parse_str("10.0.0.1 2024-01-01 10:00:00\nbad line\n", Some(callback));
//!
//! assert_eq!(parsed.entries.len(), 1);
//! assert_eq!(seen.lock().unwrap().len(), 1);
//! ```

use crate::error::{IptallyError, Result};
use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Timestamp layout of the date and time fields, joined by a single space
pub const DEFAULT_LOG_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// =============================================================================
// Types
// =============================================================================

/// One request record from the access log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Source address, stored verbatim (validated only when filtering)
    pub address: String,
    /// Request time, no timezone
    pub timestamp: NaiveDateTime,
}

impl LogEntry {
    pub fn new(address: impl Into<String>, timestamp: NaiveDateTime) -> Self {
        Self {
            address: address.into(),
            timestamp,
        }
    }
}

/// Non-fatal problem found while processing a single record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogDiagnostic {
    /// Line does not have exactly three fields
    MalformedLine {
        /// 1-based physical line number
        line_number: usize,
        line: String,
    },
    /// Date and time fields do not match the expected layout
    InvalidTimestamp { line_number: usize, line: String },
    /// Entry address is not a dotted quad; raised by the address filter
    InvalidAddress { address: String },
}

impl fmt::Display for LogDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogDiagnostic::MalformedLine { line_number, line } => write!(
                f,
                "Error reading line {}: {}. Invalid line format.",
                line_number, line
            ),
            LogDiagnostic::InvalidTimestamp { line_number, line } => write!(
                f,
                "Error reading line {}: {}. Invalid date and time format.",
                line_number, line
            ),
            LogDiagnostic::InvalidAddress { address } => {
                write!(f, "Skipping entry with invalid IPv4 address: {}", address)
            }
        }
    }
}

/// Callback type for diagnostics
///
/// When no callback is given, diagnostics are logged with `tracing::warn!`.
pub type DiagnosticCallback = Arc<dyn Fn(LogDiagnostic) + Send + Sync>;

pub(crate) fn report(callback: &Option<DiagnosticCallback>, diagnostic: LogDiagnostic) {
    match callback {
        Some(cb) => cb(diagnostic),
        None => warn!("{}", diagnostic),
    }
}

/// Result of parsing a whole log
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedLog {
    pub entries: Vec<LogEntry>,
    /// Physical lines seen, blank ones included
    pub total_lines: usize,
    /// Non-blank lines rejected as malformed or mistimed
    pub skipped_lines: usize,
}

// =============================================================================
// Parser
// =============================================================================

/// Access-log parser
pub struct LogParser {
    datetime_format: String,
}

impl LogParser {
    /// Create a parser for the default `yyyy-MM-dd HH:mm:ss` layout
    pub fn new() -> Self {
        Self {
            datetime_format: DEFAULT_LOG_DATETIME_FORMAT.to_string(),
        }
    }

    /// Use a different chrono layout for the joined date and time fields
    pub fn with_datetime_format(mut self, format: impl Into<String>) -> Self {
        self.datetime_format = format.into();
        self
    }

    /// Parse `"<date> <time>"` against the configured layout.
    ///
    /// The match must be exact: the parsed value has to format back to the
    /// same text, so `2024-1-01` is rejected where `2024-01-01` is expected.
    /// Leap seconds (`23:59:60`) are rejected as well.
    pub fn parse_timestamp(&self, text: &str) -> Option<NaiveDateTime> {
        let ts = NaiveDateTime::parse_from_str(text, &self.datetime_format).ok()?;
        if ts.nanosecond() >= 1_000_000_000 {
            return None;
        }
        if ts.format(&self.datetime_format).to_string() != text {
            return None;
        }
        Some(ts)
    }

    /// Parse one line. `Ok(None)` means the line was blank.
    pub fn parse_line(
        &self,
        line_number: usize,
        line: &str,
    ) -> std::result::Result<Option<LogEntry>, LogDiagnostic> {
        if line.trim().is_empty() {
            return Ok(None);
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        let [address, date, time] = fields.as_slice() else {
            return Err(LogDiagnostic::MalformedLine {
                line_number,
                line: line.to_string(),
            });
        };

        match self.parse_timestamp(&format!("{} {}", date, time)) {
            Some(timestamp) => Ok(Some(LogEntry::new(*address, timestamp))),
            None => Err(LogDiagnostic::InvalidTimestamp {
                line_number,
                line: line.to_string(),
            }),
        }
    }

    /// Parse pre-split lines, skipping and reporting bad ones
    pub fn parse_lines<'a, I>(&self, lines: I, callback: Option<DiagnosticCallback>) -> ParsedLog
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut parsed = ParsedLog::default();

        for (idx, line) in lines.into_iter().enumerate() {
            parsed.total_lines += 1;
            match self.parse_line(idx + 1, line) {
                Ok(Some(entry)) => parsed.entries.push(entry),
                Ok(None) => {}
                Err(diagnostic) => {
                    parsed.skipped_lines += 1;
                    report(&callback, diagnostic);
                }
            }
        }

        debug!(
            "parsed {} entries from {} lines ({} skipped)",
            parsed.entries.len(),
            parsed.total_lines,
            parsed.skipped_lines
        );
        parsed
    }

    /// Parse the full text of a log
    pub fn parse_str(&self, content: &str, callback: Option<DiagnosticCallback>) -> ParsedLog {
        self.parse_lines(content.lines(), callback)
    }

    /// Read the whole file into memory and parse it.
    ///
    /// Failing to open or read the file is fatal; bad lines are not. Bytes
    /// that are not valid UTF-8 are replaced with U+FFFD, so only the lines
    /// containing them can fail to parse.
    pub fn read_file(
        &self,
        path: &Path,
        callback: Option<DiagnosticCallback>,
    ) -> Result<ParsedLog> {
        let bytes = std::fs::read(path).map_err(|source| IptallyError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(self.parse_str(&String::from_utf8_lossy(&bytes), callback))
    }
}

impl Default for LogParser {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
