//! Access-log analysis lens
//!
//! Ties the other lenses together: read the log, filter by time window and
//! address range, count requests per address and write the counts out.
//!
//! # Example
//!
//! ```rust,ignore
//! use iptally::lens::analysis::{AnalysisArgs, AnalysisLens, WindowArgs};
//!
//! let window = WindowArgs::new("01.01.2024", "31.01.2024")
//!     .with_address("10.0.0.0", Some("255.255.255.0"));
//! let args = AnalysisArgs::new("access.log", "counts.txt", window.resolve()?);
//!
//! let report = AnalysisLens::new().run(&args, None)?;
//! println!("{} distinct addresses", report.distinct_addresses);
//! ```

use crate::error::{IptallyError, Result};
use crate::lens::address::{parse_octets, prefix_length_from_mask, prefix_length_from_mask_strict};
use crate::lens::count::{count_by_address, write_counts, CountTable};
use crate::lens::filter::{self, FilterCriteria};
use crate::lens::log::{DiagnosticCallback, LogParser};
use crate::lens::utils::OutputFormat;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

/// Layout of `--time-start` / `--time-end` values (`dd.MM.yyyy`)
pub const DEFAULT_WINDOW_DATE_FORMAT: &str = "%d.%m.%Y";

// =============================================================================
// Args
// =============================================================================

/// Unresolved time window and address range, as typed by the user
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WindowArgs {
    pub time_start: String,
    pub time_end: String,
    pub address_start: Option<String>,
    pub address_mask: Option<String>,
    /// Layout for the two dates; defaults to `dd.MM.yyyy`
    #[serde(default)]
    pub date_format: Option<String>,
    /// Reject non-contiguous masks instead of summing their bits
    #[serde(default)]
    pub strict_mask: bool,
}

impl WindowArgs {
    pub fn new(time_start: impl Into<String>, time_end: impl Into<String>) -> Self {
        Self {
            time_start: time_start.into(),
            time_end: time_end.into(),
            ..Default::default()
        }
    }

    pub fn with_address(mut self, address_start: &str, address_mask: Option<&str>) -> Self {
        self.address_start = Some(address_start.to_string());
        self.address_mask = address_mask.map(str::to_string);
        self
    }

    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = Some(format.into());
        self
    }

    pub fn with_strict_mask(mut self, strict: bool) -> Self {
        self.strict_mask = strict;
        self
    }

    /// Parse one window bound. The value must format back to the same text,
    /// so `1.1.2024` and `01.01.24` are rejected under `dd.MM.yyyy`.
    fn parse_date(&self, flag: &str, value: &str) -> Result<NaiveDate> {
        let format = self
            .date_format
            .as_deref()
            .unwrap_or(DEFAULT_WINDOW_DATE_FORMAT);
        NaiveDate::parse_from_str(value, format)
            .ok()
            .filter(|date| date.format(format).to_string() == value)
            .ok_or_else(|| {
                IptallyError::Argument(format!(
                    "{} must be a date in the form {}: {}",
                    flag, format, value
                ))
            })
    }

    /// Turn the raw values into [`FilterCriteria`].
    ///
    /// A mask without a base address is an error. A mask that does not parse
    /// is dropped, which leaves the address filter at /0.
    pub fn resolve(&self) -> Result<FilterCriteria> {
        if self.address_mask.is_some() && self.address_start.is_none() {
            return Err(IptallyError::MaskWithoutStart);
        }

        let start = self.parse_date("--time-start", &self.time_start)?;
        let end = self.parse_date("--time-end", &self.time_end)?;
        let mut criteria = FilterCriteria::from_dates(start, end);

        if let Some(address) = &self.address_start {
            let base = parse_octets(address)?;
            let prefix_length = self.address_mask.as_deref().and_then(|mask| {
                if self.strict_mask {
                    prefix_length_from_mask_strict(mask)
                } else {
                    prefix_length_from_mask(mask)
                }
            });
            criteria = criteria.with_address(base, prefix_length);
        }

        Ok(criteria)
    }
}

/// Arguments for a full analysis run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisArgs {
    pub log_path: PathBuf,
    pub output_path: PathBuf,
    pub criteria: FilterCriteria,
    #[serde(default)]
    pub format: OutputFormat,
}

impl AnalysisArgs {
    pub fn new(
        log_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        criteria: FilterCriteria,
    ) -> Self {
        Self {
            log_path: log_path.into(),
            output_path: output_path.into(),
            criteria,
            format: OutputFormat::default(),
        }
    }

    /// Set the output format
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }
}

// =============================================================================
// Types
// =============================================================================

/// Summary of a completed run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "display", derive(tabled::Tabled))]
pub struct AnalysisReport {
    pub total_lines: usize,
    pub parsed_entries: usize,
    pub skipped_lines: usize,
    pub matched_entries: usize,
    pub distinct_addresses: usize,
    pub output_path: String,
}

// =============================================================================
// Lens
// =============================================================================

/// Access-log analysis lens
pub struct AnalysisLens {
    parser: LogParser,
}

impl AnalysisLens {
    pub fn new() -> Self {
        Self {
            parser: LogParser::new(),
        }
    }

    /// Use a custom log parser (e.g. a different timestamp layout)
    pub fn with_parser(parser: LogParser) -> Self {
        Self { parser }
    }

    /// Filter and count the entries of already-loaded log text
    pub fn count_str(
        &self,
        content: &str,
        criteria: &FilterCriteria,
        callback: Option<DiagnosticCallback>,
    ) -> CountTable {
        let parsed = self.parser.parse_str(content, callback.clone());
        let entries = filter::apply(parsed.entries, criteria, callback);
        count_by_address(&entries)
    }

    /// Run the whole pipeline: read, filter, count, write.
    ///
    /// A read failure aborts before anything is written. Bad lines and bad
    /// addresses are reported through `callback` and skipped.
    pub fn run(
        &self,
        args: &AnalysisArgs,
        callback: Option<DiagnosticCallback>,
    ) -> Result<AnalysisReport> {
        let parsed = self.parser.read_file(&args.log_path, callback.clone())?;
        let total_lines = parsed.total_lines;
        let skipped_lines = parsed.skipped_lines;
        let parsed_entries = parsed.entries.len();

        let entries = filter::apply(parsed.entries, &args.criteria, callback);
        let table = count_by_address(&entries);
        write_counts(&table, &args.output_path, args.format)?;

        info!(
            "wrote {} addresses ({} requests) to {}",
            table.len(),
            table.total(),
            args.output_path.display()
        );

        Ok(AnalysisReport {
            total_lines,
            parsed_entries,
            skipped_lines,
            matched_entries: entries.len(),
            distinct_addresses: table.len(),
            output_path: args.output_path.display().to_string(),
        })
    }
}

impl Default for AnalysisLens {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
