#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! iptally - request counts per IPv4 address from an access log
//!
//! iptally reads an access log whose lines look like
//! `10.0.0.1 2024-01-01 10:00:00`, keeps the entries inside a time window and
//! (optionally) an address range, counts requests per source address and
//! writes the counts to a file. It can be used as both a command-line
//! application and a library.
//!
//! # Feature Flags
//!
//! | Feature | Description | Key Dependencies |
//! |---------|-------------|------------------|
//! | `display` | Table formatting of run summaries | `tabled` |
//! | `cli` | CLI binary | `clap`, `tracing-subscriber` |
//!
//! # Architecture
//!
//! - **[`lens`]**: business logic
//!   - `address`: mask parsing and prefix matching
//!   - `log`: log-line parsing with a pluggable diagnostic callback
//!   - `filter`: time and address filters
//!   - `count`: count table and output writer
//!   - `analysis`: the full pipeline
//! - **[`config`]**: configuration management
//! - **[`error`]**: error types
//!
//! # Quick Start
//!
//! ```rust
//! use iptally::lens::analysis::{AnalysisLens, WindowArgs};
//!
//! let log = "10.0.0.1 2024-01-01 10:00:00\n\
//!            10.0.0.2 2024-01-02 11:00:00\n\
//!            bad line\n";
//!
//! let criteria = WindowArgs::new("01.01.2024", "01.01.2024").resolve().unwrap();
//! let counts = AnalysisLens::new().count_str(log, &criteria, None);
//!
//! assert_eq!(counts.get("10.0.0.1"), Some(1));
//! assert_eq!(counts.len(), 1);
//! ```

pub mod config;
pub mod error;
pub mod lens;

pub use config::IptallyConfig;
pub use error::{IptallyError, Result};

pub use lens::analysis::{AnalysisArgs, AnalysisLens, AnalysisReport, WindowArgs};
pub use lens::count::{CountTable, count_by_address, write_counts};
pub use lens::filter::FilterCriteria;
pub use lens::log::{DiagnosticCallback, LogDiagnostic, LogEntry, LogParser};
pub use lens::utils::OutputFormat;
