//! Lens module
//!
//! High-level "lens" abstractions for access-log analysis. Each lens is
//! usable on its own from library code; [`analysis`] chains them into the
//! full read → filter → count → write pipeline used by the CLI.
//!
//! | Lens | Purpose |
//! |------|---------|
//! | `address` | Mask → prefix length, CIDR-style range test |
//! | `log` | Line parsing with per-line diagnostics |
//! | `filter` | Time window and address range filters |
//! | `count` | Per-address counting and output writing |
//! | `analysis` | `AnalysisLens`, the whole run |
//!
//! # Usage
//!
//! ```rust,ignore
//! use iptally::lens::analysis::{AnalysisArgs, AnalysisLens, WindowArgs};
//! use iptally::lens::log::{LogDiagnostic, LogParser};
//! use iptally::lens::address::{is_in_range, prefix_length_from_mask};
//! ```

pub mod utils;

pub mod address;

pub mod log;

pub mod filter;

pub mod count;

pub mod analysis;
