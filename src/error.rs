//! Error types for iptally

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for iptally
///
/// Line-level problems (malformed lines, bad timestamps, bad addresses in the
/// log) are not errors: they are reported through a diagnostic callback and
/// the offending record is skipped. See [`crate::lens::log::LogDiagnostic`].
#[derive(Error, Debug)]
pub enum IptallyError {
    #[error("Invalid arguments: {0}")]
    Argument(String),

    #[error("--address-mask cannot be used without --address-start")]
    MaskWithoutStart,

    #[error("Invalid IPv4 address: {0}")]
    AddressParse(String),

    #[error("Unable to read log file {}: {source}", .path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to write output file {}: {source}", .path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, IptallyError>;
