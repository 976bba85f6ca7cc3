//! Request counting and output lens
//!
//! Aggregates filtered entries into a [`CountTable`] keyed by address in
//! first-seen order, and writes it out in one of the [`OutputFormat`]s.

use crate::error::{IptallyError, Result};
use crate::lens::log::LogEntry;
use crate::lens::utils::OutputFormat;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// One row of the count table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "display", derive(tabled::Tabled))]
pub struct AddressCount {
    pub address: String,
    pub count: u64,
}

/// Requests per address, iterated in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CountTable {
    counts: IndexMap<String, u64>,
}

impl CountTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, address: &str) {
        match self.counts.get_mut(address) {
            Some(count) => *count += 1,
            None => {
                self.counts.insert(address.to_string(), 1);
            }
        }
    }

    pub fn get(&self, address: &str) -> Option<u64> {
        self.counts.get(address).copied()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(a, c)| (a.as_str(), *c))
    }

    pub fn rows(&self) -> Vec<AddressCount> {
        self.iter()
            .map(|(address, count)| AddressCount {
                address: address.to_string(),
                count,
            })
            .collect()
    }
}

/// Count entries per address. Addresses without entries are absent.
pub fn count_by_address(entries: &[LogEntry]) -> CountTable {
    let mut table = CountTable::new();
    for entry in entries {
        table.increment(&entry.address);
    }
    table
}

/// Render the table in the given format into any writer
pub fn write_to<W: Write>(table: &CountTable, writer: &mut W, format: OutputFormat) -> Result<()> {
    let io_err = |source: std::io::Error| IptallyError::FileWrite {
        path: Default::default(),
        source,
    };
    let json_err = |e: serde_json::Error| {
        if e.is_io() {
            io_err(e.into())
        } else {
            IptallyError::Serialize(e)
        }
    };

    match format {
        OutputFormat::Text => {
            for (address, count) in table.iter() {
                writeln!(writer, "{}: {}", address, count).map_err(io_err)?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *writer, &table.rows()).map_err(json_err)?;
            writeln!(writer).map_err(io_err)?;
        }
        OutputFormat::JsonLine => {
            for row in table.rows() {
                serde_json::to_writer(&mut *writer, &row).map_err(json_err)?;
                writeln!(writer).map_err(io_err)?;
            }
        }
        OutputFormat::Psv => {
            writeln!(writer, "address|count").map_err(io_err)?;
            for (address, count) in table.iter() {
                writeln!(writer, "{}|{}", address, count).map_err(io_err)?;
            }
        }
    }
    Ok(())
}

/// Create (or truncate) `path` and write the table to it.
///
/// The file handle is dropped on every return path; buffered data is flushed
/// before success is reported.
pub fn write_counts(table: &CountTable, path: &Path, format: OutputFormat) -> Result<()> {
    let with_path = |e: IptallyError| match e {
        IptallyError::FileWrite { source, .. } => IptallyError::FileWrite {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    };

    let file = File::create(path).map_err(|source| IptallyError::FileWrite {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = BufWriter::new(file);
    write_to(table, &mut writer, format).map_err(with_path)?;
    writer.flush().map_err(|source| IptallyError::FileWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse text-format output back into a table
pub fn parse_count_lines(text: &str) -> Result<CountTable> {
    let mut table = CountTable::new();
    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        let (address, count) = line
            .rsplit_once(": ")
            .ok_or_else(|| IptallyError::Argument(format!("invalid count line: {}", line)))?;
        let count = count
            .trim()
            .parse::<u64>()
            .map_err(|_| IptallyError::Argument(format!("invalid count in line: {}", line)))?;
        table.counts.insert(address.to_string(), count);
    }
    Ok(table)
}
