//! Entry filtering lens
//!
//! Time window and address range filters over parsed [`LogEntry`] records.
//! Both filters are pure predicates over independent fields, so they can be
//! applied in either order with the same result.

use crate::lens::address::{parse_octets, AddressRange};
use crate::lens::log::{report, DiagnosticCallback, LogDiagnostic, LogEntry};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use tracing::debug;

/// Filter settings for a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    /// Inclusive lower bound
    pub time_start: NaiveDateTime,
    /// Inclusive upper bound
    pub time_end: NaiveDateTime,
    /// Base address; `None` disables the address filter
    pub address_start: Option<Ipv4Addr>,
    /// Only meaningful together with `address_start`; absent means /0
    pub prefix_length: Option<u8>,
}

impl FilterCriteria {
    pub fn new(time_start: NaiveDateTime, time_end: NaiveDateTime) -> Self {
        Self {
            time_start,
            time_end,
            address_start: None,
            prefix_length: None,
        }
    }

    /// Build a whole-day window: from the start of `start` to the last second
    /// of `end`.
    pub fn from_dates(start: NaiveDate, end: NaiveDate) -> Self {
        let midnight = NaiveTime::default();
        let last_second = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(midnight);
        Self::new(start.and_time(midnight), end.and_time(last_second))
    }

    pub fn with_address(mut self, address_start: Ipv4Addr, prefix_length: Option<u8>) -> Self {
        self.address_start = Some(address_start);
        self.prefix_length = prefix_length;
        self
    }

    /// The effective address range, if an address filter is active
    pub fn address_range(&self) -> Option<(Ipv4Addr, u8)> {
        self.address_start
            .map(|base| (base, self.prefix_length.unwrap_or(0)))
    }
}

/// Keep entries with `start <= timestamp <= end`
pub fn filter_by_time(
    entries: Vec<LogEntry>,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Vec<LogEntry> {
    entries
        .into_iter()
        .filter(|e| e.timestamp >= start && e.timestamp <= end)
        .collect()
}

/// Keep entries whose address lies in `address_start/prefix_length`.
///
/// With no `address_start` the input is returned unchanged. A missing
/// `prefix_length` is treated as /0, which matches every well-formed
/// address. A prefix length above 32 matches nothing. Entries whose address
/// is not a dotted quad never match and are reported once each.
pub fn filter_by_address(
    entries: Vec<LogEntry>,
    address_start: Option<Ipv4Addr>,
    prefix_length: Option<u8>,
    callback: Option<DiagnosticCallback>,
) -> Vec<LogEntry> {
    let Some(base) = address_start else {
        return entries;
    };

    let range = AddressRange::new(base, prefix_length.unwrap_or(0)).ok();
    entries
        .into_iter()
        .filter(|entry| match parse_octets(&entry.address) {
            Ok(candidate) => range.is_some_and(|r| r.contains(candidate)),
            Err(_) => {
                report(
                    &callback,
                    LogDiagnostic::InvalidAddress {
                        address: entry.address.clone(),
                    },
                );
                false
            }
        })
        .collect()
}

/// Apply the time filter, then the address filter
pub fn apply(
    entries: Vec<LogEntry>,
    criteria: &FilterCriteria,
    callback: Option<DiagnosticCallback>,
) -> Vec<LogEntry> {
    let before = entries.len();
    let entries = filter_by_time(entries, criteria.time_start, criteria.time_end);
    let in_window = entries.len();
    let entries = filter_by_address(
        entries,
        criteria.address_start,
        criteria.prefix_length,
        callback,
    );
    debug!(
        "filtered {} entries: {} in time window, {} in address range",
        before,
        in_window,
        entries.len()
    );
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn entry(address: &str, ts: &str) -> LogEntry {
        LogEntry::new(
            address,
            NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S").unwrap(),
        )
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> Vec<LogEntry> {
        vec![
            entry("10.0.0.1", "2024-01-01 00:00:00"),
            entry("10.0.0.5", "2024-01-01 10:00:00"),
            entry("10.0.1.5", "2024-01-01 23:59:59"),
            entry("192.168.1.1", "2024-01-02 00:00:00"),
            entry("10.0.0.9", "2023-12-31 23:59:59"),
        ]
    }

    fn addresses(entries: &[LogEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.address.as_str()).collect()
    }

    #[test]
    fn test_filter_by_time_inclusive() {
        let criteria = FilterCriteria::from_dates(date(2024, 1, 1), date(2024, 1, 1));
        let kept = filter_by_time(sample(), criteria.time_start, criteria.time_end);
        assert_eq!(addresses(&kept), vec!["10.0.0.1", "10.0.0.5", "10.0.1.5"]);
    }

    #[test]
    fn test_filter_by_time_exact_bounds() {
        let start = entry("x", "2024-01-01 10:00:00").timestamp;
        let kept = filter_by_time(sample(), start, start);
        assert_eq!(addresses(&kept), vec!["10.0.0.5"]);
    }

    #[test]
    fn test_filter_by_time_reversed_window() {
        let criteria = FilterCriteria::from_dates(date(2024, 1, 2), date(2024, 1, 1));
        assert!(filter_by_time(sample(), criteria.time_start, criteria.time_end).is_empty());
    }

    #[test]
    fn test_filter_by_address_disabled() {
        let kept = filter_by_address(sample(), None, Some(24), None);
        assert_eq!(kept.len(), 5);
    }

    #[test]
    fn test_filter_by_address_prefix() {
        let base = Ipv4Addr::new(10, 0, 0, 0);
        let kept = filter_by_address(sample(), Some(base), Some(24), None);
        assert_eq!(addresses(&kept), vec!["10.0.0.1", "10.0.0.5", "10.0.0.9"]);
    }

    #[test]
    fn test_filter_by_address_without_prefix_matches_all() {
        let base = Ipv4Addr::new(10, 0, 0, 0);
        let kept = filter_by_address(sample(), Some(base), None, None);
        assert_eq!(kept.len(), 5);
    }

    #[test]
    fn test_filter_by_address_out_of_range_prefix() {
        let base = Ipv4Addr::new(10, 0, 0, 1);
        assert!(filter_by_address(sample(), Some(base), Some(40), None).is_empty());
    }

    #[test]
    fn test_filter_by_address_reports_bad_addresses() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callback: DiagnosticCallback =
            Arc::new(move |d: LogDiagnostic| sink.lock().unwrap().push(d));

        let entries = vec![
            entry("10.0.0.1", "2024-01-01 00:00:00"),
            entry("10.0.0.300", "2024-01-01 00:00:00"),
            entry("localhost", "2024-01-01 00:00:00"),
        ];
        let kept = filter_by_address(entries, Some(Ipv4Addr::UNSPECIFIED), None, Some(callback));

        assert_eq!(addresses(&kept), vec!["10.0.0.1"]);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                LogDiagnostic::InvalidAddress {
                    address: "10.0.0.300".to_string()
                },
                LogDiagnostic::InvalidAddress {
                    address: "localhost".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_filters_commute() {
        let criteria = FilterCriteria::from_dates(date(2024, 1, 1), date(2024, 1, 1))
            .with_address(Ipv4Addr::new(10, 0, 0, 0), Some(24));

        let time_first = filter_by_address(
            filter_by_time(sample(), criteria.time_start, criteria.time_end),
            criteria.address_start,
            criteria.prefix_length,
            None,
        );
        let address_first = filter_by_time(
            filter_by_address(sample(), criteria.address_start, criteria.prefix_length, None),
            criteria.time_start,
            criteria.time_end,
        );

        assert_eq!(time_first, address_first);
        assert_eq!(addresses(&time_first), vec!["10.0.0.1", "10.0.0.5"]);
    }

    #[test]
    fn test_apply_and_address_range() {
        let criteria = FilterCriteria::from_dates(date(2023, 12, 31), date(2024, 1, 2))
            .with_address(Ipv4Addr::new(192, 168, 0, 0), None);
        assert_eq!(
            criteria.address_range(),
            Some((Ipv4Addr::new(192, 168, 0, 0), 0))
        );
        assert_eq!(apply(sample(), &criteria, None).len(), 5);

        let criteria = FilterCriteria::from_dates(date(2023, 12, 31), date(2024, 1, 2));
        assert_eq!(criteria.address_range(), None);
    }
}
