//! Validity windows and date parsing
//!
//! Reference files express windows in different ways: ISO-8601 datetimes
//! (Club Log), bare dates (prefix list) or nothing at all (CTY). Everything is
//! reduced to a compact `YYYYMMDD` date and compared at day resolution.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A start/end date pair during which a record is authoritative.
/// `None` on either side means unbounded. Both ends are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Validity {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl Validity {
    /// Unbounded on both sides
    pub const ALWAYS: Validity = Validity { start: None, end: None };

    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// Build a window from two textual bounds, `*` or empty meaning unbounded
    pub fn parse(start: &str, end: &str) -> Result<Self, String> {
        Ok(Self {
            start: parse_bound(start)?,
            end: parse_bound(end)?,
        })
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Check whether `date` falls inside this window
    pub fn contains(&self, date: NaiveDate) -> bool {
        if let Some(start) = self.start {
            if date < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if date > end {
                return false;
            }
        }
        true
    }

    /// Check whether two windows share at least one day
    pub fn overlaps(&self, other: &Validity) -> bool {
        let starts_before_other_ends = match (self.start, other.end) {
            (Some(s), Some(e)) => s <= e,
            _ => true,
        };
        let ends_after_other_starts = match (self.end, other.start) {
            (Some(e), Some(s)) => e >= s,
            _ => true,
        };
        starts_before_other_ends && ends_after_other_starts
    }
}

impl fmt::Display for Validity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.start {
            Some(d) => write!(f, "{}", d.format("%Y-%m-%d"))?,
            None => write!(f, "*")?,
        }
        write!(f, "..")?;
        match self.end {
            Some(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            None => write!(f, "*"),
        }
    }
}

/// Reduce an ISO-8601 date or datetime to a compact `YYYYMMDD` string.
///
/// Accepts:
///   - `2003-07-30T00:00:00+00:00` → `20030730`
///   - `2003-07-30` → `20030730`
///   - `20030730` → `20030730`
///
/// Returns `None` for `*`, empty input, or anything that is not a valid
/// calendar date.
pub fn compact_date(text: &str) -> Option<String> {
    let clean = text.trim();
    if clean.is_empty() || clean == "*" {
        return None;
    }

    // Drop the time part of a datetime
    let date_part = clean.split(|c| c == 'T' || c == ' ').next().unwrap_or(clean);
    let digits: String = date_part.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() != 8 {
        return None;
    }
    if !is_valid_compact_date(&digits) {
        return None;
    }
    Some(digits)
}

/// Parse one window bound. `*` or empty → unbounded.
pub fn parse_bound(text: &str) -> Result<Option<NaiveDate>, String> {
    let clean = text.trim();
    if clean.is_empty() || clean == "*" {
        return Ok(None);
    }
    let compact = compact_date(clean).ok_or_else(|| format!("unparsable date '{}'", clean))?;
    NaiveDate::parse_from_str(&compact, "%Y%m%d")
        .map(Some)
        .map_err(|e| format!("unparsable date '{}': {}", clean, e))
}

/// Validate a compact date (YYYYMMDD) including month lengths
fn is_valid_compact_date(date_str: &str) -> bool {
    if date_str.len() != 8 || !date_str.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    NaiveDate::parse_from_str(date_str, "%Y%m%d").is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_compact_date_formats() {
        assert_eq!(compact_date("2003-07-30T00:00:00+00:00"), Some("20030730".to_string()));
        assert_eq!(compact_date("1995-12-31"), Some("19951231".to_string()));
        assert_eq!(compact_date("19950501"), Some("19950501".to_string()));
        assert_eq!(compact_date("*"), None);
        assert_eq!(compact_date(""), None);
        assert_eq!(compact_date("2003-02-30"), None);
        assert_eq!(compact_date("garbage"), None);
    }

    #[test]
    fn test_parse_bound() {
        assert_eq!(parse_bound("*"), Ok(None));
        assert_eq!(parse_bound("2013-01-01T00:00:00+00:00"), Ok(Some(d(2013, 1, 1))));
        assert!(parse_bound("2013-13-01").is_err());
    }

    #[test]
    fn test_contains_is_inclusive() {
        let window = Validity::new(Some(d(1995, 5, 1)), Some(d(1995, 12, 31)));
        assert!(window.contains(d(1995, 5, 1)));
        assert!(window.contains(d(1995, 8, 1)));
        assert!(window.contains(d(1995, 12, 31)));
        assert!(!window.contains(d(1996, 1, 15)));
        assert!(!window.contains(d(1995, 4, 30)));
        assert!(Validity::ALWAYS.contains(d(1800, 1, 1)));
    }

    #[test]
    fn test_open_ended_windows() {
        let from = Validity::new(Some(d(2000, 1, 1)), None);
        assert!(from.contains(d(2999, 1, 1)));
        assert!(!from.contains(d(1999, 12, 31)));

        let until = Validity::new(None, Some(d(2000, 1, 1)));
        assert!(until.contains(d(1900, 1, 1)));
        assert!(!until.contains(d(2000, 1, 2)));
    }

    #[test]
    fn test_overlaps() {
        let a = Validity::new(Some(d(1990, 1, 1)), Some(d(1995, 12, 31)));
        let b = Validity::new(Some(d(1996, 1, 1)), None);
        let c = Validity::new(Some(d(1995, 6, 1)), Some(d(1997, 1, 1)));
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(b.overlaps(&c));
        assert!(Validity::ALWAYS.overlaps(&a));
    }

    #[test]
    fn test_display() {
        let window = Validity::new(Some(d(1900, 1, 1)), Some(d(9999, 12, 31)));
        assert_eq!(window.to_string(), "1900-01-01..9999-12-31");
        assert_eq!(Validity::ALWAYS.to_string(), "*..*");
    }
}
