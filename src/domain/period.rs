// Period grouping and month arithmetic for `YYYY-MM` labels
use super::reading::{AggregatedPeriod, Reading};
use std::collections::BTreeMap;

pub const UNKNOWN_PERIOD: &str = "Unknown";

pub trait HasPeriod {
    fn period(&self) -> Option<&str>;
}

impl<T: HasPeriod> HasPeriod for &T {
    fn period(&self) -> Option<&str> {
        (**self).period()
    }
}

impl HasPeriod for Reading {
    fn period(&self) -> Option<&str> {
        self.period.as_deref()
    }
}

impl HasPeriod for AggregatedPeriod {
    fn period(&self) -> Option<&str> {
        Some(&self.period)
    }
}

/// Items bucketed by their period label. Labels are compared as strings, which is
/// chronological for `YYYY-MM`. The `Unknown` bucket is kept apart and always
/// yielded last.
#[derive(Debug, Clone)]
pub struct PeriodGroups<T> {
    known: BTreeMap<String, Vec<T>>,
    unknown: Vec<T>,
}

impl<T> PeriodGroups<T> {
    pub fn group<I>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: HasPeriod,
    {
        let mut known: BTreeMap<String, Vec<T>> = BTreeMap::new();
        let mut unknown = Vec::new();

        for item in items {
            match item.period().filter(|p| !p.is_empty()) {
                Some(period) => known.entry(period.to_string()).or_default().push(item),
                None => unknown.push(item),
            }
        }

        Self { known, unknown }
    }

    pub fn len(&self) -> usize {
        self.known.len() + usize::from(!self.unknown.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Newest first, for tables.
    pub fn descending(self) -> Vec<(String, Vec<T>)> {
        let mut groups: Vec<_> = self.known.into_iter().rev().collect();
        if !self.unknown.is_empty() {
            groups.push((UNKNOWN_PERIOD.to_string(), self.unknown));
        }
        groups
    }

    /// Oldest first, for charts.
    pub fn ascending(self) -> Vec<(String, Vec<T>)> {
        let mut groups: Vec<_> = self.known.into_iter().collect();
        if !self.unknown.is_empty() {
            groups.push((UNKNOWN_PERIOD.to_string(), self.unknown));
        }
        groups
    }
}

fn parse_period(period: &str) -> Option<(i32, i32)> {
    let (year, month) = period.split_once('-')?;
    if year.len() != 4 || month.len() != 2 {
        return None;
    }
    let year = year.parse::<i32>().ok()?;
    let month = month.parse::<i32>().ok()?;
    (1..=12).contains(&month).then_some((year, month))
}

pub fn is_valid_period(period: &str) -> bool {
    parse_period(period).is_some()
}

/// Whole months between two `YYYY-MM` labels, or `None` if either is malformed.
pub fn month_distance(a: &str, b: &str) -> Option<u32> {
    let (y1, m1) = parse_period(a)?;
    let (y2, m2) = parse_period(b)?;
    Some(((y2 - y1) * 12 + (m2 - m1)).unsigned_abs())
}
