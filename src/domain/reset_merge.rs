// Merging of paired meter-reset readings into display rows
use super::meter_name::{self, MeterIdentity};
use super::period::{HasPeriod, PeriodGroups};
use super::reading::{DeletionScope, Reading, Utility, WaterChannel};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

pub const PLACEHOLDER: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResetValues {
    /// Final value of the replaced meter.
    pub old: f64,
    /// Starting value of the new meter.
    pub new: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayRow {
    pub date: String,
    pub period: Option<String>,
    pub utility: Utility,
    pub identity: MeterIdentity,
    pub meter_id: Option<String>,
    pub value: f64,
    pub display_value: String,
    pub is_reset: bool,
    pub reset: Option<ResetValues>,
    /// Reset metadata (identity or meter id) was missing, so the row was never paired.
    pub incomplete: bool,
    pub consumption: Option<f64>,
    pub consumption_display: String,
    pub comment: Option<String>,
    pub source_ids: Vec<i64>,
}

impl DisplayRow {
    pub fn is_paired(&self) -> bool {
        self.reset.is_some()
    }

    pub fn deletion_scope(&self) -> DeletionScope {
        DeletionScope {
            date: self.date.clone(),
            utility: Some(self.utility),
            meter_id: self.meter_id.clone(),
        }
    }

    fn single(reading: &Reading) -> Self {
        let identity = meter_name::resolve(reading);
        Self {
            date: reading.date.day().to_string(),
            period: reading.period.clone(),
            utility: reading.utility,
            incomplete: reading.is_reset && !has_pairing_metadata(reading),
            identity,
            meter_id: reading.meter_id.clone(),
            value: reading.value,
            display_value: format_value(reading.value, reading.utility),
            is_reset: reading.is_reset,
            reset: None,
            consumption: reading.consumption,
            consumption_display: format_optional(reading.consumption),
            comment: reading.comment.clone(),
            source_ids: vec![reading.id],
        }
    }

    fn merged(old: &Reading, new: &Reading) -> Self {
        let unit = old.utility.unit();
        let consumption = old.consumption.or(new.consumption);
        Self {
            date: old.date.day().to_string(),
            period: old.period.clone().or_else(|| new.period.clone()),
            utility: old.utility,
            identity: meter_name::resolve(old),
            meter_id: old.meter_id.clone(),
            value: new.value,
            display_value: format!("{:.2} → {:.2} {}", old.value, new.value, unit),
            is_reset: true,
            reset: Some(ResetValues {
                old: old.value,
                new: new.value,
            }),
            incomplete: false,
            consumption,
            consumption_display: format_optional(consumption),
            comment: old.comment.clone().or_else(|| new.comment.clone()),
            source_ids: vec![old.id, new.id],
        }
    }
}

impl HasPeriod for DisplayRow {
    fn period(&self) -> Option<&str> {
        self.period.as_deref()
    }
}

pub fn format_value(value: f64, utility: Utility) -> String {
    format!("{:.2} {}", value, utility.unit())
}

pub fn format_optional(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => PLACEHOLDER.to_string(),
    }
}

/// Readings that may form a reset pair share all of these.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct PairKey<'a> {
    utility: Utility,
    day: &'a str,
    identity: &'a str,
    meter_id: &'a str,
    channel: Option<WaterChannel>,
}

impl<'a> PairKey<'a> {
    fn of(reading: &'a Reading) -> Option<Self> {
        Some(Self {
            utility: reading.utility,
            day: reading.date.day(),
            identity: reading.identity.as_deref().map(str::trim).filter(|i| !i.is_empty())?,
            meter_id: reading.meter_id.as_deref().map(str::trim).filter(|m| !m.is_empty())?,
            channel: reading.channel,
        })
    }
}

fn has_pairing_metadata(reading: &Reading) -> bool {
    PairKey::of(reading).is_some()
}

/// Order inside a reset pair: readings without a time come first, then by time of
/// day, then by lower id. The first of two is the old meter's final value.
fn reset_order(a: &Reading, b: &Reading) -> Ordering {
    a.date
        .time()
        .cmp(&b.date.time())
        .then_with(|| a.id.cmp(&b.id))
}

/// Newest day first, then by name, channel and first source id.
fn display_order(a: &DisplayRow, b: &DisplayRow) -> Ordering {
    b.date
        .cmp(&a.date)
        .then_with(|| a.identity.name.cmp(&b.identity.name))
        .then_with(|| a.identity.channel.cmp(&b.identity.channel))
        .then_with(|| a.source_ids.cmp(&b.source_ids))
        .then_with(|| a.value.total_cmp(&b.value))
}

/// Turns one utility's readings into display rows, collapsing each reset pair into a
/// single `old → new` row. The result does not depend on input order and every
/// reading ends up in exactly one row.
pub fn merge_reset_pairs(readings: &[Reading]) -> Vec<DisplayRow> {
    let mut rows = Vec::with_capacity(readings.len());
    let mut resets: BTreeMap<PairKey<'_>, Vec<&Reading>> = BTreeMap::new();

    for reading in readings {
        if !reading.is_reset {
            rows.push(DisplayRow::single(reading));
            continue;
        }

        match PairKey::of(reading) {
            Some(key) => resets.entry(key).or_default().push(reading),
            None => {
                tracing::warn!(
                    "Reset reading {} on {} lacks identity or meter id, rendering unpaired",
                    reading.id,
                    reading.date.day()
                );
                rows.push(DisplayRow::single(reading));
            }
        }
    }

    for (key, mut group) in resets {
        group.sort_by(|a, b| reset_order(a, b));
        for chunk in group.chunks(2) {
            match chunk {
                [old, new] => rows.push(DisplayRow::merged(old, new)),
                [lone] => {
                    tracing::debug!(
                        "Unpaired reset reading {} for {} on {}",
                        lone.id,
                        key.identity,
                        key.day
                    );
                    rows.push(DisplayRow::single(lone));
                }
                _ => {}
            }
        }
    }

    rows.sort_by(display_order);
    rows
}

#[derive(Debug, Clone, Serialize)]
pub struct PeriodRows {
    pub period: String,
    pub rows: Vec<DisplayRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReadingsTable {
    pub utility: Utility,
    pub unit: &'static str,
    pub periods: Vec<PeriodRows>,
}

impl ReadingsTable {
    pub fn build(utility: Utility, readings: &[Reading]) -> Self {
        let periods = PeriodGroups::group(merge_reset_pairs(readings))
            .descending()
            .into_iter()
            .map(|(period, rows)| PeriodRows { period, rows })
            .collect();

        Self {
            utility,
            unit: utility.unit(),
            periods,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.periods.iter().map(|p| p.rows.len()).sum()
    }
}
