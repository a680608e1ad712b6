// Consumption series per utility and gap annotation between plotted points
use super::period::month_distance;
use super::reading::{CalculationData, MeterConsumption, Utility, WaterChannel};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesKey {
    Electricity,
    Gas,
    WaterTotal,
    WaterWarm,
    WaterCold,
}

impl SeriesKey {
    pub const ALL: [SeriesKey; 5] = [
        SeriesKey::Electricity,
        SeriesKey::Gas,
        SeriesKey::WaterTotal,
        SeriesKey::WaterWarm,
        SeriesKey::WaterCold,
    ];

    pub fn utility(&self) -> Utility {
        match self {
            SeriesKey::Electricity => Utility::Electricity,
            SeriesKey::Gas => Utility::Gas,
            SeriesKey::WaterTotal | SeriesKey::WaterWarm | SeriesKey::WaterCold => Utility::Water,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            SeriesKey::Electricity => "electricity",
            SeriesKey::Gas => "gas",
            SeriesKey::WaterTotal => "water_total",
            SeriesKey::WaterWarm => "water_warm",
            SeriesKey::WaterCold => "water_cold",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SeriesKey::Electricity => "Electricity",
            SeriesKey::Gas => "Gas",
            SeriesKey::WaterTotal => "Water (Total)",
            SeriesKey::WaterWarm => "Water (Warm)",
            SeriesKey::WaterCold => "Water (Cold)",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            SeriesKey::Electricity => "#f59e0b",
            SeriesKey::Gas => "#10b981",
            SeriesKey::WaterTotal => "#3b82f6",
            SeriesKey::WaterWarm => "#ef4444",
            SeriesKey::WaterCold => "#06b6d4",
        }
    }

    fn includes(&self, meter: &MeterConsumption) -> bool {
        match self {
            SeriesKey::WaterWarm => meter.channel == Some(WaterChannel::Warm),
            SeriesKey::WaterCold => meter.channel == Some(WaterChannel::Cold),
            _ => true,
        }
    }
}

/// Summed consumption per period. A period with no non-null contribution has no
/// entry at all, which is different from a zero entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub key: SeriesKey,
    pub values: BTreeMap<String, f64>,
}

impl Series {
    fn build(key: SeriesKey, data: &CalculationData) -> Self {
        let mut values: BTreeMap<String, f64> = BTreeMap::new();
        for aggregated in &data.periods {
            let contributions: Vec<f64> = aggregated
                .meters
                .iter()
                .filter(|m| key.includes(m))
                .filter_map(|m| m.consumption)
                .collect();
            if contributions.is_empty() {
                continue;
            }
            *values.entry(aggregated.period.clone()).or_insert(0.0) +=
                contributions.iter().sum::<f64>();
        }
        Self { key, values }
    }

    /// Plotted periods, oldest first.
    pub fn periods(&self) -> Vec<&str> {
        self.values.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSet {
    /// Union of all plotted periods, oldest first.
    pub axis: Vec<String>,
    pub series: Vec<Series>,
}

impl SeriesSet {
    pub fn get(&self, key: SeriesKey) -> Option<&Series> {
        self.series.iter().find(|s| s.key == key)
    }
}

/// Builds every series from the per-utility calculation data; utilities missing from
/// `data` produce empty series.
pub fn build_series(data: &BTreeMap<Utility, CalculationData>) -> SeriesSet {
    let empty = CalculationData::default();
    let series: Vec<Series> = SeriesKey::ALL
        .iter()
        .map(|key| Series::build(*key, data.get(&key.utility()).unwrap_or(&empty)))
        .collect();

    let axis: BTreeSet<&String> = series.iter().flat_map(|s| s.values.keys()).collect();
    let axis = axis.into_iter().cloned().collect();

    SeriesSet { axis, series }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub from: String,
    pub to: String,
    /// `None` when either label is not a valid `YYYY-MM` period.
    pub months: Option<u32>,
    pub dashed: bool,
}

/// One segment per consecutive pair of plotted periods. Segments spanning more than
/// one month, or between unparseable labels, are dashed.
pub fn annotate_gaps<S: AsRef<str>>(periods: &[S]) -> Vec<Segment> {
    periods
        .windows(2)
        .map(|pair| {
            let (from, to) = (pair[0].as_ref(), pair[1].as_ref());
            let months = month_distance(from, to);
            Segment {
                from: from.to_string(),
                to: to.to_string(),
                months,
                dashed: months.is_none_or(|m| m > 1),
            }
        })
        .collect()
}
