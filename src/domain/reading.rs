// Reading and aggregated consumption domain models
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Utility {
    Electricity,
    Gas,
    Water,
}

impl Utility {
    pub const ALL: [Utility; 3] = [Utility::Electricity, Utility::Gas, Utility::Water];

    pub fn as_str(&self) -> &'static str {
        match self {
            Utility::Electricity => "electricity",
            Utility::Gas => "gas",
            Utility::Water => "water",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Utility::Electricity => "kWh",
            Utility::Gas | Utility::Water => "m³",
        }
    }
}

impl fmt::Display for Utility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Water sub-channel. Ordered so that `Cold` sorts before `Warm`, matching the
/// lexicographic order of their display labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaterChannel {
    Cold,
    Warm,
}

impl WaterChannel {
    pub fn label(&self) -> &'static str {
        match self {
            WaterChannel::Cold => "Cold",
            WaterChannel::Warm => "Warm",
        }
    }

    pub fn from_is_warm(is_warm: bool) -> Self {
        if is_warm { WaterChannel::Warm } else { WaterChannel::Cold }
    }
}

/// Calendar day of a reading plus the optional time of day that orders the two
/// halves of a reset pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ReadingDate {
    day: String,
    time: Option<NaiveTime>,
}

const TIME_FORMATS: [&str; 3] = ["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"];

impl ReadingDate {
    pub fn new(day: impl Into<String>, time: Option<NaiveTime>) -> Self {
        Self { day: day.into(), time }
    }

    /// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM[:SS]` and `YYYY-MM-DDTHH:MM[:SS]`.
    /// A time part that does not parse is dropped; the day is kept verbatim.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.split_once(&['T', ' '][..]) {
            Some((day, time)) => {
                let time = time.trim().trim_end_matches('Z');
                let parsed = TIME_FORMATS
                    .iter()
                    .find_map(|fmt| NaiveTime::parse_from_str(time, fmt).ok());
                Self::new(day, parsed)
            }
            None => Self::new(raw, None),
        }
    }

    pub fn day(&self) -> &str {
        &self.day
    }

    pub fn time(&self) -> Option<NaiveTime> {
        self.time
    }
}

impl From<String> for ReadingDate {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<ReadingDate> for String {
    fn from(date: ReadingDate) -> Self {
        match date.time {
            Some(time) => format!("{} {}", date.day, time.format("%H:%M:%S")),
            None => date.day,
        }
    }
}

/// One cumulative meter observation as delivered by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub id: i64,
    pub date: ReadingDate,
    pub utility: Utility,
    pub identity: Option<String>,
    pub channel: Option<WaterChannel>,
    pub meter_id: Option<String>,
    pub value: f64,
    pub period: Option<String>,
    pub is_reset: bool,
    pub consumption: Option<f64>,
    pub comment: Option<String>,
}

impl Reading {
    /// Plain reading whose meter id equals its identity and whose period is taken
    /// from the date.
    pub fn new(id: i64, date: &str, utility: Utility, identity: &str, value: f64) -> Self {
        let date = ReadingDate::parse(date);
        let period = date.day().get(..7).map(str::to_string);
        Self {
            id,
            date,
            utility,
            identity: Some(identity.to_string()),
            channel: None,
            meter_id: Some(identity.to_string()),
            value,
            period,
            is_reset: false,
            consumption: None,
            comment: None,
        }
    }

    pub fn with_channel(mut self, channel: WaterChannel) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn with_meter_id(mut self, meter_id: Option<&str>) -> Self {
        self.meter_id = meter_id.map(str::to_string);
        self
    }

    pub fn with_consumption(mut self, consumption: Option<f64>) -> Self {
        self.consumption = consumption;
        self
    }

    pub fn as_reset(mut self) -> Self {
        self.is_reset = true;
        self
    }
}

/// Backend-computed consumption of one meter (or synthetic entity) in one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeterConsumption {
    pub entity_id: String,
    #[serde(default)]
    pub consumption: Option<f64>,
    #[serde(default)]
    pub segments: u32,
    #[serde(default)]
    pub channel: Option<WaterChannel>,
}

impl MeterConsumption {
    pub fn new(entity_id: &str, consumption: Option<f64>, segments: u32) -> Self {
        Self {
            entity_id: entity_id.to_string(),
            consumption,
            segments,
            channel: None,
        }
    }

    pub fn with_channel(mut self, channel: WaterChannel) -> Self {
        self.channel = Some(channel);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedPeriod {
    pub period: String,
    #[serde(default)]
    pub meters: Vec<MeterConsumption>,
}

impl AggregatedPeriod {
    pub fn new(period: &str, meters: Vec<MeterConsumption>) -> Self {
        Self {
            period: period.to_string(),
            meters,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalculationData {
    #[serde(default)]
    pub periods: Vec<AggregatedPeriod>,
}

/// Optional `YYYY-MM` bounds forwarded to the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeriodRange {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl PeriodRange {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(start) = &self.start {
            pairs.push(("start", start.clone()));
        }
        if let Some(end) = &self.end {
            pairs.push(("end", end.clone()));
        }
        pairs
    }
}

/// Scope of a backend deletion: everything on `date`, optionally narrowed to one
/// utility and further to one meter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionScope {
    pub date: String,
    #[serde(default)]
    pub utility: Option<Utility>,
    #[serde(default)]
    pub meter_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_date_parse() {
        let plain = ReadingDate::parse("2024-03-01");
        assert_eq!(plain.day(), "2024-03-01");
        assert_eq!(plain.time(), None);

        let spaced = ReadingDate::parse("2024-03-01 10:15:30");
        assert_eq!(spaced.day(), "2024-03-01");
        assert_eq!(spaced.time(), NaiveTime::from_hms_opt(10, 15, 30));

        let iso = ReadingDate::parse("2024-03-01T08:05");
        assert_eq!(iso.time(), NaiveTime::from_hms_opt(8, 5, 0));

        let garbage = ReadingDate::parse("2024-03-01 noon");
        assert_eq!(garbage.day(), "2024-03-01");
        assert_eq!(garbage.time(), None);
    }

    #[test]
    fn test_reading_date_serde() {
        let date: ReadingDate = serde_json::from_str("\"2024-03-01 10:15\"").unwrap();
        assert_eq!(serde_json::to_string(&date).unwrap(), "\"2024-03-01 10:15:00\"");
    }

    #[test]
    fn test_meter_consumption_defaults() {
        let meter: MeterConsumption =
            serde_json::from_str(r#"{"entity_id":"Kitchen","consumption":null}"#).unwrap();
        assert_eq!(meter.consumption, None);
        assert_eq!(meter.segments, 0);
        assert_eq!(meter.channel, None);
    }

    #[test]
    fn test_period_range_query_pairs() {
        let range = PeriodRange {
            start: Some("2024-01".to_string()),
            end: None,
        };
        assert_eq!(range.query_pairs(), vec![("start", "2024-01".to_string())]);
        assert!(PeriodRange::default().query_pairs().is_empty());
    }
}
