// Chart-ready series: transformed points, raw values and segment styling
use super::reading::Utility;
use super::series::{Segment, Series, SeriesSet, annotate_gaps};
use super::transform::TransformSettings;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub period: String,
    /// Value shown in tooltips and labels.
    pub raw: f64,
    /// Value plotted on the shared axis.
    pub display: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub id: String,
    pub name: String,
    pub color: Option<String>,
    pub utility: Utility,
    pub unit: String,
    pub points: Vec<ChartPoint>,
    pub segments: Vec<Segment>,
}

impl ChartSeries {
    fn from_series(series: &Series, transform: &TransformSettings) -> Self {
        let key = series.key;
        let axis = transform.for_utility(key.utility());
        let points: Vec<ChartPoint> = series
            .values
            .iter()
            .map(|(period, value)| {
                let value = axis.apply(*value);
                ChartPoint {
                    period: period.clone(),
                    raw: value.raw,
                    display: value.display,
                }
            })
            .collect();
        let segments = annotate_gaps(&series.periods());

        Self {
            id: key.id().to_string(),
            name: key.name().to_string(),
            color: Some(key.color().to_string()),
            utility: key.utility(),
            unit: key.utility().unit().to_string(),
            points,
            segments,
        }
    }

    /// Values aligned to the chart axis, `None` where this series has no point.
    pub fn aligned(&self, axis: &[String]) -> Vec<Option<f64>> {
        axis.iter()
            .map(|period| {
                self.points
                    .iter()
                    .find(|p| &p.period == period)
                    .map(|p| p.display)
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub axis: Vec<String>,
    pub series: Vec<ChartSeries>,
    pub transform: TransformSettings,
    /// Hide the primary axis scale when true.
    pub transform_active: bool,
    pub empty: bool,
}

impl ChartData {
    pub fn build(set: &SeriesSet, transform: &TransformSettings) -> Self {
        let series: Vec<ChartSeries> = set
            .series
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| ChartSeries::from_series(s, transform))
            .collect();

        Self {
            axis: set.axis.clone(),
            empty: series.is_empty(),
            series,
            transform: *transform,
            transform_active: transform.is_active(),
        }
    }

    pub fn series(&self, id: &str) -> Option<&ChartSeries> {
        self.series.iter().find(|s| s.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reading::{AggregatedPeriod, CalculationData, MeterConsumption, WaterChannel};
    use crate::domain::series::build_series;
    use std::collections::BTreeMap;

    fn inputs() -> BTreeMap<Utility, CalculationData> {
        let mut inputs = BTreeMap::new();
        inputs.insert(
            Utility::Electricity,
            CalculationData {
                periods: vec![
                    AggregatedPeriod::new("2024-01", vec![MeterConsumption::new("Main", Some(100.0), 1)]),
                    AggregatedPeriod::new("2024-03", vec![MeterConsumption::new("Main", Some(120.0), 1)]),
                    AggregatedPeriod::new("2024-04", vec![MeterConsumption::new("Main", Some(90.0), 2)]),
                ],
            },
        );
        inputs.insert(
            Utility::Water,
            CalculationData {
                periods: vec![AggregatedPeriod::new(
                    "2024-02",
                    vec![MeterConsumption::new("Bath", Some(3.0), 1).with_channel(WaterChannel::Warm)],
                )],
            },
        );
        inputs
    }

    #[test]
    fn test_chart_points_keep_raw_values() {
        let transform = TransformSettings {
            electricity_scale: 0.1,
            water_scale: 0.0,
            water_offset: 5.0,
            ..TransformSettings::default()
        };
        let chart = ChartData::build(&build_series(&inputs()), &transform);

        assert!(chart.transform_active);
        assert!(!chart.empty);
        assert_eq!(chart.axis, vec!["2024-01", "2024-02", "2024-03", "2024-04"]);

        let electricity = chart.series("electricity").unwrap();
        assert_eq!(electricity.points[0].raw, 100.0);
        assert!((electricity.points[0].display - 10.0).abs() < 1e-9);
        let dashed: Vec<bool> = electricity.segments.iter().map(|s| s.dashed).collect();
        assert_eq!(dashed, vec![true, false]);

        let warm = chart.series("water_warm").unwrap();
        assert_eq!(warm.points[0].raw, 3.0);
        assert_eq!(warm.points[0].display, 5.0);
        assert!(chart.series("water_cold").is_none());
        assert!(chart.series("gas").is_none());
    }

    #[test]
    fn test_aligned_values() {
        let chart = ChartData::build(&build_series(&inputs()), &TransformSettings::default());
        assert!(!chart.transform_active);
        let total = chart.series("water_total").unwrap();
        assert_eq!(total.aligned(&chart.axis), vec![None, Some(3.0), None, None]);
    }

    #[test]
    fn test_empty_chart() {
        let chart = ChartData::build(&build_series(&BTreeMap::new()), &TransformSettings::default());
        assert!(chart.empty);
        assert!(chart.axis.is_empty());
    }
}
