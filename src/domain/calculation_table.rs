// Cross-tabulated consumption table: one row per period, one column per meter
use super::meter_name::legacy_label;
use super::period::PeriodGroups;
use super::reading::{AggregatedPeriod, CalculationData, Utility, WaterChannel};
use super::reset_merge::format_optional;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ColumnKey {
    pub entity_id: String,
    pub channel: Option<WaterChannel>,
}

impl ColumnKey {
    pub fn label(&self) -> String {
        legacy_label(&self.entity_id, self.channel)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub key: ColumnKey,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cell {
    pub consumption: Option<f64>,
    /// `None` when the meter is absent from the period altogether.
    pub segments: Option<u32>,
    pub display: String,
}

impl Cell {
    fn empty() -> Self {
        Self {
            consumption: None,
            segments: None,
            display: format_optional(None),
        }
    }

    fn new(consumption: Option<f64>, segments: u32) -> Self {
        Self {
            consumption,
            segments: Some(segments),
            display: format_optional(consumption),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub period: String,
    pub cells: Vec<Cell>,
    pub total: f64,
    pub total_display: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculationTable {
    pub utility: Utility,
    pub unit: &'static str,
    pub columns: Vec<Column>,
    pub rows: Vec<TableRow>,
}

impl CalculationTable {
    pub fn row(&self, period: &str) -> Option<&TableRow> {
        self.rows.iter().find(|r| r.period == period)
    }

    pub fn cell(&self, period: &str, label: &str) -> Option<&Cell> {
        let idx = self.columns.iter().position(|c| c.label == label)?;
        self.row(period)?.cells.get(idx)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CalculationView {
    NoData { utility: Utility },
    Table(CalculationTable),
}

impl CalculationView {
    pub fn is_no_data(&self) -> bool {
        matches!(self, CalculationView::NoData { .. })
    }
}

fn column_key(entity_id: &str, channel: Option<WaterChannel>) -> ColumnKey {
    ColumnKey {
        entity_id: entity_id.to_string(),
        channel,
    }
}

/// Sums duplicate entries for the same column inside one period.
fn collect_cells(periods: &[&AggregatedPeriod]) -> HashMap<ColumnKey, Cell> {
    let mut cells: HashMap<ColumnKey, Cell> = HashMap::new();
    for aggregated in periods {
        for meter in &aggregated.meters {
            let key = column_key(&meter.entity_id, meter.channel);
            match cells.get_mut(&key) {
                Some(cell) => {
                    let consumption = match (cell.consumption, meter.consumption) {
                        (Some(a), Some(b)) => Some(a + b),
                        (a, b) => a.or(b),
                    };
                    *cell = Cell::new(consumption, cell.segments.unwrap_or(0) + meter.segments);
                }
                None => {
                    cells.insert(key, Cell::new(meter.consumption, meter.segments));
                }
            }
        }
    }
    cells
}

pub fn build_calculation_table(utility: Utility, data: &CalculationData) -> CalculationView {
    if data.periods.is_empty() {
        return CalculationView::NoData { utility };
    }

    let keys: BTreeSet<ColumnKey> = data
        .periods
        .iter()
        .flat_map(|p| p.meters.iter())
        .map(|m| column_key(&m.entity_id, m.channel))
        .collect();
    let mut columns: Vec<Column> = keys
        .into_iter()
        .map(|key| Column {
            label: key.label(),
            key,
        })
        .collect();
    columns.sort_by(|a, b| a.label.cmp(&b.label).then_with(|| a.key.cmp(&b.key)));

    let rows = PeriodGroups::group(data.periods.iter())
        .descending()
        .into_iter()
        .map(|(period, aggregated)| {
            let mut cells_by_key = collect_cells(&aggregated);
            let cells: Vec<Cell> = columns
                .iter()
                .map(|c| cells_by_key.remove(&c.key).unwrap_or_else(Cell::empty))
                .collect();
            let total: f64 = cells.iter().filter_map(|c| c.consumption).sum();
            TableRow {
                period,
                cells,
                total,
                total_display: format!("{:.2}", total),
            }
        })
        .collect();

    CalculationView::Table(CalculationTable {
        utility,
        unit: utility.unit(),
        columns,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reading::MeterConsumption;

    fn table(view: CalculationView) -> CalculationTable {
        match view {
            CalculationView::Table(table) => table,
            CalculationView::NoData { .. } => panic!("expected a table"),
        }
    }

    #[test]
    fn test_totals_skip_null_consumption() {
        let data = CalculationData {
            periods: vec![AggregatedPeriod::new(
                "2024-01",
                vec![
                    MeterConsumption::new("A", Some(10.0), 1),
                    MeterConsumption::new("B", None, 0),
                ],
            )],
        };

        let table = table(build_calculation_table(Utility::Electricity, &data));
        let row = table.row("2024-01").unwrap();
        assert_eq!(row.total, 10.0);
        assert_eq!(row.total_display, "10.00");
        assert_eq!(table.cell("2024-01", "A").unwrap().display, "10.00");
        assert_eq!(table.cell("2024-01", "B").unwrap().display, "-");
    }

    #[test]
    fn test_empty_input_is_no_data() {
        let view = build_calculation_table(Utility::Gas, &CalculationData::default());
        assert!(view.is_no_data());
        assert_eq!(view, CalculationView::NoData { utility: Utility::Gas });
    }

    #[test]
    fn test_columns_are_union_sorted() {
        let data = CalculationData {
            periods: vec![
                AggregatedPeriod::new("2024-01", vec![MeterConsumption::new("Zeta", Some(1.0), 1)]),
                AggregatedPeriod::new("2024-02", vec![MeterConsumption::new("Alpha", Some(2.0), 2)]),
                AggregatedPeriod::new("2024-03", vec![]),
            ],
        };

        let table = table(build_calculation_table(Utility::Electricity, &data));
        let labels: Vec<_> = table.columns.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["Alpha", "Zeta"]);
        let periods: Vec<_> = table.rows.iter().map(|r| r.period.as_str()).collect();
        assert_eq!(periods, vec!["2024-03", "2024-02", "2024-01"]);

        let empty_row = table.row("2024-03").unwrap();
        assert!(empty_row.cells.iter().all(|c| c.display == "-" && c.segments.is_none()));
        assert_eq!(empty_row.total_display, "0.00");

        let alpha = table.cell("2024-02", "Alpha").unwrap();
        assert_eq!(alpha.segments, Some(2));
        assert_eq!(table.cell("2024-02", "Zeta").unwrap().segments, None);
    }

    #[test]
    fn test_water_columns_use_channel_labels() {
        let data = CalculationData {
            periods: vec![AggregatedPeriod::new(
                "2024-05",
                vec![
                    MeterConsumption::new("Bath", Some(1.5), 1).with_channel(WaterChannel::Warm),
                    MeterConsumption::new("Bath", Some(2.5), 2).with_channel(WaterChannel::Cold),
                ],
            )],
        };

        let table = table(build_calculation_table(Utility::Water, &data));
        let labels: Vec<_> = table.columns.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["Bath (Cold)", "Bath (Warm)"]);
        assert_eq!(table.row("2024-05").unwrap().total, 4.0);
    }

    #[test]
    fn test_duplicate_periods_and_entities_are_combined() {
        let data = CalculationData {
            periods: vec![
                AggregatedPeriod::new("2024-01", vec![MeterConsumption::new("A", Some(1.0), 1)]),
                AggregatedPeriod::new(
                    "2024-01",
                    vec![
                        MeterConsumption::new("A", Some(2.0), 2),
                        MeterConsumption::new("B", None, 1),
                    ],
                ),
            ],
        };

        let table = table(build_calculation_table(Utility::Gas, &data));
        assert_eq!(table.rows.len(), 1);
        let cell = table.cell("2024-01", "A").unwrap();
        assert_eq!(cell.consumption, Some(3.0));
        assert_eq!(cell.segments, Some(3));
        assert_eq!(table.cell("2024-01", "B").unwrap().segments, Some(1));
    }
}
