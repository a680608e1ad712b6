// Dashboard domain model
use super::calculation_table::{CalculationView, build_calculation_table};
use super::chart::ChartData;
use super::reading::{CalculationData, PeriodRange, Reading, Utility};
use super::reset_merge::ReadingsTable;
use super::series::build_series;
use super::transform::TransformSettings;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
pub struct UtilityView {
    pub utility: Utility,
    pub readings: ReadingsTable,
    pub calculations: CalculationView,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub range: PeriodRange,
    pub utilities: Vec<UtilityView>,
    pub chart: ChartData,
}

/// Fetched inputs for one dashboard load.
#[derive(Debug, Clone, Default)]
pub struct DashboardInputs {
    pub readings: BTreeMap<Utility, Vec<Reading>>,
    pub calculations: BTreeMap<Utility, CalculationData>,
}

impl Dashboard {
    /// Pure composition: identical inputs always give an identical dashboard.
    pub fn compose(range: PeriodRange, inputs: &DashboardInputs, transform: &TransformSettings) -> Self {
        let no_readings = Vec::new();
        let no_calculations = CalculationData::default();

        let utilities = Utility::ALL
            .iter()
            .map(|utility| UtilityView {
                utility: *utility,
                readings: ReadingsTable::build(
                    *utility,
                    inputs.readings.get(utility).unwrap_or(&no_readings),
                ),
                calculations: build_calculation_table(
                    *utility,
                    inputs.calculations.get(utility).unwrap_or(&no_calculations),
                ),
            })
            .collect();

        let chart = ChartData::build(&build_series(&inputs.calculations), transform);

        Self {
            range,
            utilities,
            chart,
        }
    }

    pub fn utility(&self, utility: Utility) -> Option<&UtilityView> {
        self.utilities.iter().find(|u| u.utility == utility)
    }
}
