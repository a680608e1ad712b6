// Domain layer - Pure reconciliation, aggregation and chart models
pub mod calculation_table;
pub mod chart;
pub mod dashboard;
pub mod meter_name;
pub mod period;
pub mod reading;
pub mod reset_merge;
pub mod series;
pub mod transform;
