// HTTP request handlers
use crate::domain::calculation_table::CalculationView;
use crate::domain::period::is_valid_period;
use crate::domain::reading::{DeletionScope, PeriodRange, Utility};
use crate::domain::reset_merge::ReadingsTable;
use crate::domain::transform::{TransformField, TransformSettings};
use crate::presentation::api_error::ApiError;
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Deserialize)]
pub struct DeleteQuery {
    pub utility: Option<Utility>,
    pub meter_id: Option<String>,
}

#[derive(Deserialize)]
pub struct TransformUpdate {
    pub value: f64,
}

#[derive(Serialize)]
pub struct TransformResponse {
    #[serde(flatten)]
    pub settings: TransformSettings,
    pub active: bool,
}

impl From<TransformSettings> for TransformResponse {
    fn from(settings: TransformSettings) -> Self {
        Self {
            active: settings.is_active(),
            settings,
        }
    }
}

fn validate_range(range: &PeriodRange) -> Result<(), ApiError> {
    for period in [&range.start, &range.end].into_iter().flatten() {
        if !is_valid_period(period) {
            return Err(ApiError::BadRequest(format!("invalid period '{}', expected YYYY-MM", period)));
        }
    }
    Ok(())
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Full dashboard: readings tables, calculation tables and the combined chart
pub async fn get_dashboard(
    Query(range): Query<PeriodRange>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    validate_range(&range)?;
    let dashboard = state.dashboard_service.get_dashboard(range).await?;
    Ok(Json(&*dashboard).into_response())
}

pub async fn get_readings(
    Path(utility): Path<Utility>,
    Query(range): Query<PeriodRange>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<ReadingsTable>, ApiError> {
    validate_range(&range)?;
    let table = state.dashboard_service.get_readings_table(utility, &range).await?;
    Ok(Json(table))
}

pub async fn get_calculations(
    Path(utility): Path<Utility>,
    Query(range): Query<PeriodRange>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<CalculationView>, ApiError> {
    validate_range(&range)?;
    let view = state.dashboard_service.get_calculation_table(utility, &range).await?;
    Ok(Json(view))
}

pub async fn get_transform(State(state): State<Arc<AppState>>) -> Json<TransformResponse> {
    Json(state.transform_service.current().await.into())
}

pub async fn update_transform(
    Path(field): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(update): Json<TransformUpdate>,
) -> Result<Json<TransformResponse>, ApiError> {
    let field: TransformField = field.parse()?;
    let settings = state.transform_service.update(field, update.value).await?;
    Ok(Json(settings.into()))
}

/// Deletes readings on a date, optionally narrowed to a utility and a meter
pub async fn delete_readings(
    Path(date): Path<String>,
    Query(query): Query<DeleteQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if query.meter_id.is_some() && query.utility.is_none() {
        return Err(ApiError::BadRequest("meter_id requires utility".to_string()));
    }

    let scope = DeletionScope {
        date,
        utility: query.utility,
        meter_id: query.meter_id,
    };
    let deleted = state.dashboard_service.delete_readings(&scope).await?;
    Ok(Json(serde_json::json!({ "status": "success", "deleted": deleted })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_range() {
        assert!(validate_range(&PeriodRange::default()).is_ok());
        let range = PeriodRange {
            start: Some("2024-01".to_string()),
            end: Some("2024-1".to_string()),
        };
        assert!(matches!(validate_range(&range), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_transform_response_flattens_settings() {
        let value = serde_json::to_value(TransformResponse::from(TransformSettings::default())).unwrap();
        assert_eq!(value["gas_scale"], 1.0);
        assert_eq!(value["active"], false);
    }
}
