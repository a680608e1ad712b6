// HTTP repository implementation against the meter storage backend
use crate::application::meter_repository::MeterRepository;
use crate::domain::reading::{
    CalculationData, DeletionScope, PeriodRange, Reading, ReadingDate, Utility, WaterChannel,
};
use crate::domain::transform::TransformSettings;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpMeterRepository {
    base_url: String,
    client: reqwest::Client,
}

/// Reading record as stored per utility. Electricity names its meter in
/// `meter_name`, water and gas use `room`.
#[derive(Debug, Deserialize)]
struct ReadingRecord {
    id: i64,
    date: String,
    #[serde(default)]
    meter_name: Option<String>,
    #[serde(default)]
    room: Option<String>,
    #[serde(default)]
    is_warm_water: Option<bool>,
    value: f64,
    #[serde(default)]
    comment: Option<String>,
    #[serde(default)]
    period: Option<String>,
    #[serde(default)]
    consumption: Option<f64>,
    #[serde(default)]
    is_reset: bool,
    #[serde(default)]
    meter_id: Option<serde_json::Value>,
}

impl ReadingRecord {
    fn into_reading(self, utility: Utility) -> Reading {
        let identity = match utility {
            Utility::Electricity => self.meter_name.or(self.room),
            Utility::Water | Utility::Gas => self.room.or(self.meter_name),
        };
        let channel = match utility {
            Utility::Water => self.is_warm_water.map(WaterChannel::from_is_warm),
            Utility::Electricity | Utility::Gas => None,
        };
        let meter_id = self.meter_id.and_then(|id| match id {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        });

        Reading {
            id: self.id,
            date: ReadingDate::parse(&self.date),
            utility,
            identity,
            channel,
            meter_id,
            value: self.value,
            period: self.period,
            is_reset: self.is_reset,
            consumption: self.consumption,
            comment: self.comment.filter(|c| !c.is_empty()),
        }
    }
}

/// Some backends fold the water channel into the entity id (`"Bath (Warm)"`) and
/// send no `channel`. Split it out here so nothing downstream reads the suffix.
fn split_legacy_channels(data: &mut CalculationData) {
    for meter in data.periods.iter_mut().flat_map(|p| p.meters.iter_mut()) {
        if meter.channel.is_some() {
            continue;
        }
        for channel in [WaterChannel::Warm, WaterChannel::Cold] {
            let suffix = format!(" ({})", channel.label());
            if let Some(name) = meter.entity_id.strip_suffix(suffix.as_str()).map(str::to_string) {
                meter.entity_id = name;
                meter.channel = Some(channel);
                break;
            }
        }
    }
}

/// Deletion responses report counts per utility, optionally with a total.
fn deleted_count(body: &serde_json::Value) -> u64 {
    if let Some(total) = body.get("total").and_then(|t| t.as_u64()) {
        return total;
    }
    if let Some(deleted) = body.get("deleted").and_then(|t| t.as_u64()) {
        return deleted;
    }
    body.as_object()
        .map(|fields| fields.values().filter_map(|v| v.as_u64()).sum())
        .unwrap_or(0)
}

fn parse_deleted(body: &str) -> Result<u64> {
    if body.trim().is_empty() {
        tracing::warn!("Deletion response had no body, reporting 0 deleted");
        return Ok(0);
    }
    let body: serde_json::Value = serde_json::from_str(body)?;
    Ok(deleted_count(&body))
}

impl HttpMeterRepository {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<Option<T>> {
        let url = self.url(path);
        tracing::debug!("GET {} {:?}", url, query);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .query(query)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", url))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Backend request {} failed with status {}: {}", url, status, body);
        }

        let data = response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to parse response from {}", url))?;
        Ok(Some(data))
    }
}

#[async_trait]
impl MeterRepository for HttpMeterRepository {
    async fn fetch_readings(&self, utility: Utility, range: &PeriodRange) -> Result<Vec<Reading>> {
        let records: Vec<ReadingRecord> = self
            .get_json(&format!("readings/{}", utility), &range.query_pairs())
            .await?
            .unwrap_or_default();

        tracing::debug!("Fetched {} {} readings", records.len(), utility);
        Ok(records.into_iter().map(|r| r.into_reading(utility)).collect())
    }

    async fn fetch_calculations(&self, utility: Utility, range: &PeriodRange) -> Result<CalculationData> {
        let mut data: CalculationData = self
            .get_json(&format!("calculations/{}", utility), &range.query_pairs())
            .await?
            .unwrap_or_default();
        if utility == Utility::Water {
            split_legacy_channels(&mut data);
        }

        tracing::debug!("Fetched {} {} calculation periods", data.periods.len(), utility);
        Ok(data)
    }

    async fn fetch_transform(&self) -> Result<Option<TransformSettings>> {
        self.get_json("settings/transform", &[]).await
    }

    async fn save_transform(&self, settings: &TransformSettings) -> Result<()> {
        let url = self.url("settings/transform");
        let response = self
            .client
            .put(&url)
            .json(settings)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", url))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Saving transform failed with status {}: {}", status, body);
        }
        Ok(())
    }

    async fn delete_readings(&self, scope: &DeletionScope) -> Result<u64> {
        let url = self.url(&format!("readings/by-date/{}", urlencoding::encode(&scope.date)));
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(utility) = scope.utility {
            query.push(("utility", utility.to_string()));
        }
        if let Some(meter_id) = &scope.meter_id {
            query.push(("meter_id", meter_id.clone()));
        }

        let response = self
            .client
            .delete(&url)
            .query(&query)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", url))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Deleting readings failed with status {}: {}", status, body);
        }

        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read deletion response from {}", url))?;
        parse_deleted(&body).with_context(|| format!("Failed to parse deletion response from {}", url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::series::{SeriesKey, build_series};
    use std::collections::BTreeMap;

    #[test]
    fn test_electricity_record() {
        let record: ReadingRecord = serde_json::from_str(
            r#"{"id": 7, "date": "2024-03-05 08:00", "meter_name": "Main", "value": 4521.3,
                "period": "2024-03", "consumption": null, "is_reset": true, "meter_id": 3}"#,
        )
        .unwrap();
        let reading = record.into_reading(Utility::Electricity);

        assert_eq!(reading.identity.as_deref(), Some("Main"));
        assert_eq!(reading.meter_id.as_deref(), Some("3"));
        assert_eq!(reading.date.day(), "2024-03-05");
        assert!(reading.date.time().is_some());
        assert!(reading.is_reset);
        assert_eq!(reading.channel, None);
    }

    #[test]
    fn test_water_record_channel() {
        let record: ReadingRecord = serde_json::from_str(
            r#"{"id": 1, "date": "2024-03-05", "room": "Bath", "value": 12.5,
                "is_warm_water": true, "comment": ""}"#,
        )
        .unwrap();
        let reading = record.into_reading(Utility::Water);

        assert_eq!(reading.channel, Some(WaterChannel::Warm));
        assert_eq!(reading.identity.as_deref(), Some("Bath"));
        assert_eq!(reading.comment, None);
        assert_eq!(reading.meter_id, None);
        assert!(!reading.is_reset);
    }

    #[test]
    fn test_water_calculations_with_suffixed_entities() {
        let mut data: CalculationData = serde_json::from_str(
            r#"{"periods": [{"period": "2024-01", "meters": [
                {"entity_id": "Bath (Warm)", "consumption": 2.0, "segments": 1},
                {"entity_id": "Bath (Cold)", "consumption": 3.0, "segments": 1},
                {"entity_id": "Sauna (Warmish)", "consumption": 1.0, "segments": 1}
            ]}]}"#,
        )
        .unwrap();
        split_legacy_channels(&mut data);

        let meters = &data.periods[0].meters;
        assert_eq!(meters[0].entity_id, "Bath");
        assert_eq!(meters[0].channel, Some(WaterChannel::Warm));
        assert_eq!(meters[1].entity_id, "Bath");
        assert_eq!(meters[1].channel, Some(WaterChannel::Cold));
        assert_eq!(meters[2].entity_id, "Sauna (Warmish)");
        assert_eq!(meters[2].channel, None);

        let mut inputs = BTreeMap::new();
        inputs.insert(Utility::Water, data);
        let set = build_series(&inputs);
        assert_eq!(set.get(SeriesKey::WaterWarm).unwrap().values["2024-01"], 2.0);
        assert_eq!(set.get(SeriesKey::WaterCold).unwrap().values["2024-01"], 3.0);
        assert_eq!(set.get(SeriesKey::WaterTotal).unwrap().values["2024-01"], 6.0);
    }

    #[test]
    fn test_explicit_channel_is_kept() {
        let mut data: CalculationData = serde_json::from_str(
            r#"{"periods": [{"period": "2024-01", "meters": [
                {"entity_id": "Bath (Cold)", "consumption": 2.0, "segments": 1, "channel": "warm"}
            ]}]}"#,
        )
        .unwrap();
        split_legacy_channels(&mut data);
        assert_eq!(data.periods[0].meters[0].entity_id, "Bath (Cold)");
        assert_eq!(data.periods[0].meters[0].channel, Some(WaterChannel::Warm));
    }

    #[test]
    fn test_deleted_count() {
        assert_eq!(deleted_count(&serde_json::json!({"total": 4, "gas": 1})), 4);
        assert_eq!(deleted_count(&serde_json::json!({"electricity": 2, "water": 1, "gas": 0})), 3);
        assert_eq!(deleted_count(&serde_json::json!(null)), 0);
    }

    #[test]
    fn test_parse_deleted_rejects_garbage() {
        assert_eq!(parse_deleted(r#"{"status": "success", "deleted": 2}"#).unwrap(), 2);
        assert_eq!(parse_deleted("").unwrap(), 0);
        assert!(parse_deleted("<html>502 Bad Gateway</html>").is_err());
    }

    #[test]
    fn test_url_joining() {
        let repo = HttpMeterRepository::new("http://backend:8000/api/".to_string(), Duration::from_secs(1)).unwrap();
        assert_eq!(repo.url("/readings/gas"), "http://backend:8000/api/readings/gas");
    }
}
