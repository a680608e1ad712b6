// Per-utility affine display transform for comparative charting
use super::reading::Utility;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const DEFAULT_SCALE: f64 = 1.0;
pub const DEFAULT_OFFSET: f64 = 0.0;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TransformError {
    #[error("unknown transform setting: {0}")]
    UnknownField(String),

    #[error("{field} must not be negative (got {value})")]
    NegativeScale { field: TransformField, value: f64 },

    #[error("{field} must be a finite number")]
    NotFinite { field: TransformField },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformField {
    ElectricityScale,
    ElectricityOffset,
    GasScale,
    GasOffset,
    WaterScale,
    WaterOffset,
}

impl TransformField {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformField::ElectricityScale => "electricity_scale",
            TransformField::ElectricityOffset => "electricity_offset",
            TransformField::GasScale => "gas_scale",
            TransformField::GasOffset => "gas_offset",
            TransformField::WaterScale => "water_scale",
            TransformField::WaterOffset => "water_offset",
        }
    }

    pub fn is_scale(&self) -> bool {
        matches!(
            self,
            TransformField::ElectricityScale | TransformField::GasScale | TransformField::WaterScale
        )
    }
}

impl std::fmt::Display for TransformField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransformField {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "electricity_scale" => Ok(TransformField::ElectricityScale),
            "electricity_offset" => Ok(TransformField::ElectricityOffset),
            "gas_scale" => Ok(TransformField::GasScale),
            "gas_offset" => Ok(TransformField::GasOffset),
            "water_scale" => Ok(TransformField::WaterScale),
            "water_offset" => Ok(TransformField::WaterOffset),
            other => Err(TransformError::UnknownField(other.to_string())),
        }
    }
}

/// `display = raw * scale + offset`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisTransform {
    pub scale: f64,
    pub offset: f64,
}

impl AxisTransform {
    pub fn apply(&self, raw: f64) -> TransformedValue {
        TransformedValue {
            raw,
            display: raw * self.scale + self.offset,
        }
    }
}

/// A charted value together with the value it was derived from. The raw value is
/// carried explicitly because a zero scale makes the transform irreversible.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TransformedValue {
    pub raw: f64,
    pub display: f64,
}

fn default_scale() -> f64 {
    DEFAULT_SCALE
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformSettings {
    #[serde(default = "default_scale")]
    pub electricity_scale: f64,
    #[serde(default)]
    pub electricity_offset: f64,
    #[serde(default = "default_scale")]
    pub gas_scale: f64,
    #[serde(default)]
    pub gas_offset: f64,
    #[serde(default = "default_scale")]
    pub water_scale: f64,
    #[serde(default)]
    pub water_offset: f64,
}

impl Default for TransformSettings {
    fn default() -> Self {
        Self {
            electricity_scale: DEFAULT_SCALE,
            electricity_offset: DEFAULT_OFFSET,
            gas_scale: DEFAULT_SCALE,
            gas_offset: DEFAULT_OFFSET,
            water_scale: DEFAULT_SCALE,
            water_offset: DEFAULT_OFFSET,
        }
    }
}

impl TransformSettings {
    /// Warm and cold water share the water transform.
    pub fn for_utility(&self, utility: Utility) -> AxisTransform {
        let (scale, offset) = match utility {
            Utility::Electricity => (self.electricity_scale, self.electricity_offset),
            Utility::Gas => (self.gas_scale, self.gas_offset),
            Utility::Water => (self.water_scale, self.water_offset),
        };
        AxisTransform { scale, offset }
    }

    /// False only when all six settings are at their defaults; the primary axis
    /// scale stops being meaningful otherwise.
    pub fn is_active(&self) -> bool {
        *self != Self::default()
    }

    pub fn get(&self, field: TransformField) -> f64 {
        match field {
            TransformField::ElectricityScale => self.electricity_scale,
            TransformField::ElectricityOffset => self.electricity_offset,
            TransformField::GasScale => self.gas_scale,
            TransformField::GasOffset => self.gas_offset,
            TransformField::WaterScale => self.water_scale,
            TransformField::WaterOffset => self.water_offset,
        }
    }

    pub fn set(&mut self, field: TransformField, value: f64) -> Result<(), TransformError> {
        validate(field, value)?;
        let slot = match field {
            TransformField::ElectricityScale => &mut self.electricity_scale,
            TransformField::ElectricityOffset => &mut self.electricity_offset,
            TransformField::GasScale => &mut self.gas_scale,
            TransformField::GasOffset => &mut self.gas_offset,
            TransformField::WaterScale => &mut self.water_scale,
            TransformField::WaterOffset => &mut self.water_offset,
        };
        *slot = value;
        Ok(())
    }

    /// Replaces out-of-contract values from storage with their defaults.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        for field in FIELDS {
            if validate(field, self.get(field)).is_err() {
                tracing::warn!("Stored {} is invalid, using default", field);
                // default values always validate
                let _ = self.set(field, defaults.get(field));
            }
        }
        self
    }
}

const FIELDS: [TransformField; 6] = [
    TransformField::ElectricityScale,
    TransformField::ElectricityOffset,
    TransformField::GasScale,
    TransformField::GasOffset,
    TransformField::WaterScale,
    TransformField::WaterOffset,
];

fn validate(field: TransformField, value: f64) -> Result<(), TransformError> {
    if !value.is_finite() {
        return Err(TransformError::NotFinite { field });
    }
    if field.is_scale() && value < 0.0 {
        return Err(TransformError::NegativeScale { field, value });
    }
    Ok(())
}
