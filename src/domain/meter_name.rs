// Display identity of a reading, independent of utility type
use super::reading::{Reading, Utility, WaterChannel};
use serde::Serialize;

pub const UNNAMED_METER: &str = "Unnamed meter";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MeterIdentity {
    /// Meter name for electricity, room for water and gas.
    pub name: String,
    pub channel: Option<WaterChannel>,
    /// False when the backend sent no identity and a placeholder is shown.
    pub complete: bool,
}

impl MeterIdentity {
    pub fn is_warm(&self) -> bool {
        self.channel == Some(WaterChannel::Warm)
    }

    pub fn label(&self) -> String {
        legacy_label(&self.name, self.channel)
    }
}

pub fn resolve(reading: &Reading) -> MeterIdentity {
    let name = reading.identity.as_deref().map(str::trim).filter(|n| !n.is_empty());
    let channel = match reading.utility {
        Utility::Water => reading.channel,
        Utility::Electricity | Utility::Gas => None,
    };

    MeterIdentity {
        name: name.unwrap_or(UNNAMED_METER).to_string(),
        channel,
        complete: name.is_some(),
    }
}

/// Presentation-only `"Room (Warm)"` form. Never parse it back.
pub fn legacy_label(name: &str, channel: Option<WaterChannel>) -> String {
    match channel {
        Some(channel) => format!("{} ({})", name, channel.label()),
        None => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_water_uses_channel_field() {
        let mut reading = Reading::new(1, "2024-01-01", Utility::Water, "Bath (Cold)", 5.0)
            .with_channel(WaterChannel::Warm);
        reading.identity = Some("Bath".to_string());

        let identity = resolve(&reading);
        assert_eq!(identity.name, "Bath");
        assert!(identity.is_warm());
        assert_eq!(identity.label(), "Bath (Warm)");
    }

    #[test]
    fn test_resolve_ignores_suffix_in_name() {
        let reading = Reading::new(1, "2024-01-01", Utility::Water, "Bath (Warm)", 5.0)
            .with_channel(WaterChannel::Cold);
        assert!(!resolve(&reading).is_warm());
    }

    #[test]
    fn test_resolve_drops_channel_outside_water() {
        let reading = Reading::new(1, "2024-01-01", Utility::Gas, "Kitchen", 5.0)
            .with_channel(WaterChannel::Warm);
        let identity = resolve(&reading);
        assert_eq!(identity.channel, None);
        assert_eq!(identity.label(), "Kitchen");
    }

    #[test]
    fn test_resolve_missing_identity() {
        let mut reading = Reading::new(1, "2024-01-01", Utility::Electricity, "Main", 5.0);
        reading.identity = None;
        let identity = resolve(&reading);
        assert_eq!(identity.name, UNNAMED_METER);
        assert!(!identity.complete);
    }
}
