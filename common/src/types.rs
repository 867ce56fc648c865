use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PriceLevel {
    Low,
    Normal,
    High,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PollStatus {
    Idle,
    Loading,
    Ready,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureReading {
    pub name: String,
    pub temperature: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HeaterState {
    pub on: bool,
}

/// Setpoints as last confirmed by the regulator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SetpointPair {
    #[serde(rename = "offPeakTemp")]
    pub off_peak_temp: f32,
    #[serde(rename = "fullCostTemp")]
    pub full_cost_temp: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingTier {
    pub today: PriceLevel,
    pub tomorrow: PriceLevel,
}

/// One consistent, merged view of every regulator resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub temperatures: Vec<TemperatureReading>,
    pub heater: HeaterState,
    pub setpoints: SetpointPair,
    pub tempo: PricingTier,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn average_temperature(&self) -> Option<f32> {
        if self.temperatures.is_empty() {
            return None;
        }
        let sum: f32 = self
            .temperatures
            .iter()
            .map(|reading| reading.temperature)
            .sum();
        Some(sum / self.temperatures.len() as f32)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TemperaturesPayload {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub temperatures: Vec<TemperatureReading>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct HeaterStatusPayload {
    pub heater_on: bool,
}

impl From<HeaterStatusPayload> for HeaterState {
    fn from(payload: HeaterStatusPayload) -> Self {
        Self {
            on: payload.heater_on,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct SetpointPayload {
    pub off_peak_temp: f32,
    pub full_cost_temp: f32,
}

impl From<SetpointPayload> for SetpointPair {
    fn from(payload: SetpointPayload) -> Self {
        Self {
            off_peak_temp: payload.off_peak_temp,
            full_cost_temp: payload.full_cost_temp,
        }
    }
}

impl From<SetpointPair> for SetpointPayload {
    fn from(pair: SetpointPair) -> Self {
        Self {
            off_peak_temp: pair.off_peak_temp,
            full_cost_temp: pair.full_cost_temp,
        }
    }
}

/// Body of `POST setpoint`. Always carries both values.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct SetpointUpdate {
    pub off_peak_cost: f32,
    pub full_cost: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AppliedFlags {
    #[serde(rename = "offPeak")]
    pub off_peak: bool,
    #[serde(rename = "fullCost")]
    pub full_cost: bool,
}

/// Read-only state handed to consumers of the panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelView {
    pub status: PollStatus,
    pub snapshot: Option<Snapshot>,
    #[serde(rename = "averageTemp")]
    pub average_temp: Option<f32>,
    #[serde(rename = "lastUpdate")]
    pub last_update: Option<String>,
    pub error: Option<String>,
    #[serde(rename = "errorExpanded")]
    pub error_expanded: bool,
    pub applied: AppliedFlags,
    #[serde(rename = "completedCycles")]
    pub completed_cycles: u64,
    pub stopped: bool,
}
