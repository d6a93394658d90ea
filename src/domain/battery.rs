// Battery and cycle domain models
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::temperature::BucketWidth;

const IMEI_LENGTH: usize = 15;

/// Device key used throughout the API (the battery's IMEI).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(imei: impl Into<String>) -> Self {
        Self(imei.into())
    }

    /// Validate an IMEI: exactly 15 ASCII digits.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.len() == IMEI_LENGTH && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            Some(Self(trimmed.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertDetails {
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub protections: Vec<String>,
}

/// Full detail for one charge/discharge cycle of one battery.
///
/// Timestamps are kept as the API sends them; the presentation layer parses
/// them leniently and falls back to the raw text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleSnapshot {
    pub imei: DeviceId,
    pub cycle_number: u32,
    pub cycle_start_time: String,
    pub cycle_end_time: String,
    pub cycle_duration_hours: f64,
    pub soh_drop: f64,
    pub average_soc: f64,
    pub min_soc: f64,
    pub max_soc: f64,
    pub average_temperature: f64,
    #[serde(default)]
    pub temperature_dist_5deg: BTreeMap<String, f64>,
    #[serde(default)]
    pub temperature_dist_10deg: BTreeMap<String, f64>,
    #[serde(default)]
    pub temperature_dist_15deg: BTreeMap<String, f64>,
    #[serde(default)]
    pub temperature_dist_20deg: BTreeMap<String, f64>,
    pub total_distance: f64,
    pub average_speed: f64,
    pub max_speed: f64,
    pub charging_instances_count: u32,
    pub average_charge_start_soc: f64,
    pub voltage_avg: f64,
    pub voltage_min: f64,
    pub voltage_max: f64,
    #[serde(default)]
    pub alert_details: AlertDetails,
}

impl CycleSnapshot {
    pub fn histogram(&self, width: BucketWidth) -> &BTreeMap<String, f64> {
        match width {
            BucketWidth::Five => &self.temperature_dist_5deg,
            BucketWidth::Ten => &self.temperature_dist_10deg,
            BucketWidth::Fifteen => &self.temperature_dist_15deg,
            BucketWidth::Twenty => &self.temperature_dist_20deg,
        }
    }

    pub fn soc_range(&self) -> f64 {
        self.max_soc - self.min_soc
    }
}

/// Entry of the cycle list for one battery.
///
/// Only the key is required. The list endpoint returns full snapshots, so the
/// per-cycle metrics used by the trend explorer are picked up when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleSummary {
    pub imei: DeviceId,
    pub cycle_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soh_drop: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_soc: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_distance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle_start_time: Option<String>,
}

impl CycleSummary {
    pub fn new(imei: DeviceId, cycle_number: u32) -> Self {
        Self {
            imei,
            cycle_number,
            soh_drop: None,
            average_soc: None,
            average_temperature: None,
            total_distance: None,
            average_speed: None,
            cycle_start_time: None,
        }
    }
}

/// Per-battery aggregate from the summary endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatterySummary {
    pub imei: DeviceId,
    #[serde(default)]
    pub total_cycles: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_health: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_cycle: Option<u32>,
}

/// Currently selected battery and cycle.
///
/// `cycle` is `None` until a cycle list has been loaded for the battery, and
/// again when the battery turns out to have no cycles.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Selection {
    pub imei: DeviceId,
    pub cycle: Option<u32>,
}

impl Selection {
    pub fn new(imei: DeviceId) -> Self {
        Self { imei, cycle: None }
    }
}
