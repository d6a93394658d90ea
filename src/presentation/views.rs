// Dashboard view models - pure projections of the store state
use crate::application::dashboard_store::DashboardState;
use crate::domain::battery::{CycleSnapshot, CycleSummary, DeviceId};
use crate::domain::cycles::{position_of, Position};
use crate::domain::temperature::{sorted_buckets, BucketWidth, TemperatureBand};
use crate::presentation::format::{
    fixed, format_date, format_datetime, format_duration_compact, format_duration_long, format_time,
    km_to_miles, pluralize,
};
use serde::Serialize;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Good,
    Caution,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum DashboardStatus {
    Loading,
    Error(String),
    Ready,
    Empty,
}

/// Error takes precedence; the loading affordance only shows while there is
/// no detail for the current selection.
pub fn status(state: &DashboardState) -> DashboardStatus {
    if let Some(message) = &state.error {
        DashboardStatus::Error(message.clone())
    } else if state.loading && state.selected_detail().is_none() {
        DashboardStatus::Loading
    } else if state.selected_detail().is_some() {
        DashboardStatus::Ready
    } else {
        DashboardStatus::Empty
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigatorView {
    pub imei: DeviceId,
    pub selected_cycle: Option<u32>,
    pub min_cycle: Option<u32>,
    pub max_cycle: Option<u32>,
    pub position: Option<Position>,
    pub label: String,
    pub loaded_count: usize,
    pub has_previous: bool,
    pub has_next: bool,
}

pub fn navigator(state: &DashboardState) -> NavigatorView {
    let sorted = state.sorted_cycles();
    let selected = state.selection.cycle;
    let position = selected.and_then(|cycle| position_of(&sorted, cycle));

    let label = match (selected, position) {
        (Some(cycle), Some(position)) => format!("Cycle {} ({})", cycle, position),
        (Some(cycle), None) => format!("Cycle {}", cycle),
        (None, _) => "No cycle selected".to_string(),
    };

    NavigatorView {
        imei: state.selection.imei.clone(),
        selected_cycle: selected,
        min_cycle: sorted.first().copied(),
        max_cycle: sorted.last().copied(),
        position,
        label,
        loaded_count: sorted.len(),
        has_previous: selected.is_some_and(|c| sorted.first().is_some_and(|&first| first < c)),
        has_next: match selected {
            Some(c) => sorted.last().is_some_and(|&last| last > c),
            None => !sorted.is_empty(),
        },
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleStatisticsView {
    pub cycle_number: u32,
    pub date: String,
    pub time_range: String,
    pub started: String,
    pub ended: String,
    pub duration: String,
    pub duration_detail: String,
    pub soh_drop: String,
    pub degradation: &'static str,
    pub severity: Severity,
    pub voltage: String,
}

pub fn cycle_statistics(detail: &CycleSnapshot) -> CycleStatisticsView {
    let high = detail.soh_drop > 1.0;
    CycleStatisticsView {
        cycle_number: detail.cycle_number,
        date: format_date(&detail.cycle_start_time),
        time_range: format!(
            "{} - {}",
            format_time(&detail.cycle_start_time),
            format_time(&detail.cycle_end_time)
        ),
        started: format_datetime(&detail.cycle_start_time),
        ended: format_datetime(&detail.cycle_end_time),
        duration: format_duration_compact(detail.cycle_duration_hours),
        duration_detail: format!(
            "{} ({} hours)",
            format_duration_long(detail.cycle_duration_hours),
            fixed(detail.cycle_duration_hours, 2)
        ),
        soh_drop: fixed(detail.soh_drop, 2),
        degradation: if high { "High degradation" } else { "Normal degradation" },
        severity: if high { Severity::Critical } else { Severity::Good },
        voltage: format!(
            "{} V ({} - {} V)",
            fixed(detail.voltage_avg, 1),
            fixed(detail.voltage_min, 1),
            fixed(detail.voltage_max, 1)
        ),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatteryHealthView {
    pub average_soc: String,
    pub average_soc_severity: Severity,
    pub min_soc: String,
    pub max_soc: String,
    pub soc_range: String,
    pub soh_drop: String,
    pub soh_severity: Severity,
    pub soh_label: &'static str,
}

pub fn battery_health(detail: &CycleSnapshot) -> BatteryHealthView {
    let (soh_severity, soh_label) = if detail.soh_drop > 1.0 {
        (Severity::Critical, "High degradation")
    } else if detail.soh_drop > 0.5 {
        (Severity::Caution, "Moderate degradation")
    } else {
        (Severity::Good, "Low degradation")
    };

    BatteryHealthView {
        average_soc: fixed(detail.average_soc, 1),
        average_soc_severity: if detail.average_soc > 50.0 {
            Severity::Good
        } else {
            Severity::Caution
        },
        min_soc: fixed(detail.min_soc, 1),
        max_soc: fixed(detail.max_soc, 1),
        soc_range: fixed(detail.soc_range(), 1),
        soh_drop: fixed(detail.soh_drop, 3),
        soh_severity,
        soh_label,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceView {
    pub average_speed: String,
    pub max_speed: String,
    pub max_speed_mph: Option<String>,
    pub total_distance: String,
    pub total_distance_miles: Option<String>,
}

pub fn performance(detail: &CycleSnapshot) -> PerformanceView {
    PerformanceView {
        average_speed: fixed(detail.average_speed, 1),
        max_speed: fixed(detail.max_speed, 1),
        max_speed_mph: (detail.max_speed > 0.0)
            .then(|| format!("{} mph", fixed(km_to_miles(detail.max_speed), 1))),
        total_distance: fixed(detail.total_distance, 2),
        total_distance_miles: (detail.total_distance > 0.0)
            .then(|| format!("{} miles", fixed(km_to_miles(detail.total_distance), 2))),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChargingView {
    pub instances: u32,
    pub instances_label: String,
    pub average_start_soc: String,
    pub start_soc_severity: Severity,
    pub start_soc_label: &'static str,
}

pub fn charging(detail: &CycleSnapshot) -> ChargingView {
    let start = detail.average_charge_start_soc;
    let (start_soc_severity, start_soc_label) = if start < 20.0 {
        (Severity::Critical, "Frequent deep discharges")
    } else if start < 40.0 {
        (Severity::Caution, "Moderate discharge")
    } else {
        (Severity::Good, "Healthy charging pattern")
    };

    ChargingView {
        instances: detail.charging_instances_count,
        instances_label: pluralize(
            u64::from(detail.charging_instances_count),
            "charging event",
            "charging events",
        ),
        average_start_soc: fixed(start, 1),
        start_soc_severity,
        start_soc_label,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertsView {
    pub warnings: Vec<String>,
    pub protections: Vec<String>,
    pub warning_count: usize,
    pub protection_count: usize,
}

pub fn alerts(detail: &CycleSnapshot) -> AlertsView {
    let details = &detail.alert_details;
    AlertsView {
        warning_count: details.warnings.len(),
        protection_count: details.protections.len(),
        warnings: details.warnings.clone(),
        protections: details.protections.clone(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemperatureBucketView {
    pub label: String,
    pub minutes: f64,
    pub band: Option<TemperatureBand>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemperatureDistributionView {
    pub bucket_width: BucketWidth,
    pub average_temperature: String,
    pub buckets: Vec<TemperatureBucketView>,
    pub max_minutes: f64,
}

pub fn temperature_distribution(
    detail: &CycleSnapshot,
    width: BucketWidth,
) -> TemperatureDistributionView {
    let buckets: Vec<TemperatureBucketView> = sorted_buckets(detail.histogram(width))
        .into_iter()
        .map(|bucket| TemperatureBucketView {
            band: bucket.band(width),
            label: bucket.label,
            minutes: bucket.minutes,
        })
        .collect();
    let max_minutes = buckets.iter().map(|b| b.minutes).fold(0.0, f64::max);

    TemperatureDistributionView {
        bucket_width: width,
        average_temperature: fixed(detail.average_temperature, 1),
        buckets,
        max_minutes,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendMetric {
    SohDrop,
    AverageSoc,
    AverageTemperature,
    Distance,
    AverageSpeed,
}

impl TrendMetric {
    pub fn label(self) -> &'static str {
        match self {
            Self::SohDrop => "SOH Drop (%)",
            Self::AverageSoc => "Average SOC (%)",
            Self::AverageTemperature => "Average Temperature (°C)",
            Self::Distance => "Total Distance (km)",
            Self::AverageSpeed => "Average Speed (km/h)",
        }
    }

    fn value(self, cycle: &CycleSummary) -> Option<f64> {
        match self {
            Self::SohDrop => cycle.soh_drop,
            Self::AverageSoc => cycle.average_soc,
            Self::AverageTemperature => cycle.average_temperature,
            Self::Distance => cycle.total_distance,
            Self::AverageSpeed => cycle.average_speed,
        }
    }
}

impl FromStr for TrendMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "soh" | "soh_drop" => Ok(Self::SohDrop),
            "soc" | "average_soc" => Ok(Self::AverageSoc),
            "temperature" | "average_temperature" => Ok(Self::AverageTemperature),
            "distance" => Ok(Self::Distance),
            "speed" | "average_speed" => Ok(Self::AverageSpeed),
            other => Err(format!("unknown trend metric {:?}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendPoint {
    pub cycle: u32,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendChange {
    pub delta: f64,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendView {
    pub metric: TrendMetric,
    pub label: &'static str,
    pub points: Vec<TrendPoint>,
    pub change: Option<TrendChange>,
}

/// Metric series across the loaded cycles, ordered by cycle number. Cycles
/// without a value for the metric are skipped.
pub fn trend(cycles: &[CycleSummary], metric: TrendMetric) -> TrendView {
    let mut points: Vec<TrendPoint> = cycles
        .iter()
        .filter_map(|c| {
            metric.value(c).map(|value| TrendPoint {
                cycle: c.cycle_number,
                value,
            })
        })
        .collect();
    points.sort_by_key(|p| p.cycle);

    let change = match (points.first(), points.last()) {
        (Some(first), Some(last)) => {
            let delta = last.value - first.value;
            let percent = if first.value == 0.0 {
                0.0
            } else {
                delta / first.value * 100.0
            };
            Some(TrendChange { delta, percent })
        }
        _ => None,
    };

    TrendView {
        metric,
        label: metric.label(),
        points,
        change,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub status: DashboardStatus,
    pub show_loading: bool,
    pub error: Option<String>,
    pub navigator: NavigatorView,
    pub statistics: Option<CycleStatisticsView>,
    pub health: Option<BatteryHealthView>,
    pub performance: Option<PerformanceView>,
    pub charging: Option<ChargingView>,
    pub alerts: Option<AlertsView>,
    pub temperature: Option<TemperatureDistributionView>,
    pub trend: TrendView,
}

/// Every panel. Detail panels render only from a snapshot that matches the
/// current selection, never from a previous cycle's data.
pub fn dashboard(state: &DashboardState) -> DashboardView {
    let detail = state.selected_detail();
    DashboardView {
        status: status(state),
        show_loading: state.loading && detail.is_none(),
        error: state.error.clone(),
        navigator: navigator(state),
        statistics: detail.map(cycle_statistics),
        health: detail.map(battery_health),
        performance: detail.map(performance),
        charging: detail.map(charging),
        alerts: detail.map(alerts),
        temperature: detail.map(|d| temperature_distribution(d, state.bucket_width)),
        trend: trend(&state.cycles, TrendMetric::SohDrop),
    }
}
