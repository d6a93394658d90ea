// Display formatting helpers shared by the dashboard views
use chrono::{DateTime, NaiveDateTime};

const KM_TO_MILES: f64 = 0.621371;

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.naive_utc());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

fn format_with(raw: &str, pattern: &str) -> String {
    match parse_timestamp(raw) {
        Some(timestamp) => timestamp.format(pattern).to_string(),
        None => {
            tracing::debug!("Unparseable timestamp {:?}, showing as-is", raw);
            raw.to_string()
        }
    }
}

/// `Mar 01, 2024 08:00`; unparseable input is returned unchanged.
pub fn format_datetime(raw: &str) -> String {
    format_with(raw, "%b %d, %Y %H:%M")
}

pub fn format_date(raw: &str) -> String {
    format_with(raw, "%b %d, %Y")
}

pub fn format_time(raw: &str) -> String {
    format_with(raw, "%H:%M:%S")
}

fn whole_minutes(hours: f64) -> u64 {
    if hours.is_finite() && hours > 0.0 {
        (hours * 60.0).floor() as u64
    } else {
        0
    }
}

/// `6h 30m`
pub fn format_duration_compact(hours: f64) -> String {
    let minutes = whole_minutes(hours);
    format!("{}h {}m", minutes / 60, minutes % 60)
}

/// `1 day, 2 hours, 30 minutes`; zero units are left out.
pub fn format_duration_long(hours: f64) -> String {
    let minutes = whole_minutes(hours);
    let parts: Vec<String> = [
        (minutes / (24 * 60), "day", "days"),
        ((minutes / 60) % 24, "hour", "hours"),
        (minutes % 60, "minute", "minutes"),
    ]
    .into_iter()
    .filter(|(count, _, _)| *count > 0)
    .map(|(count, singular, plural)| pluralize(count, singular, plural))
    .collect();

    if parts.is_empty() {
        "0 minutes".to_string()
    } else {
        parts.join(", ")
    }
}

pub fn pluralize(count: u64, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("1 {}", singular)
    } else {
        format!("{} {}", count, plural)
    }
}

pub fn km_to_miles(km: f64) -> f64 {
    km * KM_TO_MILES
}

pub fn fixed(value: f64, digits: usize) -> String {
    format!("{:.*}", digits, value)
}
