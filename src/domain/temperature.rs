// Temperature histogram domain models
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Histogram bucket width in °C. The API reports one histogram per width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum BucketWidth {
    #[default]
    Five,
    Ten,
    Fifteen,
    Twenty,
}

impl BucketWidth {
    pub const ALL: [BucketWidth; 4] = [Self::Five, Self::Ten, Self::Fifteen, Self::Twenty];

    pub fn degrees(self) -> u8 {
        match self {
            Self::Five => 5,
            Self::Ten => 10,
            Self::Fifteen => 15,
            Self::Twenty => 20,
        }
    }
}

impl TryFrom<u8> for BucketWidth {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|w| w.degrees() == value)
            .ok_or_else(|| format!("unsupported bucket width {}, expected 5, 10, 15 or 20", value))
    }
}

impl From<BucketWidth> for u8 {
    fn from(width: BucketWidth) -> Self {
        width.degrees()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemperatureBand {
    VeryCold,
    Cold,
    Cool,
    Warm,
    Hot,
    VeryHot,
}

impl TemperatureBand {
    pub fn classify(midpoint: f64) -> Self {
        if midpoint < 0.0 {
            Self::VeryCold
        } else if midpoint < 10.0 {
            Self::Cold
        } else if midpoint < 20.0 {
            Self::Cool
        } else if midpoint < 30.0 {
            Self::Warm
        } else if midpoint < 40.0 {
            Self::Hot
        } else {
            Self::VeryHot
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemperatureBucket {
    pub label: String,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
    pub minutes: f64,
}

impl TemperatureBucket {
    /// Band of the bucket midpoint, `None` when the label has no lower bound.
    pub fn band(&self, width: BucketWidth) -> Option<TemperatureBand> {
        self.lower
            .map(|lower| TemperatureBand::classify(lower + f64::from(width.degrees()) / 2.0))
    }
}

/// Parse a range label such as `"20-25"` or `"-10--5"` into its bounds.
///
/// A leading minus belongs to the lower bound; the first `-` after it is the
/// separator.
pub fn parse_range_label(label: &str) -> (Option<f64>, Option<f64>) {
    let trimmed = label.trim();
    let search_from = usize::from(trimmed.starts_with('-'));
    match trimmed[search_from..].find('-') {
        Some(idx) => {
            let split = search_from + idx;
            let lower = trimmed[..split].trim().parse().ok();
            let upper = trimmed[split + 1..].trim().parse().ok();
            (lower, upper)
        }
        None => (trimmed.parse().ok(), None),
    }
}

/// Histogram buckets ordered by lower bound. Unparseable labels sort last.
/// Negative minute values from the API are clamped to zero.
pub fn sorted_buckets(histogram: &BTreeMap<String, f64>) -> Vec<TemperatureBucket> {
    let mut buckets: Vec<TemperatureBucket> = histogram
        .iter()
        .map(|(label, minutes)| {
            let (lower, upper) = parse_range_label(label);
            TemperatureBucket {
                label: label.clone(),
                lower,
                upper,
                minutes: minutes.max(0.0),
            }
        })
        .collect();

    buckets.sort_by(|a, b| match (a.lower, b.lower) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.label.cmp(&b.label),
    });
    buckets
}
