// Response envelope normalization for the snapshot API
use crate::domain::battery::{BatterySummary, CycleSnapshot, CycleSummary};
use serde::Deserialize;

/// Known summary shapes, tried in declaration order.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SummaryEnvelope {
    Summary { summary: Vec<BatterySummary> },
    Batteries { batteries: Vec<BatterySummary> },
    Data { data: Vec<BatterySummary> },
    Bare(Vec<BatterySummary>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CycleListEnvelope {
    Data { data: Vec<CycleSummary> },
    Bare(Vec<CycleSummary>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SnapshotEnvelope {
    Wrapped { data: CycleSnapshot },
    Bare(CycleSnapshot),
}

/// Unrecognized shapes normalize to an empty list.
pub fn decode_summary(body: &[u8]) -> Vec<BatterySummary> {
    match serde_json::from_slice::<SummaryEnvelope>(body) {
        Ok(SummaryEnvelope::Summary { summary }) => summary,
        Ok(SummaryEnvelope::Batteries { batteries }) => batteries,
        Ok(SummaryEnvelope::Data { data }) => data,
        Ok(SummaryEnvelope::Bare(list)) => list,
        Err(e) => {
            tracing::warn!("Unrecognized summary response, treating as empty: {}", e);
            Vec::new()
        }
    }
}

/// Unrecognized shapes normalize to an empty list.
pub fn decode_cycle_list(body: &[u8]) -> Vec<CycleSummary> {
    match serde_json::from_slice::<CycleListEnvelope>(body) {
        Ok(CycleListEnvelope::Data { data }) => data,
        Ok(CycleListEnvelope::Bare(list)) => list,
        Err(e) => {
            tracing::warn!("Unrecognized cycle list response, treating as empty: {}", e);
            Vec::new()
        }
    }
}

/// A single snapshot has no empty value, so an unrecognized shape is an error.
pub fn decode_snapshot(body: &[u8]) -> Result<CycleSnapshot, serde_json::Error> {
    match serde_json::from_slice::<SnapshotEnvelope>(body)? {
        SnapshotEnvelope::Wrapped { data } => Ok(data),
        SnapshotEnvelope::Bare(snapshot) => Ok(snapshot),
    }
}
