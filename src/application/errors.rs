// Error taxonomy for data access and store intents
use crate::domain::battery::DeviceId;
use thiserror::Error;

/// Failure of a remote read against the snapshot API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No response reached us (connect failure, timeout, broken body).
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("server responded with status {status}: {body}")]
    Server { status: u16, body: String },

    #[error("no snapshot for battery {imei}{}", .cycle.map(|c| format!(" cycle {}", c)).unwrap_or_default())]
    NotFound { imei: DeviceId, cycle: Option<u32> },

    #[error("unexpected response shape: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("battery {0} is not in the authorized list")]
    UnauthorizedDevice(DeviceId),

    #[error("at least one authorized battery must be configured")]
    NoAuthorizedDevices,

    #[error(transparent)]
    Api(#[from] ApiError),
}
