// Data client trait for the remote battery snapshot API
use crate::application::errors::ApiError;
use crate::domain::battery::{BatterySummary, CycleSnapshot, CycleSummary, DeviceId};
use async_trait::async_trait;

/// Page size large enough to pull a battery's full history in one call.
pub const DEFAULT_PAGE_LIMIT: u32 = 1000;

/// Read-only access to the snapshot API. Implementations do no caching and no
/// retries; every failure is surfaced to the caller.
#[async_trait]
pub trait BatteryDataClient: Send + Sync {
    /// Aggregate summaries, optionally filtered to one battery
    async fn fetch_summary(&self, imei: Option<&DeviceId>) -> Result<Vec<BatterySummary>, ApiError>;

    /// One page of a battery's cycle list, in server order
    async fn fetch_cycle_list(
        &self,
        imei: &DeviceId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<CycleSummary>, ApiError>;

    /// Most recent snapshot for a battery
    async fn fetch_latest_cycle(&self, imei: &DeviceId) -> Result<CycleSnapshot, ApiError>;

    /// Snapshot for exactly one (battery, cycle) pair
    async fn fetch_cycle_detail(
        &self,
        imei: &DeviceId,
        cycle_number: u32,
    ) -> Result<CycleSnapshot, ApiError>;
}
