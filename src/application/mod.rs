// Application layer - Data access contract and dashboard orchestration
pub mod dashboard_store;
pub mod data_client;
pub mod errors;

#[cfg(test)]
pub mod testing;
