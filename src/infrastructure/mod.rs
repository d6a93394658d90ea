// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod envelope;
pub mod http_client;
