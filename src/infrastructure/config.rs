use crate::application::data_client::DEFAULT_PAGE_LIMIT;
use crate::domain::battery::DeviceId;
use crate::domain::temperature::BucketWidth;
use anyhow::{bail, Context};
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

const DEFAULT_API_BASE_URL: &str = "https://zenfinity-intern-api-104290304048.europe-west1.run.app";
const DEFAULT_AUTHORIZED: [&str; 2] = ["865044073967657", "865044073949366"];

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DashboardConfig {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub devices: DeviceSettings,
    #[serde(default)]
    pub server: ServerSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            page_limit: default_page_limit(),
        }
    }
}

impl ApiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DeviceSettings {
    #[serde(default = "default_authorized")]
    pub authorized: Vec<String>,
    #[serde(default)]
    pub default_bucket_width: BucketWidth,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            authorized: default_authorized(),
            default_bucket_width: BucketWidth::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

fn default_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_page_limit() -> u32 {
    DEFAULT_PAGE_LIMIT
}

fn default_authorized() -> Vec<String> {
    DEFAULT_AUTHORIZED.iter().map(|s| s.to_string()).collect()
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

impl DashboardConfig {
    /// Authorized IMEIs in configured order; the first is the default battery.
    pub fn authorized_devices(&self) -> anyhow::Result<Vec<DeviceId>> {
        if self.devices.authorized.is_empty() {
            bail!("devices.authorized must list at least one IMEI");
        }

        let mut devices: Vec<DeviceId> = Vec::with_capacity(self.devices.authorized.len());
        for raw in &self.devices.authorized {
            let Some(device) = DeviceId::parse(raw) else {
                bail!("invalid IMEI in devices.authorized: {:?}", raw);
            };
            if !devices.contains(&device) {
                devices.push(device);
            }
        }
        Ok(devices)
    }

    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        self.server
            .bind
            .parse()
            .with_context(|| format!("invalid server.bind address {:?}", self.server.bind))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.authorized_devices()?;
        self.bind_addr()?;
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://") {
            bail!("api.base_url must start with http:// or https://, got {:?}", self.api.base_url);
        }
        if self.api.page_limit == 0 {
            bail!("api.page_limit must be positive");
        }
        Ok(())
    }
}

/// `config/dashboard.toml` (optional) overlaid with `DASHBOARD__SECTION__KEY`
/// environment variables. `DASHBOARD__DEVICES__AUTHORIZED` is comma separated.
pub fn load_dashboard_config() -> anyhow::Result<DashboardConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/dashboard").required(false))
        .add_source(
            config::Environment::with_prefix("DASHBOARD")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("devices.authorized")
                .try_parsing(true),
        )
        .build()?;

    let config: DashboardConfig = settings.try_deserialize()?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(source: &str) -> DashboardConfig {
        config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = from_toml("");
        assert_eq!(config.api.page_limit, 1000);
        assert_eq!(config.api.timeout(), Duration::from_secs(15));
        assert_eq!(config.devices.default_bucket_width, BucketWidth::Five);
        assert_eq!(
            config.authorized_devices().unwrap(),
            vec![
                DeviceId::new("865044073967657"),
                DeviceId::new("865044073949366")
            ]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let config = from_toml(
            r#"
            [api]
            base_url = "http://localhost:9000"
            page_limit = 250

            [devices]
            authorized = ["865044073949366", "865044073949366"]
            default_bucket_width = 10

            [server]
            bind = "0.0.0.0:3000"
            "#,
        );
        assert_eq!(config.api.page_limit, 250);
        assert_eq!(config.devices.default_bucket_width, BucketWidth::Ten);
        assert_eq!(
            config.authorized_devices().unwrap(),
            vec![DeviceId::new("865044073949366")]
        );
        assert_eq!(config.bind_addr().unwrap().port(), 3000);
    }

    #[test]
    fn test_validation_failures() {
        let mut config = DashboardConfig::default();
        config.devices.authorized.clear();
        assert!(config.validate().is_err());

        let mut config = DashboardConfig::default();
        config.devices.authorized = vec!["not-an-imei".to_string()];
        assert!(config.validate().is_err());

        let mut config = DashboardConfig::default();
        config.api.base_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());

        let mut config = DashboardConfig::default();
        config.server.bind = "localhost".to_string();
        assert!(config.validate().is_err());
    }
}
