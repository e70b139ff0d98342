//! Configuration types and loading logic.

use std::path::PathBuf;

use beacon_tracing::TracingConfig;
use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;

/// Top-level beacon configuration. Every section has usable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BeaconConfig {
    #[serde(default)]
    pub collector: CollectorConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub shop: ShopConfig,
    #[serde(default)]
    pub tracing: TracingConfig,
}

/// Measurement collection endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Property all hits are reported under.
    #[serde(default = "default_tracking_id")]
    pub tracking_id: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Where host settings (including the client id) are persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShopConfig {
    /// Domain reported with page views. Falls back to the store's
    /// `SHOP_DOMAIN` value when unset.
    #[serde(default)]
    pub domain: Option<String>,
}

fn default_endpoint() -> String {
    "https://ssl.google-analytics.com/collect".to_string()
}

fn default_tracking_id() -> String {
    "UA-54881067-1".to_string()
}

fn default_timeout() -> u64 {
    10
}

fn default_store_path() -> PathBuf {
    PathBuf::from("storefront-beacon.json")
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            tracking_id: default_tracking_id(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

impl BeaconConfig {
    /// Load configuration from TOML file and environment variables.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (BEACON_ prefix, __ for nesting)
    /// 2. TOML config file (missing file is fine)
    /// 3. Defaults
    pub fn load(config_path: &str) -> anyhow::Result<Self> {
        let config: BeaconConfig = Figment::new()
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("BEACON_").split("__"))
            .extract()?;

        Ok(config)
    }
}
