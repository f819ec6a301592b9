//! Session configuration, loaded once at startup from a TOML file.
//!
//! A missing file means built-in defaults; a malformed file is a startup
//! error. Nothing is re-read after startup.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::broker::{BrokerSettings, Catalog, Weights};
use crate::server::state::DEFAULT_CHUNK_CAP;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("pricing catalog does not price the default model {0:?}")]
    UnpricedDefault(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VfsSection {
    pub chunk_cap: usize,
}

impl Default for VfsSection {
    fn default() -> Self {
        Self { chunk_cap: DEFAULT_CHUNK_CAP }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrokerSection {
    pub default_model: String,
    pub default_max_tokens: u32,
    pub queue_max_wait_ms: u64,
    pub request_timeout_ms: u64,
    pub safety_factor: f64,
    pub initial_units: f64,
}

impl Default for BrokerSection {
    fn default() -> Self {
        Self {
            default_model: "default".to_owned(),
            default_max_tokens: 1024,
            queue_max_wait_ms: 30_000,
            request_timeout_ms: 120_000,
            safety_factor: 0.9,
            initial_units: 1.0,
        }
    }
}

fn default_pricing() -> BTreeMap<String, Weights> {
    let mut models = BTreeMap::new();
    models.insert("default".to_owned(), Weights { input: 3.0, cached: 0.3, output: 15.0 });
    models
}

/// The whole session config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub vfs: VfsSection,
    pub broker: BrokerSection,
    pub pricing: BTreeMap<String, Weights>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vfs: VfsSection::default(),
            broker: BrokerSection::default(),
            pricing: default_pricing(),
        }
    }
}

impl Config {
    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(ConfigError::Read { path: path.display().to_string(), source: err })
            }
        };
        toml::from_str(&raw)
            .map_err(|err| ConfigError::Parse { path: path.display().to_string(), source: err })
    }

    pub fn broker_settings(&self) -> BrokerSettings {
        BrokerSettings {
            default_max_tokens: self.broker.default_max_tokens,
            queue_max_wait: Duration::from_millis(self.broker.queue_max_wait_ms),
            request_timeout: Duration::from_millis(self.broker.request_timeout_ms),
            safety_factor: self.broker.safety_factor,
            initial_units: self.broker.initial_units,
        }
    }

    /// Build the pricing catalog; the default model must be priced.
    pub fn catalog(&self) -> Result<Catalog, ConfigError> {
        Catalog::new(self.pricing.clone(), self.broker.default_model.clone())
            .ok_or_else(|| ConfigError::UnpricedDefault(self.broker.default_model.clone()))
    }
}
