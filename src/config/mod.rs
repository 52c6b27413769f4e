//! Configuration management for the registry replicator.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file support (`CONFIG_PATH`)
//! - Environment variable overrides (`SD__` prefix)
//! - Component-wise validation
mod discovery;
mod logging;
mod monitoring;
mod store;
mod watch;
pub use discovery::*;
pub use logging::*;
pub use monitoring::*;
pub use store::*;
pub use watch::*;

#[cfg(test)]
mod config_test;

use std::env;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Main configuration container
///
/// Combines all subsystem configurations with hierarchical override support:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables (highest priority)
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct SdConfig {
    /// Coordination store connection parameters
    #[serde(default)]
    pub store: StoreConfig,
    /// Watched prefix and output document location
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    /// Watch supervision parameters
    #[serde(default)]
    pub watch: WatchConfig,
    /// Metrics exporter settings
    #[serde(default)]
    pub monitoring: MonitoringConfig,
    /// Log destination
    #[serde(default)]
    pub log: LogConfig,
}

impl SdConfig {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// Sources are merged in the following order (later sources override earlier):
    /// 1. Type defaults (lowest priority)
    /// 2. Configuration file from `CONFIG_PATH` environment variable (if set)
    /// 3. Environment variables with `SD__` prefix (highest priority)
    ///
    /// Callers MUST call `validate()` before using the configuration.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("SD__DISCOVERY__PREFIX", "/registry");
    /// let cfg = SdConfig::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(environment());

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies additional configuration overrides from file without validation.
    ///
    /// Merging order (later sources override earlier):
    /// 1. Current configuration values
    /// 2. New configuration file
    /// 3. Latest environment variables (highest priority)
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(environment())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validates configuration and returns validated instance.
    pub fn validate(self) -> Result<Self> {
        self.store.validate()?;
        self.discovery.validate()?;
        self.watch.validate()?;
        self.monitoring.validate()?;
        Ok(self)
    }
}

fn environment() -> Environment {
    Environment::with_prefix("SD")
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("store.endpoints")
}
