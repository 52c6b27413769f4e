use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Watch supervision parameters
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WatchConfig {
    /// Fixed delay before a closed watch stream is reopened
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_in_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_in_ms: default_reconnect_delay(),
        }
    }
}

impl WatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.reconnect_delay_in_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "watch.reconnect_delay_in_ms must be > 0".into(),
            )));
        }
        Ok(())
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_in_ms)
    }
}

fn default_reconnect_delay() -> u64 {
    5_000
}
