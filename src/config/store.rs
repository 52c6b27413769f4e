use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Connection parameters for the coordination store (etcd v3 gRPC gateway)
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StoreConfig {
    /// Store endpoints, tried in order until one accepts a connection
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<String>,

    /// TCP connect timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_in_ms: u64,

    /// Deadline for unary requests such as the bootstrap snapshot
    #[serde(default = "default_request_timeout")]
    pub request_timeout_in_ms: u64,

    /// TCP keepalive in seconds
    #[serde(default = "default_tcp_keepalive")]
    pub tcp_keepalive_in_secs: u64,

    /// Largest response accepted from the store, so a big snapshot still decodes
    #[serde(default = "default_max_decoding_message_size")]
    pub max_decoding_message_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoints: default_endpoints(),
            connect_timeout_in_ms: default_connect_timeout(),
            request_timeout_in_ms: default_request_timeout(),
            tcp_keepalive_in_secs: default_tcp_keepalive(),
            max_decoding_message_size: default_max_decoding_message_size(),
        }
    }
}

impl StoreConfig {
    pub fn validate(&self) -> Result<()> {
        if self.endpoints.is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "store.endpoints must contain at least one endpoint".into(),
            )));
        }

        for endpoint in &self.endpoints {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(Error::Config(ConfigError::Message(format!(
                    "store endpoint {endpoint} must start with http:// or https://"
                ))));
            }
        }

        if self.connect_timeout_in_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "store.connect_timeout_in_ms must be > 0".into(),
            )));
        }

        if self.request_timeout_in_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "store.request_timeout_in_ms must be > 0".into(),
            )));
        }

        if self.max_decoding_message_size == 0 {
            return Err(Error::Config(ConfigError::Message(
                "store.max_decoding_message_size must be > 0".into(),
            )));
        }

        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_in_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_in_ms)
    }
}

fn default_endpoints() -> Vec<String> {
    vec!["http://127.0.0.1:2379".to_string()]
}
fn default_connect_timeout() -> u64 {
    10_000
}
fn default_request_timeout() -> u64 {
    5_000
}
fn default_tcp_keepalive() -> u64 {
    30
}
fn default_max_decoding_message_size() -> usize {
    i32::MAX as usize
}
