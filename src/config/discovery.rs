use std::path::PathBuf;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Which registry subtree to replicate and where the target groups go
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DiscoveryConfig {
    /// Registry prefix; keys look like `<prefix>/<service>/<instance>`
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// File the target-group document is written to
    #[serde(default = "default_target_file")]
    pub target_file: PathBuf,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            target_file: default_target_file(),
        }
    }
}

impl DiscoveryConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.prefix.starts_with('/') {
            return Err(Error::Config(ConfigError::Message(format!(
                "discovery.prefix {} must start with '/'",
                self.prefix
            ))));
        }

        if self.prefix.len() > 1 && self.prefix.ends_with('/') {
            return Err(Error::Config(ConfigError::Message(format!(
                "discovery.prefix {} must not end with '/'",
                self.prefix
            ))));
        }

        if self.target_file.as_os_str().is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "discovery.target_file cannot be empty".into(),
            )));
        }

        if self.target_file.file_name().is_none() || self.target_file.is_dir() {
            return Err(Error::Config(ConfigError::Message(format!(
                "discovery.target_file {} must name a file",
                self.target_file.display()
            ))));
        }

        Ok(())
    }
}

fn default_prefix() -> String {
    "/services".to_string()
}
fn default_target_file() -> PathBuf {
    PathBuf::from("tgroups.json")
}
