use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

/// Log destination. Stdout unless `dir` is set.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct LogConfig {
    /// Directory receiving `etcd_sd.log`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}
