//! Error hierarchy for the registry replication pipeline
//!
//! Errors are grouped by the layer that raised them: configuration loading,
//! the coordination store client, and the document persister. Only store and
//! configuration errors are fatal, and only during startup.

use std::path::PathBuf;
use std::time::Duration;

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration loading or validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Coordination store failures (connect, snapshot, watch)
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Discovery document serialization or write failures
    #[error(transparent)]
    Persist(#[from] PersistError),

    /// The metrics exporter could not start
    #[error("Metrics server failed: {0}")]
    Metrics(String),

    /// Unrecoverable failures requiring process termination
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Malformed store endpoint
    #[error("Invalid endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// None of the configured endpoints accepted a connection
    #[error("Failed to connect to any of {endpoints:?}: {reason}")]
    Connect {
        endpoints: Vec<String>,
        reason: String,
    },

    /// gRPC status returned by the store
    #[error(transparent)]
    Status(#[from] Box<tonic::Status>),

    /// Request exceeded its deadline
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The store cancelled an active watch
    #[error("Watch canceled by store: {0}")]
    WatchCanceled(String),
}

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("Failed to serialize discovery document: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<tonic::Status> for Error {
    fn from(status: tonic::Status) -> Self {
        Error::Store(StoreError::Status(Box::new(status)))
    }
}
