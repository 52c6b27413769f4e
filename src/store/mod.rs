//! Coordination store abstraction.
//!
//! The replicator only needs two operations from the store: a one-shot prefix
//! snapshot and a prefix watch stream. [`CoordinationStore`] is the seam the
//! supervisor is written against; [`EtcdStore`] is the etcd v3 gRPC
//! implementation used by the binary.

mod etcd;
mod proto;
pub use etcd::*;


use futures::stream::BoxStream;
#[cfg(test)]
use mockall::automock;
use tonic::async_trait;

use crate::Result;

/// One key/value pair returned by a snapshot read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// Event type for watch notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventKind {
    /// Key was inserted or updated
    Put,
    /// Key was deleted
    Delete,
}

/// Watch event containing key change information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub kind: WatchEventKind,
    pub key: Vec<u8>,
    /// Empty for DELETE events
    pub value: Vec<u8>,
}

impl WatchEvent {
    pub fn put(
        key: impl Into<Vec<u8>>,
        value: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            kind: WatchEventKind::Put,
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        Self {
            kind: WatchEventKind::Delete,
            key: key.into(),
            value: Vec::new(),
        }
    }
}

/// Live watch subscription. Ends (or yields an error) when the store drops it.
pub type WatchStream = BoxStream<'static, Result<WatchEvent>>;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait CoordinationStore: Send + Sync + 'static {
    /// Reads every key under `prefix`, in key order.
    async fn snapshot(
        &self,
        prefix: &str,
    ) -> Result<Vec<KeyValue>>;

    /// Subscribes to changes under `prefix` from the current revision onward.
    ///
    /// No history is replayed; changes made while no stream is open are not seen.
    async fn watch(
        &self,
        prefix: &str,
    ) -> Result<WatchStream>;
}
