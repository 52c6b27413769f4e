use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::build_document;
use crate::metrics;
use crate::CoordinationStore;
use crate::Error;
use crate::Persister;
use crate::Result;
use crate::ServiceRegistry;
use crate::WatchEvent;
use crate::WatchStream;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Bootstrapping,
    Watching,
    Reconnecting,
    Stopped,
}

/// How a single watch session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    /// Stream closed, errored, or could not be opened
    Closed,
    Shutdown,
}

/// Drives the replication pipeline.
///
/// Owns the registry for the process lifetime; it is the only writer, so no
/// locking is involved. Every applied event is followed by exactly one persist,
/// in arrival order.
pub struct WatchSupervisor<S, P> {
    store: S,
    persister: Arc<P>,
    registry: ServiceRegistry,
    prefix: String,
    reconnect_delay: Duration,
    state: SupervisorState,
}

impl<S, P> WatchSupervisor<S, P>
where
    S: CoordinationStore,
    P: Persister,
{
    pub fn new(
        store: S,
        persister: P,
        registry: ServiceRegistry,
        reconnect_delay: Duration,
    ) -> Self {
        let prefix = registry.parser().prefix().to_string();
        Self {
            store,
            persister: Arc::new(persister),
            registry,
            prefix,
            reconnect_delay,
            state: SupervisorState::Bootstrapping,
        }
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    /// Loads the full prefix once and persists it if anything was found.
    ///
    /// A failed snapshot is returned to the caller; startup cannot proceed
    /// without it.
    pub async fn bootstrap(&mut self) -> Result<()> {
        self.state = SupervisorState::Bootstrapping;

        let kvs = self.store.snapshot(&self.prefix).await?;
        info!(prefix = %self.prefix, keys = kvs.len(), "Data fetched from path");

        for kv in &kvs {
            let outcome = self.registry.apply_put(&kv.key, &kv.value);
            debug!(?outcome, key = %String::from_utf8_lossy(&kv.key), "Snapshot key applied");
            metrics::record_unrecognized(outcome);
        }
        metrics::record_registry_size(&self.registry);

        if self.registry.is_empty() {
            info!("Empty; found in the {} path", self.prefix);
        } else {
            self.persist().await;
        }
        Ok(())
    }

    /// Watches until `shutdown` fires, reopening the stream after a fixed delay
    /// whenever it ends.
    pub async fn run(
        &mut self,
        mut shutdown: watch::Receiver<()>,
    ) -> Result<()> {
        loop {
            self.state = SupervisorState::Watching;
            if self.watch_session(&mut shutdown).await == SessionEnd::Shutdown {
                break;
            }

            self.state = SupervisorState::Reconnecting;
            warn!(
                "Watch channel closed, reconnecting in {:?}...",
                self.reconnect_delay
            );
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = sleep(self.reconnect_delay) => {
                    metrics::WATCH_RECONNECTS.inc();
                }
            }
        }

        self.state = SupervisorState::Stopped;
        warn!(prefix = %self.prefix, "Watch supervisor stopped");
        Ok(())
    }

    async fn watch_session(
        &mut self,
        shutdown: &mut watch::Receiver<()>,
    ) -> SessionEnd {
        info!("Start watching data from path: {}", self.prefix);

        let opened = tokio::select! {
            biased;
            _ = shutdown.changed() => return SessionEnd::Shutdown,
            opened = self.store.watch(&self.prefix) => opened,
        };
        let mut stream: WatchStream = match opened {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Failed to open watch on {}: {:?}", self.prefix, e);
                return SessionEnd::Closed;
            }
        };

        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => return SessionEnd::Shutdown,
                next = stream.next() => match next {
                    Some(Ok(event)) => self.handle_event(&event).await,
                    Some(Err(e)) => {
                        warn!("Watch stream failed: {:?}", e);
                        return SessionEnd::Closed;
                    }
                    None => return SessionEnd::Closed,
                },
            }
        }
    }

    async fn handle_event(
        &mut self,
        event: &WatchEvent,
    ) {
        info!(
            "Event received: {:?} {:?} : {:?}",
            event.kind,
            String::from_utf8_lossy(&event.key),
            String::from_utf8_lossy(&event.value)
        );

        let outcome = self.registry.apply(event);
        debug!(?outcome, "Event applied");
        metrics::record_event(event.kind, outcome);
        metrics::record_registry_size(&self.registry);

        // persisted even when nothing changed
        self.persist().await;
    }

    /// Failures leave the previous document in place; the next successful
    /// persist catches up since the document is rebuilt from the full registry.
    ///
    /// The write runs on the blocking pool and is awaited, so documents still
    /// land in event order.
    async fn persist(&self) {
        let groups = build_document(&self.registry);
        let persister = self.persister.clone();
        let result = tokio::task::spawn_blocking(move || persister.persist(&groups))
            .await
            .unwrap_or_else(|e| Err(Error::Fatal(format!("persist task failed: {e}"))));

        match result {
            Ok(()) => metrics::record_persist(true),
            Err(e) => {
                metrics::record_persist(false);
                error!("Failed to persist discovery document: {:?}", e);
            }
        }
    }
}
