use lazy_static::lazy_static;
use prometheus::IntCounter;
use prometheus::IntCounterVec;
use prometheus::IntGauge;
use prometheus::Opts;
use prometheus::Registry;
use tokio::sync::watch;
use tracing::error;
use tracing::info;
use warp::Filter;
use warp::Rejection;
use warp::Reply;

use crate::ApplyOutcome;
use crate::ServiceRegistry;
use crate::WatchEventKind;

#[cfg(test)]
mod metrics_test;

lazy_static! {
    pub static ref WATCH_EVENTS: IntCounterVec = IntCounterVec::new(
        Opts::new("sd_watch_events_total", "Watch events applied, by kind"),
        &["kind"]
    )
    .expect("metric can not be created");

    pub static ref UNRECOGNIZED_KEYS: IntCounter = IntCounter::new(
        "sd_unrecognized_keys_total",
        "Keys discarded because they do not follow the registry layout"
    )
    .expect("metric can not be created");

    pub static ref PERSIST_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("sd_persist_total", "Discovery document writes, by result"),
        &["result"]
    )
    .expect("metric can not be created");

    pub static ref WATCH_RECONNECTS: IntCounter = IntCounter::new(
        "sd_watch_reconnects_total",
        "Watch streams reopened after the previous one ended"
    )
    .expect("metric can not be created");

    pub static ref REGISTRY_SERVICES: IntGauge =
        IntGauge::new("sd_registry_services", "Services currently in the registry")
            .expect("metric can not be created");

    pub static ref REGISTRY_INSTANCES: IntGauge =
        IntGauge::new("sd_registry_instances", "Instances currently in the registry")
            .expect("metric can not be created");

    pub static ref REGISTRY: Registry = {
        let registry = Registry::new();
        register_custom_metrics(&registry).expect("collector can be registered");
        registry
    };
}

pub(crate) fn register_custom_metrics(registry: &Registry) -> prometheus::Result<()> {
    registry.register(Box::new(WATCH_EVENTS.clone()))?;
    registry.register(Box::new(UNRECOGNIZED_KEYS.clone()))?;
    registry.register(Box::new(PERSIST_TOTAL.clone()))?;
    registry.register(Box::new(WATCH_RECONNECTS.clone()))?;
    registry.register(Box::new(REGISTRY_SERVICES.clone()))?;
    registry.register(Box::new(REGISTRY_INSTANCES.clone()))?;
    Ok(())
}

pub(crate) fn record_event(
    kind: WatchEventKind,
    outcome: ApplyOutcome,
) {
    let label = match kind {
        WatchEventKind::Put => "put",
        WatchEventKind::Delete => "delete",
    };
    WATCH_EVENTS.with_label_values(&[label]).inc();
    record_unrecognized(outcome);
}

/// Counts keys outside the registry layout, from the snapshot or the watch.
pub(crate) fn record_unrecognized(outcome: ApplyOutcome) {
    if outcome == ApplyOutcome::Unrecognized {
        UNRECOGNIZED_KEYS.inc();
    }
}

pub(crate) fn record_persist(ok: bool) {
    let label = if ok { "success" } else { "failure" };
    PERSIST_TOTAL.with_label_values(&[label]).inc();
}

pub(crate) fn record_registry_size(registry: &ServiceRegistry) {
    REGISTRY_SERVICES.set(registry.service_count() as i64);
    REGISTRY_INSTANCES.set(registry.instance_count() as i64);
}

/// Serves `/metrics` until the shutdown signal fires.
///
/// Returns an error instead of serving when the port cannot be bound.
pub async fn start_server(
    port: u16,
    mut shutdown_signal: watch::Receiver<()>,
) -> crate::Result<()> {
    let metrics_route = warp::path!("metrics").and_then(metrics_handler);

    let (addr, server) = warp::serve(metrics_route)
        .try_bind_with_graceful_shutdown(([0, 0, 0, 0], port), async move {
            let _ = shutdown_signal.changed().await;
        })
        .map_err(|e| {
            error!(port, "Failed to bind metrics server: {}", e);
            crate::Error::Metrics(format!("cannot bind port {port}: {e}"))
        })?;

    info!(%addr, "Metrics server listening");
    server.await;
    Ok(())
}

async fn metrics_handler() -> Result<impl Reply, Rejection> {
    Ok(gather_text())
}

pub fn gather_text() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        error!("could not encode custom metrics: {}", e);
    };
    match String::from_utf8(buffer) {
        Ok(v) => v,
        Err(e) => {
            error!("custom metrics could not be from_utf8'd: {}", e);
            String::default()
        }
    }
}
