use super::*;

#[test]
fn test_custom_registry() {
    let registry = Registry::new_custom(Some("etcd".to_string()), None).unwrap();
    register_custom_metrics(&registry).unwrap();

    WATCH_EVENTS.with_label_values(&["put"]).inc();
    let metrics = registry.gather();
    let metric_names: Vec<_> = metrics.iter().map(|m| m.get_name()).collect();

    assert!(
        metric_names.contains(&"etcd_sd_watch_events_total"),
        "Missing etcd_sd_watch_events_total"
    );
}

#[test]
fn test_record_event_counts_unrecognized_keys() {
    let before_unrecognized = UNRECOGNIZED_KEYS.get();
    let before_deletes = WATCH_EVENTS.with_label_values(&["delete"]).get();

    record_event(WatchEventKind::Delete, ApplyOutcome::Unrecognized);
    record_event(WatchEventKind::Delete, ApplyOutcome::InstanceRemoved);

    assert!(UNRECOGNIZED_KEYS.get() >= before_unrecognized + 1);
    assert!(WATCH_EVENTS.with_label_values(&["delete"]).get() >= before_deletes + 2);
}

#[test]
fn test_gather_text_exposes_registered_metrics() {
    record_persist(true);

    let text = gather_text();

    assert!(text.contains("sd_persist_total"));
}

#[tokio::test]
async fn test_start_server_reports_port_in_use() {
    let taken = std::net::TcpListener::bind(("0.0.0.0", 0)).unwrap();
    let port = taken.local_addr().unwrap().port();
    let (_shutdown_tx, shutdown_rx) = watch::channel(());

    let result = tokio::spawn(start_server(port, shutdown_rx)).await;

    assert!(matches!(result, Ok(Err(crate::Error::Metrics(_)))));
}

#[tokio::test]
async fn test_start_server_stops_on_shutdown_signal() {
    let free = std::net::TcpListener::bind(("0.0.0.0", 0)).unwrap();
    let port = free.local_addr().unwrap().port();
    drop(free);
    let (shutdown_tx, shutdown_rx) = watch::channel(());

    let handle = tokio::spawn(start_server(port, shutdown_rx));
    shutdown_tx.send(()).unwrap();

    let result = tokio::time::timeout(std::time::Duration::from_secs(5), handle)
        .await
        .unwrap();
    assert!(matches!(result, Ok(Ok(()))));
}
