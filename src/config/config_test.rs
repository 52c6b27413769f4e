use serial_test::serial;
use temp_env::with_vars;

use super::*;

fn cleanup_all_sd_env_vars() {
    for (key, _) in std::env::vars() {
        if key.starts_with("SD__") || key == "CONFIG_PATH" {
            std::env::remove_var(&key);
        }
    }
}

#[test]
#[serial]
fn default_config_should_initialize_with_hardcoded_values() {
    let config = SdConfig::default();

    assert_eq!(config.store.endpoints, vec!["http://127.0.0.1:2379".to_string()]);
    assert_eq!(config.store.connect_timeout_in_ms, 10_000);
    assert_eq!(config.store.request_timeout_in_ms, 5_000);
    assert_eq!(config.discovery.prefix, "/services");
    assert_eq!(config.discovery.target_file, std::path::PathBuf::from("tgroups.json"));
    assert_eq!(config.watch.reconnect_delay_in_ms, 5_000);
    assert!(!config.monitoring.prometheus_enabled);
    assert!(config.log.dir.is_none());
}

#[test]
#[serial]
fn new_should_merge_environment_overrides() {
    cleanup_all_sd_env_vars();
    with_vars(
        vec![
            ("SD__DISCOVERY__PREFIX", Some("/registry")),
            ("SD__WATCH__RECONNECT_DELAY_IN_MS", Some("250")),
        ],
        || {
            let config = SdConfig::new().unwrap();

            assert_eq!(config.discovery.prefix, "/registry");
            assert_eq!(config.watch.reconnect_delay_in_ms, 250);
        },
    );
}

#[test]
#[serial]
fn new_should_read_decoding_limit_from_environment() {
    cleanup_all_sd_env_vars();
    with_vars(
        vec![("SD__STORE__MAX_DECODING_MESSAGE_SIZE", Some("67108864"))],
        || {
            let config = SdConfig::new().unwrap();

            assert_eq!(config.store.max_decoding_message_size, 64 * 1024 * 1024);
        },
    );
}

#[test]
#[serial]
fn new_should_parse_endpoint_list_from_environment() {
    cleanup_all_sd_env_vars();
    with_vars(
        vec![(
            "SD__STORE__ENDPOINTS",
            Some("http://10.0.0.1:2379,http://10.0.0.2:2379"),
        )],
        || {
            let config = SdConfig::new().unwrap();

            assert_eq!(
                config.store.endpoints,
                vec![
                    "http://10.0.0.1:2379".to_string(),
                    "http://10.0.0.2:2379".to_string()
                ]
            );
        },
    );
}

#[test]
#[serial]
fn with_override_config_should_merge_file_settings() {
    cleanup_all_sd_env_vars();
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("override.toml");

    std::fs::write(
        &config_path,
        r#"
        [discovery]
        prefix = "/apps"
        target_file = "/tmp/sd/targets.json"

        [monitoring]
        prometheus_enabled = true
        prometheus_port = 9500
        "#,
    )
    .unwrap();

    let empty_vars: Vec<(&str, Option<&str>)> = vec![];
    with_vars(empty_vars, || {
        let base_config = SdConfig::new().expect("success");
        let config = base_config
            .with_override_config(config_path.to_str().unwrap())
            .unwrap();

        assert_eq!(config.discovery.prefix, "/apps");
        assert_eq!(
            config.discovery.target_file,
            std::path::PathBuf::from("/tmp/sd/targets.json")
        );
        assert!(config.monitoring.prometheus_enabled);
        assert_eq!(config.monitoring.prometheus_port, 9500);
        // untouched sections keep their defaults
        assert_eq!(config.watch.reconnect_delay_in_ms, 5_000);
    });
}

#[test]
#[serial]
fn environment_variables_should_have_highest_priority() {
    cleanup_all_sd_env_vars();
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("base.toml");
    std::fs::write(
        &config_path,
        r#"
        [discovery]
        prefix = "/from-file"
        "#,
    )
    .unwrap();

    with_vars(
        vec![
            ("CONFIG_PATH", Some(config_path.to_str().unwrap())),
            ("SD__DISCOVERY__PREFIX", Some("/from-env")),
        ],
        || {
            let config = SdConfig::new().unwrap();
            assert_eq!(config.discovery.prefix, "/from-env");
        },
    );
}

#[test]
#[serial]
fn new_should_fail_when_config_path_is_missing() {
    cleanup_all_sd_env_vars();
    with_vars(vec![("CONFIG_PATH", Some("/nonexistent/etcd_sd.toml"))], || {
        assert!(SdConfig::new().is_err());
    });
}

#[test]
fn validation_should_reject_relative_prefix() {
    let mut config = SdConfig::default();
    config.discovery.prefix = "services".to_string();

    assert!(config.validate().is_err());
}

#[test]
fn validation_should_reject_prefix_with_trailing_slash() {
    let mut config = SdConfig::default();
    config.discovery.prefix = "/services/".to_string();

    assert!(config.validate().is_err());
}

#[test]
fn validation_should_reject_zero_reconnect_delay() {
    let mut config = SdConfig::default();
    config.watch.reconnect_delay_in_ms = 0;

    assert!(config.validate().is_err());
}

#[test]
fn validation_should_reject_privileged_metrics_port() {
    let mut config = SdConfig::default();
    config.monitoring.prometheus_enabled = true;
    config.monitoring.prometheus_port = 80;

    assert!(config.validate().is_err());
}

#[test]
fn validation_should_accept_defaults() {
    assert!(SdConfig::default().validate().is_ok());
}
