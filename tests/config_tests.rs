// SPDX-License-Identifier: MPL-2.0

//! Integration tests for configuration module

use obs_bridge::{BridgeConfig, BridgeError};
use std::time::Duration;

#[test]
fn test_config_default() {
    let config = BridgeConfig::default();

    assert_eq!(config.stop_timeout(), Duration::from_secs(30));
    assert_eq!(config.stop_poll_interval(), Duration::from_millis(10));
    assert!(
        config.auto_dispose_outputs,
        "Outputs should auto-dispose by default"
    );
    assert_eq!(config.log_filter, "warn");
    assert!(config.recording_dir.is_none());
}

#[test]
fn test_partial_json_takes_defaults() {
    let config = BridgeConfig::from_json_str(r#"{"stop_timeout_ms": 500}"#).unwrap();

    assert_eq!(config.stop_timeout(), Duration::from_millis(500));
    assert_eq!(
        config.stop_poll_interval(),
        BridgeConfig::default().stop_poll_interval()
    );
}

#[test]
fn test_unknown_keys_are_ignored() {
    let config =
        BridgeConfig::from_json_str(r#"{"log_filter": "debug", "theme": "dark"}"#).unwrap();
    assert_eq!(config.log_filter, "debug");
}

#[test]
fn test_zero_poll_interval_rejected() {
    let err = BridgeConfig::from_json_str(r#"{"stop_poll_interval_ms": 0}"#).unwrap_err();
    assert!(matches!(err, BridgeError::Config(_)));
}

#[test]
fn test_malformed_json_is_json_error() {
    let err = BridgeConfig::from_json_str("{not json").unwrap_err();
    assert!(matches!(err, BridgeError::Json(_)));
}

#[test]
fn test_save_and_load() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("nested").join("config.json");
    let config = BridgeConfig {
        stop_timeout_ms: 1_000,
        auto_dispose_outputs: false,
        recording_dir: Some(tmp.path().join("videos")),
        ..BridgeConfig::default()
    };

    config.save(&path).unwrap();
    let loaded = BridgeConfig::load(&path).unwrap();

    assert_eq!(loaded, config);
    assert_eq!(loaded.recording_dir(), tmp.path().join("videos"));
}

#[test]
fn test_missing_file_is_io_error() {
    let tmp = tempfile::tempdir().unwrap();
    let err = BridgeConfig::load(&tmp.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, BridgeError::Io(_)));
}

#[test]
fn test_default_recording_dir_ends_in_app_folder() {
    let dir = BridgeConfig::default().recording_dir();
    assert!(dir.ends_with(obs_bridge::constants::RECORDING_FOLDER));
}
