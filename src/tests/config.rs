// src/tests/config.rs
use std::env;

use crate::config_loader::{load_config, PipelineConfig, Profile};
use crate::record::LogLevel;

#[test]
fn defaults_match_documented_values() {
    let config = PipelineConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.batch_size, 10);
    assert_eq!(config.flush_interval_ms, 5000);
    assert_eq!(config.max_retries, 3);
    assert_eq!(config.retry_base_delay_ms, 1000);
    assert_eq!(config.max_buffer_size, 1000);
    assert!(!config.remote_enabled);
}

#[test]
fn development_profile_enables_all_levels_and_verbose_console() {
    let config = PipelineConfig::default();
    assert_eq!(config.profile, Profile::Development);
    assert_eq!(config.min_enabled_level().unwrap(), LogLevel::Trace);
    assert!(config.verbose_console());
}

#[test]
fn production_profile_restricts_levels_and_disables_coloring() {
    let config = PipelineConfig {
        profile: Profile::Production,
        ..PipelineConfig::default()
    };
    assert_eq!(config.min_enabled_level().unwrap(), LogLevel::Info);
    assert!(!config.verbose_console());
}

#[test]
fn explicit_level_set_overrides_profile() {
    let config = PipelineConfig {
        enabled_levels: vec!["WARN".into(), "error".into(), "Fatal".into()],
        ..PipelineConfig::default()
    };
    assert_eq!(config.min_enabled_level().unwrap(), LogLevel::Warn);
}

#[test]
fn unknown_level_name_fails_validation() {
    let config = PipelineConfig {
        enabled_levels: vec!["loud".into()],
        ..PipelineConfig::default()
    };
    let result = config.validate();
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("loud"));
}

#[test]
fn remote_without_endpoint_fails_at_construction_time() {
    let config = PipelineConfig {
        remote_enabled: true,
        endpoint: None,
        ..PipelineConfig::default()
    };
    let result = config.validate();
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("endpoint"));

    let config = PipelineConfig {
        remote_enabled: true,
        endpoint: Some("   ".into()),
        ..PipelineConfig::default()
    };
    assert!(config.validate().is_err());

    let config = PipelineConfig {
        remote_enabled: true,
        endpoint: Some("https://logs.example.com/batch".into()),
        ..PipelineConfig::default()
    };
    assert!(config.validate().is_ok());
}

#[test]
fn zero_batch_size_is_rejected() {
    let config = PipelineConfig {
        batch_size: 0,
        ..PipelineConfig::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn toml_config_file_shape_parses() {
    let config: PipelineConfig = toml::from_str(
        r#"
        profile = "production"
        remote_enabled = true
        endpoint = "https://logs.example.com/batch"
        batch_size = 20

        [auth_headers]
        "X-Api-Key" = "k-123"
        "#,
    )
    .expect("config file shape should parse");

    assert_eq!(config.profile, Profile::Production);
    assert_eq!(config.batch_size, 20);
    assert_eq!(config.auth_headers.get("X-Api-Key").map(String::as_str), Some("k-123"));
    // unspecified knobs keep their defaults
    assert_eq!(config.flush_interval_ms, 5000);
    assert!(config.validate().is_ok());
}

#[test]
fn env_overrides_apply_through_figment() {
    env::set_var("LOGSHIP_PROFILE", "production");
    env::set_var("LOGSHIP_BATCH_SIZE", "25");
    env::set_var("LOGSHIP_MAX_RETRIES", "5");

    let config = load_config().expect("config should load");
    assert_eq!(config.profile, Profile::Production);
    assert_eq!(config.batch_size, 25);
    assert_eq!(config.max_retries, 5);

    env::remove_var("LOGSHIP_PROFILE");
    env::remove_var("LOGSHIP_BATCH_SIZE");
    env::remove_var("LOGSHIP_MAX_RETRIES");
}
