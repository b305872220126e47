use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use sundar_core::config::{self, Config, ConfigError};

fn unique_path(label: &str) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir()
        .join(format!("sundar-config-{label}-{unique}"))
        .join("config.toml")
}

#[test]
fn accepts_default_config() {
    let cfg = Config::default();
    assert_eq!(cfg.max_results, 20);
    assert_eq!(cfg.match_threshold, 50);
    assert_eq!(cfg.refresh_interval_secs, 300);
    assert_eq!(cfg.search_debounce_ms, 10);
    assert_eq!(cfg.animation_interval_ms, 40);
    assert_eq!(cfg.api_key_env, "GEMINI_API_KEY");
    assert!(cfg.commands_enabled);
    assert!(cfg.config_path.to_string_lossy().contains("sundar"));
    assert!(cfg
        .descriptor_dirs
        .iter()
        .any(|dir| dir == &PathBuf::from("/usr/share/applications")));
    assert!(config::validate(&cfg).is_ok());
}

#[test]
fn rejects_max_results_out_of_range() {
    let cfg = Config {
        max_results: 200,
        ..Default::default()
    };
    assert!(matches!(config::validate(&cfg), Err(ConfigError::Invalid(_))));
}

#[test]
fn rejects_threshold_and_zero_intervals() {
    let cfg = Config {
        match_threshold: 100,
        ..Default::default()
    };
    assert!(config::validate(&cfg).is_err());

    let cfg = Config {
        refresh_interval_secs: 0,
        ..Default::default()
    };
    assert!(config::validate(&cfg).is_err());

    let cfg = Config {
        api_key_env: "  ".to_string(),
        ..Default::default()
    };
    assert!(config::validate(&cfg).is_err());
}

#[test]
fn missing_file_yields_defaults_bound_to_path() {
    let path = unique_path("missing");
    let cfg = config::load(Some(&path)).unwrap();
    assert_eq!(cfg.config_path, path);
    assert_eq!(cfg.max_results, 20);
    assert!(!path.exists());
}

#[test]
fn save_then_load_preserves_values() {
    let path = unique_path("roundtrip");
    let mut cfg = config::load(Some(&path)).unwrap();
    cfg.commands_enabled = false;
    cfg.max_results = 10;
    cfg.descriptor_dirs = vec![PathBuf::from("/opt/apps")];
    config::save(&cfg).unwrap();

    let loaded = config::load(Some(&path)).unwrap();
    assert_eq!(loaded, cfg);

    std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
}

#[test]
fn partial_file_fills_in_defaults() {
    let path = unique_path("partial");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "max_results = 8\nmodel = \"gemini-1.5-pro\"\n").unwrap();

    let cfg = config::load(Some(&path)).unwrap();
    assert_eq!(cfg.max_results, 8);
    assert_eq!(cfg.model, "gemini-1.5-pro");
    assert_eq!(cfg.match_threshold, 50);

    std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
}

#[test]
fn malformed_or_invalid_file_is_rejected() {
    let path = unique_path("bad");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();

    std::fs::write(&path, "max_results = \"many\"\n").unwrap();
    assert!(matches!(config::load(Some(&path)), Err(ConfigError::Parse { .. })));

    std::fs::write(&path, "max_results = 1\n").unwrap();
    assert!(matches!(config::load(Some(&path)), Err(ConfigError::Invalid(_))));

    std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
}

#[test]
fn encoded_config_is_toml() {
    let encoded = config::to_toml(&Config::default()).unwrap();
    assert!(encoded.contains("max_results = 20"));
    assert!(!encoded.contains("config_path"));
}
