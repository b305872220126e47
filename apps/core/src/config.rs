use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

const APP_DIR_NAME: &str = "sundar";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to encode config: {0}")]
    Encode(#[from] toml::ser::Error),
    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scanned in order; the first directory to define a name keeps it.
    pub descriptor_dirs: Vec<PathBuf>,
    pub descriptor_scan_depth: usize,
    pub refresh_interval_secs: u64,
    pub max_results: u16,
    pub match_threshold: u8,
    pub search_debounce_ms: u64,
    pub playback_word_delay_ms: u64,
    pub playback_clause_delay_ms: u64,
    pub playback_sentence_delay_ms: u64,
    pub animation_interval_ms: u64,
    pub commands_enabled: bool,
    pub transcript_path: PathBuf,
    pub model: String,
    pub api_key_env: String,
    pub backend_endpoint: String,
    pub backend_timeout_secs: u64,
    #[serde(skip)]
    pub config_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = app_data_dir();
        Self {
            descriptor_dirs: default_descriptor_dirs(),
            descriptor_scan_depth: 1,
            refresh_interval_secs: 300,
            max_results: 20,
            match_threshold: 50,
            search_debounce_ms: 10,
            playback_word_delay_ms: 100,
            playback_clause_delay_ms: 200,
            playback_sentence_delay_ms: 300,
            animation_interval_ms: 40,
            commands_enabled: true,
            transcript_path: data_dir.join("transcript.log"),
            model: "gemini-1.5-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            backend_endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            backend_timeout_secs: 60,
            config_path: default_config_path(),
        }
    }
}

pub fn app_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR_NAME)
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR_NAME)
        .join(CONFIG_FILE_NAME)
}

/// User-local first, then the system-wide and local-system trees.
pub fn default_descriptor_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::with_capacity(3);
    if let Some(data) = dirs::data_dir() {
        dirs.push(data.join("applications"));
    }
    dirs.push(PathBuf::from("/usr/share/applications"));
    dirs.push(PathBuf::from("/usr/local/share/applications"));
    dirs
}

pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.max_results < 5 || cfg.max_results > 100 {
        return Err(ConfigError::Invalid("max_results out of range (5..=100)".into()));
    }

    if cfg.match_threshold > 99 {
        return Err(ConfigError::Invalid("match_threshold out of range (0..=99)".into()));
    }

    if cfg.descriptor_scan_depth == 0 {
        return Err(ConfigError::Invalid("descriptor_scan_depth must be at least 1".into()));
    }

    if cfg.refresh_interval_secs == 0 {
        return Err(ConfigError::Invalid("refresh_interval_secs must be positive".into()));
    }

    if cfg.animation_interval_ms == 0 {
        return Err(ConfigError::Invalid("animation_interval_ms must be positive".into()));
    }

    if cfg.transcript_path.as_os_str().is_empty() {
        return Err(ConfigError::Invalid("transcript_path is required".into()));
    }

    if cfg.api_key_env.trim().is_empty() {
        return Err(ConfigError::Invalid("api_key_env is required".into()));
    }

    if cfg.model.trim().is_empty() {
        return Err(ConfigError::Invalid("model is required".into()));
    }

    Ok(())
}

/// Reads the config at `path` (or the default location). A missing file
/// yields defaults bound to that path.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);

    let mut cfg = match std::fs::read_to_string(&path) {
        Ok(raw) => toml::from_str::<Config>(&raw).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Config::default(),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.clone(),
                source,
            })
        }
    };
    cfg.config_path = path;

    validate(&cfg)?;
    Ok(cfg)
}

pub fn save(cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = cfg.config_path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let encoded = to_toml(cfg)?;
    std::fs::write(&cfg.config_path, encoded).map_err(|source| ConfigError::Write {
        path: cfg.config_path.clone(),
        source,
    })
}

pub fn to_toml(cfg: &Config) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(cfg)?)
}
