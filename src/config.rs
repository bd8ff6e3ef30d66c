// `::config` disambiguates the crate from this module.
use ::config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    pub scope: ScopeConfig,
    pub capture: CaptureConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ScopeConfig {
    pub host: String,
    pub port: u16,
    pub connect_timeout_secs: u64,
    /// Bounds every instrument round-trip; deep-memory transfers need a
    /// generous value.
    pub read_timeout_secs: u64,
    pub write_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CaptureConfig {
    /// Channels to capture (1..=4). Empty means auto-detect the displayed
    /// ones.
    #[serde(default)]
    pub channels: Vec<u8>,
    /// Cap on CSV rows; omit to keep every sample.
    pub max_rows: Option<usize>,
    pub output_dir: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub log_level: String,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            host: "192.168.1.100".to_string(),
            port: crate::siglent::SCPI_PORT,
            connect_timeout_secs: 5,
            read_timeout_secs: 30,
            write_timeout_secs: 5,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            channels: Vec::new(),
            max_rows: None,
            output_dir: ".".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Load configuration from file with layered fallbacks
pub fn load_config(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder().add_source(Config::try_from(&AppConfig::default())?);

    if let Some(path) = config_path {
        if path.exists() {
            builder = builder.add_source(File::from(path));
        } else {
            return Err(ConfigError::Message(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
    } else if Path::new("scope-capture.toml").exists() {
        builder = builder.add_source(File::with_name("scope-capture.toml"));
    }

    // Add environment variable overrides with prefix "SCOPE_CAPTURE_"
    builder = builder.add_source(
        Environment::with_prefix("SCOPE_CAPTURE")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    config.try_deserialize::<AppConfig>()
}

/// Load configuration with better error handling and defaults
pub fn load_config_or_default(config_path: Option<&Path>) -> AppConfig {
    match load_config(config_path) {
        Ok(config) => {
            log::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            log::warn!("Failed to load config ({}), using defaults", e);
            AppConfig::default()
        }
    }
}
