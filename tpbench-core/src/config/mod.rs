//! Configuration management

pub mod validation;

pub use validation::{Validate, ValidationError};

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub library: LibraryConfig,
    pub measurement: MeasurementConfig,
    pub discovery: DiscoveryConfig,
    pub logging: LoggingConfig,
    /// SAST tools table: tool name -> tool version -> entry
    pub tools: HashMap<String, HashMap<String, ToolEntry>>,
    /// CPG generator table: language token -> generator configuration
    pub cpg: HashMap<String, CpgGeneratorConfig>,
}

/// Location of the testability-pattern library and default output directory
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Root of the on-disk pattern catalogue
    pub tp_lib: PathBuf,
    /// Directory where engine outputs (measurements reports, discovery CSVs,
    /// run logs) are written unless overridden on the command line
    pub output_dir: PathBuf,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            tp_lib: PathBuf::from("testability_patterns"),
            output_dir: PathBuf::from("out"),
        }
    }
}

/// Measurement engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasurementConfig {
    /// Number of cooperative workers draining the SAST job queue
    pub workers: usize,
}

impl Default for MeasurementConfig {
    fn default() -> Self {
        Self { workers: 4 }
    }
}

/// Discovery engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Pattern ids excluded from discovery. This is operator data, not code:
    /// patterns whose rules are known to misbehave against large CPGs land
    /// here instead of being hard-coded anywhere.
    pub skip_pattern_ids: Vec<u32>,
    /// Wall-clock limit for a single discovery-rule execution (seconds).
    /// `None` means no limit.
    pub rule_timeout_seconds: Option<u64>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            skip_pattern_ids: Vec::new(),
            rule_timeout_seconds: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing filter (overridden by `RUST_LOG`)
    pub level: String,
    /// Filename of the per-run human-readable log written into the
    /// operation's output directory
    pub log_filename: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_filename: "tpbench.log".to_string(),
        }
    }
}

/// One entry of the SAST tools table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolEntry {
    /// Path to the per-tool command configuration file (TOML)
    pub config_file_path: PathBuf,
    /// Adapter implementation selector (e.g. "command")
    pub tool_interface: String,
    /// Uppercase language tokens this tool supports
    pub supported_languages: Vec<String>,
}

/// CPG generator entry for one language
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpgGeneratorConfig {
    /// Command template with `$SRC_DIR` and `$BINARY_OUT` placeholders
    pub command_template: String,
    /// Installation directory of the CPG toolchain; the query runner binary
    /// is resolved relative to it
    pub installation_dir: PathBuf,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigLoadError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false));

        // Add environment-specific config if ENV is set
        if let Ok(env) = std::env::var("ENV") {
            builder = builder
                .add_source(config::File::with_name(&format!("config/{}", env)).required(false));
        }

        // Add local config and environment variables last (highest priority)
        builder = builder
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("TPBENCH").separator("__"));

        let config: Config = builder.build()?.try_deserialize()?;

        config.validate()?;

        Ok(config)
    }
}

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Configuration file error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Configuration validation error: {0}")]
    Validation(#[from] ValidationError),
}
