//! strmatch configuration file handling
//!
//! Provides default configuration generation and loading for the matcher.
//! Configuration files are TOML. Every section is optional; anything left out
//! takes the built-in default.
//!
//! Tier thresholds are defaults, not physical constants. Forensic reporting
//! bands are jurisdiction- and assay-specific, so operators are expected to
//! set them here.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use strmatch::matching::{BatchConfig, TierThresholds};
use strmatch::profile::AlleleRange;

/// Default log level
const DEFAULT_LOG_LEVEL: &str = "info";

/// Matcher configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StrmatchConfig {
    /// Plausible repeat-count bounds
    #[serde(default)]
    pub profile: AlleleRange,

    /// Lower edges of the match tiers
    #[serde(default)]
    pub thresholds: TierThresholds,

    /// Batch matcher tuning
    #[serde(default)]
    pub batch: BatchConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            file: None,
        }
    }
}

impl StrmatchConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;

        let config: StrmatchConfig = toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config file '{}': {}", path.display(), e))?;

        Ok(config)
    }

    /// Load from `--config` if given, else the default path if it exists,
    /// else built-in defaults.
    pub fn resolve(config_path: Option<&str>) -> Result<Self, Box<dyn std::error::Error>> {
        match config_path {
            Some(path) => Self::load(Path::new(path)),
            None => {
                let path = default_config_path();
                if path.exists() {
                    Self::load(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Generate default configuration content as a string with comments
    pub fn generate_default_toml() -> String {
        r#"# strmatch configuration
#
# Every section is optional. Values shown are the built-in defaults.

[profile]
# Plausible repeat-count bounds. Alleles outside min..=max are rejected.
min = 1
max = 50

[thresholds]
# Lower edges of the match tiers (closed). Must strictly descend within 0..=1.
# These are defaults, not forensic standards: set them per jurisdiction/assay.
definite = 0.95
probable = 0.80
partial = 0.50

[batch]
# Concurrent scoring tasks. 0 uses all available cores.
max_workers = 0

# Keep only the best N results (optional)
# top_n = 10

# Attach per-locus shared/not-shared flags to each result
include_breakdown = false

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log file path (optional, logs to stderr if not specified)
# file = "/var/log/strmatch/strmatch.log"
"#
        .to_string()
    }

    /// Create and save a default configuration file
    pub fn create_default(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let contents = Self::generate_default_toml();

        // Create parent directory if needed
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        fs::write(config_path, contents).map_err(|e| {
            format!(
                "Failed to write config file '{}': {}",
                config_path.display(),
                e
            )
        })?;

        Ok(())
    }
}

/// Get the default config file path
///
/// - Linux: ~/.config/strmatch/config.toml
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("strmatch")
        .join("config.toml")
}

/// Write a commented default config
pub fn execute_init(path: Option<String>, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = path.map(PathBuf::from).unwrap_or_else(default_config_path);

    if path.exists() && !force {
        return Err(format!(
            "Config file '{}' already exists (use --force to overwrite)",
            path.display()
        )
        .into());
    }

    StrmatchConfig::create_default(&path)?;
    println!("Created: {}", path.display());
    Ok(())
}
