//! Configuration management for adb-reader.
//!
//! This module provides TOML-based configuration file loading and saving.
//! The default configuration path is `~/.config/adb-reader/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use listing::{FileTypeRecognizer, ListingOptions, ReferencePolicy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::android::DEFAULT_STORAGE_ROOT;
use crate::runner::adb_file_name;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("storage_root must be an absolute device path, got {0:?}")]
    InvalidStorageRoot(String),

    #[error("{name} must be at most {max} seconds, got {value}")]
    InvalidTimeout {
        name: &'static str,
        value: u64,
        max: u64,
    },

    #[error("{0} must not be empty")]
    EmptyExtensionList(&'static str),

    #[error("log_level must be one of: trace, debug, info, warn, error; got {0}")]
    InvalidLogLevel(String),
}

/// Valid log level values for tracing configuration.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Upper bound for the configurable timeouts (one day).
const MAX_TIMEOUT_SECS: u64 = 86_400;

/// Environment variable overriding `bridge.adb_dir`.
pub const ENV_ADB_DIR: &str = "ADB_READER_ADB_DIR";

/// Environment variable overriding `logging.log_level`.
pub const ENV_LOG_LEVEL: &str = "ADB_READER_LOG_LEVEL";

/// Main configuration structure for adb-reader.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// adb location and command deadlines.
    pub bridge: BridgeConfig,

    /// Listing filters.
    pub listing: ListingConfig,

    /// Log output.
    pub logging: LoggingConfig,
}

/// adb location and command deadlines.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BridgeConfig {
    /// Directory holding the adb executable. Empty means look it up in PATH.
    pub adb_dir: PathBuf,

    /// Device folder whose filesystem `info --storage` reports.
    pub storage_root: String,

    /// Deadline for shell queries in seconds (0 = no deadline).
    pub command_timeout_secs: u64,

    /// Deadline for push and pull in seconds (0 = no deadline).
    pub transfer_timeout_secs: u64,
}

/// Listing filters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ListingConfig {
    /// Extensions listed as images.
    pub image_extensions: Vec<String>,

    /// Extensions listed as videos.
    pub video_extensions: Vec<String>,

    /// Extensions listed as audio.
    pub audio_extensions: Vec<String>,

    /// Name suffixes accepted without a known extension.
    pub allowed_suffixes: Vec<String>,

    /// Names never listed.
    pub excluded_names: Vec<String>,

    /// What to do with entries the plain listing cannot name.
    pub reference_policy: ReferencePolicy,
}

/// Log output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Optional file receiving a copy of the log.
    pub log_file: Option<PathBuf>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            adb_dir: PathBuf::new(),
            storage_root: DEFAULT_STORAGE_ROOT.to_string(),
            command_timeout_secs: 60,
            transfer_timeout_secs: 0,
        }
    }
}

impl Default for ListingConfig {
    fn default() -> Self {
        let options = ListingOptions::default();
        Self {
            image_extensions: options.recognizer.image_extensions,
            video_extensions: options.recognizer.video_extensions,
            audio_extensions: options.recognizer.audio_extensions,
            allowed_suffixes: options.allowed_suffixes,
            excluded_names: options.excluded_names,
            reference_policy: options.reference_policy,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

impl BridgeConfig {
    /// Shell query deadline, `None` when disabled.
    pub fn command_timeout(&self) -> Option<Duration> {
        non_zero_secs(self.command_timeout_secs)
    }

    /// Transfer deadline, `None` when disabled.
    pub fn transfer_timeout(&self) -> Option<Duration> {
        non_zero_secs(self.transfer_timeout_secs)
    }
}

fn non_zero_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("adb-reader")
        .join("config.toml")
}

impl Config {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables take precedence over config file values.
    /// Supported variables:
    /// - ADB_READER_ADB_DIR: Override the adb directory
    /// - ADB_READER_LOG_LEVEL: Override log level (trace, debug, info, warn, error)
    ///
    /// Runs before logging is set up, so the applied variables and their
    /// values are returned for the caller to log.
    pub fn apply_env_overrides(&mut self) -> Vec<(&'static str, String)> {
        let mut applied = Vec::new();

        if let Ok(dir) = std::env::var(ENV_ADB_DIR) {
            if !dir.is_empty() {
                self.bridge.adb_dir = PathBuf::from(&dir);
                applied.push((ENV_ADB_DIR, dir));
            }
        }

        if let Ok(level) = std::env::var(ENV_LOG_LEVEL) {
            if !level.is_empty() {
                self.logging.log_level = level.clone();
                applied.push((ENV_LOG_LEVEL, level));
            }
        }

        applied
    }

    /// Validate the configuration values.
    ///
    /// Returns an error if any configuration value is outside the valid range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let root = &self.bridge.storage_root;
        if root.is_empty() || !root.starts_with('/') {
            return Err(ConfigError::InvalidStorageRoot(root.clone()));
        }

        for (name, value) in [
            ("command_timeout_secs", self.bridge.command_timeout_secs),
            ("transfer_timeout_secs", self.bridge.transfer_timeout_secs),
        ] {
            if value > MAX_TIMEOUT_SECS {
                return Err(ConfigError::InvalidTimeout {
                    name,
                    value,
                    max: MAX_TIMEOUT_SECS,
                });
            }
        }

        for (name, list) in [
            ("image_extensions", &self.listing.image_extensions),
            ("video_extensions", &self.listing.video_extensions),
            ("audio_extensions", &self.listing.audio_extensions),
        ] {
            if list.is_empty() {
                return Err(ConfigError::EmptyExtensionList(name));
            }
        }

        let level = self.logging.log_level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.logging.log_level.clone()));
        }

        Ok(())
    }

    /// Directory holding adb.
    ///
    /// The configured directory wins; otherwise the directory of the `adb`
    /// found in PATH. `None` when neither is available.
    pub fn resolve_adb_dir(&self) -> Option<PathBuf> {
        if !self.bridge.adb_dir.as_os_str().is_empty() {
            return Some(self.bridge.adb_dir.clone());
        }
        match which::which(adb_file_name()) {
            Ok(path) => path.parent().map(Path::to_path_buf),
            Err(e) => {
                tracing::debug!("adb not found in PATH: {}", e);
                None
            }
        }
    }

    /// Listing options built from the `[listing]` section.
    pub fn listing_options(&self) -> ListingOptions {
        ListingOptions {
            excluded_names: self.listing.excluded_names.clone(),
            recognizer: FileTypeRecognizer {
                image_extensions: self.listing.image_extensions.clone(),
                video_extensions: self.listing.video_extensions.clone(),
                audio_extensions: self.listing.audio_extensions.clone(),
            },
            allowed_suffixes: self.listing.allowed_suffixes.clone(),
            reference_policy: self.listing.reference_policy,
            ..ListingOptions::default()
        }
    }

    /// Load configuration from a file.
    ///
    /// If the file does not exist, returns the default configuration.
    /// If the file exists but is invalid TOML, returns an error with
    /// a helpful message.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self> {
        Self::load(default_config_path())
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| anyhow::anyhow!("Invalid TOML configuration: {}", format_toml_error(&e)))
    }

    /// Save configuration to a file.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = self.to_toml()?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::debug!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }
}

/// Format a TOML deserialization error for user-friendly display.
fn format_toml_error(error: &toml::de::Error) -> String {
    let mut msg = error.message().to_string();

    if let Some(span) = error.span() {
        msg.push_str(&format!(" (at position {}..{})", span.start, span.end));
    }

    msg
}
