//! TOML-based configuration persistence for the capture application.
//!
//! Reads and writes `AppConfig` to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\SigPad\config.toml`
//! - Linux:    `~/.config/sigpad/config.toml`
//! - macOS:    `~/Library/Application Support/SigPad/config.toml`
//!
//! Every field carries a serde default so the app works on first run (before
//! a config file exists) and when upgrading from an older file that is
//! missing newer fields.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::session_manager::RetryPolicy;
use crate::infrastructure::render::ExportFormat;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A field value is outside its valid domain.
    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level application configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
}

/// Canvas and export settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaptureConfig {
    /// Output canvas width in pixels.
    #[serde(default = "default_canvas_width")]
    pub canvas_width: u32,
    /// Output canvas height in pixels.
    #[serde(default = "default_canvas_height")]
    pub canvas_height: u32,
    /// Stroke thickness in pixels.
    #[serde(default = "default_pen_width")]
    pub pen_width: u32,
    /// Export format: `"png"` or `"jpeg"`.
    #[serde(default = "default_image_format")]
    pub image_format: String,
    /// JPEG encoder quality in `1..=100`; ignored for PNG.
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Bridge connection and retry settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BridgeConfig {
    /// Maximum failed service-readiness polls before giving up.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Delay before the first readiness poll, in milliseconds.
    #[serde(default = "default_short_delay_ms")]
    pub short_delay_ms: u64,
    /// Delay between subsequent readiness polls (and before the single
    /// rescheduled attempt after a component reinitialize), in milliseconds.
    #[serde(default = "default_long_delay_ms")]
    pub long_delay_ms: u64,
    /// Whether to request the exclusive device lock.  The capture flow
    /// assumes exclusivity; this exists for bridge diagnostics only.
    #[serde(default = "default_true")]
    pub exclusive: bool,
    /// Name of the primary encryption handler, if any.
    #[serde(default)]
    pub encryption_handler: Option<String>,
    /// Name of the secondary encryption handler, if any.
    #[serde(default)]
    pub encryption_handler2: Option<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            canvas_width: default_canvas_width(),
            canvas_height: default_canvas_height(),
            pen_width: default_pen_width(),
            image_format: default_image_format(),
            jpeg_quality: default_jpeg_quality(),
            log_level: default_log_level(),
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            short_delay_ms: default_short_delay_ms(),
            long_delay_ms: default_long_delay_ms(),
            exclusive: default_true(),
            encryption_handler: None,
            encryption_handler2: None,
        }
    }
}

impl CaptureConfig {
    /// Resolves the configured export format.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for an unknown format name or a
    /// JPEG quality outside `1..=100`.
    pub fn export_format(&self) -> Result<ExportFormat, ConfigError> {
        match self.image_format.as_str() {
            "png" => Ok(ExportFormat::Png),
            "jpeg" | "jpg" => {
                if !(1..=100).contains(&self.jpeg_quality) {
                    return Err(ConfigError::InvalidValue(format!(
                        "jpeg_quality {} outside 1..=100",
                        self.jpeg_quality
                    )));
                }
                Ok(ExportFormat::Jpeg {
                    quality: self.jpeg_quality,
                })
            }
            other => Err(ConfigError::InvalidValue(format!(
                "unknown image_format {other:?} (expected \"png\" or \"jpeg\")"
            ))),
        }
    }
}

impl BridgeConfig {
    /// Builds the session manager's retry policy from this config.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            short_delay: Duration::from_millis(self.short_delay_ms),
            long_delay: Duration::from_millis(self.long_delay_ms),
        }
    }
}

fn default_canvas_width() -> u32 {
    500
}
fn default_canvas_height() -> u32 {
    300
}
fn default_pen_width() -> u32 {
    2
}
fn default_image_format() -> String {
    "png".to_string()
}
fn default_jpeg_quality() -> u8 {
    92
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_max_retries() -> u32 {
    20
}
fn default_short_delay_ms() -> u64 {
    500
}
fn default_long_delay_ms() -> u64 {
    1000
}
fn default_true() -> bool {
    true
}

// ── Load / save ───────────────────────────────────────────────────────────────

/// Resolves the config file path inside the platform config directory.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    platform_config_dir()
        .ok_or(ConfigError::NoPlatformConfigDir)
        .map(|dir| dir.join("config.toml"))
}

/// Loads `AppConfig` from disk, returning `AppConfig::default()` if the file
/// does not yet exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let path = config_file_path()?;

    match std::fs::read_to_string(&path) {
        Ok(content) => {
            let cfg: AppConfig = toml::from_str(&content)?;
            Ok(cfg)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(ConfigError::Io { path, source: e }),
    }
}

/// Persists `config` to disk, creating the config directory if needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    let path = config_file_path()?;

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(&path, content).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(())
}

/// Resolves the platform config directory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("SigPad"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("sigpad"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("SigPad")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
