//! Persistence infrastructure: the TOML application configuration.

pub mod config;

pub use config::{load_config, save_config, AppConfig, BridgeConfig, CaptureConfig, ConfigError};
