//! Configuration
//!
//! Loads configuration from a TOML file at `~/.config/mirage/config.toml`.
//! Auto-generates a default config file on first run if missing.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::mirror::EngineOptions;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log: LogConfig,
    pub engine: EngineConfig,
    pub transport: TransportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Tracing filter used when `RUST_LOG` is not set.
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "mirage=info".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Mirror dock/taskbar windows.
    pub chrome_visible: bool,
    /// Title/class substrings of windows never to mirror.
    pub deny_list: Vec<String>,
    /// Upper bound on the synchronous move/resize confirmation wait.
    pub configure_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chrome_visible: true,
            deny_list: Vec::new(),
            configure_timeout_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Update batch socket; defaults to the uid-scoped runtime path.
    pub socket: Option<PathBuf>,
    /// How often accumulated updates are pushed to the host.
    pub flush_interval_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            socket: None,
            flush_interval_ms: 100,
        }
    }
}

impl Config {
    /// Load configuration from file, or use defaults if the file doesn't
    /// exist.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            info!("config file not found at {:?}, using defaults", config_path);
            if let Err(err) = Self::save_default(&config_path) {
                warn!("failed to create default config file: {err}");
            }
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).context("reading config file")?;
        let config: Config = toml::from_str(&content).context("parsing config file")?;

        info!("configuration loaded from {:?}", config_path);
        debug!("config: {:?}", config);

        Ok(config)
    }

    /// Path to the config file.
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("cannot determine config directory")?;
        Ok(config_dir.join("mirage").join("config.toml"))
    }

    fn save_default(path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("creating config directory")?;
        }
        let content = toml::to_string_pretty(&Self::default()).context("serializing defaults")?;
        fs::write(path, content).context("writing default config")?;
        info!("wrote default configuration to {:?}", path);
        Ok(())
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            chrome_visible: self.engine.chrome_visible,
            deny_list: self.engine.deny_list.clone(),
            configure_timeout: Duration::from_millis(self.engine.configure_timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_roundtrip_through_toml() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.engine.configure_timeout_ms, 2000);
        assert!(parsed.engine.chrome_visible);
        assert_eq!(parsed.transport.flush_interval_ms, 100);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[engine]\nchrome_visible = false\n").unwrap();
        assert!(!parsed.engine.chrome_visible);
        assert_eq!(parsed.engine.configure_timeout_ms, 2000);
        assert_eq!(parsed.log.filter, "mirage=info");
    }
}
