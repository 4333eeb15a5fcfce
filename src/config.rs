//! Configuration management for Post-Scrapper

use crate::{Error, Result};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

/// How the session obtains its browser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachMode {
    /// Spawn a fresh persistent browser instance rooted at the profile dir
    Launch,
    /// Connect to an already-running browser via its remote debugging port
    AttachByEndpoint,
}

/// Session configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Acquisition strategy
    pub attach_mode: AttachMode,

    /// Headless mode (no GUI)
    pub headless: bool,

    /// Persistent user-data directory (cookies, cache, fingerprint state)
    pub profile_dir: PathBuf,

    /// Remote debugging port, required iff attach mode
    pub endpoint_port: Option<u16>,

    /// Bounded window for the endpoint to become reachable, in milliseconds
    pub connect_timeout_ms: u64,

    /// Readiness poll interval, in milliseconds
    pub poll_interval_ms: u64,

    /// Chrome executable override
    pub chrome_path: Option<String>,

    /// Block for operator input before teardown
    pub interactive_pause: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            attach_mode: AttachMode::Launch,
            headless: false,
            profile_dir: PathBuf::from("./chromedata"),
            endpoint_port: None,
            connect_timeout_ms: 20000,
            poll_interval_ms: 250,
            chrome_path: None,
            interactive_pause: false,
        }
    }
}

impl SessionConfig {
    /// Check the mode/port invariant: a port is required iff attaching
    pub fn validate(&self) -> Result<()> {
        match (self.attach_mode, self.endpoint_port) {
            (AttachMode::AttachByEndpoint, None) => Err(Error::configuration(
                "endpoint_port is required in attach mode",
            )),
            (AttachMode::Launch, Some(_)) => Err(Error::configuration(
                "endpoint_port is only valid in attach mode",
            )),
            _ => Ok(()),
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = SessionConfig::default();

        if let Ok(headless) = env::var("SCRAPPER_HEADLESS") {
            config.headless = headless
                .parse()
                .map_err(|_| Error::configuration("Invalid SCRAPPER_HEADLESS"))?;
        }

        if let Ok(profile_dir) = env::var("SCRAPPER_PROFILE_DIR") {
            config.profile_dir = PathBuf::from(profile_dir);
        }

        // Presence of a port selects attach mode
        if let Ok(port) = env::var("SCRAPPER_ATTACH_PORT") {
            config.attach_mode = AttachMode::AttachByEndpoint;
            config.endpoint_port = Some(
                port.parse()
                    .map_err(|_| Error::configuration("Invalid SCRAPPER_ATTACH_PORT"))?,
            );
        }

        if let Ok(timeout) = env::var("SCRAPPER_CONNECT_TIMEOUT") {
            config.connect_timeout_ms = timeout
                .parse()
                .map_err(|_| Error::configuration("Invalid SCRAPPER_CONNECT_TIMEOUT"))?;
        }

        if let Ok(interval) = env::var("SCRAPPER_POLL_INTERVAL") {
            config.poll_interval_ms = interval
                .parse()
                .map_err(|_| Error::configuration("Invalid SCRAPPER_POLL_INTERVAL"))?;
        }

        if let Ok(chrome_path) = env::var("SCRAPPER_CHROME_PATH") {
            config.chrome_path = Some(chrome_path);
        }

        if let Ok(pause) = env::var("SCRAPPER_PAUSE") {
            config.interactive_pause = pause
                .parse()
                .map_err(|_| Error::configuration("Invalid SCRAPPER_PAUSE"))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::configuration(format!("Failed to read config file: {}", e)))?;

        let config: SessionConfig = toml::from_str(&content)
            .map_err(|e| Error::configuration(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SessionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.attach_mode, AttachMode::Launch);
        assert!(!config.headless);
    }

    #[test]
    fn test_attach_mode_requires_port() {
        let config = SessionConfig {
            attach_mode: AttachMode::AttachByEndpoint,
            endpoint_port: None,
            ..SessionConfig::default()
        };

        let result = config.validate();
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_launch_mode_rejects_port() {
        let config = SessionConfig {
            endpoint_port: Some(9222),
            ..SessionConfig::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_attach_mode_with_port_is_valid() {
        let config = SessionConfig {
            attach_mode: AttachMode::AttachByEndpoint,
            endpoint_port: Some(9222),
            ..SessionConfig::default()
        };

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml() {
        let config: SessionConfig = toml::from_str(
            r#"
            attach_mode = "attach_by_endpoint"
            headless = true
            profile_dir = "/tmp/profile"
            endpoint_port = 9222
            connect_timeout_ms = 5000
            poll_interval_ms = 100
            interactive_pause = false
            "#,
        )
        .unwrap();

        assert_eq!(config.attach_mode, AttachMode::AttachByEndpoint);
        assert_eq!(config.endpoint_port, Some(9222));
        assert!(config.validate().is_ok());
    }
}
