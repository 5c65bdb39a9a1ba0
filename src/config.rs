//! Configuration loading and management.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::encoder::Encoder;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("server.nickname must not be empty")]
    EmptyNickname,
    #[error("server.port must be in 1..=65535")]
    InvalidPort,
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// IRC server connection settings.
    pub server: ServerConfig,
    /// Process-level settings.
    #[serde(default)]
    pub instance: InstanceConfig,
    /// UDP-to-channel bridge blocks.
    #[serde(default, rename = "bridge")]
    pub bridges: Vec<BridgeBlock>,
}

/// IRC server connection settings. Immutable once the process starts.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server hostname (e.g., "irc.libera.chat").
    pub host: String,
    /// Server port (e.g., 6667, or 6697 for TLS).
    pub port: u16,
    /// Connect over TLS.
    #[serde(default)]
    pub tls: bool,
    /// Nickname to claim.
    pub nickname: String,
    /// Optional services account password, used for IDENTIFY and GHOST.
    pub password: Option<String>,
}

/// Process-level settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstanceConfig {
    /// Single-instance marker path. Defaults to `udpircd.pid` in the
    /// system temp directory.
    pub pidfile: Option<PathBuf>,
}

/// One `[[bridge]]` block: a UDP port and its destination channels.
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeBlock {
    /// UDP port to listen on.
    pub udp_port: Option<u16>,
    /// Destination channels (leading `#`).
    #[serde(default)]
    pub channels: Vec<String>,
    /// Encoding applied to each datagram, one per block.
    #[serde(default)]
    pub encoding: Encoder,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.server.validate()?;
        Ok(config)
    }
}

impl ServerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.nickname.is_empty() {
            return Err(ConfigError::EmptyNickname);
        }
        if self.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        Ok(())
    }
}

impl InstanceConfig {
    /// The effective pidfile path.
    pub fn pidfile_path(&self) -> PathBuf {
        self.pidfile
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("udpircd.pid"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn minimal_config() -> &'static str {
        r##"
[server]
host = "irc.example.com"
port = 6667
nickname = "relay"

[[bridge]]
udp_port = 9999
channels = ["#demo"]
"##
    }

    #[test]
    fn parses_minimal_config() {
        let config: Config = toml::from_str(minimal_config()).unwrap();
        assert_eq!(config.server.host, "irc.example.com");
        assert!(!config.server.tls);
        assert!(config.server.password.is_none());
        assert_eq!(config.bridges.len(), 1);
        assert_eq!(config.bridges[0].udp_port, Some(9999));
        assert_eq!(config.bridges[0].encoding, Encoder::Raw);
    }

    #[test]
    fn parses_full_config() {
        let toml = r##"
[server]
host = "irc.libera.chat"
port = 6697
tls = true
nickname = "relay"
password = "hunter2"

[instance]
pidfile = "/tmp/custom.pid"

[[bridge]]
udp_port = 9998
channels = ["#logs", "#ops"]
encoding = "base64"

[[bridge]]
udp_port = 9999
channels = ["#metrics"]
encoding = "gzip-base64"
"##;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.server.tls);
        assert_eq!(config.server.password.as_deref(), Some("hunter2"));
        assert_eq!(
            config.instance.pidfile_path(),
            PathBuf::from("/tmp/custom.pid")
        );
        assert_eq!(config.bridges[0].channels.len(), 2);
        assert_eq!(config.bridges[1].encoding, Encoder::GzipBase64);
    }

    #[test]
    fn load_rejects_empty_nickname() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[server]
host = "irc.example.com"
port = 6667
nickname = ""
"#
        )
        .unwrap();
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyNickname));
    }

    #[test]
    fn load_rejects_port_zero() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[server]
host = "irc.example.com"
port = 0
nickname = "relay"
"#
        )
        .unwrap();
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Config::load("/nonexistent/udpircd.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn default_pidfile_is_in_temp_dir() {
        let instance = InstanceConfig::default();
        assert!(instance.pidfile_path().ends_with("udpircd.pid"));
    }
}
