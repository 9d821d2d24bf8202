use crate::error_handling::types::ConfigError;
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;

/// Runtime parameters of the `netrec` recording server.
///
/// Loaded from a TOML file, every field optional:
///
/// ```toml
/// bind_address = "127.0.0.1:8080"
/// response_body = "Hello World!"
/// preview_bytes = 256
/// ```
///
/// # Fields Overview
///
/// - `bind_address`: socket address the recorded listener binds to
/// - `response_body`: body served to every request
/// - `preview_bytes`: cap on logged bytes per direction, `0` logs everything
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub bind_address: String,
    pub response_body: String,
    pub preview_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: String::from("0.0.0.0:8080"),
            response_body: String::from("Hello World!"),
            preview_bytes: 0,
        }
    }
}

impl Config {
    /// Reads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::IoError`] if the file cannot be read
    /// - [`ConfigError::TomlError`] if it is not valid TOML for this structure
    /// - [`ConfigError::BadAddressFormatting`] if `bind_address` is not a socket address
    pub fn from_file(path: &Path) -> Result<Config, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Config, ConfigError> {
        let config: Config =
            toml::from_str(raw).map_err(|e| ConfigError::TomlError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.socket_addr().map(|_| ())
    }

    /// The parsed `bind_address`.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind_address
            .parse()
            .map_err(|_| ConfigError::BadAddressFormatting(self.bind_address.clone()))
    }
}
