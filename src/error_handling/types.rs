use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    BadAddressFormatting(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::BadAddressFormatting(e) => write!(f, "Address formatting error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

#[derive(Debug)]
pub enum NetworkError {
    BindError(std::io::Error),
    AcceptFailed(std::io::Error),
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::BindError(e) => write!(f, "Network bind error: {}", e),
            NetworkError::AcceptFailed(e) => write!(f, "Accept failed: {}", e),
        }
    }
}

impl std::error::Error for NetworkError {}

/// Construction-time failures of the recording decorators.
///
/// I/O on a decorated listener or connection never produces this type; those
/// operations return the wrapped `std::io::Error` untouched.
#[derive(Debug, PartialEq, Eq)]
pub enum RecordError {
    MissingCallback,
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::MissingCallback => write!(f, "Record listener requires a callback"),
        }
    }
}

impl std::error::Error for RecordError {}
