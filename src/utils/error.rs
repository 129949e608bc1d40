//! Error type shared by the HTTP clients, configuration loading and agents.
//!
//! Feeds never surface these: every client error is turned into an
//! unavailable value before it reaches fusion. What escapes to callers is
//! configuration trouble and agent failures, which the arena isolates.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Bad config file or agent definition
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Provider answered but the payload is missing or malformed
    #[error("Data error: {0}")]
    DataError(String),

    /// Provider unreachable or too slow
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Strategy error: {0}")]
    StrategyError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    /// HTTP failure other than connect/timeout (status, body decoding)
    #[error("Request error: {0}")]
    ReqwestError(#[source] reqwest::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            let target = err.url().map(|u| u.to_string()).unwrap_or_else(|| "provider".to_string());
            Error::ConnectionError(format!("{target}: {err}"))
        } else {
            Error::ReqwestError(err)
        }
    }
}

impl From<&str> for Error {
    fn from(err: &str) -> Self {
        Error::Other(err.to_string())
    }
}

impl From<String> for Error {
    fn from(err: String) -> Self {
        Error::Other(err)
    }
}

impl Error {
    /// Caused by the caller's configuration rather than by a data source.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::ConfigError(_) | Error::TomlError(_) | Error::InvalidArgument(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn display_prefixes() {
        assert_eq!(Error::ConfigError("missing field".into()).to_string(), "Configuration error: missing field");
        assert_eq!(Error::from("plain").to_string(), "Error: plain");

        let io = Error::from(std::io::Error::new(std::io::ErrorKind::NotFound, "config.toml"));
        assert_matches!(io, Error::IoError(_));
        assert!(io.to_string().starts_with("I/O error"));
    }

    #[test]
    fn toml_parse_failure_is_config() {
        let err: Error = toml::from_str::<toml::Value>("version = ").unwrap_err().into();
        assert!(err.is_config());
        assert!(!Error::DataError("x".into()).is_config());
        assert!(!Error::ConnectionError("x".into()).is_config());
    }
}
