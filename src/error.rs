use std::time::Duration;
use thiserror::Error;

/// Failures while resolving a caller inside the access gate.
///
/// None of these reach the client. The gate logs them and answers with the
/// same `/login` redirect it uses for an unknown user.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("session resolution failed: {0}")]
    Session(String),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error("directory lookup timed out after {0:?}")]
    Timeout(Duration),
}

/// Failures of a `UserDirectory` lookup. An empty result is not an error.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("directory responded with status {0}")]
    Status(u16),

    #[error("directory request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("directory response could not be decoded: {0}")]
    Decode(String),

    #[error("directory query failed: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);
