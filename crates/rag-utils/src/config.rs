//! Environment configuration helpers
//!
//! Every helper treats an unset variable as "use the default" and a set but
//! unparsable variable as an error, so typos surface at startup.

use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Failure to read a configuration value from the environment
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvError {
    /// Variable is set but cannot be parsed
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: String, value: String },
}

/// Read a non-empty string variable
pub fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read and parse a variable, falling back to `default` when unset
pub fn env_or<T: FromStr>(key: &str, default: T) -> Result<T, EnvError> {
    match env_string(key) {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| EnvError::Invalid {
            key: key.to_string(),
            value,
        }),
    }
}

/// Read a whole number of seconds as a `Duration`
pub fn env_duration_secs(key: &str, default: Duration) -> Result<Duration, EnvError> {
    env_or(key, default.as_secs()).map(Duration::from_secs)
}
