use std::str::FromStr;

use thiserror::Error;

/// Errors raised while reading configuration from environment variables.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvVarError {
    /// The variable is set but its value could not be parsed.
    #[error("Invalid value {value:?} for environment variable {name}: {reason}")]
    Invalid {
        /// Variable name.
        name: String,
        /// Raw value as read from the environment.
        value: String,
        /// Parser error message.
        reason: String,
    },
}

/// Reads an optional environment variable. Unset and blank values both yield `None`;
/// surrounding whitespace is trimmed.
pub fn get_env_var_opt(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Reads and parses an optional environment variable.
///
/// Returns `Ok(None)` when the variable is unset, and [`EnvVarError::Invalid`]
/// when it is set to something `T` cannot parse.
pub fn parse_env_var<T>(name: &str) -> Result<Option<T>, EnvVarError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get_env_var_opt(name) {
        None => Ok(None),
        Some(value) => value.parse::<T>().map(Some).map_err(|e| EnvVarError::Invalid {
            name: name.to_string(),
            reason: e.to_string(),
            value,
        }),
    }
}
