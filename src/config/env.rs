use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use humantime::parse_duration;

use crate::error::ConfigError;

/// Read `key`, treating unset and blank values alike, and run `parse` on
/// the trimmed value.
fn env_value<T, E>(
    key: &'static str,
    parse: impl FnOnce(&str) -> Result<T, E>,
) -> Result<Option<T>, ConfigError>
where
    E: std::fmt::Display,
{
    let raw = match std::env::var(key) {
        Ok(value) => value,
        Err(std::env::VarError::NotPresent) => return Ok(None),
        Err(err) => return Err(ConfigError::Other(err.to_string())),
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    parse(trimmed)
        .map(Some)
        .map_err(|err| ConfigError::InvalidField {
            field: key,
            message: err.to_string(),
        })
}

pub(super) fn env_string(key: &'static str) -> Result<Option<String>, ConfigError> {
    env_value(key, |value| Ok::<_, std::convert::Infallible>(value.to_string()))
}

pub(super) fn env_path(key: &'static str) -> Result<Option<PathBuf>, ConfigError> {
    env_value(key, |value| Ok::<_, std::convert::Infallible>(PathBuf::from(value)))
}

pub(super) fn env_parse<T>(key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_value(key, str::parse::<T>)
}

pub(super) fn env_duration(key: &'static str) -> Result<Option<Duration>, ConfigError> {
    env_value(key, parse_duration)
}
