use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("toast registry was never installed into the host (key `{key}`)")]
    NotInstalled { key: &'static str },
    #[error("container `{name}` has not been opened")]
    UnknownContainer { name: String },
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(String),
    #[error("missing required configuration field: {field}")]
    MissingField { field: &'static str },
    #[error("invalid configuration for {field}: {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },
    #[error("configuration error: {0}")]
    Other(String),
}

/// Failure reported by a click or action handler.
///
/// The controller logs it, clears its loading flag and keeps the toast open.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HandlerError {
    #[error("handler rejected: {0}")]
    Rejected(String),
    #[error("handler was cancelled")]
    Cancelled,
}

impl HandlerError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }
}

impl Error {
    /// Integration errors indicate a broken setup rather than a runtime condition.
    pub const fn is_integration(&self) -> bool {
        matches!(self, Self::NotInstalled { .. } | Self::UnknownContainer { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, Error, HandlerError};

    #[test]
    fn missing_registration_is_an_integration_error() {
        let err = Error::NotInstalled { key: "toasts" };
        assert!(err.is_integration());
        assert!(err.to_string().contains("toasts"));
        let cfg = Error::from(ConfigError::Parse("bad".into()));
        assert!(!cfg.is_integration());
    }

    #[test]
    fn handler_error_display() {
        assert_eq!(
            HandlerError::rejected("nope").to_string(),
            "handler rejected: nope"
        );
    }
}
