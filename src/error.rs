//! Error types and handling for the switcher
//!
//! The variants mirror how a failure is handled at runtime: configuration
//! errors stop the process before it starts, authentication errors are fatal
//! only at startup, transport errors end the current tick, and status decode
//! errors are the signal that the monitoring session silently expired.

use thiserror::Error;

/// Result type alias for switcher operations
pub type Result<T> = std::result::Result<T, SwitcherError>;

/// Main error type for the switcher
#[derive(Debug, Error)]
pub enum SwitcherError {
    /// Invalid or unreadable configuration
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Login rejected or retries exhausted
    #[error("Authentication error: {message}")]
    Auth { message: String },

    /// Network or HTTP-level failure of a remote call
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Monitoring service answered, but not with the expected structure
    #[error("Status decode error: {message}")]
    StatusDecode { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },
}

impl SwitcherError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        SwitcherError::Config {
            message: message.into(),
        }
    }

    /// Create a configuration error for a specific field
    pub fn invalid(field: &str, message: &str) -> Self {
        SwitcherError::Config {
            message: format!("{} - {}", field, message),
        }
    }

    /// Create a new authentication error
    pub fn auth<S: Into<String>>(message: S) -> Self {
        SwitcherError::Auth {
            message: message.into(),
        }
    }

    /// Create a new transport error
    pub fn transport<S: Into<String>>(message: S) -> Self {
        SwitcherError::Transport {
            message: message.into(),
        }
    }

    /// Create a new status decode error
    pub fn status_decode<S: Into<String>>(message: S) -> Self {
        SwitcherError::StatusDecode {
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        SwitcherError::Io {
            message: message.into(),
        }
    }

    /// True when the error means the monitoring session should be renewed
    pub fn is_session_expired(&self) -> bool {
        matches!(self, SwitcherError::StatusDecode { .. })
    }
}

impl From<std::io::Error> for SwitcherError {
    fn from(err: std::io::Error) -> Self {
        SwitcherError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for SwitcherError {
    fn from(err: serde_yaml::Error) -> Self {
        SwitcherError::config(err.to_string())
    }
}

impl From<reqwest::Error> for SwitcherError {
    fn from(err: reqwest::Error) -> Self {
        SwitcherError::transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = SwitcherError::config("test config error");
        assert!(matches!(err, SwitcherError::Config { .. }));

        let err = SwitcherError::invalid("battery", "bad thresholds");
        assert!(matches!(err, SwitcherError::Config { .. }));

        let err = SwitcherError::status_decode("empty body");
        assert!(err.is_session_expired());

        let err = SwitcherError::transport("connection refused");
        assert!(!err.is_session_expired());
    }

    #[test]
    fn test_error_display() {
        let err = SwitcherError::config("test error");
        assert_eq!(format!("{}", err), "Configuration error: test error");

        let err = SwitcherError::invalid("schedule.check_interval_seconds", "Must be positive");
        assert_eq!(
            format!("{}", err),
            "Configuration error: schedule.check_interval_seconds - Must be positive"
        );
    }

    #[test]
    fn test_yaml_error_is_config_error() {
        let err: SwitcherError = serde_yaml::from_str::<u32>("[not, a, number]")
            .unwrap_err()
            .into();
        assert!(matches!(err, SwitcherError::Config { .. }));
    }
}
