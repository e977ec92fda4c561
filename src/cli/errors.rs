//! CLI-specific error types
//!
//! All CLI errors end the process with a non-zero status.

use std::fmt;
use std::io;

use crate::mirror::MirrorError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (stdin/stdout)
    IoError,
    /// Malformed argument or request
    InvalidInput,
    /// The mirror or its store failed
    MirrorFailed,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "RTM_CLI_CONFIG_ERROR",
            Self::IoError => "RTM_CLI_IO_ERROR",
            Self::InvalidInput => "RTM_CLI_INVALID_INPUT",
            Self::MirrorFailed => "RTM_CLI_MIRROR_FAILED",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Config error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    /// I/O error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    /// Invalid argument or request
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::InvalidInput, msg)
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::invalid_input(format!("JSON error: {}", e))
    }
}

impl From<MirrorError> for CliError {
    fn from(e: MirrorError) -> Self {
        match e {
            MirrorError::InvalidConfig(msg) => Self::config_error(msg),
            MirrorError::InvalidPayload(msg) => Self::invalid_input(msg),
            other => Self::new(
                CliErrorCode::MirrorFailed,
                format!("{} ({})", other, other.code()),
            ),
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordId;

    #[test]
    fn test_display_includes_code() {
        let err = CliError::config_error("missing store_path");
        assert_eq!(err.to_string(), "RTM_CLI_CONFIG_ERROR: missing store_path");
    }

    #[test]
    fn test_from_mirror_error() {
        let err = CliError::from(MirrorError::NotFoundLocally(RecordId::from(3)));
        assert_eq!(err.code(), &CliErrorCode::MirrorFailed);
        assert!(err.message().contains("RTM_MIRROR_NOT_FOUND_LOCALLY"));

        let err = CliError::from(MirrorError::InvalidConfig("bad".into()));
        assert_eq!(err.code_str(), "RTM_CLI_CONFIG_ERROR");
    }
}
