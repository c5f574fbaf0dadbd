//! Layered error definitions
//!
//! Categorized by source: config / transport / location command

use thiserror::Error;

/// Unified configuration and IO error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Failure reported by the message transport itself
///
/// A transport call that reaches the remote engine returns `Ok(..)`; the engine's own
/// verdict travels in the indication status.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientError {
    #[error("request timed out")]
    Timeout,

    #[error("request not supported")]
    Unsupported,

    #[error("engine busy")]
    EngineBusy,

    #[error("general failure")]
    GeneralFailure,

    #[error("invalid parameter")]
    InvalidParameter,

    #[error("internal failure")]
    Internal,

    #[error("invalid client handle")]
    InvalidHandle,

    #[error("invalid message id")]
    InvalidMessageId,

    #[error("service not present")]
    ServiceNotPresent,

    #[error("phone offline")]
    PhoneOffline,
}

/// Caller-visible outcome of a location command
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationError {
    #[error("general failure")]
    GeneralFailure,

    #[error("invalid parameter")]
    InvalidParameter,

    #[error("not supported")]
    NotSupported,
}

/// Result of a location command as delivered to a response sink
pub type LocationResult = Result<(), LocationError>;
