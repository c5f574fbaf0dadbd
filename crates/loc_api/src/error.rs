//! Adapter-level errors
//!
//! Protocol outcomes keep their own types ([`ClientError`], [`LocationError`]); this
//! enum adds the failures of the worker plumbing around them.

use contracts::{ClientError, ContractError, LocationError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LocApiError {
    /// The worker task has stopped and no longer accepts commands
    #[error("adapter worker is gone")]
    WorkerGone,

    /// The worker dropped a command without replying
    #[error("adapter worker dropped the reply of '{command}'")]
    ReplyDropped { command: String },

    #[error(transparent)]
    Config(#[from] ContractError),

    /// Caller-visible outcome of a location command
    #[error("location command failed: {0}")]
    Location(#[from] LocationError),

    /// Transport-level failure of open/close
    #[error("transport failure: {0}")]
    Client(#[from] ClientError),
}

impl LocApiError {
    pub fn reply_dropped(command: impl Into<String>) -> Self {
        Self::ReplyDropped {
            command: command.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LocApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_error_converts() {
        let err: LocApiError = LocationError::InvalidParameter.into();
        assert!(matches!(
            err,
            LocApiError::Location(LocationError::InvalidParameter)
        ));
        assert_eq!(err.to_string(), "location command failed: invalid parameter");
    }

    #[test]
    fn test_config_error_is_transparent() {
        let err: LocApiError =
            ContractError::config_validation("queue_capacity", "must be >= 1").into();
        assert_eq!(
            err.to_string(),
            "config validation error at 'queue_capacity': must be >= 1"
        );
    }

    #[test]
    fn test_reply_dropped_names_command() {
        let err = LocApiError::reply_dropped("start_fix");
        assert!(err.to_string().contains("start_fix"));
    }
}
