//! Adapter configuration contracts

use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{AdapterEventMask, ContractError};

/// Adapter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AdapterConfig {
    /// Uncertainty attached to AP-side timestamps of measurement reports (ms)
    #[validate(range(min = 0.0))]
    pub ap_timestamp_uncertainty_ms: f32,

    /// Uniform timeout of synchronous requests (ms)
    #[validate(range(min = 1, max = 60000))]
    pub sync_request_timeout_ms: u64,

    /// Command queue depth of the worker
    #[validate(range(min = 1))]
    pub queue_capacity: usize,

    /// Attempt master registration on open
    pub master_client: bool,

    /// Abstract event bits this instance never registers
    pub excluded_event_mask: AdapterEventMask,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            ap_timestamp_uncertainty_ms: 0.0,
            sync_request_timeout_ms: 1000,
            queue_capacity: 64,
            master_client: true,
            excluded_event_mask: AdapterEventMask::empty(),
        }
    }
}

impl AdapterConfig {
    pub fn sync_request_timeout(&self) -> Duration {
        Duration::from_millis(self.sync_request_timeout_ms)
    }

    /// Validate field ranges
    pub fn check(&self) -> Result<(), ContractError> {
        self.validate().map_err(|errors| {
            let field = errors
                .field_errors()
                .keys()
                .next()
                .map(|f| f.to_string())
                .unwrap_or_default();
            ContractError::config_validation(field, errors.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = AdapterConfig::default();
        assert!(config.check().is_ok());
        assert_eq!(config.sync_request_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = AdapterConfig {
            sync_request_timeout_ms: 0,
            ..Default::default()
        };
        let err = config.check().unwrap_err();
        match err {
            ContractError::ConfigValidation { field, .. } => {
                assert_eq!(field, "sync_request_timeout_ms")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_negative_uncertainty_rejected() {
        let config = AdapterConfig {
            ap_timestamp_uncertainty_ms: -1.0,
            ..Default::default()
        };
        assert!(config.check().is_err());
    }
}
