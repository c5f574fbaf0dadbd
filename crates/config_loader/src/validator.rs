//! Configuration validation
//!
//! Rules:
//! - Derived field ranges
//! - ap_timestamp_uncertainty_ms is finite
//! - The excluded mask leaves at least one event

use contracts::{AdapterConfig, AdapterEventMask, ContractError};

/// Validate an `AdapterConfig`, stopping at the first error
pub fn validate(config: &AdapterConfig) -> Result<(), ContractError> {
    validate_uncertainty(config)?;
    config.check()?;
    validate_excluded_mask(config)?;
    Ok(())
}

fn validate_uncertainty(config: &AdapterConfig) -> Result<(), ContractError> {
    if !config.ap_timestamp_uncertainty_ms.is_finite() {
        return Err(ContractError::config_validation(
            "ap_timestamp_uncertainty_ms",
            "must be a finite number",
        ));
    }
    Ok(())
}

fn validate_excluded_mask(config: &AdapterConfig) -> Result<(), ContractError> {
    if config.excluded_event_mask.contains(AdapterEventMask::all()) {
        return Err(ContractError::config_validation(
            "excluded_event_mask",
            "cannot exclude every event",
        ));
    }
    Ok(())
}
