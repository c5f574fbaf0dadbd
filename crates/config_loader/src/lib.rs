//! # Config Loader
//!
//! Loads the [`AdapterConfig`] of a location adapter instance from TOML (or JSON) and
//! validates it before the adapter is spawned. Every key is optional:
//!
//! ```toml
//! ap_timestamp_uncertainty_ms = 2.5
//! sync_request_timeout_ms = 1000
//! queue_capacity = 64
//! master_client = true
//! excluded_event_mask = "NMEA_1HZ_REPORT | REQUEST_WIFI"
//! ```

mod parser;
mod validator;

pub use contracts::AdapterConfig;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load a config file; the format follows the extension (.toml / .json)
    pub fn load_from_path(path: &Path) -> Result<AdapterConfig, ContractError> {
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(ConfigFormat::from_extension)
            .ok_or_else(|| {
                ContractError::config_parse(format!(
                    "unsupported config file: {}",
                    path.display()
                ))
            })?;
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format)
    }

    /// Parse and validate config content
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<AdapterConfig, ContractError> {
        let config = parser::parse(content, format)?;
        validator::validate(&config)?;
        Ok(config)
    }
}
