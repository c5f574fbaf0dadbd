//! # Contracts
//!
//! Frozen interface contracts between the location adapter, its transport and the
//! location engine. Business crates depend only on this crate, never on each other.
//!
//! ## Two vocabularies
//! - Native: requests, indications and masks exactly as the remote engine knows them
//! - Normalized: records and masks handed to the location engine
//!
//! ## Time Model
//! - UTC milliseconds for fixes
//! - GNSS week / time-of-week for system time
//! - Boot-clock `Duration` for AP-side timestamps

mod aiding;
mod capabilities;
mod config;
mod engine;
mod error;
mod gnss;
mod indication;
mod location;
mod mask;
mod measurement;
mod ni;
mod request;
mod status;
mod transport;

pub use aiding::*;
pub use capabilities::{CapabilityStore, EngineCapabilities};
pub use config::AdapterConfig;
pub use engine::LocationEngine;
pub use error::*;
pub use gnss::*;
pub use indication::*;
pub use location::*;
pub use mask::*;
pub use measurement::*;
pub use ni::*;
pub use request::*;
pub use status::*;
pub use transport::*;
