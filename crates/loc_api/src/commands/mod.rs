//! Outbound command encoders
//!
//! Each submodule adds `LocApi` methods that translate one family of engine commands
//! into native requests. Setters that the engine acknowledges go through the
//! synchronous bridge; queries whose answer arrives as an indication are sent
//! fire-and-forget.

pub(crate) mod agps;
pub(crate) mod aiding;
pub(crate) mod config;
pub(crate) mod constellation;
pub(crate) mod xtra;
pub(crate) mod zpp;
