//! Mutable adapter state, touched only by the worker

use contracts::{AdapterEventMask, ClientHandle, GnssPowerMode, NativeEventMask};

use crate::decoders::gnss_measurement::MeasurementAccumulator;
use crate::decoders::measurement::RawMeasurementBuffer;

/// Lifecycle phase derived from the connection handle and the session flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Closed,
    OpenIdle,
    OpenInSession,
}

#[derive(Debug)]
pub struct AdapterState {
    pub handle: Option<ClientHandle>,
    /// Abstract mask last requested by the engine, exclusions already removed
    pub requested_mask: AdapterEventMask,
    /// Native mask the transport accepted
    pub registered_mask: NativeEventMask,
    pub in_session: bool,
    pub power_mode: Option<GnssPowerMode>,
    pub engine_on: bool,
    pub master_registration_unsupported: bool,
    /// Cleared on the first unsupported service-data deletion
    pub use_new_delete_api: bool,
    /// NMEA sentence types last sent
    pub nmea_types: Option<u32>,
    /// Set on fix start; the first clock of a session counts as a discontinuity
    pub measurements_started: bool,
    pub raw_measurements: Option<RawMeasurementBuffer>,
    pub gnss_measurements: MeasurementAccumulator,
}

impl Default for AdapterState {
    fn default() -> Self {
        Self {
            handle: None,
            requested_mask: AdapterEventMask::empty(),
            registered_mask: NativeEventMask::empty(),
            in_session: false,
            power_mode: None,
            engine_on: false,
            master_registration_unsupported: false,
            use_new_delete_api: true,
            nmea_types: None,
            measurements_started: false,
            raw_measurements: None,
            gnss_measurements: MeasurementAccumulator::default(),
        }
    }
}

impl AdapterState {
    pub fn phase(&self) -> Phase {
        match (self.handle.is_some(), self.in_session) {
            (false, _) => Phase::Closed,
            (true, false) => Phase::OpenIdle,
            (true, true) => Phase::OpenInSession,
        }
    }

    /// Back to the freshly constructed state
    ///
    /// The master-registration flag and the delete-API decision outlive a close.
    pub fn reset(&mut self) {
        let master_registration_unsupported = self.master_registration_unsupported;
        let use_new_delete_api = self.use_new_delete_api;
        *self = Self {
            master_registration_unsupported,
            use_new_delete_api,
            ..Self::default()
        };
    }
}
