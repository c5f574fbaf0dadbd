//! Event and capability bitmasks
//!
//! Two event-mask representations live side by side:
//! - [`AdapterEventMask`]: bits meaningful to the location engine
//! - [`NativeEventMask`]: bits registered with the remote engine
//!
//! Mapping between them is owned by the adapter.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Abstract event subscription requested by the location engine
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct AdapterEventMask: u64 {
        const POSITION_REPORT = 1 << 0;
        const UNPROPAGATED_POSITION_REPORT = 1 << 1;
        const SATELLITE_REPORT = 1 << 2;
        const NMEA_POSITION_REPORT = 1 << 3;
        const NMEA_1HZ_REPORT = 1 << 4;
        const NI_NOTIFY_VERIFY_REQUEST = 1 << 5;
        const ASSISTANCE_DATA_REQUEST = 1 << 6;
        const POSITION_INJECTION_REQUEST = 1 << 7;
        const STATUS_REPORT = 1 << 8;
        const LOCATION_SERVER_REQUEST = 1 << 9;
        const REQUEST_WIFI = 1 << 10;
        const SENSOR_STATUS = 1 << 11;
        const REQUEST_TIME_SYNC = 1 << 12;
        const REPORT_SPI = 1 << 13;
        const REPORT_NI_GEOFENCE = 1 << 14;
        const GEOFENCE_GEN_ALERT = 1 << 15;
        const GEOFENCE_BREACH = 1 << 16;
        const BATCHED_GEOFENCE_BREACH = 1 << 17;
        const PEDOMETER_CTRL = 1 << 18;
        const GEOFENCE_DWELL = 1 << 19;
        const MOTION_CTRL = 1 << 20;
        const REQUEST_WIFI_AP_DATA = 1 << 21;
        const BATCH_FULL = 1 << 22;
        const BATCH_STATUS = 1 << 23;
        const BATCHED_POSITION_REPORT = 1 << 24;
        const GNSS_MEASUREMENT_REPORT = 1 << 25;
        const SV_POLYNOMIAL_REPORT = 1 << 26;
        const SV_EPHEMERIS_REPORT = 1 << 27;
        const GDT_UPLOAD_BEGIN_REQ = 1 << 28;
        const GDT_UPLOAD_END_REQ = 1 << 29;
        const GNSS_MEASUREMENT = 1 << 30;
        const REQUEST_TIMEZONE = 1 << 31;
        const REQUEST_SRN_DATA = 1 << 32;
        const FDCL_SERVICE_REQ = 1 << 33;
        const BS_OBS_DATA_SERVICE_REQ = 1 << 34;
        const LOC_SYSTEM_INFO = 1 << 35;
        const EVENT_REPORT_INFO = 1 << 36;
        const GNSS_NHZ_MEASUREMENT = 1 << 37;
    }
}

bitflags! {
    /// Event mask registered with the remote engine
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct NativeEventMask: u64 {
        const POSITION_REPORT = 0x0000_0001;
        const GNSS_SV_INFO = 0x0000_0002;
        const NMEA = 0x0000_0004;
        const NI_NOTIFY_VERIFY_REQ = 0x0000_0008;
        const INJECT_TIME_REQ = 0x0000_0010;
        const INJECT_PREDICTED_ORBITS_REQ = 0x0000_0020;
        const INJECT_POSITION_REQ = 0x0000_0040;
        const ENGINE_STATE = 0x0000_0080;
        const FIX_SESSION_STATE = 0x0000_0100;
        const WIFI_REQ = 0x0000_0200;
        const SENSOR_STREAMING_READY_STATUS = 0x0000_0400;
        const TIME_SYNC_REQ = 0x0000_0800;
        const SET_SPI_STREAMING_REPORT = 0x0000_1000;
        const LOCATION_SERVER_CONNECTION_REQ = 0x0000_2000;
        const NI_GEOFENCE_NOTIFICATION = 0x0000_4000;
        const GEOFENCE_GEN_ALERT = 0x0000_8000;
        const GEOFENCE_BREACH_NOTIFICATION = 0x0001_0000;
        const PEDOMETER_CONTROL = 0x0002_0000;
        const MOTION_DATA_CONTROL = 0x0004_0000;
        const BATCH_FULL_NOTIFICATION = 0x0008_0000;
        const LIVE_BATCHED_POSITION_REPORT = 0x0010_0000;
        const INJECT_WIFI_AP_DATA_REQ = 0x0020_0000;
        const GEOFENCE_BATCH_BREACH_NOTIFICATION = 0x0040_0000;
        const GNSS_MEASUREMENT_REPORT = 0x0100_0000;
        const GNSS_SV_POLYNOMIAL_REPORT = 0x0200_0000;
        const GDT_UPLOAD_BEGIN_REQ = 0x0800_0000;
        const GDT_UPLOAD_END_REQ = 0x1000_0000;
        const GEOFENCE_BATCH_DWELL_NOTIFICATION = 0x2000_0000;
        const GET_TIME_ZONE_REQ = 0x4000_0000;
        const BATCHING_STATUS = 0x8000_0000;
        const INJECT_SRN_AP_DATA_REQ = 0x0002_0000_0000;
        const FDCL_SERVICE_REQ = 0x0008_0000_0000;
        const UNPROPAGATED_POSITION_REPORT = 0x0040_0000_0000;
        const BS_OBS_DATA_SERVICE_REQ = 0x0080_0000_0000;
        const EPHEMERIS_REPORT = 0x0100_0000_0000;
        const NEXT_LS_INFO_REPORT = 0x0200_0000_0000;
        const GNSS_NHZ_MEASUREMENT_REPORT = 0x0800_0000_0000;
        const GNSS_EVENT_REPORT = 0x1000_0000_0000;
    }
}

impl NativeEventMask {
    /// Bits suppressed while no fix session is active
    pub const SESSION_GATED: Self = Self::POSITION_REPORT
        .union(Self::UNPROPAGATED_POSITION_REPORT)
        .union(Self::GNSS_SV_INFO)
        .union(Self::NMEA)
        .union(Self::ENGINE_STATE)
        .union(Self::GNSS_MEASUREMENT_REPORT)
        .union(Self::GNSS_SV_POLYNOMIAL_REPORT)
        .union(Self::EPHEMERIS_REPORT)
        .union(Self::GNSS_EVENT_REPORT);

    /// Report types gated by the per-constellation report configuration
    pub const MEASUREMENT_OR_POLYNOMIAL: Self =
        Self::GNSS_MEASUREMENT_REPORT.union(Self::GNSS_SV_POLYNOMIAL_REPORT);
}

bitflags! {
    /// Engine messages and capabilities confirmed during negotiation
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct SupportedMessages: u64 {
        const LOCATION_BATCHING = 1 << 0;
        const BATCHED_GEOFENCE_BREACH = 1 << 1;
        const DISTANCE_BASED_TRACKING = 1 << 2;
        const ADAPTIVE_LOCATION_BATCHING = 1 << 3;
        const DISTANCE_BASED_LOCATION_BATCHING = 1 << 4;
        const UPDATE_TBF_ON_THE_FLY = 1 << 5;
        const OUTDOOR_TRIP_BATCHING = 1 << 6;
    }
}

bitflags! {
    /// Positioning technologies contributing to a fix
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct PosTechMask: u32 {
        const SATELLITE = 1 << 0;
        const CELLID = 1 << 1;
        const WIFI = 1 << 2;
        const SENSORS = 1 << 3;
        const REFERENCE_LOCATION = 1 << 4;
        const INJECTED_COARSE_POSITION = 1 << 5;
        const AFLT = 1 << 6;
        const HYBRID = 1 << 7;
    }
}

bitflags! {
    /// Corrections applied to a navigation solution
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct NavSolutionMask: u32 {
        const SBAS_CORRECTION_IONO = 1 << 0;
        const SBAS_CORRECTION_FAST = 1 << 1;
        const SBAS_CORRECTION_LONG = 1 << 2;
        const SBAS_INTEGRITY = 1 << 3;
    }
}

bitflags! {
    /// APN types a data call may serve
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ApnTypeMask: u32 {
        const DEFAULT = 1 << 0;
        const IMS = 1 << 1;
        const MMS = 1 << 2;
        const DUN = 1 << 3;
        const SUPL = 1 << 4;
        const HIPRI = 1 << 5;
        const FOTA = 1 << 6;
        const CBS = 1 << 7;
        const IA = 1 << 8;
        const EMERGENCY = 1 << 9;
    }
}

bitflags! {
    /// Constellation selector shared by report configuration, deletion and blacklisting
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ConstellationMask: u64 {
        const GPS = 1 << 0;
        const GLONASS = 1 << 1;
        const BDS = 1 << 2;
        const GALILEO = 1 << 3;
        const QZSS = 1 << 4;
    }
}

impl ConstellationMask {
    /// Constellations subscribed for measurement and polynomial reports
    pub const MEASUREMENT_SET: Self = Self::GPS
        .union(Self::GLONASS)
        .union(Self::BDS)
        .union(Self::GALILEO)
        .union(Self::QZSS);
}

bitflags! {
    /// Aiding data the engine can be asked to report in full
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct SvDataMask: u32 {
        const POLY = 1 << 0;
        const EPHEMERIS = 1 << 1;
        const IONOSPHERE = 1 << 2;
    }
}

bitflags! {
    /// Positioning protocols allowed on A-GLONASS
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct AGlonassProtocolMask: u32 {
        const RRC_CONTROL_PLANE = 1 << 0;
        const RRLP_USER_PLANE = 1 << 1;
        const LPP_USER_PLANE = 1 << 2;
        const LPP_CONTROL_PLANE = 1 << 3;
    }
}

bitflags! {
    /// LPPe capabilities, shared by the control and user plane configuration
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct LppeMask: u32 {
        const DBH = 1 << 0;
        const WLAN_AP_MEASUREMENTS = 1 << 1;
        const SRN_AP_MEASUREMENTS = 1 << 2;
        const SENSOR_BARO_MEASUREMENTS = 1 << 3;
    }
}

bitflags! {
    /// LPP planes enabled on the engine
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct LppConfigMask: u32 {
        const USER_PLANE = 1 << 0;
        const CONTROL_PLANE = 1 << 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_gated_bits() {
        let gated = NativeEventMask::SESSION_GATED;
        assert!(gated.contains(NativeEventMask::POSITION_REPORT));
        assert!(gated.contains(NativeEventMask::GNSS_EVENT_REPORT));
        assert!(!gated.contains(NativeEventMask::NI_NOTIFY_VERIFY_REQ));
        assert!(!gated.contains(NativeEventMask::GNSS_NHZ_MEASUREMENT_REPORT));
        assert_eq!(gated.bits().count_ones(), 9);
    }

    #[test]
    fn test_native_bits_match_protocol() {
        assert_eq!(NativeEventMask::WIFI_REQ.bits(), 0x200);
        assert_eq!(NativeEventMask::EPHEMERIS_REPORT.bits(), 0x100_0000_0000);
        assert_eq!(NativeEventMask::GNSS_EVENT_REPORT.bits(), 0x1000_0000_0000);
    }
}
