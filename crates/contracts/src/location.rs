//! Normalized location records and fix criteria

use std::time::Duration;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::{
    GnssSignalTypeMask, GnssSvType, GnssSystemTime, GpsTime, NavSolutionMask, PosTechMask,
    ReportStatus,
};

/// Latitude and longitude in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Where a location originates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LocationSource {
    #[default]
    Unknown,
    Gnss,
}

/// Core location fix
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    pub coordinates: Option<Coordinates>,
    /// Altitude above the WGS-84 ellipsoid, meters
    pub altitude: Option<f64>,
    /// Horizontal speed, m/s
    pub speed: Option<f32>,
    /// Heading, degrees
    pub bearing: Option<f32>,
    /// Horizontal accuracy at 68% confidence, meters
    pub accuracy: Option<f32>,
    /// Vertical accuracy, meters
    pub vertical_accuracy: Option<f32>,
    /// UTC milliseconds; 0 when unknown
    pub timestamp_ms: u64,
    pub source: LocationSource,
    pub spoof_mask: Option<u32>,
    /// Position not propagated to the report time
    pub unpropagated: bool,
}

/// Reliability classification of an estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Reliability {
    #[default]
    NotSet,
    VeryLow,
    Low,
    Medium,
    High,
}

/// Dilution of precision
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Dop {
    pub pdop: f32,
    pub hdop: f32,
    pub vdop: f32,
}

/// Dilution of precision including geometric and time terms
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ExtDop {
    pub pdop: f32,
    pub hdop: f32,
    pub vdop: f32,
    pub gdop: f32,
    pub tdop: f32,
}

/// East, north and up components
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Enu {
    pub east: f32,
    pub north: f32,
    pub up: f32,
}

impl Enu {
    pub fn from_array(v: [f32; 3]) -> Self {
        Self {
            east: v[0],
            north: v[1],
            up: v[2],
        }
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.east, self.north, self.up]
    }
}

/// Horizontal uncertainty ellipse
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct UncEllipse {
    pub semi_major: Option<f32>,
    pub semi_minor: Option<f32>,
    /// Orientation of the major axis, as reported by the engine
    pub azimuth: Option<f32>,
}

/// Satellites used in a fix, one bitmask per constellation, bit 0 = lowest PRN
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SvUsedIds {
    pub gps: u64,
    pub glonass: u64,
    pub bds: u64,
    pub galileo: u64,
    pub qzss: u64,
}

/// Per-satellite usage entry of a fix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasUsageInfo {
    pub constellation: GnssSvType,
    pub sv_id: u16,
    pub signal_type: GnssSignalTypeMask,
}

/// Boot-clock time the application processor observed a report
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ApTimestamp {
    pub boot_time: Duration,
    pub uncertainty_ms: f32,
}

/// Extended fix information
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LocationExtended {
    pub ap_timestamp: Option<ApTimestamp>,
    pub tech_mask: Option<PosTechMask>,
    pub magnetic_deviation: Option<f32>,
    pub dop: Option<Dop>,
    pub ext_dop: Option<ExtDop>,
    pub altitude_mean_sea_level: Option<f32>,
    pub vert_unc: Option<f32>,
    pub speed_unc: Option<f32>,
    pub bearing_unc: Option<f32>,
    pub horizontal_reliability: Option<Reliability>,
    pub vertical_reliability: Option<Reliability>,
    pub hor_unc_ellipse: UncEllipse,
    pub north_std_dev: Option<f32>,
    pub east_std_dev: Option<f32>,
    pub sv_used_ids: Option<SvUsedIds>,
    pub meas_usage: Vec<MeasUsageInfo>,
    pub nav_solution_mask: Option<NavSolutionMask>,
    pub gps_time: Option<GpsTime>,
    pub velocity: Option<Enu>,
    pub velocity_unc: Option<Enu>,
    pub system_time: Option<GnssSystemTime>,
    pub time_unc_ms: Option<f32>,
    pub leap_seconds: Option<u8>,
}

/// Jammer metrics of one signal band
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SignalJamming {
    /// Automatic gain control, dB
    pub agc_db: Option<f64>,
    /// Jammer indicator, dB
    pub jammer_ind_db: Option<f64>,
}

/// Jammer data carried alongside a position report
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GnssDataNotification {
    pub signals: Vec<SignalJamming>,
}

/// Normalized position report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionReport {
    pub location: Location,
    pub extended: LocationExtended,
    pub status: ReportStatus,
    pub tech_mask: PosTechMask,
    pub data: GnssDataNotification,
    /// GPS time of week of the report, -1 when jammer data supersedes it
    pub ms_in_week: i32,
}

/// Location plus the extended data accepted by position injection
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GnssLocationInfo {
    pub location: Location,
    pub system_time: Option<GnssSystemTime>,
    pub leap_seconds: Option<u8>,
    pub east_velocity: Option<f32>,
    pub north_velocity: Option<f32>,
    pub up_velocity: Option<f32>,
    pub east_velocity_std_dev: Option<f32>,
    pub north_velocity_std_dev: Option<f32>,
    pub up_velocity_std_dev: Option<f32>,
    pub time_unc_ms: Option<f32>,
    pub sv_used: Option<SvUsedIds>,
    pub tech_mask: PosTechMask,
}

/// Positioning mode requested for a fix session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PositionMode {
    #[default]
    Standalone,
    MsBased,
    MsAssisted,
    CellId,
    Wwan,
}

/// Fix recurrence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Recurrence {
    #[default]
    Periodic,
    Single,
}

/// Engine power modes, M1 being full power
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GnssPowerMode {
    /// Improved accuracy
    M1,
    /// Normal
    M2,
    /// Background, defined power
    M3,
    /// Background, defined time
    M4,
    /// Background, keep warm
    M5,
}

impl GnssPowerMode {
    /// Background tiers trade accuracy for power
    pub fn is_background(self) -> bool {
        matches!(self, Self::M3 | Self::M4 | Self::M5)
    }
}

/// Criteria of a fix session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixCriteria {
    pub mode: PositionMode,
    pub recurrence: Recurrence,
    pub min_interval_ms: u32,
    /// Preferred horizontal accuracy, meters
    pub preferred_accuracy_m: u32,
    pub share_position: bool,
    pub credentials: String,
    pub provider: String,
    pub power_mode: Option<GnssPowerMode>,
    pub time_between_measurements_ms: u32,
}

impl Default for FixCriteria {
    fn default() -> Self {
        Self {
            mode: PositionMode::Standalone,
            recurrence: Recurrence::Periodic,
            min_interval_ms: 1000,
            preferred_accuracy_m: 50,
            share_position: true,
            credentials: String::new(),
            provider: String::new(),
            power_mode: None,
            time_between_measurements_ms: 0,
        }
    }
}

bitflags! {
    /// Qualifiers of a visible satellite
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct GnssSvOptions: u32 {
        const HAS_EPHEMERIS = 1 << 0;
        const HAS_ALMANAC = 1 << 1;
        const USED_IN_FIX = 1 << 2;
        const HAS_CARRIER_FREQUENCY = 1 << 3;
    }
}

/// One visible satellite
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GnssSv {
    /// Constellation-relative id
    pub sv_id: u16,
    pub sv_type: GnssSvType,
    pub cn0_dbhz: f32,
    pub elevation: f32,
    pub azimuth: f32,
    pub options: GnssSvOptions,
    pub carrier_frequency_hz: f32,
    pub signal_type: GnssSignalTypeMask,
}

/// Satellite visibility report
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GnssSvNotification {
    /// Signal types came from the engine rather than per-constellation defaults
    pub signal_type_valid: bool,
    pub svs: Vec<GnssSv>,
}
