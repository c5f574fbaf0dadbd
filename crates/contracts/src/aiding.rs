//! Aiding data, engine configuration values and the records reported about them

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::{SvSystem, SystemTime};

bitflags! {
    /// Satellite data selected for deletion
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct AidingDataSvMask: u32 {
        const EPHEMERIS = 1 << 0;
        const ALMANAC = 1 << 1;
        const HEALTH = 1 << 2;
        const DIRECTION = 1 << 3;
        const STEER = 1 << 4;
        const ALMANAC_CORR = 1 << 5;
        const BLACKLIST = 1 << 6;
        const SA_DATA = 1 << 7;
        const NO_EXIST = 1 << 8;
        const IONOSPHERE = 1 << 9;
        const TIME = 1 << 10;
        const MB_DATA = 1 << 11;
        const POLY = 1 << 12;
    }
}

bitflags! {
    /// Constellations a satellite-data deletion applies to
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct AidingDataSvTypeMask: u32 {
        const GPS = 1 << 0;
        const GLONASS = 1 << 1;
        const QZSS = 1 << 2;
        const BEIDOU = 1 << 3;
        const GALILEO = 1 << 4;
    }
}

bitflags! {
    /// Constellation-independent data selected for deletion
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct AidingDataCommonMask: u32 {
        const POSITION = 1 << 0;
        const TIME = 1 << 1;
        const UTC = 1 << 2;
        const RTI = 1 << 3;
        const FREQ_BIAS_EST = 1 << 4;
        const CELLDB = 1 << 5;
    }
}

/// Aiding data deletion request, also used to report deletions done by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GnssAidingData {
    pub delete_all: bool,
    pub sv_mask: AidingDataSvMask,
    pub sv_type_mask: AidingDataSvTypeMask,
    pub common_mask: AidingDataCommonMask,
}

/// Source of an ephemeris update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EphemerisAction {
    #[default]
    UpdateSrcUnknown,
    UpdateSrcOta,
    UpdateSrcNetwork,
    DeleteSrcUnknown,
    DeleteSrcNetwork,
    DeleteSrcOta,
}

/// Keplerian parameters shared by every GPS-like constellation
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EphemerisCommon {
    pub sv_id: u16,
    pub action: EphemerisAction,
    pub iode: u16,
    pub a_sqrt: f64,
    pub delta_n: f64,
    pub m0: f64,
    pub eccentricity: f64,
    pub omega0: f64,
    pub i0: f64,
    pub omega: f64,
    pub omega_dot: f64,
    pub i_dot: f64,
    pub c_uc: f64,
    pub c_us: f64,
    pub c_rc: f64,
    pub c_rs: f64,
    pub c_ic: f64,
    pub c_is: f64,
    pub toe: u32,
    pub toc: u32,
    pub af0: f64,
    pub af1: f64,
    pub af2: f64,
}

/// GPS or QZSS ephemeris
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GpsEphemeris {
    pub common: EphemerisCommon,
    pub signal_health: u8,
    pub urai: u8,
    pub code_l2: u8,
    pub data_flag_l2p: u8,
    pub tgd: f64,
    pub fit_interval: u8,
    pub iodc: u16,
}

/// GLONASS ephemeris
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GlonassEphemeris {
    pub sv_id: u16,
    pub action: EphemerisAction,
    pub bn_health: u8,
    pub ln_health: u8,
    pub tb: u8,
    pub ft: u8,
    pub glo_m: u8,
    pub en_age: u8,
    pub glo_frequency: u8,
    pub p1: u8,
    pub p2: u8,
    pub delta_tau: f32,
    pub position: [f64; 3],
    pub velocity: [f64; 3],
    pub acceleration: [f64; 3],
    pub tau_n: f32,
    pub gamma: f64,
    pub toe: f64,
    pub nt: u16,
}

/// BeiDou ephemeris
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BdsEphemeris {
    pub common: EphemerisCommon,
    pub sv_health: u8,
    pub aodc: u8,
    pub tgd1: f64,
    pub tgd2: f64,
    pub urai: u8,
}

/// Galileo signal an ephemeris was decoded from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GalEphSignalSource {
    #[default]
    Unknown,
    E1b,
    E5a,
    E5b,
}

/// Galileo ephemeris
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GalileoEphemeris {
    pub common: EphemerisCommon,
    pub data_source_signal: GalEphSignalSource,
    pub sis_index: u8,
    pub bgd_e1_e5a: f64,
    pub bgd_e1_e5b: f64,
    pub sv_health: u8,
}

/// Ephemerides of one constellation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EphemerisData {
    Gps(Vec<GpsEphemeris>),
    Glonass(Vec<GlonassEphemeris>),
    Bds(Vec<BdsEphemeris>),
    Galileo(Vec<GalileoEphemeris>),
    Qzss(Vec<GpsEphemeris>),
}

impl EphemerisData {
    pub fn constellation(&self) -> SvSystem {
        match self {
            Self::Gps(_) => SvSystem::Gps,
            Self::Glonass(_) => SvSystem::Glonass,
            Self::Bds(_) => SvSystem::Bds,
            Self::Galileo(_) => SvSystem::Galileo,
            Self::Qzss(_) => SvSystem::Qzss,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Gps(v) | Self::Qzss(v) => v.len(),
            Self::Glonass(v) => v.len(),
            Self::Bds(v) => v.len(),
            Self::Galileo(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Ephemeris report forwarded to the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SvEphemerisReport {
    /// GPS time the report was generated at
    pub system_time: Option<SystemTime>,
    pub data: EphemerisData,
}

/// Klobuchar ionospheric model broadcast by a constellation
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct KlobucharIonoModel {
    pub constellation: SvSystem,
    pub system_time: Option<SystemTime>,
    pub alpha: [f32; 4],
    pub beta: [f32; 4],
}

/// Leap second and GLONASS time offset from the engine event report
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AdditionalSystemInfo {
    pub system_time: Option<SystemTime>,
    pub leap_sec: Option<u8>,
    /// GLONASS to UTC time offset, seconds
    pub tau_c: Option<f64>,
}

/// Upcoming leap second change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LeapSecondChange {
    pub gps_week: u16,
    pub gps_time_of_week_ms: u32,
    pub leap_seconds_before: u8,
    pub leap_seconds_after: u8,
}

/// System information forwarded to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LocationSystemInfo {
    pub current_leap_seconds: Option<u8>,
    pub leap_second_change: Option<LeapSecondChange>,
}

impl LocationSystemInfo {
    pub fn is_empty(&self) -> bool {
        self.current_leap_seconds.is_none() && self.leap_second_change.is_none()
    }
}

/// Satellites blacklisted per constellation, bit 0 = lowest PRN
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SvIdConfig {
    pub glo_blacklist: u64,
    pub bds_blacklist: u64,
    pub qzss_blacklist: u64,
    pub gal_blacklist: u64,
}

bitflags! {
    /// Constellation selector of constellation control
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct GnssSvTypesMask: u32 {
        const GLO = 1 << 0;
        const BDS = 1 << 1;
        const QZSS = 1 << 2;
        const GAL = 1 << 3;
    }
}

/// Enabled and blacklisted constellations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SvTypeConfig {
    pub enabled: GnssSvTypesMask,
    pub blacklisted: GnssSvTypesMask,
}

/// Positioning lock applied to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GpsLock {
    None,
    /// Mobile-originated sessions locked
    Mo,
    /// Network-initiated sessions locked
    Ni,
    MoAndNi,
}

/// Kind of location server being configured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServerType {
    Supl,
    MoSupl,
    Mpc,
    CustomPde,
    Pde,
}

/// SUPL protocol version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SuplVersion {
    #[default]
    V1_0_0,
    V2_0_0,
    V2_0_2,
}

/// LPP planes to enable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LppProfile {
    #[default]
    Rrlp,
    UserPlane,
    ControlPlane,
    UserPlaneAndControlPlane,
}

/// XTRA file version check mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum XtraVersionCheck {
    #[default]
    Disabled,
    Auto,
    Xtra2,
    Xtra3,
}

impl XtraVersionCheck {
    /// Raw configuration value; out-of-range values disable the check
    pub fn from_raw(check: u32) -> Self {
        match check {
            1 => Self::Auto,
            2 => Self::Xtra2,
            3 => Self::Xtra3,
            _ => Self::Disabled,
        }
    }
}

/// Host sensor properties forwarded to the engine; absent values are not sent
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SensorProperties {
    pub gyro_bias_variance_random_walk: Option<f32>,
    pub accel_random_walk_spectral_density: Option<f32>,
    pub angle_random_walk_spectral_density: Option<f32>,
    pub rate_random_walk_spectral_density: Option<f32>,
    pub velocity_random_walk_spectral_density: Option<f32>,
}

/// Sensor sampling parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SensorSampling {
    pub samples_per_batch: u16,
    pub batches_per_sec: u16,
}

/// Sensor performance control configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SensorPerfControl {
    /// Raw control mode; 2 means "not set"
    pub control_mode: i32,
    pub accel: SensorSampling,
    pub gyro: SensorSampling,
    pub accel_high: SensorSampling,
    pub gyro_high: SensorSampling,
    pub algorithm_config: i32,
}

/// DER encoded SUPL certificate
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DerCertificate {
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
}

/// Number of SUPL certificate slots on the engine
pub const AGPS_CERTIFICATE_MAX_SLOTS: u8 = 10;
