//! Raw satellite measurements, processed GNSS measurements and SV polynomials

use std::time::Duration;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::{GloTime, GnssSignalTypeMask, GnssSvType, SvSystem, SystemTime};

bitflags! {
    /// Per-measurement status bits; the same layout serves as validity mask
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct MeasStatus: u64 {
        /// Sub-millisecond time valid (code lock)
        const SM_VALID = 1 << 0;
        /// Sub-bit time valid
        const SB_VALID = 1 << 1;
        /// Satellite time known to the millisecond
        const MS_VALID = 1 << 2;
        /// Bit edge confirmed from signal
        const BE_CONFIRM = 1 << 3;
        const VELOCITY_VALID = 1 << 4;
        /// Doppler from the fine tracking loop
        const VELOCITY_FINE = 1 << 5;
        const LP_VALID = 1 << 6;
        const LP_POS_VALID = 1 << 7;
        const FROM_RNG_DIFF = 1 << 9;
        const FROM_VE_DIFF = 1 << 10;
        const DONT_USE_X = 1 << 11;
        const DONT_USE_M = 1 << 12;
        const DONT_USE_D = 1 << 13;
        const DONT_USE_S = 1 << 14;
        const DONT_USE_P = 1 << 15;
        /// Galileo E1C secondary code lock (100 ms)
        const GAL_100MS = 1 << 34;
        /// Galileo E1B page sync (2 s)
        const GAL_2S = 1 << 35;
        /// Measurement was refreshed in this epoch
        const FRESH_MEAS = 1 << 56;
    }
}

bitflags! {
    /// Tracking state of a processed measurement; empty means unknown
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct GnssMeasurementState: u32 {
        const CODE_LOCK = 1 << 0;
        const BIT_SYNC = 1 << 1;
        const SUBFRAME_SYNC = 1 << 2;
        const TOW_DECODED = 1 << 3;
        const MSEC_AMBIGUOUS = 1 << 4;
        const SYMBOL_SYNC = 1 << 5;
        const GLO_STRING_SYNC = 1 << 6;
        const GLO_TOD_DECODED = 1 << 7;
        const BDS_D2_BIT_SYNC = 1 << 8;
        const BDS_D2_SUBFRAME_SYNC = 1 << 9;
        const GAL_E1BC_CODE_LOCK = 1 << 10;
        const GAL_E1C_2ND_CODE_LOCK = 1 << 11;
        const GAL_E1B_PAGE_SYNC = 1 << 12;
        const SBAS_SYNC = 1 << 13;
    }
}

/// Carrier frequencies in Hz, per signal
pub mod carrier {
    pub const GPS_L1CA: f32 = 1_575_420_000.0;
    pub const GPS_L1C: f32 = 1_575_420_000.0;
    pub const GPS_L2C_L: f32 = 1_227_600_000.0;
    pub const GPS_L5_Q: f32 = 1_176_450_000.0;
    pub const GLONASS_G1: f32 = 1_602_000_000.0;
    pub const GLONASS_G2: f32 = 1_246_000_000.0;
    pub const GALILEO_E1_C: f32 = 1_575_420_000.0;
    pub const GALILEO_E5A_Q: f32 = 1_176_450_000.0;
    pub const GALILEO_E5B_Q: f32 = 1_207_140_000.0;
    pub const BEIDOU_B1_I: f32 = 1_561_098_000.0;
    pub const BEIDOU_B1C: f32 = 1_575_420_000.0;
    pub const BEIDOU_B2_I: f32 = 1_207_140_000.0;
    pub const BEIDOU_B2A_I: f32 = 1_176_450_000.0;
    pub const QZSS_L1CA: f32 = 1_575_420_000.0;
    pub const QZSS_L1S: f32 = 1_575_420_000.0;
    pub const QZSS_L2C_L: f32 = 1_227_600_000.0;
    pub const QZSS_L5_Q: f32 = 1_176_450_000.0;
    pub const SBAS_L1_CA: f32 = 1_575_420_000.0;

    /// GLONASS G1 spacing between frequency channels
    pub const GLONASS_G1_CHANNEL_STEP: f32 = 562_500.0;
    /// GLONASS G2 spacing between frequency channels
    pub const GLONASS_G2_CHANNEL_STEP: f32 = 437_500.0;
}

/// Receiver clock frequency estimate
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RcvrClockFrequency {
    /// m/s
    pub clock_drift: f32,
    pub clock_drift_unc: f32,
    pub source_of_freq: u32,
}

/// Time bias between two constellations
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct InterSystemBias {
    pub valid_mask: u32,
    /// ms
    pub time_bias: f32,
    pub time_bias_unc: f32,
}

/// Satellite time and doppler of one measurement
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SvTimeSpeed {
    pub sv_time_ms: u32,
    pub sv_time_sub_ms: f32,
    pub sv_time_unc_ms: f32,
    pub doppler_shift: f32,
    pub doppler_shift_unc: f32,
}

/// Inter-system biases of a measurement epoch
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct InterSystemBiases {
    pub gps_glo: Option<InterSystemBias>,
    pub gps_bds: Option<InterSystemBias>,
    pub gps_gal: Option<InterSystemBias>,
    pub bds_glo: Option<InterSystemBias>,
    pub gal_glo: Option<InterSystemBias>,
    pub gal_bds: Option<InterSystemBias>,
    pub gal_e1_e5a: Option<InterSystemBias>,
    pub gps_l1_l5: Option<InterSystemBias>,
}

/// System time of one constellation within a measurement header
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MeasSystemTime {
    pub time: Option<SystemTime>,
    pub ref_fcount: Option<u32>,
    pub num_clock_resets: Option<u32>,
}

/// GLONASS time within a measurement header
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MeasGloTime {
    pub time: Option<GloTime>,
    pub ref_fcount: Option<u32>,
    pub num_clock_resets: Option<u32>,
}

/// Header shared by every satellite in a measurement set
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SvMeasurementHeader {
    pub clock_frequency: Option<RcvrClockFrequency>,
    pub leap_sec: Option<u8>,
    pub biases: InterSystemBiases,
    pub gps_time: MeasSystemTime,
    pub gal_time: MeasSystemTime,
    pub bds_time: MeasSystemTime,
    pub qzss_time: MeasSystemTime,
    pub glo_time: MeasGloTime,
    /// RTC of the constellation the last fragment came from
    pub system_rtc_ms: Option<u64>,
    pub ap_timestamp: Option<crate::ApTimestamp>,
}

/// Optional refinements of one raw measurement
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SvMeasurementExtras {
    pub multipath_estimate: Option<f32>,
    pub fine_speed: Option<f32>,
    pub fine_speed_unc: Option<f32>,
    pub carrier_phase: Option<f64>,
    pub carrier_phase_unc: Option<f32>,
    pub elevation: Option<f32>,
    pub azimuth: Option<f32>,
    pub cycle_slip_count: Option<u8>,
}

/// One satellite of a raw measurement set
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SvMeasurement {
    pub system: SvSystem,
    pub signal_type: Option<GnssSignalTypeMask>,
    pub sv_id: u16,
    pub glo_frequency: u8,
    pub loss_of_lock: Option<bool>,
    pub sv_status: u8,
    pub health_status: Option<u8>,
    pub sv_info_mask: u8,
    pub cno: u16,
    pub glo_rf_loss: u16,
    pub meas_latency: i32,
    pub time_speed: SvTimeSpeed,
    pub measurement_status: MeasStatus,
    pub valid_meas_status_mask: MeasStatus,
    pub extras: SvMeasurementExtras,
}

/// Raw measurement epoch accumulated from a fragment sequence
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SvMeasurementSet {
    pub is_nhz: bool,
    pub header: SvMeasurementHeader,
    pub measurements: Vec<SvMeasurement>,
}

/// Multipath indicator of a processed measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MultipathIndicator {
    #[default]
    Unknown,
    Present,
    NotPresent,
}

/// Processed measurement of one satellite
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GnssMeasurementsData {
    pub sv_type: GnssSvType,
    pub sv_id: u16,
    pub time_offset_ns: f64,
    pub state: GnssMeasurementState,
    pub received_sv_time_ns: i64,
    pub received_sv_time_unc_ns: i64,
    pub cn0_dbhz: f64,
    pub pseudorange_rate_mps: f64,
    pub pseudorange_rate_unc_mps: f64,
    pub carrier_frequency_hz: Option<f32>,
    pub multipath: MultipathIndicator,
    pub agc_level_db: Option<f64>,
}

/// Receiver clock of a processed measurement epoch
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GnssMeasurementsClock {
    pub time_ns: i64,
    pub time_unc_ns: f64,
    pub full_bias_ns: Option<i64>,
    pub bias_ns: Option<f64>,
    pub bias_unc_ns: Option<f64>,
    pub drift_nsps: Option<f64>,
    pub drift_unc_nsps: Option<f64>,
    pub hw_clock_discontinuity_count: u32,
}

/// Processed measurement epoch
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GnssMeasurements {
    pub clock: GnssMeasurementsClock,
    pub measurements: Vec<GnssMeasurementsData>,
}

bitflags! {
    /// Qualifiers of an SV polynomial
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct SvPolyStatus: u8 {
        const FROM_EPHEMERIS = 1 << 0;
        const FROM_ALMANAC = 1 << 1;
        const FROM_XTRA = 1 << 2;
        const VALID_POLY = 1 << 3;
    }
}

/// Satellite orbit polynomial; shared by the indication and the engine report
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SvPolynomial {
    pub sv_id: u16,
    pub t0: f64,
    pub glo_frequency: Option<u8>,
    pub iode: Option<u16>,
    pub sv_pos_unc: Option<f32>,
    pub flags: Option<SvPolyStatus>,
    pub poly_coeff_xyz0: Option<[f64; 3]>,
    pub poly_coeff_xyzn: Option<[f64; 9]>,
    pub poly_coeff_clock_bias: Option<[f32; 4]>,
    pub iono_dot: Option<f32>,
    pub iono_delay: Option<f32>,
    pub sbas_iono_dot: Option<f32>,
    pub sbas_iono_delay: Option<f32>,
    pub tropo_delay: Option<f32>,
    pub elevation: Option<f32>,
    pub elevation_dot: Option<f32>,
    pub elevation_unc: Option<f32>,
    pub vel_coef: Option<[f64; 12]>,
    pub enhanced_iod: Option<u32>,
}

impl SvMeasurementHeader {
    /// Stamp the header with the boot-clock time it was flushed at
    pub fn stamp(&mut self, boot_time: Duration, uncertainty_ms: f32) {
        self.ap_timestamp = Some(crate::ApTimestamp {
            boot_time,
            uncertainty_ms,
        });
    }
}
