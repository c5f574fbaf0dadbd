//! Constellation, signal and time primitives shared by both sides of the adapter

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Satellite system as tagged by the remote engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SvSystem {
    Gps,
    Galileo,
    Sbas,
    Compass,
    Glonass,
    Bds,
    Qzss,
    #[default]
    Unknown,
}

/// Satellite constellation as seen by the location engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GnssSvType {
    #[default]
    Unknown,
    Gps,
    Sbas,
    Glonass,
    Qzss,
    Beidou,
    Galileo,
}

bitflags! {
    /// Signal carried by a measurement; one bit per band and code
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct GnssSignalTypeMask: u32 {
        const GPS_L1CA = 1 << 0;
        const GPS_L1C = 1 << 1;
        const GPS_L2C_L = 1 << 2;
        const GPS_L5_Q = 1 << 3;
        const GLONASS_G1 = 1 << 4;
        const GLONASS_G2 = 1 << 5;
        const GALILEO_E1_C = 1 << 6;
        const GALILEO_E5A_Q = 1 << 7;
        const GALILEO_E5B_Q = 1 << 8;
        const BEIDOU_B1_I = 1 << 9;
        const BEIDOU_B1_C = 1 << 10;
        const BEIDOU_B2_I = 1 << 11;
        const BEIDOU_B2A_I = 1 << 12;
        const QZSS_L1CA = 1 << 13;
        const QZSS_L1S = 1 << 14;
        const QZSS_L2C_L = 1 << 15;
        const QZSS_L5_Q = 1 << 16;
        const SBAS_L1_CA = 1 << 17;
    }
}

/// PRN ranges used by the remote engine, per constellation
pub mod prn {
    pub const GPS_MIN: u16 = 1;
    pub const GPS_MAX: u16 = 32;
    pub const GLO_MIN: u16 = 65;
    pub const GLO_MAX: u16 = 96;
    pub const QZSS_MIN: u16 = 193;
    pub const QZSS_MAX: u16 = 197;
    pub const BDS_MIN: u16 = 201;
    pub const BDS_MAX: u16 = 237;
    pub const GAL_MIN: u16 = 301;
    pub const GAL_MAX: u16 = 336;
}

/// Milliseconds in a GPS week
pub const WEEK_MSECS: u64 = 604_800_000;
/// Milliseconds in a day
pub const DAY_MSECS: u64 = 86_400_000;
/// Week number reported when the engine has no GPS time
pub const GPS_WEEK_UNKNOWN: u16 = 65535;

/// GPS week and time of week
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GpsTime {
    pub week: u16,
    pub tow_ms: u32,
}

/// Week-based system time (GPS, Galileo, BeiDou, QZSS)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SystemTime {
    pub week: u16,
    pub week_ms: u32,
    pub clk_time_bias_ms: f32,
    pub clk_time_unc_ms: f32,
}

/// GLONASS system time
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GloTime {
    pub four_year: u8,
    pub days: u16,
    pub msec: u32,
    pub clk_time_bias_ms: f32,
    pub clk_time_unc_ms: f32,
}

impl GloTime {
    /// Four-year and day counters both carry a known value
    pub fn is_known(&self) -> bool {
        self.four_year != 255 && self.days != 65535
    }
}

/// Extended system time: frame counter and RTC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SystemTimeExt {
    pub ref_fcount: u32,
    pub system_rtc_ms: Option<u64>,
}

/// GNSS time attached to a normalized record, tagged by constellation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GnssSystemTime {
    Gps(SystemTime),
    Galileo(SystemTime),
    Beidou(SystemTime),
    Qzss(SystemTime),
    Glonass(GloTime),
}

/// Leap second state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LeapSecondInfo {
    pub leap_sec: u8,
    pub leap_sec_unc: u8,
}
