//! Field conversions shared by the command encoders and indication decoders

use contracts::{
    carrier, prn, ApnTypeMask, GloTime, GnssPowerMode, GnssSignalTypeMask, GnssSvType,
    GnssSystemTime, GpsTime, NativeApnTypeMask, NativeNavSolutionMask, NativePowerMode,
    NativeTechMask, NavSolutionMask, OperationMode, PosTechMask, PositionMode, SvSystem,
    SvUsedIds, DAY_MSECS, WEEK_MSECS,
};

/// Days between the GPS epoch (1980) and the GLONASS epoch (1996)
const GPS_GLONASS_DAYS_DIFF: u64 = 5838;
const GLONASS_DAYS_IN_4YEARS: u64 = 1461;
const GLONASS_UTC_OFFSET_HOURS: u64 = 3;

/// Confidence → scale factor to 68%, first bucket whose bound covers the confidence wins
const CONFIDENCE_SCALERS: &[(u8, f32)] = &[(39, 1.517), (50, 1.287), (63, 1.072)];

/// Confidence assumed for circular uncertainty
const CIRCULAR_CONFIDENCE: u8 = 63;

const TECH_MAP: &[(NativeTechMask, PosTechMask)] = &[
    (NativeTechMask::SATELLITE, PosTechMask::SATELLITE),
    (NativeTechMask::CELLID, PosTechMask::CELLID),
    (NativeTechMask::WIFI, PosTechMask::WIFI),
    (NativeTechMask::SENSORS, PosTechMask::SENSORS),
    (
        NativeTechMask::REFERENCE_LOCATION,
        PosTechMask::REFERENCE_LOCATION,
    ),
    (
        NativeTechMask::INJECTED_COARSE_POSITION,
        PosTechMask::INJECTED_COARSE_POSITION,
    ),
    (NativeTechMask::AFLT, PosTechMask::AFLT),
    (NativeTechMask::HYBRID, PosTechMask::HYBRID),
];

const NAV_MAP: &[(NativeNavSolutionMask, NavSolutionMask)] = &[
    (
        NativeNavSolutionMask::SBAS_CORRECTION_IONO,
        NavSolutionMask::SBAS_CORRECTION_IONO,
    ),
    (
        NativeNavSolutionMask::SBAS_CORRECTION_FAST,
        NavSolutionMask::SBAS_CORRECTION_FAST,
    ),
    (
        NativeNavSolutionMask::SBAS_CORRECTION_LONG,
        NavSolutionMask::SBAS_CORRECTION_LONG,
    ),
    (
        NativeNavSolutionMask::SBAS_INTEGRITY,
        NavSolutionMask::SBAS_INTEGRITY,
    ),
];

const APN_MAP: &[(NativeApnTypeMask, ApnTypeMask)] = &[
    (NativeApnTypeMask::DEFAULT, ApnTypeMask::DEFAULT),
    (NativeApnTypeMask::IMS, ApnTypeMask::IMS),
    (NativeApnTypeMask::MMS, ApnTypeMask::MMS),
    (NativeApnTypeMask::DUN, ApnTypeMask::DUN),
    (NativeApnTypeMask::SUPL, ApnTypeMask::SUPL),
    (NativeApnTypeMask::HIPRI, ApnTypeMask::HIPRI),
    (NativeApnTypeMask::FOTA, ApnTypeMask::FOTA),
    (NativeApnTypeMask::CBS, ApnTypeMask::CBS),
    (NativeApnTypeMask::IA, ApnTypeMask::IA),
    (NativeApnTypeMask::EMERGENCY, ApnTypeMask::EMERGENCY),
];

pub fn tech_mask(native: NativeTechMask) -> PosTechMask {
    TECH_MAP
        .iter()
        .filter(|(n, _)| native.contains(*n))
        .fold(PosTechMask::empty(), |acc, (_, t)| acc | *t)
}

/// Only the SBAS correction bits have a normalized counterpart
pub fn nav_solution_mask(native: NativeNavSolutionMask) -> NavSolutionMask {
    NAV_MAP
        .iter()
        .filter(|(n, _)| native.contains(*n))
        .fold(NavSolutionMask::empty(), |acc, (_, m)| acc | *m)
}

pub fn apn_type_mask(native: NativeApnTypeMask) -> ApnTypeMask {
    APN_MAP
        .iter()
        .filter(|(n, _)| native.contains(*n))
        .fold(ApnTypeMask::empty(), |acc, (_, m)| acc | *m)
}

pub fn native_apn_type_mask(mask: ApnTypeMask) -> NativeApnTypeMask {
    APN_MAP
        .iter()
        .filter(|(_, m)| mask.contains(*m))
        .fold(NativeApnTypeMask::empty(), |acc, (n, _)| acc | *n)
}

pub fn operation_mode(mode: PositionMode) -> OperationMode {
    match mode {
        PositionMode::MsBased => OperationMode::Msb,
        PositionMode::MsAssisted => OperationMode::Msa,
        PositionMode::CellId => OperationMode::CellId,
        PositionMode::Wwan => OperationMode::Wwan,
        PositionMode::Standalone => OperationMode::Standalone,
    }
}

pub fn power_mode(mode: GnssPowerMode) -> NativePowerMode {
    match mode {
        GnssPowerMode::M1 => NativePowerMode::ImprovedAccuracy,
        GnssPowerMode::M2 => NativePowerMode::Normal,
        GnssPowerMode::M3 => NativePowerMode::BackgroundDefinedPower,
        GnssPowerMode::M4 => NativePowerMode::BackgroundDefinedTime,
        GnssPowerMode::M5 => NativePowerMode::BackgroundKeepWarm,
    }
}

/// Rescale a horizontal accuracy reported at `confidence` percent to 68 percent
///
/// Confidences of 68 and above, and those between the last bucket and 68, are left as-is.
pub fn scale_to_68(accuracy: f32, confidence: u8, circular: bool) -> f32 {
    if confidence >= 68 {
        return accuracy;
    }
    let real = if circular {
        CIRCULAR_CONFIDENCE
    } else {
        confidence
    };
    CONFIDENCE_SCALERS
        .iter()
        .find(|(bound, _)| real <= *bound)
        .map_or(accuracy, |(_, scale)| accuracy * scale)
}

/// Signal assumed when the engine does not report one
pub fn default_signal_type(sv_type: GnssSvType) -> GnssSignalTypeMask {
    match sv_type {
        GnssSvType::Gps => GnssSignalTypeMask::GPS_L1CA,
        GnssSvType::Sbas => GnssSignalTypeMask::SBAS_L1_CA,
        GnssSvType::Glonass => GnssSignalTypeMask::GLONASS_G1,
        GnssSvType::Qzss => GnssSignalTypeMask::QZSS_L1CA,
        GnssSvType::Beidou => GnssSignalTypeMask::BEIDOU_B1_I,
        GnssSvType::Galileo => GnssSignalTypeMask::GALILEO_E1_C,
        GnssSvType::Unknown => GnssSignalTypeMask::empty(),
    }
}

/// Carrier frequency of a single signal bit, GLONASS shifted by its channel
pub fn carrier_frequency(signal: GnssSignalTypeMask, glo_frequency: u8) -> f32 {
    let channel = if (1..=14).contains(&glo_frequency) {
        f32::from(glo_frequency) - 8.0
    } else {
        0.0
    };
    if signal == GnssSignalTypeMask::GPS_L1CA {
        carrier::GPS_L1CA
    } else if signal == GnssSignalTypeMask::GPS_L1C {
        carrier::GPS_L1C
    } else if signal == GnssSignalTypeMask::GPS_L2C_L {
        carrier::GPS_L2C_L
    } else if signal == GnssSignalTypeMask::GPS_L5_Q {
        carrier::GPS_L5_Q
    } else if signal == GnssSignalTypeMask::GLONASS_G1 {
        carrier::GLONASS_G1 + channel * carrier::GLONASS_G1_CHANNEL_STEP
    } else if signal == GnssSignalTypeMask::GLONASS_G2 {
        carrier::GLONASS_G2 + channel * carrier::GLONASS_G2_CHANNEL_STEP
    } else if signal == GnssSignalTypeMask::GALILEO_E1_C {
        carrier::GALILEO_E1_C
    } else if signal == GnssSignalTypeMask::GALILEO_E5A_Q {
        carrier::GALILEO_E5A_Q
    } else if signal == GnssSignalTypeMask::GALILEO_E5B_Q {
        carrier::GALILEO_E5B_Q
    } else if signal == GnssSignalTypeMask::BEIDOU_B1_I {
        carrier::BEIDOU_B1_I
    } else if signal == GnssSignalTypeMask::BEIDOU_B1_C {
        carrier::BEIDOU_B1C
    } else if signal == GnssSignalTypeMask::BEIDOU_B2_I {
        carrier::BEIDOU_B2_I
    } else if signal == GnssSignalTypeMask::BEIDOU_B2A_I {
        carrier::BEIDOU_B2A_I
    } else if signal == GnssSignalTypeMask::QZSS_L1CA {
        carrier::QZSS_L1CA
    } else if signal == GnssSignalTypeMask::QZSS_L1S {
        carrier::QZSS_L1S
    } else if signal == GnssSignalTypeMask::QZSS_L2C_L {
        carrier::QZSS_L2C_L
    } else if signal == GnssSignalTypeMask::QZSS_L5_Q {
        carrier::QZSS_L5_Q
    } else if signal == GnssSignalTypeMask::SBAS_L1_CA {
        carrier::SBAS_L1_CA
    } else {
        0.0
    }
}

/// Normalized type and id of a satellite in an SV info report
pub fn sv_info_id(system: SvSystem, gnss_sv_id: u16) -> (GnssSvType, u16) {
    match system {
        SvSystem::Gps => (GnssSvType::Gps, gnss_sv_id),
        SvSystem::Galileo => (GnssSvType::Galileo, gnss_sv_id.saturating_sub(300)),
        SvSystem::Sbas => (GnssSvType::Sbas, gnss_sv_id),
        SvSystem::Glonass => (GnssSvType::Glonass, gnss_sv_id),
        SvSystem::Bds | SvSystem::Compass => {
            (GnssSvType::Beidou, gnss_sv_id.saturating_sub(200))
        }
        SvSystem::Qzss => (GnssSvType::Qzss, gnss_sv_id.saturating_sub(192)),
        SvSystem::Unknown => (GnssSvType::Unknown, gnss_sv_id),
    }
}

/// Constellation of a satellite id by its PRN range
pub fn sv_type_for_prn(id: u16) -> Option<(GnssSvType, u16)> {
    match id {
        prn::GPS_MIN..=prn::GPS_MAX => Some((GnssSvType::Gps, id - prn::GPS_MIN)),
        prn::GLO_MIN..=prn::GLO_MAX => Some((GnssSvType::Glonass, id - prn::GLO_MIN)),
        prn::QZSS_MIN..=prn::QZSS_MAX => Some((GnssSvType::Qzss, id - prn::QZSS_MIN)),
        prn::BDS_MIN..=prn::BDS_MAX => Some((GnssSvType::Beidou, id - prn::BDS_MIN)),
        prn::GAL_MIN..=prn::GAL_MAX => Some((GnssSvType::Galileo, id - prn::GAL_MIN)),
        _ => None,
    }
}

/// Mark a satellite id in the per-constellation used masks
///
/// Returns the constellation it landed in, `None` for ids outside every range.
pub fn mark_sv_used(ids: &mut SvUsedIds, id: u16) -> Option<GnssSvType> {
    let (sv_type, offset) = sv_type_for_prn(id)?;
    let bit = 1u64 << offset;
    match sv_type {
        GnssSvType::Gps => ids.gps |= bit,
        GnssSvType::Glonass => ids.glonass |= bit,
        GnssSvType::Qzss => ids.qzss |= bit,
        GnssSvType::Beidou => ids.bds |= bit,
        GnssSvType::Galileo => ids.galileo |= bit,
        GnssSvType::Sbas | GnssSvType::Unknown => return None,
    }
    Some(sv_type)
}

/// Satellites used in a fix, each mask limited to its constellation size
pub fn num_sv_used(ids: &SvUsedIds) -> u8 {
    fn count(mask: u64, size: u16) -> u32 {
        let limit = if size >= 64 {
            u64::MAX
        } else {
            (1u64 << size) - 1
        };
        (mask & limit).count_ones()
    }
    let total = count(ids.gps, prn::GPS_MAX - prn::GPS_MIN + 1)
        + count(ids.glonass, prn::GLO_MAX - prn::GLO_MIN + 1)
        + count(ids.qzss, prn::QZSS_MAX - prn::QZSS_MIN + 1)
        + count(ids.bds, prn::BDS_MAX - prn::BDS_MIN + 1)
        + count(ids.galileo, prn::GAL_MAX - prn::GAL_MIN + 1);
    u8::try_from(total).unwrap_or(u8::MAX)
}

/// GLONASS time expressed as GPS week and time of week
pub fn glonass_to_gps_time(glo: &GloTime, leap_seconds: u8) -> GpsTime {
    let total = u64::from(glo.four_year) * GLONASS_DAYS_IN_4YEARS * DAY_MSECS
        + u64::from(glo.days) * DAY_MSECS
        + u64::from(glo.msec)
        + GPS_GLONASS_DAYS_DIFF * DAY_MSECS
        - GLONASS_UTC_OFFSET_HOURS * 3600 * 1000
        + u64::from(leap_seconds) * 1000;
    GpsTime {
        week: u16::try_from(total / WEEK_MSECS).unwrap_or(u16::MAX),
        tow_ms: u32::try_from(total % WEEK_MSECS).unwrap_or(u32::MAX),
    }
}

/// GPS time of a system time; GLONASS needs the leap seconds
pub fn system_time_to_gps(time: &GnssSystemTime, leap_seconds: Option<u8>) -> Option<GpsTime> {
    match time {
        GnssSystemTime::Gps(t)
        | GnssSystemTime::Galileo(t)
        | GnssSystemTime::Beidou(t)
        | GnssSystemTime::Qzss(t) => Some(GpsTime {
            week: t.week,
            tow_ms: t.week_ms,
        }),
        GnssSystemTime::Glonass(glo) => leap_seconds.map(|ls| glonass_to_gps_time(glo, ls)),
    }
}

/// Upper-case hex rendering, two digits per byte
pub fn hex_string(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
        let _ = write!(s, "{b:02X}");
        s
    })
}
