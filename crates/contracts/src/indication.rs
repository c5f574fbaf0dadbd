//! Native indications delivered by the transport
//!
//! Every optional field of the remote protocol is modelled as `Option`; decoders omit
//! absent fields from the normalized output instead of failing.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::{
    BearerType, BlacklistSvInd, ConstellationConfigInd, Dop, EngineState, ExtDop,
    FixSessionState, GloTime, GnssSignalTypeMask, GpsTime, IndStatus, InterSystemBiases,
    LeapSecondInfo, MeasStatus, NiNotifyVerifyReqInd, RcvrClockFrequency, Reliability,
    ServerRequestType, SessionStatus, SvPolynomial, SvSystem, SvTimeSpeed, SystemTime,
    SystemTimeExt, WwanType,
};

/// Jammer metric value meaning "not available"
pub const GNSS_INVALID_JAMMER_IND: i32 = 0x7FFF_FFFF;

bitflags! {
    /// Technology mask as sent by the remote engine
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct NativeTechMask: u32 {
        const SATELLITE = 0x0001;
        const CELLID = 0x0002;
        const WIFI = 0x0004;
        const SENSORS = 0x0008;
        const REFERENCE_LOCATION = 0x0010;
        const INJECTED_COARSE_POSITION = 0x0020;
        const AFLT = 0x0040;
        const HYBRID = 0x0080;
        const PPE = 0x0100;
        const VEH = 0x0200;
        const VIS = 0x0400;
    }
}

bitflags! {
    /// Navigation solution mask as sent by the remote engine
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct NativeNavSolutionMask: u32 {
        const SBAS_CORRECTION_IONO = 0x0001;
        const SBAS_CORRECTION_FAST = 0x0002;
        const SBAS_CORRECTION_LONG = 0x0004;
        const SBAS_INTEGRITY = 0x0008;
        const DGNSS_CORRECTION = 0x0010;
        const RTK_CORRECTION = 0x0020;
        const PPP_CORRECTION = 0x0040;
    }
}

bitflags! {
    /// APN types as encoded on the wire
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct NativeApnTypeMask: u64 {
        const DEFAULT = 0x0001;
        const IMS = 0x0002;
        const MMS = 0x0004;
        const DUN = 0x0008;
        const SUPL = 0x0010;
        const HIPRI = 0x0020;
        const FOTA = 0x0040;
        const CBS = 0x0080;
        const IA = 0x0100;
        const EMERGENCY = 0x0200;
    }
}

bitflags! {
    /// Aiding data the satellite currently holds
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct SvInfoMask: u8 {
        const HAS_EPHEMERIS = 0x01;
        const HAS_ALMANAC = 0x02;
    }
}

bitflags! {
    /// Aiding data the engine reports as deleted
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct LocEventReportMask: u64 {
        const DELETE_GPS_EPHEMERIS_ALL = 1 << 0;
        const DELETE_GLO_EPHEMERIS_ALL = 1 << 1;
        const DELETE_BDS_EPHEMERIS_ALL = 1 << 2;
        const DELETE_GAL_EPHEMERIS_ALL = 1 << 3;
        const DELETE_QZSS_EPHEMERIS_ALL = 1 << 4;
        const DELETE_GPS_SV_POLY_ALL = 1 << 5;
        const DELETE_GLO_SV_POLY_ALL = 1 << 6;
        const DELETE_BDS_SV_POLY_ALL = 1 << 7;
        const DELETE_GAL_SV_POLY_ALL = 1 << 8;
        const DELETE_QZSS_SV_POLY_ALL = 1 << 9;
        const DELETE_GPS_IONO_ALL = 1 << 10;
        const DELETE_GLO_IONO_ALL = 1 << 11;
        const DELETE_BDS_IONO_ALL = 1 << 12;
        const DELETE_GAL_IONO_ALL = 1 << 13;
        const DELETE_QZSS_IONO_ALL = 1 << 14;
    }
}

/// AGC and jammer metrics of one band, hundredths of dB
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JammerIndicator {
    pub agc_metric_db: i32,
    pub bp_metric_db: i32,
}

impl Default for JammerIndicator {
    fn default() -> Self {
        Self {
            agc_metric_db: GNSS_INVALID_JAMMER_IND,
            bp_metric_db: GNSS_INVALID_JAMMER_IND,
        }
    }
}

/// Position report, final or intermediate, propagated or not
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PositionReportInd {
    pub session_status: SessionStatus,
    pub session_id: u8,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub hor_unc_circular: Option<f32>,
    pub hor_unc_ellipse_semi_minor: Option<f32>,
    pub hor_unc_ellipse_semi_major: Option<f32>,
    /// Radians
    pub hor_unc_ellipse_orient_azimuth: Option<f32>,
    pub hor_confidence: Option<u8>,
    pub hor_reliability: Option<Reliability>,
    pub speed_horizontal: Option<f32>,
    pub speed_unc: Option<f32>,
    pub altitude_wrt_ellipsoid: Option<f32>,
    pub altitude_wrt_mean_sea_level: Option<f32>,
    pub vert_unc: Option<f32>,
    pub vert_reliability: Option<Reliability>,
    pub heading: Option<f32>,
    pub heading_unc: Option<f32>,
    pub magnetic_deviation: Option<f32>,
    pub technology_mask: NativeTechMask,
    pub dop: Option<Dop>,
    pub ext_dop: Option<ExtDop>,
    pub timestamp_utc_ms: Option<u64>,
    pub leap_seconds: Option<u8>,
    pub gps_time: Option<GpsTime>,
    pub time_unc_ms: Option<f32>,
    pub gnss_sv_used_list: Option<Vec<u16>>,
    pub expanded_gnss_sv_used_list: Option<Vec<u16>>,
    pub gnss_sv_used_signal_type_list: Option<Vec<GnssSignalTypeMask>>,
    pub nav_solution_mask: Option<NativeNavSolutionMask>,
    pub vel_enu: Option<[f32; 3]>,
    pub vel_unc_enu: Option<[f32; 3]>,
    pub spoof_report_mask: Option<u32>,
    /// Index 0 is the aggregate; per-band entries follow
    pub jammer_indicators: Option<Vec<JammerIndicator>>,
}

/// Visibility record of one satellite
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SvInfo {
    pub system: Option<SvSystem>,
    pub gnss_sv_id: Option<u16>,
    pub snr: Option<f32>,
    pub elevation: Option<f32>,
    pub azimuth: Option<f32>,
    pub sv_info_mask: Option<SvInfoMask>,
}

/// Satellite visibility record carrying the GLONASS frequency channel
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ExpandedSvInfo {
    pub sv_info: SvInfo,
    pub glo_frequency: u8,
}

/// Satellite visibility report
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SvInfoInd {
    pub sv_list: Option<Vec<SvInfo>>,
    pub expanded_sv_list: Option<Vec<ExpandedSvInfo>>,
    /// Signal of each reported satellite, in reporting order
    pub signal_type_list: Option<Vec<GnssSignalTypeMask>>,
}

/// One satellite of a measurement fragment
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NativeSvMeasurement {
    pub gnss_sv_id: u16,
    pub glo_frequency: u8,
    pub loss_of_lock: Option<bool>,
    pub sv_status: u8,
    pub health_status: Option<u8>,
    pub sv_info_mask: u8,
    /// dB-Hz scaled by 10
    pub cno: u16,
    pub glo_rf_loss: u16,
    pub meas_latency: i32,
    pub time_speed: SvTimeSpeed,
    pub measurement_status: MeasStatus,
    pub valid_meas_status_mask: MeasStatus,
    pub multipath_estimate: Option<f32>,
    pub fine_speed: Option<f32>,
    pub fine_speed_unc: Option<f32>,
    pub carrier_phase: Option<f64>,
    pub sv_elevation: Option<f32>,
    pub sv_azimuth: Option<f32>,
    pub cycle_slip_count: Option<u8>,
}

/// Measurement fragment; one fragment per constellation and signal
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SvMeasInfoInd {
    pub seq_num: u8,
    pub max_message_num: u8,
    pub system: SvSystem,
    pub gnss_signal_type: Option<GnssSignalTypeMask>,
    pub nhz_measurement: Option<bool>,
    pub rcvr_clock_frequency: Option<RcvrClockFrequency>,
    pub leap_second: Option<LeapSecondInfo>,
    pub biases: InterSystemBiases,
    pub glo_time: Option<GloTime>,
    pub system_time: Option<SystemTime>,
    pub system_time_ext: Option<SystemTimeExt>,
    pub num_clock_resets: Option<u32>,
    pub sv_measurements: Option<Vec<NativeSvMeasurement>>,
    /// Overflow of `sv_measurements` for constellations with many satellites
    pub ext_sv_measurements: Option<Vec<NativeSvMeasurement>>,
    pub carrier_phase_unc: Option<Vec<f32>>,
    pub jammer_indicator: Option<JammerIndicator>,
}

/// Keplerian core shared by GPS-like ephemerides, as sent on the wire
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EphGnssData {
    pub gnss_sv_id: u16,
    /// Raw update action code
    pub update_action: u8,
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

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NativeGpsEphemeris {
    pub common: EphGnssData,
    pub signal_health: u8,
    pub urai: u8,
    pub code_l2: u8,
    pub data_flag_l2p: u8,
    pub tgd: f64,
    pub fit_interval: u8,
    pub iodc: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NativeGloEphemeris {
    pub gnss_sv_id: u16,
    pub update_action: u8,
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

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NativeBdsEphemeris {
    pub common: EphGnssData,
    pub sv_health: u8,
    pub aodc: u8,
    pub tgd1: f64,
    pub tgd2: f64,
    pub urai: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NativeGalEphemeris {
    pub common: EphGnssData,
    /// Raw signal source code
    pub data_source_signal: u8,
    pub sis_index: u8,
    pub bgd_e1_e5a: f64,
    pub bgd_e1_e5b: f64,
    pub sv_health: u8,
}

/// Ephemeris list of one of the five ephemeris indications
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NativeEphemerisList {
    Gps(Vec<NativeGpsEphemeris>),
    Glonass(Vec<NativeGloEphemeris>),
    Bds(Vec<NativeBdsEphemeris>),
    Galileo(Vec<NativeGalEphemeris>),
    Qzss(Vec<NativeGpsEphemeris>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EphemerisReportInd {
    pub gps_system_time: Option<SystemTime>,
    pub list: NativeEphemerisList,
}

/// NMEA sentence report; the expanded form wins when present
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NmeaInd {
    pub nmea: String,
    pub expanded_nmea: Option<String>,
}

/// Engine request for XTRA data, listing the servers to download from
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PredictedOrbitsReqInd {
    pub server_list: Vec<String>,
}

/// ATL connection request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConnectionReqInd {
    pub conn_handle: u32,
    pub request_type: ServerRequestType,
    pub wwan_type: WwanType,
    pub bearer_type: Option<BearerType>,
    pub apn_type_mask: Option<NativeApnTypeMask>,
}

/// Kind of Wi-Fi request sent by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WifiRequestType {
    StartPeriodicHiFreqFixes,
    StartPeriodicKeepWarm,
    StopPeriodicFixes,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiReqInd {
    pub request_type: WifiRequestType,
    pub e911_mode: Option<u8>,
    pub tbf_ms: Option<u32>,
}

/// Klobuchar model as broadcast, tagged by the constellation it came from
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NativeKlobucharModel {
    pub data_source: SvSystem,
    pub alpha: [f32; 4],
    pub beta: [f32; 4],
}

/// General engine event report
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EventReportInd {
    pub event_report: LocEventReportMask,
    pub gps_system_time: Option<SystemTime>,
    pub klobuchar_iono_model: Option<NativeKlobucharModel>,
    pub leap_sec: Option<u8>,
    pub tau_c: Option<f64>,
}

/// Information class of a system info indication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SystemInfoType {
    NextLeapSecondInfo,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NextLeapSecondInfo {
    pub gps_time_current: Option<GpsTime>,
    pub leap_seconds_current: Option<u8>,
    pub gps_time_next_ls_event: Option<GpsTime>,
    pub leap_seconds_next: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInfoInd {
    pub system_info: SystemInfoType,
    pub next_leap_second_info: Option<NextLeapSecondInfo>,
}

/// Reply to a WWAN position query
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WwanPositionInd {
    pub status: IndStatus,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub hor_unc_circular: Option<f32>,
    pub hor_circular_confidence: Option<u8>,
    pub altitude_wrt_ellipsoid: Option<f32>,
    pub vert_unc: Option<f32>,
    pub timestamp_utc_ms: Option<u64>,
}

/// Reply to a best-available position query
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BestAvailablePositionInd {
    pub status: IndStatus,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub hor_unc_circular: Option<f32>,
    pub hor_circular_confidence: Option<u8>,
    pub altitude_wrt_ellipsoid: Option<f32>,
    pub vert_unc: Option<f32>,
    pub hor_speed: Option<f32>,
    pub hor_speed_unc: Option<f32>,
    pub heading: Option<f32>,
    pub heading_unc: Option<f32>,
    pub technology_mask: Option<NativeTechMask>,
    pub spoof_report_mask: Option<u32>,
    pub timestamp_utc_ms: Option<u64>,
}

/// Asynchronous event indication
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Indication {
    Position(Box<PositionReportInd>),
    UnpropagatedPosition(Box<PositionReportInd>),
    SvInfo(SvInfoInd),
    EngineState(EngineState),
    FixSessionState(FixSessionState),
    Nmea(NmeaInd),
    InjectPredictedOrbitsReq(PredictedOrbitsReqInd),
    InjectTimeReq,
    InjectPositionReq,
    NiNotifyVerifyReq(Box<NiNotifyVerifyReqInd>),
    LocationServerConnectionReq(ServerConnectionReqInd),
    GnssMeasurement(Box<SvMeasInfoInd>),
    SvPolynomial(Box<SvPolynomial>),
    Ephemeris(Box<EphemerisReportInd>),
    GetBlacklistSv(BlacklistSvInd),
    GetConstellationControl(ConstellationConfigInd),
    WifiReq(WifiReqInd),
    EventReport(EventReportInd),
    SystemInfo(SystemInfoInd),
}

/// Closed tag of [`Indication`], used to key the decoder table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IndicationKind {
    Position,
    UnpropagatedPosition,
    SvInfo,
    EngineState,
    FixSessionState,
    Nmea,
    InjectPredictedOrbitsReq,
    InjectTimeReq,
    InjectPositionReq,
    NiNotifyVerifyReq,
    LocationServerConnectionReq,
    GnssMeasurement,
    SvPolynomial,
    Ephemeris,
    GetBlacklistSv,
    GetConstellationControl,
    WifiReq,
    EventReport,
    SystemInfo,
}

impl IndicationKind {
    pub const ALL: [IndicationKind; 19] = [
        Self::Position,
        Self::UnpropagatedPosition,
        Self::SvInfo,
        Self::EngineState,
        Self::FixSessionState,
        Self::Nmea,
        Self::InjectPredictedOrbitsReq,
        Self::InjectTimeReq,
        Self::InjectPositionReq,
        Self::NiNotifyVerifyReq,
        Self::LocationServerConnectionReq,
        Self::GnssMeasurement,
        Self::SvPolynomial,
        Self::Ephemeris,
        Self::GetBlacklistSv,
        Self::GetConstellationControl,
        Self::WifiReq,
        Self::EventReport,
        Self::SystemInfo,
    ];

    /// Stable label for logs and metrics
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Position => "position",
            Self::UnpropagatedPosition => "unpropagated_position",
            Self::SvInfo => "sv_info",
            Self::EngineState => "engine_state",
            Self::FixSessionState => "fix_session_state",
            Self::Nmea => "nmea",
            Self::InjectPredictedOrbitsReq => "inject_predicted_orbits_req",
            Self::InjectTimeReq => "inject_time_req",
            Self::InjectPositionReq => "inject_position_req",
            Self::NiNotifyVerifyReq => "ni_notify_verify_req",
            Self::LocationServerConnectionReq => "location_server_connection_req",
            Self::GnssMeasurement => "gnss_measurement",
            Self::SvPolynomial => "sv_polynomial",
            Self::Ephemeris => "ephemeris",
            Self::GetBlacklistSv => "get_blacklist_sv",
            Self::GetConstellationControl => "get_constellation_control",
            Self::WifiReq => "wifi_req",
            Self::EventReport => "event_report",
            Self::SystemInfo => "system_info",
        }
    }
}

impl Indication {
    pub fn kind(&self) -> IndicationKind {
        match self {
            Self::Position(_) => IndicationKind::Position,
            Self::UnpropagatedPosition(_) => IndicationKind::UnpropagatedPosition,
            Self::SvInfo(_) => IndicationKind::SvInfo,
            Self::EngineState(_) => IndicationKind::EngineState,
            Self::FixSessionState(_) => IndicationKind::FixSessionState,
            Self::Nmea(_) => IndicationKind::Nmea,
            Self::InjectPredictedOrbitsReq(_) => IndicationKind::InjectPredictedOrbitsReq,
            Self::InjectTimeReq => IndicationKind::InjectTimeReq,
            Self::InjectPositionReq => IndicationKind::InjectPositionReq,
            Self::NiNotifyVerifyReq(_) => IndicationKind::NiNotifyVerifyReq,
            Self::LocationServerConnectionReq(_) => IndicationKind::LocationServerConnectionReq,
            Self::GnssMeasurement(_) => IndicationKind::GnssMeasurement,
            Self::SvPolynomial(_) => IndicationKind::SvPolynomial,
            Self::Ephemeris(_) => IndicationKind::Ephemeris,
            Self::GetBlacklistSv(_) => IndicationKind::GetBlacklistSv,
            Self::GetConstellationControl(_) => IndicationKind::GetConstellationControl,
            Self::WifiReq(_) => IndicationKind::WifiReq,
            Self::EventReport(_) => IndicationKind::EventReport,
            Self::SystemInfo(_) => IndicationKind::SystemInfo,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_labels_are_unique() {
        let mut labels: Vec<_> = IndicationKind::ALL.iter().map(|k| k.as_str()).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), IndicationKind::ALL.len());
    }

    #[test]
    fn test_indication_kind() {
        let ind = Indication::EngineState(EngineState::On);
        assert_eq!(ind.kind(), IndicationKind::EngineState);
        assert_eq!(Indication::InjectTimeReq.kind().as_str(), "inject_time_req");
    }

    #[test]
    fn test_jammer_default_is_invalid() {
        let j = JammerIndicator::default();
        assert_eq!(j.agc_metric_db, GNSS_INVALID_JAMMER_IND);
        assert_eq!(j.bp_metric_db, GNSS_INVALID_JAMMER_IND);
    }

    #[test]
    fn test_indication_json_roundtrip() {
        let ind = Indication::Nmea(NmeaInd {
            nmea: "$GPGGA".to_string(),
            expanded_nmea: None,
        });
        let json = serde_json::to_string(&ind).unwrap();
        let back: Indication = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ind);
    }
}
