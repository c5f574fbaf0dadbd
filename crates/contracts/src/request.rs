//! Outbound protocol requests and the response indications they produce
//!
//! Requests are plain owned values: the worker can clone one into the busy-replay
//! queue without any manual buffer handling.

use bitflags::bitflags;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{
    AGlonassProtocolMask, ConstellationMask, GnssSvTypesMask, GpsTime, IndStatus, LppConfigMask,
    LppeMask, NativeApnTypeMask, Recurrence, SensorProperties, SensorSampling, SvSystem,
};

/// Protocol message identifiers known to the adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageId {
    RegisterMasterClient,
    SetOperationMode,
    Start,
    Stop,
    InjectUtcTime,
    InjectPosition,
    DeleteGnssServiceData,
    DeleteAssistData,
    NiUserResponse,
    SetServer,
    InjectPredictedOrbitsData,
    GetPredictedOrbitsDataSource,
    InformLocationServerConnStatus,
    SetProtocolConfigParameters,
    SetNmeaTypes,
    SetSensorProperties,
    SetSensorPerformanceControlConfig,
    SetEngineLock,
    GetEngineLock,
    SetXtraVersionCheck,
    InjectSuplCertificate,
    DeleteSuplCertificate,
    SetGnssConstellReportConfig,
    SetConstrainedTuncMode,
    EnablePositionAssistedClockEst,
    QueryGnssEnergyConsumed,
    GetAvailWwanPosition,
    GetBestAvailablePosition,
    SetBlacklistSv,
    GetBlacklistSv,
    SetConstellationControl,
    GetConstellationControl,
    QueryAonConfig,
    GetSupportedFeature,
    NotifyWifiStatus,
    // Only probed for support during negotiation
    GetBatchSize,
    GeofenceBatchedBreachInd,
    StartDbt,
}

/// Key presented when registering as master client
pub const MASTER_CLIENT_KEY: u32 = 0xBAAB_CDEF;

/// Largest predicted-orbits part carried by one request
pub const MAX_PREDICTED_ORBITS_PART_LEN: usize = 1024;

/// Longest server URL the engine accepts
pub const MAX_SERVER_ADDR_LENGTH: usize = 255;

/// Largest SUPL certificate the engine accepts
pub const MAX_SUPL_CERT_LENGTH: usize = 2000;

/// Operation mode sent before a fix session starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationMode {
    Standalone,
    Msb,
    Msa,
    CellId,
    Wwan,
}

/// Horizontal accuracy tier of a start request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccuracyLevel {
    Low,
    Med,
    High,
}

/// Engine power mode as understood by the remote engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NativePowerMode {
    ImprovedAccuracy,
    Normal,
    BackgroundDefinedPower,
    BackgroundDefinedTime,
    BackgroundKeepWarm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerModeConfig {
    pub mode: NativePowerMode,
    pub time_between_measurements_ms: u32,
}

/// Application credentials attached to a start request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationId {
    pub name: String,
    pub provider: String,
}

/// Fix session start request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartReq {
    pub session_id: u8,
    pub min_interval_ms: u32,
    pub horizontal_accuracy: AccuracyLevel,
    pub position_report_timeout_ms: Option<u32>,
    pub recurrence: Recurrence,
    pub share_position: bool,
    pub application_id: Option<ApplicationId>,
    pub altitude_assumed_in_sv_info: bool,
    pub power_mode: Option<PowerModeConfig>,
}

/// UTC time injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectUtcTimeReq {
    pub time_utc_ms: u64,
    pub time_unc_ms: u32,
}

/// Origin of an injected position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PositionSource {
    Gnss,
    Cellid,
    EnhancedCellid,
    Wifi,
    Terrestrial,
    GnssTerrestrialHybrid,
    Other,
    /// Dead-reckoning engine
    Dre,
}

/// Coarse position injection; absent fields are not sent
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct InjectPositionReq {
    pub timestamp_utc_ms: Option<u64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub hor_unc_circular: Option<f32>,
    pub hor_confidence: Option<u8>,
    pub raw_hor_unc_circular: Option<f32>,
    pub raw_hor_confidence: Option<u8>,
    pub altitude_wrt_ellipsoid: Option<f32>,
    pub vert_unc: Option<f32>,
    pub vert_confidence: Option<u8>,
    pub on_demand_cpi: Option<bool>,
    pub gps_time: Option<GpsTime>,
    pub vel_enu: Option<[f32; 3]>,
    pub vel_unc_enu: Option<[f32; 3]>,
    pub time_unc_ms: Option<f32>,
    pub num_sv_in_fix: Option<u8>,
    pub position_src: Option<PositionSource>,
}

bitflags! {
    /// Satellite data cleared by a service-data deletion
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct DeleteSatDataMask: u32 {
        const EPHEMERIS = 1 << 0;
        const ALMANAC = 1 << 1;
        const SVHEALTH = 1 << 2;
        const SVDIR = 1 << 3;
        const SVSTEER = 1 << 4;
        const ALM_CORR = 1 << 5;
        const BLACKLIST = 1 << 6;
        const SA_DATA = 1 << 7;
        const SV_NO_EXIST = 1 << 8;
        const IONO = 1 << 9;
        const TIME = 1 << 10;
        const MB_DATA = 1 << 11;
    }
}

bitflags! {
    /// Common data cleared by a service-data deletion
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct DeleteCommonDataMask: u32 {
        const POS = 1 << 0;
        const TIME = 1 << 1;
        const UTC = 1 << 2;
        const RTI = 1 << 3;
        const FREQ_BIAS_EST = 1 << 4;
    }
}

bitflags! {
    /// Cell database entries cleared by a deletion
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct DeleteCellDbMask: u32 {
        const POS = 1 << 0;
        const LATEST_GPS_POS = 1 << 1;
        const OTA_POS = 1 << 2;
        const EXT_REF_POS = 1 << 3;
        const TIMETAG = 1 << 4;
        const CELLID = 1 << 5;
        const CACHED_CELLID = 1 << 6;
        const LAST_SRV_CELL = 1 << 7;
        const CUR_SRV_CELL = 1 << 8;
        const NEIGHBOR_INFO = 1 << 9;
    }
}

bitflags! {
    /// Legacy deletion: GNSS-wide data
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct DeleteGnssDataMask: u64 {
        const GPS_SVDIR = 1 << 0;
        const GPS_SVSTEER = 1 << 1;
        const GPS_TIME = 1 << 2;
        const GPS_ALM_CORR = 1 << 3;
        const GLO_SVDIR = 1 << 4;
        const GLO_SVSTEER = 1 << 5;
        const GLO_TIME = 1 << 6;
        const GLO_ALM_CORR = 1 << 7;
        const SADATA = 1 << 8;
        const POSITION = 1 << 9;
        const TIME = 1 << 10;
        const IONO = 1 << 11;
        const UTC = 1 << 12;
        const HEALTH = 1 << 13;
        const RTI = 1 << 14;
    }
}

bitflags! {
    /// Legacy deletion: per-satellite data
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct DeleteSvInfoMask: u8 {
        const EPHEMERIS = 1 << 0;
        const ALMANAC = 1 << 1;
    }
}

/// Satellite data selected for a service-data deletion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteSatelliteData {
    pub system: ConstellationMask,
    pub data_mask: DeleteSatDataMask,
}

/// Service-data deletion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeleteGnssServiceDataReq {
    pub delete_all: bool,
    pub satellite_data: Option<DeleteSatelliteData>,
    pub common_data: Option<DeleteCommonDataMask>,
    pub cell_db: Option<DeleteCellDbMask>,
}

/// One satellite entry of a legacy deletion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteSvInfo {
    pub gnss_sv_id: u16,
    pub system: SvSystem,
    pub mask: DeleteSvInfoMask,
}

/// Legacy assistance-data deletion
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeleteAssistDataReq {
    pub delete_all: bool,
    pub sv_info: Vec<DeleteSvInfo>,
    pub gnss_data: Option<DeleteGnssDataMask>,
    pub cell_db: Option<DeleteCellDbMask>,
}

/// User verdict on a network-initiated request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NiUserResponse {
    Accept,
    Deny,
    NoResponse,
}

/// Location server kind on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NativeServerType {
    CdmaPde,
    CdmaMpc,
    UmtsSlp,
    CustomPde,
    CustomSlp,
}

/// Address of a location server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerAddress {
    Url(String),
    Ipv4 { addr: u32, port: u16 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetServerReq {
    pub server_type: NativeServerType,
    pub address: ServerAddress,
}

/// APN PDN type on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PdnType {
    Ipv4,
    Ipv6,
    Ipv4v6,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeApnProfile {
    pub pdn_type: PdnType,
    pub apn_name: String,
}

/// Outcome of a data connection requested by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConnStatusReq {
    pub conn_handle: u32,
    pub open: bool,
    pub success: bool,
    pub apn_profile: Option<NativeApnProfile>,
    pub apn_type_mask: Option<NativeApnTypeMask>,
}

/// SUPL version on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NativeSuplVersion {
    V1_0,
    V2_0,
    V2_0_2,
}

/// Protocol configuration; absent fields are left untouched by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProtocolConfigReq {
    pub supl_version: Option<NativeSuplVersion>,
    pub lpp_config: Option<LppConfigMask>,
    pub assisted_glonass_protocol: Option<AGlonassProtocolMask>,
    pub lppe_cp_config: Option<LppeMask>,
    pub lppe_up_config: Option<LppeMask>,
}

/// Sensor performance control as sent to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorPerfControlReq {
    pub performance_control_mode: Option<i32>,
    pub accel_sampling: SensorSampling,
    pub gyro_sampling: SensorSampling,
    pub accel_sampling_high: SensorSampling,
    pub gyro_sampling_high: SensorSampling,
    pub algorithm_config: i32,
}

/// Engine lock on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineLock {
    None,
    /// Mobile-initiated sessions locked
    Mi,
    /// Mobile-terminated sessions locked
    Mt,
    All,
}

/// Subscription the lock applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LockSubType {
    Dds,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum XtraVersionCheckMode {
    Disable,
    Auto,
    Xtra2,
    Xtra3,
}

/// Per-constellation measurement and polynomial report subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConstellReportConfig {
    pub meas_report: Option<ConstellationMask>,
    pub sv_poly_report: Option<ConstellationMask>,
    pub report_full_sv_poly_db: bool,
    pub report_full_ephemeris_db: bool,
    pub report_full_iono_db: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ConstrainedTuncReq {
    pub enabled: bool,
    pub tunc_constraint: Option<f32>,
    pub energy_budget: Option<u32>,
}

/// Persistent per-constellation blacklist with the matching clear masks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlacklistSvReq {
    pub glo_blacklist: u64,
    pub glo_clear: u64,
    pub bds_blacklist: u64,
    pub bds_clear: u64,
    pub qzss_blacklist: u64,
    pub qzss_clear: u64,
    pub gal_blacklist: u64,
    pub gal_clear: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConstellationControlReq {
    pub reset: bool,
    pub enable_mask: Option<GnssSvTypesMask>,
    pub disable_mask: Option<GnssSvTypesMask>,
}

/// Outbound request, one variant per message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Request {
    RegisterMasterClient { key: u32 },
    SetOperationMode(OperationMode),
    Start(StartReq),
    Stop { session_id: u8 },
    InjectUtcTime(InjectUtcTimeReq),
    InjectPosition(InjectPositionReq),
    DeleteGnssServiceData(DeleteGnssServiceDataReq),
    DeleteAssistData(DeleteAssistDataReq),
    NiUserResponse {
        response: NiUserResponse,
        request: Box<crate::NiNotifyVerifyReqInd>,
    },
    SetServer(SetServerReq),
    InjectPredictedOrbitsData {
        total_size: u32,
        total_parts: u16,
        part_num: u16,
        data: Bytes,
    },
    GetPredictedOrbitsDataSource,
    InformLocationServerConnStatus(ServerConnStatusReq),
    SetProtocolConfigParameters(ProtocolConfigReq),
    SetNmeaTypes { sentence_types: u32 },
    SetSensorProperties(SensorProperties),
    SetSensorPerformanceControlConfig(SensorPerfControlReq),
    SetEngineLock { lock: EngineLock, sub_type: LockSubType },
    GetEngineLock { sub_type: LockSubType },
    SetXtraVersionCheck(XtraVersionCheckMode),
    InjectSuplCertificate { slot: u8, data: Bytes },
    DeleteSuplCertificate { slot: u8 },
    SetGnssConstellReportConfig(ConstellReportConfig),
    SetConstrainedTuncMode(ConstrainedTuncReq),
    EnablePositionAssistedClockEst { enabled: bool },
    QueryGnssEnergyConsumed,
    GetAvailWwanPosition,
    GetBestAvailablePosition,
    SetBlacklistSv(BlacklistSvReq),
    GetBlacklistSv,
    SetConstellationControl(ConstellationControlReq),
    GetConstellationControl,
    QueryAonConfig { transaction_id: u32 },
    GetSupportedFeature,
    NotifyWifiStatus { available: bool },
}

impl Request {
    /// Message id of the request; the response indication shares it
    pub fn id(&self) -> MessageId {
        match self {
            Self::RegisterMasterClient { .. } => MessageId::RegisterMasterClient,
            Self::SetOperationMode(_) => MessageId::SetOperationMode,
            Self::Start(_) => MessageId::Start,
            Self::Stop { .. } => MessageId::Stop,
            Self::InjectUtcTime(_) => MessageId::InjectUtcTime,
            Self::InjectPosition(_) => MessageId::InjectPosition,
            Self::DeleteGnssServiceData(_) => MessageId::DeleteGnssServiceData,
            Self::DeleteAssistData(_) => MessageId::DeleteAssistData,
            Self::NiUserResponse { .. } => MessageId::NiUserResponse,
            Self::SetServer(_) => MessageId::SetServer,
            Self::InjectPredictedOrbitsData { .. } => MessageId::InjectPredictedOrbitsData,
            Self::GetPredictedOrbitsDataSource => MessageId::GetPredictedOrbitsDataSource,
            Self::InformLocationServerConnStatus(_) => MessageId::InformLocationServerConnStatus,
            Self::SetProtocolConfigParameters(_) => MessageId::SetProtocolConfigParameters,
            Self::SetNmeaTypes { .. } => MessageId::SetNmeaTypes,
            Self::SetSensorProperties(_) => MessageId::SetSensorProperties,
            Self::SetSensorPerformanceControlConfig(_) => {
                MessageId::SetSensorPerformanceControlConfig
            }
            Self::SetEngineLock { .. } => MessageId::SetEngineLock,
            Self::GetEngineLock { .. } => MessageId::GetEngineLock,
            Self::SetXtraVersionCheck(_) => MessageId::SetXtraVersionCheck,
            Self::InjectSuplCertificate { .. } => MessageId::InjectSuplCertificate,
            Self::DeleteSuplCertificate { .. } => MessageId::DeleteSuplCertificate,
            Self::SetGnssConstellReportConfig(_) => MessageId::SetGnssConstellReportConfig,
            Self::SetConstrainedTuncMode(_) => MessageId::SetConstrainedTuncMode,
            Self::EnablePositionAssistedClockEst { .. } => {
                MessageId::EnablePositionAssistedClockEst
            }
            Self::QueryGnssEnergyConsumed => MessageId::QueryGnssEnergyConsumed,
            Self::GetAvailWwanPosition => MessageId::GetAvailWwanPosition,
            Self::GetBestAvailablePosition => MessageId::GetBestAvailablePosition,
            Self::SetBlacklistSv(_) => MessageId::SetBlacklistSv,
            Self::GetBlacklistSv => MessageId::GetBlacklistSv,
            Self::SetConstellationControl(_) => MessageId::SetConstellationControl,
            Self::GetConstellationControl => MessageId::GetConstellationControl,
            Self::QueryAonConfig { .. } => MessageId::QueryAonConfig,
            Self::GetSupportedFeature => MessageId::GetSupportedFeature,
            Self::NotifyWifiStatus { .. } => MessageId::NotifyWifiStatus,
        }
    }
}

bitflags! {
    /// Always-on batching capabilities reported by the engine
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct AonCapability: u32 {
        const AUTO_BATCHING = 1 << 0;
        const DISTANCE_BASED_BATCHING = 1 << 1;
        const UPDATE_TBF = 1 << 2;
        const OUTDOOR_TRIP_BATCHING = 1 << 3;
    }
}

/// Constellation state in a constellation-control reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstellationStatus {
    EnabledMandatory,
    EnabledInternally,
    EnabledByClient,
    DisabledNotSupported,
    DisabledInternally,
    DisabledByClient,
    DisabledNoMemory,
}

impl ConstellationStatus {
    pub fn is_enabled(self) -> bool {
        matches!(
            self,
            Self::EnabledMandatory | Self::EnabledInternally | Self::EnabledByClient
        )
    }
}

/// Persistent blacklist reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlacklistSvInd {
    pub status: IndStatus,
    pub glo_blacklist: Option<u64>,
    pub bds_blacklist: Option<u64>,
    pub qzss_blacklist: Option<u64>,
    pub gal_blacklist: Option<u64>,
}

/// Constellation-control reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConstellationConfigInd {
    pub status: IndStatus,
    pub glonass: Option<ConstellationStatus>,
    pub bds: Option<ConstellationStatus>,
    pub qzss: Option<ConstellationStatus>,
    pub galileo: Option<ConstellationStatus>,
}

/// Payload of a response indication beyond its status
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum ResponsePayload {
    #[default]
    None,
    PredictedOrbitsPart { part_num: u16 },
    XtraServers(Vec<String>),
    EngineLock(Option<EngineLock>),
    EnergyConsumed { since_first_boot: u64 },
    AonCapability(Option<AonCapability>),
    SupportedFeatures(Vec<u8>),
    ConstellationConfig(ConstellationConfigInd),
}

/// Response indication matched to a synchronous request
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Response {
    pub status: IndStatus,
    pub payload: ResponsePayload,
}

impl Response {
    pub fn new(status: IndStatus) -> Self {
        Self {
            status,
            payload: ResponsePayload::None,
        }
    }

    pub fn with_payload(status: IndStatus, payload: ResponsePayload) -> Self {
        Self { status, payload }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_follows_variant() {
        assert_eq!(Request::Stop { session_id: 1 }.id(), MessageId::Stop);
        assert_eq!(
            Request::NotifyWifiStatus { available: true }.id(),
            MessageId::NotifyWifiStatus
        );
        let part = Request::InjectPredictedOrbitsData {
            total_size: 1,
            total_parts: 1,
            part_num: 1,
            data: Bytes::from_static(&[1]),
        };
        assert_eq!(part.id(), MessageId::InjectPredictedOrbitsData);
    }

    #[test]
    fn test_constellation_status_enabled() {
        assert!(ConstellationStatus::EnabledByClient.is_enabled());
        assert!(!ConstellationStatus::DisabledNoMemory.is_enabled());
    }

    #[test]
    fn test_response_default_is_success() {
        let resp = Response::default();
        assert!(resp.status.is_success());
        assert_eq!(resp.payload, ResponsePayload::None);
    }
}
