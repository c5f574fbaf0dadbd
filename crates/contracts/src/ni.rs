//! Network-initiated positioning, data-call (ATL) and on-demand CPI records

use std::sync::Arc;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Privacy class of an NI request as sent by the network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NiNotifyVerifyType {
    NoNotifyNoVerify,
    NotifyOnly,
    NotifyVerifyAllowNoResp,
    NotifyVerifyNotAllowNoResp,
    PrivacyOverride,
}

/// Data coding scheme of NI text fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NiDataCodingScheme {
    SuplUtf8,
    SuplUcs2,
    SuplGsmDefault,
    SsLanguageUnspec,
    #[default]
    Unknown,
}

/// Encoded text with its own coding scheme
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NiCodedString {
    pub data_coding_scheme: NiDataCodingScheme,
    #[serde(with = "serde_bytes")]
    pub text: Vec<u8>,
}

/// Voice (Vx) NI payload
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NiVxPayload {
    pub encoding_scheme: u8,
    #[serde(with = "serde_bytes")]
    pub requestor_id: Vec<u8>,
    pub position_mode: u8,
}

/// UMTS control plane NI payload
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NiUmtsCpPayload {
    pub data_coding_scheme: NiDataCodingScheme,
    #[serde(with = "serde_bytes")]
    pub notification_text: Vec<u8>,
    pub requestor_id: NiCodedString,
    #[serde(with = "serde_bytes")]
    pub client_address: Vec<u8>,
}

/// SUPL NI payload
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NiSuplPayload {
    pub client_name: Option<NiCodedString>,
    pub requestor_id: Option<NiCodedString>,
    pub data_coding_scheme: Option<NiDataCodingScheme>,
}

/// SUPL 2.0 extension of an NI request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NiSuplVer2Ext {
    pub supported_networks_mask: u16,
    pub trigger_type: i8,
    pub gnss_type: u16,
}

/// Emergency SUPL notification
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EmergencyNotification {
    pub eslp_url: String,
}

/// NI notify/verify indication as delivered by the remote engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NiNotifyVerifyReqInd {
    pub notification_type: NiNotifyVerifyType,
    pub vx: Option<NiVxPayload>,
    pub umts_cp: Option<NiUmtsCpPayload>,
    pub supl: Option<NiSuplPayload>,
    pub vx_service_interaction: Option<NiVxPayload>,
    pub supl_ver2_ext: Option<NiSuplVer2Ext>,
    pub supl_emergency: Option<EmergencyNotification>,
}

/// Kind of NI notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NiType {
    Voice,
    ControlPlane,
    Supl,
    EmergencySupl,
}

/// Text encoding of normalized NI fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NiEncoding {
    #[default]
    None,
    Gsm,
    Utf8,
    Ucs2,
}

/// User response to an NI notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NiResponse {
    Accept,
    Deny,
    #[default]
    NoResponse,
}

bitflags! {
    /// Interaction the user is asked for
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct NiOptions: u32 {
        const NOTIFICATION = 1 << 0;
        const VERIFICATION = 1 << 1;
        const PRIVACY_OVERRIDE = 1 << 2;
    }
}

/// Seconds before an unanswered NI notification gets its default response
pub const NI_NO_RESPONSE_TIME_S: u32 = 20;

/// Normalized NI notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GnssNiNotification {
    pub ni_type: NiType,
    pub options: NiOptions,
    pub timeout_s: u32,
    pub timeout_response: NiResponse,
    pub requestor: String,
    pub requestor_encoding: NiEncoding,
    pub message: String,
    pub message_encoding: NiEncoding,
    pub extras: String,
}

/// Opaque handle echoed back with the user response
///
/// Carries the original indication so the response can quote its payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NiToken(Arc<NiNotifyVerifyReqInd>);

impl NiToken {
    pub fn new(ind: NiNotifyVerifyReqInd) -> Self {
        Self(Arc::new(ind))
    }

    pub fn request(&self) -> &NiNotifyVerifyReqInd {
        &self.0
    }
}

/// Data connection type requested through ATL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgpsType {
    Any,
    Supl,
    SuplEs,
    WwanAny,
    Wifi,
}

/// Bearer of an opened data connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgpsBearer {
    Invalid,
    Ipv4,
    Ipv6,
    Ipv4v6,
}

/// WWAN type the engine requests a connection for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WwanType {
    Internet,
    Agnss,
    AgnssEmergency,
    Other,
}

/// Bearer the engine requests a connection over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BearerType {
    Wwan,
    Wlan,
}

/// Open or close a location server connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServerRequestType {
    Open,
    Close,
}

/// Kind of on-demand CPI request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OdcpiRequestType {
    Start,
    Stop,
}

/// On-demand CPI (Wi-Fi assisted position) request forwarded to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OdcpiRequest {
    pub request_type: OdcpiRequestType,
    pub is_emergency: bool,
    pub tbf_ms: Option<u32>,
}
