//! Engine state, requests and small event reports

use contracts::{
    AdditionalSystemInfo, AgpsType, AidingDataSvMask, AidingDataSvTypeMask, ApnTypeMask,
    BearerType, EngineState, EngineStatus, EventReportInd, FixSessionState, GnssAidingData,
    Indication, KlobucharIonoModel, LeapSecondChange, LocEventReportMask, LocationSystemInfo,
    OdcpiRequest, OdcpiRequestType, ServerConnectionReqInd, ServerRequestType, SvSystem,
    SystemInfoInd, SystemInfoType, WifiReqInd, WifiRequestType, WwanType,
};
use tracing::{debug, warn};

use super::{DecodeContext, Followup};
use crate::commands::constellation::{sv_id_config, sv_type_config};
use crate::convert;

/// XTRA servers forwarded to the engine at most
const MAX_XTRA_SERVERS: usize = 3;

const DELETE_EVENTS: &[(LocEventReportMask, AidingDataSvMask, AidingDataSvTypeMask)] = &[
    (
        LocEventReportMask::DELETE_GPS_EPHEMERIS_ALL,
        AidingDataSvMask::EPHEMERIS,
        AidingDataSvTypeMask::GPS,
    ),
    (
        LocEventReportMask::DELETE_GLO_EPHEMERIS_ALL,
        AidingDataSvMask::EPHEMERIS,
        AidingDataSvTypeMask::GLONASS,
    ),
    (
        LocEventReportMask::DELETE_BDS_EPHEMERIS_ALL,
        AidingDataSvMask::EPHEMERIS,
        AidingDataSvTypeMask::BEIDOU,
    ),
    (
        LocEventReportMask::DELETE_GAL_EPHEMERIS_ALL,
        AidingDataSvMask::EPHEMERIS,
        AidingDataSvTypeMask::GALILEO,
    ),
    (
        LocEventReportMask::DELETE_QZSS_EPHEMERIS_ALL,
        AidingDataSvMask::EPHEMERIS,
        AidingDataSvTypeMask::QZSS,
    ),
    (
        LocEventReportMask::DELETE_GPS_SV_POLY_ALL,
        AidingDataSvMask::POLY,
        AidingDataSvTypeMask::GPS,
    ),
    (
        LocEventReportMask::DELETE_GLO_SV_POLY_ALL,
        AidingDataSvMask::POLY,
        AidingDataSvTypeMask::GLONASS,
    ),
    (
        LocEventReportMask::DELETE_BDS_SV_POLY_ALL,
        AidingDataSvMask::POLY,
        AidingDataSvTypeMask::BEIDOU,
    ),
    (
        LocEventReportMask::DELETE_GAL_SV_POLY_ALL,
        AidingDataSvMask::POLY,
        AidingDataSvTypeMask::GALILEO,
    ),
    (
        LocEventReportMask::DELETE_QZSS_SV_POLY_ALL,
        AidingDataSvMask::POLY,
        AidingDataSvTypeMask::QZSS,
    ),
    (
        LocEventReportMask::DELETE_GPS_IONO_ALL,
        AidingDataSvMask::IONOSPHERE,
        AidingDataSvTypeMask::GPS,
    ),
    (
        LocEventReportMask::DELETE_GLO_IONO_ALL,
        AidingDataSvMask::IONOSPHERE,
        AidingDataSvTypeMask::GLONASS,
    ),
    (
        LocEventReportMask::DELETE_BDS_IONO_ALL,
        AidingDataSvMask::IONOSPHERE,
        AidingDataSvTypeMask::BEIDOU,
    ),
    (
        LocEventReportMask::DELETE_GAL_IONO_ALL,
        AidingDataSvMask::IONOSPHERE,
        AidingDataSvTypeMask::GALILEO,
    ),
    (
        LocEventReportMask::DELETE_QZSS_IONO_ALL,
        AidingDataSvMask::IONOSPHERE,
        AidingDataSvTypeMask::QZSS,
    ),
];

/// Engine power edge; turning off asks the worker to restore the mask and drain replays
pub(crate) fn decode_engine_state(
    ctx: &mut DecodeContext<'_>,
    ind: &Indication,
) -> Option<Followup> {
    let Indication::EngineState(state) = ind else {
        return None;
    };
    debug!(?state, in_session = ctx.state.in_session, "Engine state");
    match state {
        EngineState::On => {
            ctx.state.engine_on = true;
            // A stopped session has already reported its end
            if ctx.state.in_session {
                ctx.engine.report_status(EngineStatus::EngineOn);
                ctx.engine.report_status(EngineStatus::SessionBegin);
            }
            None
        }
        EngineState::Off => {
            ctx.state.engine_on = false;
            ctx.engine.report_status(EngineStatus::SessionEnd);
            ctx.engine.report_status(EngineStatus::EngineOff);
            Some(Followup::EngineOff)
        }
    }
}

pub(crate) fn decode_fix_session_state(
    ctx: &mut DecodeContext<'_>,
    ind: &Indication,
) -> Option<Followup> {
    let Indication::FixSessionState(state) = ind else {
        return None;
    };
    let status = match state {
        FixSessionState::Started => EngineStatus::SessionBegin,
        FixSessionState::Finished => EngineStatus::SessionEnd,
        FixSessionState::Unknown => EngineStatus::None,
    };
    ctx.engine.report_status(status);
    None
}

/// Expanded sentence preferred; empty sentences are dropped
pub(crate) fn decode_nmea(ctx: &mut DecodeContext<'_>, ind: &Indication) -> Option<Followup> {
    let Indication::Nmea(nmea) = ind else {
        return None;
    };
    let sentence = nmea.expanded_nmea.as_deref().unwrap_or(&nmea.nmea);
    if !sentence.is_empty() {
        ctx.engine.report_nmea(sentence);
    }
    None
}

pub(crate) fn decode_xtra_request(
    ctx: &mut DecodeContext<'_>,
    ind: &Indication,
) -> Option<Followup> {
    let Indication::InjectPredictedOrbitsReq(req) = ind else {
        return None;
    };
    let servers: Vec<String> = req
        .server_list
        .iter()
        .take(MAX_XTRA_SERVERS)
        .cloned()
        .collect();
    debug!(servers = servers.len(), "XTRA download requested");
    if !servers.is_empty() {
        ctx.engine.report_xtra_server(&servers);
    }
    ctx.engine.request_xtra_data();
    None
}

pub(crate) fn decode_time_request(
    ctx: &mut DecodeContext<'_>,
    ind: &Indication,
) -> Option<Followup> {
    if !matches!(ind, Indication::InjectTimeReq) {
        return None;
    }
    debug!("Time injection requested");
    ctx.engine.request_time();
    None
}

pub(crate) fn decode_position_request(
    ctx: &mut DecodeContext<'_>,
    ind: &Indication,
) -> Option<Followup> {
    if !matches!(ind, Indication::InjectPositionReq) {
        return None;
    }
    debug!("Position injection requested");
    ctx.engine.request_location();
    None
}

/// Connection type for an ATL open: WLAN bearer wins, else the WWAN type decides
fn agps_type(req: &ServerConnectionReqInd) -> AgpsType {
    if req.bearer_type == Some(BearerType::Wlan) {
        return AgpsType::Wifi;
    }
    match req.wwan_type {
        WwanType::Agnss => AgpsType::Supl,
        WwanType::AgnssEmergency => AgpsType::SuplEs,
        WwanType::Internet | WwanType::Other => AgpsType::WwanAny,
    }
}

pub(crate) fn decode_atl_request(
    ctx: &mut DecodeContext<'_>,
    ind: &Indication,
) -> Option<Followup> {
    let Indication::LocationServerConnectionReq(req) = ind else {
        return None;
    };
    match req.request_type {
        ServerRequestType::Open => {
            let agps_type = agps_type(req);
            let apn_type_mask = req
                .apn_type_mask
                .map_or(ApnTypeMask::empty(), convert::apn_type_mask);
            debug!(
                handle = req.conn_handle,
                ?agps_type,
                apn = apn_type_mask.bits(),
                "ATL open requested"
            );
            ctx.engine
                .request_atl(req.conn_handle, agps_type, apn_type_mask);
        }
        ServerRequestType::Close => {
            debug!(handle = req.conn_handle, "ATL close requested");
            ctx.engine.release_atl(req.conn_handle);
        }
    }
    None
}

pub(crate) fn decode_sv_polynomial(
    ctx: &mut DecodeContext<'_>,
    ind: &Indication,
) -> Option<Followup> {
    let Indication::SvPolynomial(poly) = ind else {
        return None;
    };
    if poly.sv_id == 0 {
        debug!("SV polynomial without satellite id");
        return None;
    }
    ctx.engine.report_sv_polynomial(poly);
    None
}

pub(crate) fn decode_blacklist(ctx: &mut DecodeContext<'_>, ind: &Indication) -> Option<Followup> {
    let Indication::GetBlacklistSv(blacklist) = ind else {
        return None;
    };
    if !blacklist.status.is_success() {
        warn!(status = ?blacklist.status, "Blacklist query failed");
        return None;
    }
    ctx.engine.report_gnss_sv_id_config(&sv_id_config(blacklist));
    None
}

pub(crate) fn decode_constellation_config(
    ctx: &mut DecodeContext<'_>,
    ind: &Indication,
) -> Option<Followup> {
    let Indication::GetConstellationControl(config) = ind else {
        return None;
    };
    if !config.status.is_success() {
        warn!(status = ?config.status, "Constellation query failed");
        return None;
    }
    ctx.engine.report_gnss_sv_type_config(&sv_type_config(config));
    None
}

fn odcpi_request(req: &WifiReqInd) -> Option<OdcpiRequest> {
    let request_type = match req.request_type {
        WifiRequestType::StartPeriodicHiFreqFixes | WifiRequestType::StartPeriodicKeepWarm => {
            OdcpiRequestType::Start
        }
        WifiRequestType::StopPeriodicFixes => OdcpiRequestType::Stop,
        WifiRequestType::Other => return None,
    };
    Some(OdcpiRequest {
        request_type,
        is_emergency: req.e911_mode == Some(1),
        tbf_ms: req.tbf_ms,
    })
}

pub(crate) fn decode_wifi_request(
    ctx: &mut DecodeContext<'_>,
    ind: &Indication,
) -> Option<Followup> {
    let Indication::WifiReq(req) = ind else {
        return None;
    };
    match odcpi_request(req) {
        Some(request) => ctx.engine.request_odcpi(&request),
        None => warn!(request_type = ?req.request_type, "Unsupported Wi-Fi request"),
    }
    None
}

fn deleted_aiding_data(mask: LocEventReportMask) -> Option<GnssAidingData> {
    let data = DELETE_EVENTS
        .iter()
        .filter(|(event, _, _)| mask.contains(*event))
        .fold(GnssAidingData::default(), |mut data, (_, sv, sv_type)| {
            data.sv_mask |= *sv;
            data.sv_type_mask |= *sv_type;
            data
        });
    (!data.sv_mask.is_empty() && !data.sv_type_mask.is_empty()).then_some(data)
}

fn klobuchar_model(ind: &EventReportInd) -> Option<KlobucharIonoModel> {
    let model = ind.klobuchar_iono_model?;
    let constellation = match model.data_source {
        SvSystem::Compass => SvSystem::Bds,
        other => other,
    };
    Some(KlobucharIonoModel {
        constellation,
        system_time: ind.gps_system_time,
        alpha: model.alpha,
        beta: model.beta,
    })
}

/// Leap second and tau C; only reported together with the GPS time they refer to
fn additional_system_info(ind: &EventReportInd) -> Option<AdditionalSystemInfo> {
    if ind.leap_sec.is_none() && ind.tau_c.is_none() {
        return None;
    }
    ind.gps_system_time.map(|time| AdditionalSystemInfo {
        system_time: Some(time),
        leap_sec: ind.leap_sec,
        tau_c: ind.tau_c,
    })
}

pub(crate) fn decode_event_report(
    ctx: &mut DecodeContext<'_>,
    ind: &Indication,
) -> Option<Followup> {
    let Indication::EventReport(report) = ind else {
        return None;
    };
    debug!(events = report.event_report.bits(), "Event report");
    if let Some(data) = deleted_aiding_data(report.event_report) {
        ctx.engine.report_delete_aiding_data_event(&data);
    }
    if let Some(model) = klobuchar_model(report) {
        ctx.engine.report_klobuchar_iono_model(&model);
    }
    if let Some(info) = additional_system_info(report) {
        ctx.engine.report_gnss_additional_system_info(&info);
    }
    None
}

fn location_system_info(ind: &SystemInfoInd) -> LocationSystemInfo {
    let mut info = LocationSystemInfo::default();
    let (SystemInfoType::NextLeapSecondInfo, Some(next)) =
        (ind.system_info, ind.next_leap_second_info)
    else {
        return info;
    };
    if let (Some(event), Some(before), Some(after)) = (
        next.gps_time_next_ls_event,
        next.leap_seconds_current,
        next.leap_seconds_next,
    ) {
        info.leap_second_change = Some(LeapSecondChange {
            gps_week: event.week,
            gps_time_of_week_ms: event.tow_ms,
            leap_seconds_before: before,
            leap_seconds_after: after,
        });
    }
    info.current_leap_seconds = next.leap_seconds_current;
    info
}

pub(crate) fn decode_system_info(
    ctx: &mut DecodeContext<'_>,
    ind: &Indication,
) -> Option<Followup> {
    let Indication::SystemInfo(system_info) = ind else {
        return None;
    };
    let info = location_system_info(system_info);
    if !info.is_empty() {
        ctx.engine.report_location_system_info(&info);
    }
    None
}
