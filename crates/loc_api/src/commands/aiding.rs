//! Time, position and aiding-data commands

use contracts::{
    AidingDataCommonMask, AidingDataSvMask, AidingDataSvTypeMask, ClientError, ConstellReportConfig,
    ConstellationMask, Coordinates, DeleteAssistDataReq, DeleteCellDbMask, DeleteCommonDataMask,
    DeleteGnssDataMask, DeleteGnssServiceDataReq, DeleteSatDataMask, DeleteSatelliteData,
    DeleteSvInfo, DeleteSvInfoMask, GnssAidingData, GnssLocationInfo, InjectPositionReq,
    InjectUtcTimeReq, Location, LocationResult, PosTechMask, PositionSource, Request,
    SvDataMask, SvSystem, Transport,
};
use tracing::{debug, info, warn};

use crate::adapter::LocApi;
use crate::bridge::success_or_general_failure;
use crate::{clock, convert};

/// Injected positions never advertise a better accuracy than this (m)
const MIN_INJECTED_ACCURACY_M: f32 = 1000.0;
/// Confidence attached to injected uncertainties (%)
const INJECTED_CONFIDENCE: u8 = 68;

/// First GPS satellite id of the legacy deletion list
const GPS_SV_ID_OFFSET: u16 = 1;
/// Number of GPS satellites covered by the legacy deletion list
const GPS_SV_ID_RANGE: u16 = 32;

const SV_DATA_MAP: &[(AidingDataSvMask, DeleteSatDataMask)] = &[
    (AidingDataSvMask::EPHEMERIS, DeleteSatDataMask::EPHEMERIS),
    (AidingDataSvMask::ALMANAC, DeleteSatDataMask::ALMANAC),
    (AidingDataSvMask::HEALTH, DeleteSatDataMask::SVHEALTH),
    (AidingDataSvMask::DIRECTION, DeleteSatDataMask::SVDIR),
    (AidingDataSvMask::STEER, DeleteSatDataMask::SVSTEER),
    (AidingDataSvMask::ALMANAC_CORR, DeleteSatDataMask::ALM_CORR),
    (AidingDataSvMask::BLACKLIST, DeleteSatDataMask::BLACKLIST),
    (AidingDataSvMask::SA_DATA, DeleteSatDataMask::SA_DATA),
    (AidingDataSvMask::NO_EXIST, DeleteSatDataMask::SV_NO_EXIST),
    (AidingDataSvMask::IONOSPHERE, DeleteSatDataMask::IONO),
    (AidingDataSvMask::TIME, DeleteSatDataMask::TIME),
    (AidingDataSvMask::MB_DATA, DeleteSatDataMask::MB_DATA),
];

const SV_TYPE_MAP: &[(AidingDataSvTypeMask, ConstellationMask)] = &[
    (AidingDataSvTypeMask::GPS, ConstellationMask::GPS),
    (AidingDataSvTypeMask::GLONASS, ConstellationMask::GLONASS),
    (AidingDataSvTypeMask::QZSS, ConstellationMask::QZSS),
    (AidingDataSvTypeMask::BEIDOU, ConstellationMask::BDS),
    (AidingDataSvTypeMask::GALILEO, ConstellationMask::GALILEO),
];

const COMMON_MAP: &[(AidingDataCommonMask, DeleteCommonDataMask)] = &[
    (AidingDataCommonMask::POSITION, DeleteCommonDataMask::POS),
    (AidingDataCommonMask::TIME, DeleteCommonDataMask::TIME),
    (AidingDataCommonMask::UTC, DeleteCommonDataMask::UTC),
    (AidingDataCommonMask::RTI, DeleteCommonDataMask::RTI),
    (
        AidingDataCommonMask::FREQ_BIAS_EST,
        DeleteCommonDataMask::FREQ_BIAS_EST,
    ),
];

/// GPS-only satellite bits of the legacy deletion
const LEGACY_GPS_MAP: &[(AidingDataSvMask, DeleteGnssDataMask)] = &[
    (AidingDataSvMask::IONOSPHERE, DeleteGnssDataMask::IONO),
    (AidingDataSvMask::HEALTH, DeleteGnssDataMask::HEALTH),
    (AidingDataSvMask::DIRECTION, DeleteGnssDataMask::GPS_SVDIR),
    (AidingDataSvMask::SA_DATA, DeleteGnssDataMask::SADATA),
];

const LEGACY_COMMON_MAP: &[(AidingDataCommonMask, DeleteGnssDataMask)] = &[
    (AidingDataCommonMask::POSITION, DeleteGnssDataMask::POSITION),
    (AidingDataCommonMask::TIME, DeleteGnssDataMask::TIME),
    (AidingDataCommonMask::UTC, DeleteGnssDataMask::UTC),
    (AidingDataCommonMask::RTI, DeleteGnssDataMask::RTI),
];

fn map_bits<A, N>(mask: A, table: &[(A, N)]) -> N
where
    A: bitflags::Flags + Copy,
    N: bitflags::Flags + Copy,
{
    table
        .iter()
        .filter(|(abstract_bit, _)| mask.contains(*abstract_bit))
        .fold(N::empty(), |acc, (_, native)| acc.union(*native))
}

fn some_if_set<M: bitflags::Flags>(mask: M) -> Option<M> {
    (!mask.is_empty()).then_some(mask)
}

/// Service-data deletion for an aiding-data request
pub(crate) fn service_data_request(data: &GnssAidingData) -> DeleteGnssServiceDataReq {
    if data.delete_all {
        return DeleteGnssServiceDataReq {
            delete_all: true,
            ..Default::default()
        };
    }

    let data_mask = map_bits(data.sv_mask, SV_DATA_MAP);
    let satellite_data = (!data_mask.is_empty()).then(|| DeleteSatelliteData {
        system: map_bits(data.sv_type_mask, SV_TYPE_MAP),
        data_mask,
    });

    DeleteGnssServiceDataReq {
        delete_all: false,
        satellite_data,
        common_data: some_if_set(map_bits(data.common_mask, COMMON_MAP)),
        cell_db: data
            .common_mask
            .contains(AidingDataCommonMask::CELLDB)
            .then(DeleteCellDbMask::all),
    }
}

/// Legacy deletion for engines without service-data deletion; GPS only
pub(crate) fn assist_data_request(data: &GnssAidingData) -> DeleteAssistDataReq {
    if data.delete_all {
        return DeleteAssistDataReq {
            delete_all: true,
            ..Default::default()
        };
    }

    let gps = data.sv_type_mask.contains(AidingDataSvTypeMask::GPS);

    let mut sv_mask = DeleteSvInfoMask::empty();
    if data.sv_mask.contains(AidingDataSvMask::EPHEMERIS) {
        sv_mask |= DeleteSvInfoMask::EPHEMERIS;
    }
    if data.sv_mask.contains(AidingDataSvMask::ALMANAC) {
        sv_mask |= DeleteSvInfoMask::ALMANAC;
    }
    let sv_info = if gps && !sv_mask.is_empty() {
        (GPS_SV_ID_OFFSET..GPS_SV_ID_OFFSET + GPS_SV_ID_RANGE)
            .map(|gnss_sv_id| DeleteSvInfo {
                gnss_sv_id,
                system: SvSystem::Gps,
                mask: sv_mask,
            })
            .collect()
    } else {
        Vec::new()
    };

    let mut gnss_data = map_bits(data.common_mask, LEGACY_COMMON_MAP);
    if gps {
        gnss_data |= map_bits(data.sv_mask, LEGACY_GPS_MAP);
    }

    DeleteAssistDataReq {
        delete_all: false,
        sv_info,
        gnss_data: some_if_set(gnss_data),
        cell_db: data
            .common_mask
            .contains(AidingDataCommonMask::CELLDB)
            .then(DeleteCellDbMask::all),
    }
}

/// Position fields shared by both injection entry points
fn position_request(location: &Location, on_demand_cpi: bool) -> InjectPositionReq {
    let mut req = InjectPositionReq::default();
    if location.timestamp_ms > 0 {
        req.timestamp_utc_ms = Some(location.timestamp_ms);
    }
    if let Some(Coordinates {
        latitude,
        longitude,
    }) = location.coordinates
    {
        req.latitude = Some(latitude);
        req.longitude = Some(longitude);
    }
    if let Some(accuracy) = location.accuracy {
        req.hor_unc_circular = Some(accuracy.max(MIN_INJECTED_ACCURACY_M));
        req.hor_confidence = Some(INJECTED_CONFIDENCE);
        req.raw_hor_unc_circular = Some(accuracy);
        req.raw_hor_confidence = Some(INJECTED_CONFIDENCE);
    }
    if let Some(altitude) = location.altitude {
        req.altitude_wrt_ellipsoid = Some(altitude as f32);
    }
    if let Some(vertical) = location.vertical_accuracy {
        req.vert_unc = Some(vertical);
        req.vert_confidence = Some(INJECTED_CONFIDENCE);
    }
    if on_demand_cpi {
        req.on_demand_cpi = Some(true);
    }
    req
}

/// Position injection with the extended fix information
pub(crate) fn location_info_request(info: &GnssLocationInfo, on_demand_cpi: bool) -> InjectPositionReq {
    let mut req = position_request(&info.location, on_demand_cpi);

    req.gps_time = info
        .system_time
        .as_ref()
        .and_then(|time| convert::system_time_to_gps(time, info.leap_seconds));

    if let (Some(east), Some(north), Some(up)) =
        (info.east_velocity, info.north_velocity, info.up_velocity)
    {
        req.vel_enu = Some([east, north, up]);
    }
    if let (Some(east), Some(north), Some(up)) = (
        info.east_velocity_std_dev,
        info.north_velocity_std_dev,
        info.up_velocity_std_dev,
    ) {
        req.vel_unc_enu = Some([east, north, up]);
    }
    req.time_unc_ms = info.time_unc_ms;
    req.num_sv_in_fix = info.sv_used.as_ref().map(convert::num_sv_used);

    // Dead-reckoned fixes are tagged for the engine
    if info.tech_mask.contains(PosTechMask::SENSORS) {
        req.position_src = Some(PositionSource::Dre);
    }
    req
}

impl<T: Transport + Sync + 'static> LocApi<T> {
    /// Inject UTC time sampled at uptime `reference_ms`
    pub async fn set_time(&mut self, utc_ms: u64, reference_ms: u64, uncertainty_ms: u32) -> LocationResult {
        let elapsed = clock::uptime_ms().saturating_sub(reference_ms);
        let request = InjectUtcTimeReq {
            time_utc_ms: utc_ms.saturating_add(elapsed),
            time_unc_ms: uncertainty_ms,
        };
        debug!(
            time_utc_ms = request.time_utc_ms,
            uncertainty_ms, "Injecting UTC time"
        );
        let result = self.sync_send(Request::InjectUtcTime(request)).await;
        success_or_general_failure(&result)
    }

    /// Inject a coarse position stamped with the current time
    pub async fn inject_position(&mut self, latitude: f64, longitude: f64, accuracy: f32) -> LocationResult {
        let location = Location {
            coordinates: Some(Coordinates {
                latitude,
                longitude,
            }),
            accuracy: Some(accuracy),
            timestamp_ms: clock::now_utc_ms(),
            ..Default::default()
        };
        self.inject_location(&location, false).await
    }

    pub async fn inject_location(&mut self, location: &Location, on_demand_cpi: bool) -> LocationResult {
        let request = position_request(location, on_demand_cpi);
        let result = self.sync_send(Request::InjectPosition(request)).await;
        success_or_general_failure(&result)
    }

    pub async fn inject_location_info(&mut self, info: &GnssLocationInfo, on_demand_cpi: bool) -> LocationResult {
        let request = location_info_request(info, on_demand_cpi);
        debug!(
            num_sv_in_fix = ?request.num_sv_in_fix,
            position_src = ?request.position_src,
            "Injecting position"
        );
        let result = self.sync_send(Request::InjectPosition(request)).await;
        success_or_general_failure(&result)
    }

    /// Delete aiding data
    ///
    /// Falls back to the legacy deletion the first time the engine does not know
    /// service-data deletion, and stays there for the adapter's lifetime.
    pub async fn delete_aiding_data(&mut self, data: &GnssAidingData) -> LocationResult {
        if self.state.use_new_delete_api {
            let request = Request::DeleteGnssServiceData(service_data_request(data));
            let result = self.sync_send(request).await;
            if !matches!(
                result,
                Err(ClientError::Unsupported | ClientError::Internal)
            ) {
                return success_or_general_failure(&result);
            }
            info!("Service data deletion unsupported, falling back to assist data deletion");
            self.state.use_new_delete_api = false;
        }

        let result = self
            .sync_send(Request::DeleteAssistData(assist_data_request(data)))
            .await;
        success_or_general_failure(&result)
    }

    /// Ask the engine to report its full polynomial, ephemeris or iono database
    pub async fn request_for_aiding_data(&mut self, mask: SvDataMask) {
        let request = Request::SetGnssConstellReportConfig(ConstellReportConfig {
            report_full_sv_poly_db: mask.contains(SvDataMask::POLY),
            report_full_ephemeris_db: mask.contains(SvDataMask::EPHEMERIS),
            report_full_iono_db: mask.contains(SvDataMask::IONOSPHERE),
            ..Default::default()
        });
        match self.sync_send(request).await {
            Ok(resp) if resp.status.is_success_or_busy() => {
                debug!(mask = mask.bits(), "Aiding data requested")
            }
            other => warn!(mask = mask.bits(), result = ?other, "Aiding data request failed"),
        }
    }
}
