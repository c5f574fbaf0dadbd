//! LocationEngine trait - consumer of normalized reports
//!
//! Every callback has a no-op default so an engine only overrides what it consumes.
//! Callbacks run on the adapter worker and must return promptly.

use crate::{
    AdditionalSystemInfo, AgpsType, ApnTypeMask, EngineStatus, GnssAidingData,
    GnssDataNotification, GnssMeasurements, GnssNiNotification, GnssSvNotification,
    KlobucharIonoModel, Location, LocationExtended, LocationSystemInfo, NiToken, OdcpiRequest,
    PosTechMask, PositionReport, SvEphemerisReport, SvIdConfig, SvMeasurementSet, SvPolynomial,
    SvTypeConfig,
};

/// Location engine callback surface
#[allow(unused_variables)]
pub trait LocationEngine: Send + Sync {
    // ===== Fix and satellite reports =====

    /// Position fix; failures carry [`crate::ReportStatus::Failure`]
    fn report_position(&self, report: &PositionReport) {}

    /// Jammer data of a position report that had no usable fix
    fn report_data(&self, data: &GnssDataNotification, ms_in_week: i32) {}

    fn report_sv(&self, svs: &GnssSvNotification) {}

    fn report_sv_measurement(&self, set: &SvMeasurementSet) {}

    fn report_gnss_measurement_data(&self, measurements: &GnssMeasurements, ms_in_week: i32) {}

    fn report_sv_polynomial(&self, polynomial: &SvPolynomial) {}

    fn report_sv_ephemeris(&self, ephemeris: &SvEphemerisReport) {}

    fn report_nmea(&self, sentence: &str) {}

    fn report_status(&self, status: EngineStatus) {}

    // ===== Aiding data =====

    /// URLs the engine wants XTRA data downloaded from
    fn report_xtra_server(&self, urls: &[String]) {}

    fn request_xtra_data(&self) {}

    fn request_time(&self) {}

    fn request_location(&self) {}

    fn report_delete_aiding_data_event(&self, data: &GnssAidingData) {}

    fn report_klobuchar_iono_model(&self, model: &KlobucharIonoModel) {}

    fn report_gnss_additional_system_info(&self, info: &AdditionalSystemInfo) {}

    fn report_location_system_info(&self, info: &LocationSystemInfo) {}

    // ===== Network-initiated and data connection =====

    fn request_ni_notify(&self, notification: &GnssNiNotification, token: NiToken) {}

    fn request_atl(&self, conn_handle: u32, agps_type: AgpsType, apn_type_mask: ApnTypeMask) {}

    fn release_atl(&self, conn_handle: u32) {}

    fn request_odcpi(&self, request: &OdcpiRequest) {}

    // ===== Configuration replies =====

    fn report_gnss_sv_id_config(&self, config: &SvIdConfig) {}

    fn report_gnss_sv_type_config(&self, config: &SvTypeConfig) {}

    fn report_wwan_zpp_fix(&self, location: &Location) {}

    fn report_zpp_best_available_fix(
        &self,
        location: &Location,
        extended: &LocationExtended,
        tech_mask: PosTechMask,
    ) {
    }

    fn report_gnss_eng_energy_consumed(&self, energy_since_first_boot: u64) {}

    // ===== Lifecycle =====

    /// The remote service went away; the adapter has already closed
    fn handle_engine_down(&self) {}

    /// Master negotiation finished; capabilities are now readable
    fn inject_feature_config(&self) {}
}
