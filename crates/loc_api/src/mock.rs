//! Mock transport and recording engine
//!
//! Used by unit and end-to-end tests. The transport records every outbound request and
//! mask registration and supports failure injection per message id.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use contracts::{
    AdditionalSystemInfo, AgpsType, ApnTypeMask, ClientError, ClientHandle, EngineStatus,
    GnssAidingData, GnssDataNotification, GnssMeasurements, GnssNiNotification,
    GnssSvNotification, IndStatus, KlobucharIonoModel, Location, LocationEngine,
    LocationExtended, LocationSystemInfo, MessageId, NativeEventMask, NiToken, OdcpiRequest,
    PosTechMask, PositionReport, Request, Response, ResponsePayload, SvEphemerisReport,
    SvIdConfig, SvMeasurementSet, SvPolynomial, SvTypeConfig, Transport, TransportCallback,
    TransportEvent,
};
use tracing::{debug, instrument};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock transport configuration (failure scenarios)
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Error returned by `open`
    pub fail_open: Option<ClientError>,
    /// Client error returned for every request with this id
    pub failures: HashMap<MessageId, ClientError>,
    /// Response indication returned for synchronous requests with this id
    pub responses: HashMap<MessageId, Response>,
    /// Requests with this id never get a response
    pub stalled: Vec<MessageId>,
    /// Answer to the batched support query
    pub supported_messages: u64,
    /// Messages `is_message_supported` denies
    pub unsupported: Vec<MessageId>,
    /// Every mask registration fails
    pub reject_registrations: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            fail_open: None,
            failures: HashMap::new(),
            responses: HashMap::new(),
            stalled: Vec::new(),
            supported_messages: 0,
            unsupported: Vec::new(),
            reject_registrations: false,
        }
    }
}

/// Outbound request as seen by the transport
#[derive(Debug, Clone, PartialEq)]
pub struct SentRequest {
    pub request: Request,
    /// Sent through `send_sync`
    pub sync: bool,
}

/// In-memory transport
pub struct MockTransport {
    config: Mutex<MockConfig>,
    /// Consumed before persistent failures, one per request
    once: Mutex<HashMap<MessageId, ClientError>>,
    requests: Mutex<Vec<SentRequest>>,
    registrations: Mutex<Vec<NativeEventMask>>,
    callback: Mutex<Option<TransportCallback>>,
    next_handle: AtomicU64,
    opens: AtomicUsize,
    closes: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    pub fn with_config(config: MockConfig) -> Self {
        Self {
            config: Mutex::new(config),
            once: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            registrations: Mutex::new(Vec::new()),
            callback: Mutex::new(None),
            next_handle: AtomicU64::new(1),
            opens: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
        }
    }

    // ===== Failure injection =====

    pub fn fail_open(&self, error: ClientError) {
        lock(&self.config).fail_open = Some(error);
    }

    pub fn fail_with(&self, id: MessageId, error: ClientError) {
        lock(&self.config).failures.insert(id, error);
    }

    pub fn fail_once(&self, id: MessageId, error: ClientError) {
        lock(&self.once).insert(id, error);
    }

    pub fn respond_with(&self, id: MessageId, response: Response) {
        lock(&self.config).responses.insert(id, response);
    }

    pub fn stall(&self, id: MessageId) {
        lock(&self.config).stalled.push(id);
    }

    pub fn set_supported_messages(&self, bits: u64) {
        lock(&self.config).supported_messages = bits;
    }

    pub fn set_unsupported(&self, id: MessageId) {
        lock(&self.config).unsupported.push(id);
    }

    pub fn reject_registrations(&self, reject: bool) {
        lock(&self.config).reject_registrations = reject;
    }

    // ===== Inspection =====

    pub fn requests(&self) -> Vec<SentRequest> {
        lock(&self.requests).clone()
    }

    pub fn requests_for(&self, id: MessageId) -> Vec<Request> {
        lock(&self.requests)
            .iter()
            .filter(|r| r.request.id() == id)
            .map(|r| r.request.clone())
            .collect()
    }

    pub fn clear_requests(&self) {
        lock(&self.requests).clear();
    }

    /// Masks of successful registrations, oldest first
    pub fn registered_masks(&self) -> Vec<NativeEventMask> {
        lock(&self.registrations).clone()
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::Relaxed)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::Relaxed)
    }

    /// Deliver an event through the callback of the open connection
    ///
    /// Returns `false` when no connection is open.
    pub fn emit(&self, event: TransportEvent) -> bool {
        let callback = lock(&self.callback).clone();
        match callback {
            Some(callback) => {
                callback(event);
                true
            }
            None => false,
        }
    }

    fn record(&self, request: &Request, sync: bool) -> Result<(), ClientError> {
        let id = request.id();
        lock(&self.requests).push(SentRequest {
            request: request.clone(),
            sync,
        });
        if let Some(error) = lock(&self.once).remove(&id) {
            return Err(error);
        }
        match lock(&self.config).failures.get(&id) {
            Some(error) => Err(*error),
            None => Ok(()),
        }
    }

    fn response_for(&self, request: &Request) -> Option<Response> {
        let config = lock(&self.config);
        let id = request.id();
        if config.stalled.contains(&id) {
            return None;
        }
        if let Some(response) = config.responses.get(&id) {
            return Some(response.clone());
        }
        let response = match request {
            Request::InjectPredictedOrbitsData { part_num, .. } => Response::with_payload(
                IndStatus::Success,
                ResponsePayload::PredictedOrbitsPart {
                    part_num: *part_num,
                },
            ),
            _ => Response::new(IndStatus::Success),
        };
        Some(response)
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    #[instrument(name = "mock_transport_open", skip(self, callback))]
    async fn open(&self, callback: TransportCallback) -> Result<ClientHandle, ClientError> {
        if let Some(error) = lock(&self.config).fail_open {
            return Err(error);
        }
        self.opens.fetch_add(1, Ordering::Relaxed);
        *lock(&self.callback) = Some(callback);
        Ok(ClientHandle(self.next_handle.fetch_add(1, Ordering::Relaxed)))
    }

    async fn close(&self, handle: ClientHandle) -> Result<(), ClientError> {
        debug!(handle = handle.0, "Mock transport closed");
        self.closes.fetch_add(1, Ordering::Relaxed);
        *lock(&self.callback) = None;
        Ok(())
    }

    async fn send(&self, _handle: ClientHandle, request: Request) -> Result<(), ClientError> {
        self.record(&request, false)
    }

    async fn send_sync(
        &self,
        _handle: ClientHandle,
        request: Request,
    ) -> Result<Response, ClientError> {
        self.record(&request, true)?;
        match self.response_for(&request) {
            Some(response) => Ok(response),
            None => std::future::pending().await,
        }
    }

    async fn register_event_mask(
        &self,
        _handle: ClientHandle,
        mask: NativeEventMask,
        _is_master: bool,
    ) -> bool {
        if lock(&self.config).reject_registrations {
            return false;
        }
        lock(&self.registrations).push(mask);
        true
    }

    async fn is_message_supported(&self, id: MessageId) -> bool {
        !lock(&self.config).unsupported.contains(&id)
    }

    async fn support_msg_check(
        &self,
        _handle: ClientHandle,
        ids: &[MessageId],
    ) -> Result<u64, ClientError> {
        let bits = lock(&self.config).supported_messages;
        let width = u32::try_from(ids.len()).unwrap_or(u64::BITS);
        Ok(match 1u64.checked_shl(width) {
            Some(limit) => bits & (limit - 1),
            None => bits,
        })
    }
}

/// One engine callback as recorded by [`RecordingEngine`]
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Position(PositionReport),
    Data(GnssDataNotification, i32),
    Sv(GnssSvNotification),
    SvMeasurement(SvMeasurementSet),
    GnssMeasurement(GnssMeasurements, i32),
    SvPolynomial(SvPolynomial),
    SvEphemeris(SvEphemerisReport),
    Nmea(String),
    Status(EngineStatus),
    XtraServer(Vec<String>),
    RequestXtraData,
    RequestTime,
    RequestLocation,
    DeleteAidingDataEvent(GnssAidingData),
    KlobucharIonoModel(KlobucharIonoModel),
    AdditionalSystemInfo(AdditionalSystemInfo),
    LocationSystemInfo(LocationSystemInfo),
    NiNotify(GnssNiNotification, NiToken),
    RequestAtl {
        conn_handle: u32,
        agps_type: AgpsType,
        apn_type_mask: ApnTypeMask,
    },
    ReleaseAtl(u32),
    Odcpi(OdcpiRequest),
    SvIdConfig(SvIdConfig),
    SvTypeConfig(SvTypeConfig),
    WwanZppFix(Location),
    ZppBestAvailableFix(Location, LocationExtended, PosTechMask),
    EnergyConsumed(u64),
    EngineDown,
    FeatureConfig,
}

/// Location engine that records every callback
#[derive(Debug, Default)]
pub struct RecordingEngine {
    calls: Mutex<Vec<EngineCall>>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        lock(&self.calls).clone()
    }

    pub fn clear(&self) {
        lock(&self.calls).clear();
    }

    fn push(&self, call: EngineCall) {
        lock(&self.calls).push(call);
    }
}

impl LocationEngine for RecordingEngine {
    fn report_position(&self, report: &PositionReport) {
        self.push(EngineCall::Position(report.clone()));
    }

    fn report_data(&self, data: &GnssDataNotification, ms_in_week: i32) {
        self.push(EngineCall::Data(data.clone(), ms_in_week));
    }

    fn report_sv(&self, svs: &GnssSvNotification) {
        self.push(EngineCall::Sv(svs.clone()));
    }

    fn report_sv_measurement(&self, set: &SvMeasurementSet) {
        self.push(EngineCall::SvMeasurement(set.clone()));
    }

    fn report_gnss_measurement_data(&self, measurements: &GnssMeasurements, ms_in_week: i32) {
        self.push(EngineCall::GnssMeasurement(measurements.clone(), ms_in_week));
    }

    fn report_sv_polynomial(&self, polynomial: &SvPolynomial) {
        self.push(EngineCall::SvPolynomial(polynomial.clone()));
    }

    fn report_sv_ephemeris(&self, ephemeris: &SvEphemerisReport) {
        self.push(EngineCall::SvEphemeris(ephemeris.clone()));
    }

    fn report_nmea(&self, sentence: &str) {
        self.push(EngineCall::Nmea(sentence.to_string()));
    }

    fn report_status(&self, status: EngineStatus) {
        self.push(EngineCall::Status(status));
    }

    fn report_xtra_server(&self, urls: &[String]) {
        self.push(EngineCall::XtraServer(urls.to_vec()));
    }

    fn request_xtra_data(&self) {
        self.push(EngineCall::RequestXtraData);
    }

    fn request_time(&self) {
        self.push(EngineCall::RequestTime);
    }

    fn request_location(&self) {
        self.push(EngineCall::RequestLocation);
    }

    fn report_delete_aiding_data_event(&self, data: &GnssAidingData) {
        self.push(EngineCall::DeleteAidingDataEvent(*data));
    }

    fn report_klobuchar_iono_model(&self, model: &KlobucharIonoModel) {
        self.push(EngineCall::KlobucharIonoModel(*model));
    }

    fn report_gnss_additional_system_info(&self, info: &AdditionalSystemInfo) {
        self.push(EngineCall::AdditionalSystemInfo(*info));
    }

    fn report_location_system_info(&self, info: &LocationSystemInfo) {
        self.push(EngineCall::LocationSystemInfo(*info));
    }

    fn request_ni_notify(&self, notification: &GnssNiNotification, token: NiToken) {
        self.push(EngineCall::NiNotify(notification.clone(), token));
    }

    fn request_atl(&self, conn_handle: u32, agps_type: AgpsType, apn_type_mask: ApnTypeMask) {
        self.push(EngineCall::RequestAtl {
            conn_handle,
            agps_type,
            apn_type_mask,
        });
    }

    fn release_atl(&self, conn_handle: u32) {
        self.push(EngineCall::ReleaseAtl(conn_handle));
    }

    fn request_odcpi(&self, request: &OdcpiRequest) {
        self.push(EngineCall::Odcpi(*request));
    }

    fn report_gnss_sv_id_config(&self, config: &SvIdConfig) {
        self.push(EngineCall::SvIdConfig(*config));
    }

    fn report_gnss_sv_type_config(&self, config: &SvTypeConfig) {
        self.push(EngineCall::SvTypeConfig(*config));
    }

    fn report_wwan_zpp_fix(&self, location: &Location) {
        self.push(EngineCall::WwanZppFix(location.clone()));
    }

    fn report_zpp_best_available_fix(
        &self,
        location: &Location,
        extended: &LocationExtended,
        tech_mask: PosTechMask,
    ) {
        self.push(EngineCall::ZppBestAvailableFix(
            location.clone(),
            extended.clone(),
            tech_mask,
        ));
    }

    fn report_gnss_eng_energy_consumed(&self, energy_since_first_boot: u64) {
        self.push(EngineCall::EnergyConsumed(energy_since_first_boot));
    }

    fn handle_engine_down(&self) {
        self.push(EngineCall::EngineDown);
    }

    fn inject_feature_config(&self) {
        self.push(EngineCall::FeatureConfig);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_failures_are_recorded_and_once_is_consumed() {
        let transport = MockTransport::new();
        let handle = ClientHandle(1);
        transport.fail_once(MessageId::GetBlacklistSv, ClientError::EngineBusy);

        let first = transport.send(handle, Request::GetBlacklistSv).await;
        let second = transport.send(handle, Request::GetBlacklistSv).await;
        assert_eq!(first, Err(ClientError::EngineBusy));
        assert_eq!(second, Ok(()));
        assert_eq!(transport.requests_for(MessageId::GetBlacklistSv).len(), 2);
    }

    #[tokio::test]
    async fn test_support_check_is_bounded_by_query() {
        let transport = MockTransport::with_config(MockConfig {
            supported_messages: 0b1111,
            ..Default::default()
        });
        let ids = [MessageId::GetBlacklistSv, MessageId::SetServer];
        let bits = transport
            .support_msg_check(ClientHandle(1), &ids)
            .await
            .unwrap();
        assert_eq!(bits, 0b11);
    }

    #[tokio::test]
    async fn test_emit_needs_open_connection() {
        let transport = MockTransport::new();
        assert!(!transport.emit(TransportEvent::Indication(
            contracts::Indication::InjectTimeReq
        )));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handle = transport
            .open(Arc::new(move |event| lock(&sink).push(event)))
            .await
            .unwrap();
        assert!(transport.emit(TransportEvent::Indication(
            contracts::Indication::InjectTimeReq
        )));
        assert_eq!(lock(&seen).len(), 1);

        transport.close(handle).await.unwrap();
        assert_eq!((transport.open_count(), transport.close_count()), (1, 1));
    }

    #[test]
    fn test_engine_records_in_order() {
        let engine = RecordingEngine::new();
        engine.request_time();
        engine.report_status(EngineStatus::EngineOn);
        assert_eq!(
            engine.calls(),
            vec![
                EngineCall::RequestTime,
                EngineCall::Status(EngineStatus::EngineOn)
            ]
        );
        engine.clear();
        assert!(engine.calls().is_empty());
    }
}
