//! LocApiHandle - public front of the adapter worker
//!
//! Every method queues a command and waits for the worker's reply. Transport events are
//! pushed by the callback handed to the transport into a separate unbounded queue, so the
//! transport is never blocked and no event is lost while the worker waits on a request.

use std::sync::Arc;

use bytes::Bytes;
use contracts::{
    AGlonassProtocolMask, AdapterConfig, AdapterEventMask, AgpsBearer, ApnTypeMask,
    CapabilityStore, DerCertificate, FixCriteria, GnssAidingData, GnssLocationInfo, GpsLock,
    Location, LocationEngine, LocationResult, LockSubType, LppProfile, LppeMask, NiResponse,
    NiToken, SensorPerfControl, SensorProperties, ServerType, SuplVersion, SvDataMask,
    SvIdConfig, SvTypeConfig, Transport, TransportCallback, TransportEvent,
};
use observability::StatsSummary;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument};

use crate::adapter::{AdapterStatus, LocApi};
use crate::error::{LocApiError, Result};
use crate::metrics::AdapterMetrics;
use crate::worker::{self, BoxFuture, Job};

/// Handle to a running adapter worker
pub struct LocApiHandle<T> {
    /// Channel to the worker
    tx: mpsc::Sender<Job<T>>,
    /// Shared metrics
    metrics: Arc<AdapterMetrics>,
    capabilities: Arc<CapabilityStore>,
    /// Worker task handle
    worker_handle: JoinHandle<()>,
}

/// Transport callback feeding the worker's event queue
fn event_callback(
    tx: mpsc::UnboundedSender<TransportEvent>,
    metrics: Arc<AdapterMetrics>,
) -> TransportCallback {
    Arc::new(move |event: TransportEvent| {
        if let Err(mpsc::error::SendError(event)) = tx.send(event) {
            metrics.inc_dropped_events();
            debug!(event = ?event, "Adapter worker gone, transport event ignored");
        }
    })
}

impl<T: Transport + Send + Sync + 'static> LocApiHandle<T> {
    /// Validate the config and spawn the worker with a fresh capability store
    pub fn spawn(
        transport: Arc<T>,
        engine: Arc<dyn LocationEngine>,
        config: AdapterConfig,
    ) -> Result<Self> {
        Self::spawn_with_capabilities(transport, engine, config, Arc::new(CapabilityStore::new()))
    }

    /// Spawn sharing capabilities negotiated by another adapter instance
    pub fn spawn_with_capabilities(
        transport: Arc<T>,
        engine: Arc<dyn LocationEngine>,
        config: AdapterConfig,
        capabilities: Arc<CapabilityStore>,
    ) -> Result<Self> {
        config.check()?;
        let (tx, rx) = mpsc::channel(config.queue_capacity);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let metrics = Arc::new(AdapterMetrics::new());

        let callback = event_callback(event_tx, Arc::clone(&metrics));
        let api = LocApi::new(
            transport,
            engine,
            Arc::clone(&capabilities),
            config,
            Arc::clone(&metrics),
            callback,
        );
        let worker_handle = tokio::spawn(worker::run(api, rx, event_rx));

        Ok(Self {
            tx,
            metrics,
            capabilities,
            worker_handle,
        })
    }

    pub fn metrics(&self) -> &Arc<AdapterMetrics> {
        &self.metrics
    }

    pub fn capabilities(&self) -> &Arc<CapabilityStore> {
        &self.capabilities
    }

    /// Run `f` on the worker and wait for its result
    async fn call<R, F>(&self, command: &'static str, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: for<'a> FnOnce(&'a mut LocApi<T>) -> BoxFuture<'a, R> + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job = worker::job(move |api| {
            Box::pin(async move {
                let _ = reply_tx.send(f(api).await);
            })
        });
        self.tx
            .send(job)
            .await
            .map_err(|_| LocApiError::WorkerGone)?;
        reply_rx
            .await
            .map_err(|_| LocApiError::reply_dropped(command))
    }

    /// [`Self::call`] for commands reporting a [`LocationResult`]
    async fn location<F>(&self, command: &'static str, f: F) -> Result<()>
    where
        F: for<'a> FnOnce(&'a mut LocApi<T>) -> BoxFuture<'a, LocationResult> + Send + 'static,
    {
        Ok(self.call(command, f).await??)
    }

    // ===== Session =====

    pub async fn open(&self, mask: AdapterEventMask) -> Result<()> {
        Ok(self
            .call("open", move |api| Box::pin(api.open(mask)))
            .await??)
    }

    pub async fn close(&self) -> Result<()> {
        Ok(self.call("close", |api| Box::pin(api.close())).await??)
    }

    pub async fn register_event_mask(&self, mask: AdapterEventMask) -> Result<()> {
        self.call("register_event_mask", move |api| {
            Box::pin(api.register_event_mask(mask))
        })
        .await
    }

    pub async fn start_fix(&self, criteria: FixCriteria) -> Result<()> {
        self.location("start_fix", move |api| {
            Box::pin(async move { api.start_fix(&criteria).await })
        })
        .await
    }

    pub async fn stop_fix(&self) -> Result<()> {
        self.location("stop_fix", |api| Box::pin(api.stop_fix()))
            .await
    }

    pub async fn set_position_mode(&self, criteria: FixCriteria) -> Result<()> {
        self.location("set_position_mode", move |api| {
            Box::pin(async move { api.set_position_mode(&criteria).await })
        })
        .await
    }

    pub async fn status(&self) -> Result<AdapterStatus> {
        self.call("status", |api| Box::pin(async move { api.status() }))
            .await
    }

    pub async fn is_master(&self) -> Result<bool> {
        self.call("is_master", |api| Box::pin(async move { api.is_master() }))
            .await
    }

    /// Round-trip latency of synchronous requests so far
    pub async fn sync_latency(&self) -> Result<StatsSummary> {
        self.call("sync_latency", |api| {
            Box::pin(async move { api.sync_latency().summary() })
        })
        .await
    }

    // ===== Aiding data =====

    pub async fn set_time(&self, utc_ms: u64, reference_ms: u64, uncertainty_ms: u32) -> Result<()> {
        self.location("set_time", move |api| {
            Box::pin(api.set_time(utc_ms, reference_ms, uncertainty_ms))
        })
        .await
    }

    pub async fn inject_position(&self, latitude: f64, longitude: f64, accuracy: f32) -> Result<()> {
        self.location("inject_position", move |api| {
            Box::pin(api.inject_position(latitude, longitude, accuracy))
        })
        .await
    }

    pub async fn inject_location(&self, location: Location, on_demand_cpi: bool) -> Result<()> {
        self.location("inject_location", move |api| {
            Box::pin(async move { api.inject_location(&location, on_demand_cpi).await })
        })
        .await
    }

    pub async fn inject_location_info(
        &self,
        info: GnssLocationInfo,
        on_demand_cpi: bool,
    ) -> Result<()> {
        self.location("inject_location_info", move |api| {
            Box::pin(async move { api.inject_location_info(&info, on_demand_cpi).await })
        })
        .await
    }

    pub async fn delete_aiding_data(&self, data: GnssAidingData) -> Result<()> {
        self.location("delete_aiding_data", move |api| {
            Box::pin(async move { api.delete_aiding_data(&data).await })
        })
        .await
    }

    pub async fn request_for_aiding_data(&self, mask: SvDataMask) -> Result<()> {
        self.call("request_for_aiding_data", move |api| {
            Box::pin(api.request_for_aiding_data(mask))
        })
        .await
    }

    /// Inject XTRA data; returns the bytes injected
    pub async fn set_xtra_data(&self, data: Bytes) -> Result<usize> {
        Ok(self
            .call("set_xtra_data", move |api| Box::pin(api.set_xtra_data(data)))
            .await??)
    }

    pub async fn request_xtra_server(&self) -> Result<()> {
        self.location("request_xtra_server", |api| {
            Box::pin(api.request_xtra_server())
        })
        .await
    }

    pub async fn set_xtra_version_check(&self, check: u32) -> Result<()> {
        self.location("set_xtra_version_check", move |api| {
            Box::pin(api.set_xtra_version_check(check))
        })
        .await
    }

    // ===== Constellation control =====

    pub async fn set_blacklist_sv(&self, config: SvIdConfig) -> Result<()> {
        self.location("set_blacklist_sv", move |api| {
            Box::pin(async move { api.set_blacklist_sv(&config).await })
        })
        .await
    }

    pub async fn get_blacklist_sv(&self) -> Result<()> {
        self.location("get_blacklist_sv", |api| Box::pin(api.get_blacklist_sv()))
            .await
    }

    pub async fn set_constellation_control(&self, config: SvTypeConfig) -> Result<()> {
        self.location("set_constellation_control", move |api| {
            Box::pin(async move { api.set_constellation_control(&config).await })
        })
        .await
    }

    pub async fn get_constellation_control(&self) -> Result<()> {
        self.location("get_constellation_control", |api| {
            Box::pin(api.get_constellation_control())
        })
        .await
    }

    pub async fn reset_constellation_control(&self) -> Result<()> {
        self.location("reset_constellation_control", |api| {
            Box::pin(api.reset_constellation_control())
        })
        .await
    }

    // ===== Protocol configuration =====

    pub async fn set_supl_version(&self, version: SuplVersion) -> Result<()> {
        self.location("set_supl_version", move |api| {
            Box::pin(api.set_supl_version(version))
        })
        .await
    }

    pub async fn set_lpp_config(&self, profile: LppProfile) -> Result<()> {
        self.location("set_lpp_config", move |api| {
            Box::pin(api.set_lpp_config(profile))
        })
        .await
    }

    pub async fn set_aglonass_protocol(&self, protocols: AGlonassProtocolMask) -> Result<()> {
        self.location("set_aglonass_protocol", move |api| {
            Box::pin(api.set_aglonass_protocol(protocols))
        })
        .await
    }

    pub async fn set_lppe_protocol_cp(&self, lppe: LppeMask) -> Result<()> {
        self.location("set_lppe_protocol_cp", move |api| {
            Box::pin(api.set_lppe_protocol_cp(lppe))
        })
        .await
    }

    pub async fn set_lppe_protocol_up(&self, lppe: LppeMask) -> Result<()> {
        self.location("set_lppe_protocol_up", move |api| {
            Box::pin(api.set_lppe_protocol_up(lppe))
        })
        .await
    }

    pub async fn set_nmea_types(&self, sentence_types: u32) -> Result<()> {
        self.location("set_nmea_types", move |api| {
            Box::pin(api.set_nmea_types(sentence_types))
        })
        .await
    }

    pub async fn set_sensor_properties(&self, properties: SensorProperties) -> Result<()> {
        self.location("set_sensor_properties", move |api| {
            Box::pin(async move { api.set_sensor_properties(&properties).await })
        })
        .await
    }

    pub async fn set_sensor_perf_control_config(&self, config: SensorPerfControl) -> Result<()> {
        self.location("set_sensor_perf_control_config", move |api| {
            Box::pin(async move { api.set_sensor_perf_control_config(&config).await })
        })
        .await
    }

    pub async fn set_gps_lock(&self, lock: GpsLock) -> Result<()> {
        self.location("set_gps_lock", move |api| Box::pin(api.set_gps_lock(lock)))
            .await
    }

    pub async fn get_gps_lock(&self, sub_type: LockSubType) -> Result<GpsLock> {
        Ok(self
            .call("get_gps_lock", move |api| Box::pin(api.get_gps_lock(sub_type)))
            .await??)
    }

    pub async fn set_constrained_tunc(
        &self,
        enabled: bool,
        tunc_constraint: f32,
        energy_budget: u32,
    ) -> Result<()> {
        self.location("set_constrained_tunc", move |api| {
            Box::pin(api.set_constrained_tunc(enabled, tunc_constraint, energy_budget))
        })
        .await
    }

    pub async fn set_position_assisted_clock_estimator(&self, enabled: bool) -> Result<()> {
        self.location("set_position_assisted_clock_estimator", move |api| {
            Box::pin(api.set_position_assisted_clock_estimator(enabled))
        })
        .await
    }

    pub async fn get_gnss_energy_consumed(&self) -> Result<()> {
        self.location("get_gnss_energy_consumed", |api| {
            Box::pin(api.get_gnss_energy_consumed())
        })
        .await
    }

    // ===== Network-initiated, servers and data connections =====

    pub async fn inform_ni_response(&self, response: NiResponse, token: NiToken) -> Result<()> {
        self.location("inform_ni_response", move |api| {
            Box::pin(async move { api.inform_ni_response(response, &token).await })
        })
        .await
    }

    pub async fn set_server_url(&self, url: String, server_type: ServerType) -> Result<()> {
        self.location("set_server_url", move |api| {
            Box::pin(async move { api.set_server_url(&url, server_type).await })
        })
        .await
    }

    pub async fn set_server_ipv4(&self, addr: u32, port: u16, server_type: ServerType) -> Result<()> {
        self.location("set_server_ipv4", move |api| {
            Box::pin(api.set_server_ipv4(addr, port, server_type))
        })
        .await
    }

    pub async fn atl_open_status(
        &self,
        conn_handle: u32,
        success: bool,
        apn: String,
        bearer: AgpsBearer,
        apn_type_mask: ApnTypeMask,
    ) -> Result<()> {
        self.call("atl_open_status", move |api| {
            Box::pin(async move {
                api.atl_open_status(conn_handle, success, &apn, bearer, apn_type_mask)
                    .await
            })
        })
        .await
    }

    pub async fn atl_close_status(&self, conn_handle: u32, success: bool) -> Result<()> {
        self.call("atl_close_status", move |api| {
            Box::pin(api.atl_close_status(conn_handle, success))
        })
        .await
    }

    pub async fn install_agps_cert(&self, certs: Vec<DerCertificate>, slot_mask: u32) -> Result<()> {
        self.call("install_agps_cert", move |api| {
            Box::pin(async move { api.install_agps_cert(&certs, slot_mask).await })
        })
        .await
    }

    // ===== Zero-power positioning =====

    pub async fn get_wwan_zpp_fix(&self) -> Result<()> {
        self.location("get_wwan_zpp_fix", |api| Box::pin(api.get_wwan_zpp_fix()))
            .await
    }

    pub async fn get_best_available_zpp_fix(&self) -> Result<()> {
        self.location("get_best_available_zpp_fix", |api| {
            Box::pin(api.get_best_available_zpp_fix())
        })
        .await
    }

    /// Shutdown the worker gracefully; an open connection is closed first
    #[instrument(name = "loc_api_handle_shutdown", skip(self))]
    pub async fn shutdown(self) {
        // Drop sender to signal worker to stop
        drop(self.tx);
        if let Err(e) = self.worker_handle.await {
            error!(error = ?e, "Worker task panicked");
        }
        debug!("LocApiHandle shutdown complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{EngineCall, MockTransport, RecordingEngine};
    use crate::state::Phase;
    use contracts::{
        EngineState, EngineStatus, Indication, LocationError, MessageId, NmeaInd, ServiceError,
    };
    use tokio::time::{sleep, timeout, Duration};

    fn spawn(
        config: AdapterConfig,
    ) -> (LocApiHandle<MockTransport>, Arc<MockTransport>, Arc<RecordingEngine>) {
        let transport = Arc::new(MockTransport::new());
        let engine = Arc::new(RecordingEngine::new());
        let handle = LocApiHandle::spawn(Arc::clone(&transport), engine.clone(), config).unwrap();
        (handle, transport, engine)
    }

    async fn settle() {
        sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let config = AdapterConfig {
            queue_capacity: 0,
            ..Default::default()
        };
        let result = LocApiHandle::spawn(
            Arc::new(MockTransport::new()),
            Arc::new(RecordingEngine::new()),
            config,
        );
        assert!(matches!(result, Err(LocApiError::Config(_))));
    }

    #[tokio::test]
    async fn test_commands_run_on_worker() {
        let (handle, transport, _) = spawn(AdapterConfig::default());
        handle.open(AdapterEventMask::POSITION_REPORT).await.unwrap();
        handle.start_fix(FixCriteria::default()).await.unwrap();

        let status = handle.status().await.unwrap();
        assert_eq!(status.phase, Phase::OpenInSession);
        assert_eq!(transport.requests_for(MessageId::Start).len(), 1);
        assert!(handle.metrics().command_count() >= 3);

        handle.shutdown().await;
        assert_eq!(transport.close_count(), 1);
    }

    #[tokio::test]
    async fn test_location_errors_surface() {
        let (handle, _, _) = spawn(AdapterConfig::default());
        // Not open: no handle to send with
        let err = handle.stop_fix().await.unwrap_err();
        assert!(matches!(
            err,
            LocApiError::Location(LocationError::GeneralFailure)
        ));
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_transport_events_are_decoded() {
        let (handle, transport, engine) = spawn(AdapterConfig::default());
        handle.open(AdapterEventMask::empty()).await.unwrap();

        assert!(transport.emit(TransportEvent::Indication(Indication::Nmea(NmeaInd {
            nmea: "$GPGGA".to_string(),
            expanded_nmea: None,
        }))));
        assert!(transport.emit(TransportEvent::Indication(Indication::EngineState(
            EngineState::Off
        ))));
        timeout(Duration::from_secs(1), async {
            while handle.metrics().indication_count() < 2 {
                settle().await;
            }
        })
        .await
        .unwrap();

        let calls = engine.calls();
        assert!(calls.contains(&EngineCall::Nmea("$GPGGA".to_string())));
        assert!(calls.contains(&EngineCall::Status(EngineStatus::EngineOff)));
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_events_kept_while_worker_waits() {
        let config = AdapterConfig {
            queue_capacity: 1,
            sync_request_timeout_ms: 200,
            ..Default::default()
        };
        let (handle, transport, engine) = spawn(config);
        handle.open(AdapterEventMask::empty()).await.unwrap();
        transport.stall(MessageId::InjectUtcTime);

        // Events pile up while the worker waits on the stalled request
        let (result, ()) = tokio::join!(handle.set_time(1_700_000_000_000, 0, 10), async {
            settle().await;
            for _ in 0..5 {
                assert!(transport.emit(TransportEvent::Indication(Indication::InjectTimeReq)));
            }
            assert!(transport.emit(TransportEvent::Error(ServiceError::ServiceUnavailable)));
        });
        assert!(result.is_err());

        assert_eq!(handle.status().await.unwrap().phase, Phase::Closed);
        let calls = engine.calls();
        assert_eq!(
            calls.iter().filter(|c| **c == EngineCall::RequestTime).count(),
            5
        );
        assert!(calls.contains(&EngineCall::EngineDown));
        assert_eq!(handle.metrics().dropped_events(), 0);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_dropped_handle_stops_worker() {
        let (handle, transport, _) = spawn(AdapterConfig::default());
        handle.open(AdapterEventMask::empty()).await.unwrap();
        handle.shutdown().await;

        // Callback no longer reaches anything
        assert!(!transport.emit(TransportEvent::Indication(Indication::InjectTimeReq)));
    }
}
