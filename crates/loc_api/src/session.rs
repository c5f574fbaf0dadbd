//! Session and event-mask state machine
//!
//! `Closed --open--> OpenIdle --start_fix--> OpenInSession --stop_fix--> OpenIdle`;
//! `close` returns to `Closed` from anywhere.

use std::sync::Arc;

use contracts::{
    AccuracyLevel, AdapterEventMask, ApplicationId, ClientError, ConstellReportConfig,
    ConstellationMask, FixCriteria, GnssPowerMode, LocationError, LocationResult,
    NativeEventMask, PowerModeConfig, Request, StartReq, Transport,
};
use tracing::{debug, error, info, instrument, warn};

use crate::adapter::LocApi;
use crate::convert;
use crate::mask::{convert_mask, native_mask_for};

/// Session id of every start and stop request
pub(crate) const SESSION_ID: u8 = 1;

const HIGH_ACCURACY_MAX_M: u32 = 100;
const MED_ACCURACY_MAX_M: u32 = 1000;
/// Scan limit of a low-accuracy session
const LOW_ACCURACY_REPORT_TIMEOUT_MS: u32 = 60_000;
/// Report interval floor of a low-accuracy session
const LOW_ACCURACY_MIN_INTERVAL_MS: u32 = 600_000;

/// Start request for the given criteria
pub(crate) fn start_request(criteria: &FixCriteria) -> StartReq {
    let mut min_interval_ms = criteria.min_interval_ms;
    let mut position_report_timeout_ms = None;

    let mut horizontal_accuracy = if criteria.preferred_accuracy_m <= HIGH_ACCURACY_MAX_M {
        AccuracyLevel::High
    } else if criteria.preferred_accuracy_m <= MED_ACCURACY_MAX_M {
        AccuracyLevel::Med
    } else {
        position_report_timeout_ms = Some(LOW_ACCURACY_REPORT_TIMEOUT_MS);
        min_interval_ms = min_interval_ms.max(LOW_ACCURACY_MIN_INTERVAL_MS);
        AccuracyLevel::Low
    };

    let application_id = (!criteria.credentials.is_empty()).then(|| ApplicationId {
        name: criteria.credentials.clone(),
        provider: criteria.provider.clone(),
    });

    let mut power_mode = None;
    if let Some(mode) = criteria.power_mode {
        if mode.is_background() {
            horizontal_accuracy = AccuracyLevel::Low;
        }
        let time_between_measurements_ms = if mode == GnssPowerMode::M4 {
            min_interval_ms
        } else {
            criteria.time_between_measurements_ms
        };
        power_mode = Some(PowerModeConfig {
            mode: convert::power_mode(mode),
            time_between_measurements_ms,
        });
    }

    StartReq {
        session_id: SESSION_ID,
        min_interval_ms,
        horizontal_accuracy,
        position_report_timeout_ms,
        recurrence: criteria.recurrence,
        share_position: criteria.share_position,
        application_id,
        altitude_assumed_in_sv_info: false,
        power_mode,
    }
}

impl<T: Transport + Sync + 'static> LocApi<T> {
    /// Open the connection and register `mask`
    ///
    /// Already open: only the mask is re-registered.
    #[instrument(name = "loc_api_open", skip(self), fields(mask = mask.bits()))]
    pub async fn open(&mut self, mask: AdapterEventMask) -> Result<(), ClientError> {
        let new_mask = mask.difference(self.config.excluded_event_mask);

        if self.state.handle.is_none() {
            match self.transport.open(Arc::clone(&self.callback)).await {
                Ok(handle) => {
                    self.state.handle = Some(handle);
                    info!(handle = handle.0, "Connection opened");
                }
                Err(e) => {
                    self.state.reset();
                    self.replays.clear();
                    error!(error = %e, "Connection open failed");
                    return Err(e);
                }
            }
            if self.is_master() {
                self.negotiate().await;
            }
        }

        let native = convert_mask(new_mask, self.batched_breach_supported());
        let registered = self.state.registered_mask;
        if ((registered ^ native) & native).contains(NativeEventMask::WIFI_REQ) {
            self.wifi_status_inform().await;
        }

        if new_mask != self.state.requested_mask {
            let diff = native ^ registered;
            self.register_event_mask(new_mask).await;
            if self.is_master() && diff.intersects(NativeEventMask::MEASUREMENT_OR_POLYNOMIAL) {
                self.set_sv_measurement_constellation(native).await;
            }
        }
        Ok(())
    }

    /// Close the connection; state is reset even if the transport refuses
    #[instrument(name = "loc_api_close", skip(self))]
    pub async fn close(&mut self) -> Result<(), ClientError> {
        let result = match self.state.handle {
            Some(handle) => self.transport.close(handle).await,
            None => Ok(()),
        };
        if let Err(e) = &result {
            warn!(error = %e, "Connection close failed");
        }
        self.state.reset();
        self.replays.clear();
        result
    }

    /// Register the native mask for `mask` in the current session state
    ///
    /// The stored registered mask only changes when the transport accepts.
    pub async fn register_event_mask(&mut self, mask: AdapterEventMask) {
        let mask = mask.difference(self.config.excluded_event_mask);
        let native = native_mask_for(
            mask,
            self.state.in_session,
            self.batched_breach_supported(),
        );
        if native != self.state.registered_mask {
            if let Some(handle) = self.state.handle {
                if self
                    .transport
                    .register_event_mask(handle, native, self.is_master())
                    .await
                {
                    self.state.registered_mask = native;
                    observability::record_registered_mask(native.bits());
                } else {
                    warn!(native = native.bits(), "Event mask registration rejected");
                }
            }
        }
        debug!(
            requested = mask.bits(),
            registered = self.state.registered_mask.bits(),
            "Event mask updated"
        );
        self.state.requested_mask = mask;
    }

    /// Re-register the requested mask, e.g. after the engine went idle
    pub(crate) async fn restore_event_mask(&mut self) {
        let requested = self.state.requested_mask;
        self.register_event_mask(requested).await;
    }

    /// Subscribe measurement and polynomial reports per constellation
    ///
    /// Busy counts as success.
    pub(crate) async fn set_sv_measurement_constellation(&mut self, native: NativeEventMask) -> bool {
        let meas_report = if native.contains(NativeEventMask::GNSS_MEASUREMENT_REPORT)
            || self.state.master_registration_unsupported
        {
            ConstellationMask::MEASUREMENT_SET
        } else {
            ConstellationMask::empty()
        };
        let sv_poly_report = if native.contains(NativeEventMask::GNSS_SV_POLYNOMIAL_REPORT) {
            ConstellationMask::MEASUREMENT_SET
        } else {
            ConstellationMask::empty()
        };
        let request = Request::SetGnssConstellReportConfig(ConstellReportConfig {
            meas_report: Some(meas_report),
            sv_poly_report: Some(sv_poly_report),
            ..Default::default()
        });
        let result = self.sync_send(request).await;
        let accepted = matches!(&result, Ok(resp) if resp.status.is_success_or_busy());
        if !accepted {
            warn!(?result, "Measurement constellation subscription failed");
        }
        accepted
    }

    async fn wifi_status_inform(&mut self) {
        let result = self
            .sync_send(Request::NotifyWifiStatus { available: true })
            .await;
        if !matches!(&result, Ok(resp) if resp.status.is_success()) {
            warn!(?result, "Wi-Fi status notice failed");
        }
    }

    /// Start a fix session
    ///
    /// A timed-out operation mode still starts the session; any other failure skips it.
    #[instrument(name = "loc_api_start_fix", skip(self, criteria), fields(mode = ?criteria.mode))]
    pub async fn start_fix(&mut self, criteria: &FixCriteria) -> LocationResult {
        self.state.in_session = true;
        self.state.measurements_started = true;
        self.restore_event_mask().await;

        let mode = convert::operation_mode(criteria.mode);
        match self.sync_send(Request::SetOperationMode(mode)).await {
            Ok(resp) if resp.status.is_success() => {}
            Err(ClientError::Timeout) => {
                warn!(?mode, "Set operation mode timed out, starting anyway");
            }
            Ok(resp) => {
                error!(?mode, status = ?resp.status, "Set operation mode rejected");
                return Err(LocationError::GeneralFailure);
            }
            Err(e) => {
                error!(?mode, error = %e, "Set operation mode failed");
                return Err(LocationError::GeneralFailure);
            }
        }

        self.state.power_mode = criteria.power_mode;
        let start = start_request(criteria);
        debug!(
            min_interval_ms = start.min_interval_ms,
            accuracy = ?start.horizontal_accuracy,
            "Starting fix session"
        );
        self.send(Request::Start(start))
            .await
            .map_err(|_| LocationError::GeneralFailure)
    }

    /// Stop the fix session; session state is cleared even if the send fails
    #[instrument(name = "loc_api_stop_fix", skip(self))]
    pub async fn stop_fix(&mut self) -> LocationResult {
        let result = self
            .send(Request::Stop {
                session_id: SESSION_ID,
            })
            .await;

        self.state.in_session = false;
        self.state.power_mode = None;
        // No engine-on seen: gated bits go now instead of on engine off
        if !self.state.engine_on {
            self.restore_event_mask().await;
        }
        self.state.raw_measurements = None;

        result.map_err(|_| LocationError::GeneralFailure)
    }

    /// Apply new criteria; restarts the session when one is running
    pub async fn set_position_mode(&mut self, criteria: &FixCriteria) -> LocationResult {
        if self.state.in_session {
            debug!("Fix in progress, restarting with new criteria");
            self.start_fix(criteria).await
        } else {
            Ok(())
        }
    }

    /// The remote service went away
    pub(crate) fn handle_engine_down(&mut self) {
        warn!("Location service unavailable, resetting adapter");
        self.state.reset();
        self.replays.clear();
        self.engine.handle_engine_down();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::test_support::adapter;
    use crate::mock::{EngineCall, MockTransport};
    use crate::state::Phase;
    use contracts::{
        AdapterConfig, IndStatus, MessageId, NativePowerMode, OperationMode, PositionMode,
        Recurrence, Response,
    };

    fn start_requests(transport: &MockTransport) -> Vec<StartReq> {
        transport
            .requests()
            .into_iter()
            .filter_map(|r| match r.request {
                Request::Start(start) => Some(start),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_accuracy_tiers() {
        let high = start_request(&FixCriteria {
            preferred_accuracy_m: 100,
            ..Default::default()
        });
        assert_eq!(high.horizontal_accuracy, AccuracyLevel::High);
        assert_eq!(high.position_report_timeout_ms, None);

        let med = start_request(&FixCriteria {
            preferred_accuracy_m: 1000,
            ..Default::default()
        });
        assert_eq!(med.horizontal_accuracy, AccuracyLevel::Med);
    }

    #[test]
    fn test_low_accuracy_caps_scan_and_floors_interval() {
        let criteria = FixCriteria {
            mode: PositionMode::MsAssisted,
            preferred_accuracy_m: 2000,
            recurrence: Recurrence::Periodic,
            min_interval_ms: 1000,
            ..Default::default()
        };
        let start = start_request(&criteria);
        assert_eq!(start.horizontal_accuracy, AccuracyLevel::Low);
        assert_eq!(start.position_report_timeout_ms, Some(60_000));
        assert_eq!(start.min_interval_ms, 600_000);
        assert_eq!(start.session_id, SESSION_ID);
        assert!(!start.altitude_assumed_in_sv_info);

        let longer = start_request(&FixCriteria {
            min_interval_ms: 900_000,
            ..criteria
        });
        assert_eq!(longer.min_interval_ms, 900_000);
    }

    #[test]
    fn test_background_power_mode() {
        let start = start_request(&FixCriteria {
            preferred_accuracy_m: 10,
            min_interval_ms: 5000,
            power_mode: Some(GnssPowerMode::M4),
            time_between_measurements_ms: 1000,
            ..Default::default()
        });
        assert_eq!(start.horizontal_accuracy, AccuracyLevel::Low);
        assert_eq!(
            start.power_mode,
            Some(PowerModeConfig {
                mode: NativePowerMode::BackgroundDefinedTime,
                time_between_measurements_ms: 5000,
            })
        );

        let m2 = start_request(&FixCriteria {
            preferred_accuracy_m: 10,
            power_mode: Some(GnssPowerMode::M2),
            time_between_measurements_ms: 1000,
            ..Default::default()
        });
        assert_eq!(m2.horizontal_accuracy, AccuracyLevel::High);
        assert_eq!(m2.power_mode.map(|p| p.time_between_measurements_ms), Some(1000));
    }

    #[test]
    fn test_credentials_become_application_id() {
        let start = start_request(&FixCriteria {
            credentials: "maps".into(),
            provider: "vendor".into(),
            ..Default::default()
        });
        let app = start.application_id.unwrap();
        assert_eq!(app.name, "maps");
        assert_eq!(app.provider, "vendor");
        assert!(start_request(&FixCriteria::default()).application_id.is_none());
    }

    #[tokio::test]
    async fn test_open_is_idempotent() {
        let (mut api, transport, _) = adapter(AdapterConfig::default());
        let mask = AdapterEventMask::POSITION_REPORT | AdapterEventMask::NI_NOTIFY_VERIFY_REQUEST;

        api.open(mask).await.unwrap();
        let after_first = transport.requests().len();
        api.open(mask).await.unwrap();

        assert_eq!(transport.open_count(), 1);
        assert_eq!(transport.requests().len(), after_first);
        assert_eq!(
            transport.requests_for(MessageId::RegisterMasterClient).len(),
            1
        );
        assert_eq!(api.status().phase, Phase::OpenIdle);
    }

    #[tokio::test]
    async fn test_open_failure_stays_closed() {
        let (mut api, transport, _) = adapter(AdapterConfig::default());
        transport.fail_open(ClientError::ServiceNotPresent);

        let result = api.open(AdapterEventMask::POSITION_REPORT).await;
        assert_eq!(result, Err(ClientError::ServiceNotPresent));
        assert_eq!(api.status().phase, Phase::Closed);
        assert!(api.status().registered_mask.is_empty());
        assert!(api.status().requested_mask.is_empty());
    }

    #[tokio::test]
    async fn test_open_outside_session_registers_ungated_bits() {
        let (mut api, transport, _) = adapter(AdapterConfig::default());
        let mask = AdapterEventMask::POSITION_REPORT | AdapterEventMask::NI_NOTIFY_VERIFY_REQUEST;
        api.open(mask).await.unwrap();

        let registered = transport.registered_masks();
        assert_eq!(
            registered.last().copied(),
            Some(NativeEventMask::NI_NOTIFY_VERIFY_REQ)
        );
        assert_eq!(
            api.status().registered_mask,
            NativeEventMask::NI_NOTIFY_VERIFY_REQ
        );
    }

    #[tokio::test]
    async fn test_open_applies_exclusions() {
        let config = AdapterConfig {
            excluded_event_mask: AdapterEventMask::NI_NOTIFY_VERIFY_REQUEST,
            ..Default::default()
        };
        let (mut api, _, _) = adapter(config);
        api.open(AdapterEventMask::NI_NOTIFY_VERIFY_REQUEST | AdapterEventMask::STATUS_REPORT)
            .await
            .unwrap();
        assert_eq!(api.status().requested_mask, AdapterEventMask::STATUS_REPORT);
    }

    #[tokio::test]
    async fn test_wifi_bit_sends_status_notice_first() {
        let (mut api, transport, _) = adapter(AdapterConfig::default());
        api.open(AdapterEventMask::REQUEST_WIFI).await.unwrap();

        let notices = transport.requests_for(MessageId::NotifyWifiStatus);
        assert_eq!(notices, vec![Request::NotifyWifiStatus { available: true }]);

        // Already registered: no second notice
        api.open(AdapterEventMask::REQUEST_WIFI | AdapterEventMask::STATUS_REPORT)
            .await
            .unwrap();
        assert_eq!(transport.requests_for(MessageId::NotifyWifiStatus).len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_registration_keeps_previous_mask() {
        let (mut api, transport, _) = adapter(AdapterConfig::default());
        api.open(AdapterEventMask::empty()).await.unwrap();
        let before = api.status().registered_mask;
        transport.reject_registrations(true);

        api.register_event_mask(AdapterEventMask::NI_NOTIFY_VERIFY_REQUEST)
            .await;
        assert_eq!(api.status().registered_mask, before);
        assert_eq!(
            api.status().requested_mask,
            AdapterEventMask::NI_NOTIFY_VERIFY_REQUEST
        );
    }

    #[tokio::test]
    async fn test_start_then_stop_gates_mask() {
        let (mut api, transport, _) = adapter(AdapterConfig::default());
        api.open(AdapterEventMask::POSITION_REPORT).await.unwrap();
        assert!(api.status().registered_mask.is_empty());

        api.start_fix(&FixCriteria::default()).await.unwrap();
        assert_eq!(api.status().phase, Phase::OpenInSession);
        assert_eq!(
            api.status().registered_mask,
            NativeEventMask::POSITION_REPORT
        );
        assert_eq!(
            transport.requests_for(MessageId::SetOperationMode),
            vec![Request::SetOperationMode(OperationMode::Standalone)]
        );
        assert_eq!(start_requests(&transport).len(), 1);

        // Engine never reported on: the mask is dropped right away
        api.stop_fix().await.unwrap();
        assert_eq!(api.status().phase, Phase::OpenIdle);
        assert!(api.status().registered_mask.is_empty());
        assert_eq!(
            transport.requests_for(MessageId::Stop),
            vec![Request::Stop { session_id: 1 }]
        );
    }

    #[tokio::test]
    async fn test_operation_mode_timeout_still_starts() {
        let (mut api, transport, _) = adapter(AdapterConfig {
            sync_request_timeout_ms: 20,
            ..Default::default()
        });
        api.open(AdapterEventMask::empty()).await.unwrap();
        transport.stall(MessageId::SetOperationMode);

        assert_eq!(api.start_fix(&FixCriteria::default()).await, Ok(()));
        assert_eq!(start_requests(&transport).len(), 1);
    }

    #[tokio::test]
    async fn test_operation_mode_failure_skips_start() {
        let (mut api, transport, _) = adapter(AdapterConfig::default());
        api.open(AdapterEventMask::empty()).await.unwrap();
        transport.respond_with(
            MessageId::SetOperationMode,
            Response::new(IndStatus::GeneralFailure),
        );

        let result = api
            .start_fix(&FixCriteria {
                mode: PositionMode::MsAssisted,
                ..Default::default()
            })
            .await;
        assert_eq!(result, Err(LocationError::GeneralFailure));
        assert!(start_requests(&transport).is_empty());
    }

    #[tokio::test]
    async fn test_ms_assisted_periodic_start_sequence() {
        let (mut api, transport, _) = adapter(AdapterConfig::default());
        api.open(AdapterEventMask::empty()).await.unwrap();

        api.start_fix(&FixCriteria {
            mode: PositionMode::MsAssisted,
            preferred_accuracy_m: 2000,
            recurrence: Recurrence::Periodic,
            min_interval_ms: 1000,
            ..Default::default()
        })
        .await
        .unwrap();

        assert_eq!(
            transport.requests_for(MessageId::SetOperationMode),
            vec![Request::SetOperationMode(OperationMode::Msa)]
        );
        let starts = start_requests(&transport);
        assert_eq!(starts.len(), 1);
        assert_eq!(starts[0].horizontal_accuracy, AccuracyLevel::Low);
        assert_eq!(starts[0].position_report_timeout_ms, Some(60_000));
        assert!(starts[0].min_interval_ms >= 600_000);
        assert_eq!(starts[0].recurrence, Recurrence::Periodic);
    }

    #[tokio::test]
    async fn test_stop_failure_still_clears_session() {
        let (mut api, transport, _) = adapter(AdapterConfig::default());
        api.open(AdapterEventMask::empty()).await.unwrap();
        api.start_fix(&FixCriteria::default()).await.unwrap();
        transport.fail_with(MessageId::Stop, ClientError::GeneralFailure);

        assert_eq!(api.stop_fix().await, Err(LocationError::GeneralFailure));
        assert_eq!(api.status().phase, Phase::OpenIdle);
        assert!(api.state.raw_measurements.is_none());
    }

    #[tokio::test]
    async fn test_set_position_mode_only_restarts_in_session() {
        let (mut api, transport, _) = adapter(AdapterConfig::default());
        api.open(AdapterEventMask::empty()).await.unwrap();

        api.set_position_mode(&FixCriteria::default()).await.unwrap();
        assert!(start_requests(&transport).is_empty());

        api.start_fix(&FixCriteria::default()).await.unwrap();
        api.set_position_mode(&FixCriteria {
            min_interval_ms: 5000,
            ..Default::default()
        })
        .await
        .unwrap();
        let starts = start_requests(&transport);
        assert_eq!(starts.len(), 2);
        assert_eq!(starts[1].min_interval_ms, 5000);
    }

    #[tokio::test]
    async fn test_close_resets_everything() {
        let (mut api, transport, _) = adapter(AdapterConfig::default());
        api.open(AdapterEventMask::NI_NOTIFY_VERIFY_REQUEST)
            .await
            .unwrap();
        api.start_fix(&FixCriteria::default()).await.unwrap();

        api.close().await.unwrap();
        assert_eq!(transport.close_count(), 1);
        let status = api.status();
        assert_eq!(status.phase, Phase::Closed);
        assert!(status.registered_mask.is_empty());
        assert!(status.requested_mask.is_empty());
    }

    #[tokio::test]
    async fn test_engine_down_resets_and_notifies() {
        let (mut api, _, engine) = adapter(AdapterConfig::default());
        api.open(AdapterEventMask::NI_NOTIFY_VERIFY_REQUEST)
            .await
            .unwrap();

        api.handle_engine_down();
        assert_eq!(api.status().phase, Phase::Closed);
        assert_eq!(engine.calls(), vec![EngineCall::FeatureConfig, EngineCall::EngineDown]);
    }
}
