//! # Integration Tests
//!
//! Cross-crate and end-to-end tests.
//!
//! Covers:
//! - contract invariants shared by the crates
//! - config file to running adapter
//! - mock e2e tests: commands through the handle, indications through the transport

#[cfg(test)]
mod contract_tests {
    use std::collections::HashSet;

    use contracts::{AdapterEventMask, IndicationKind, NativeEventMask};
    use loc_api::mask::{adjust_for_session, convert_mask};

    #[test]
    fn test_indication_kinds_have_unique_names() {
        let names: HashSet<&str> = IndicationKind::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(names.len(), IndicationKind::ALL.len());
    }

    #[test]
    fn test_session_gating_only_removes_bits() {
        let native = convert_mask(AdapterEventMask::all(), true);
        let idle = adjust_for_session(native, false);
        assert_eq!(idle & native, idle);
        assert!(!idle.contains(NativeEventMask::POSITION_REPORT));
        assert!(idle.contains(NativeEventMask::NI_NOTIFY_VERIFY_REQ));
        assert_eq!(adjust_for_session(native, true), native);
    }
}

#[cfg(test)]
mod config_tests {
    use std::sync::Arc;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::AdapterEventMask;
    use loc_api::{LocApiError, LocApiHandle, MockTransport, RecordingEngine};

    const CONFIG: &str = r#"
ap_timestamp_uncertainty_ms = 2.5
sync_request_timeout_ms = 300
queue_capacity = 8
master_client = false
excluded_event_mask = "NI_NOTIFY_VERIFY_REQUEST"
"#;

    #[tokio::test]
    async fn test_loaded_config_drives_adapter() {
        let config = ConfigLoader::load_from_str(CONFIG, ConfigFormat::Toml).unwrap();
        let transport = Arc::new(MockTransport::new());
        let handle =
            LocApiHandle::spawn(Arc::clone(&transport), Arc::new(RecordingEngine::new()), config)
                .unwrap();

        handle
            .open(AdapterEventMask::NI_NOTIFY_VERIFY_REQUEST | AdapterEventMask::STATUS_REPORT)
            .await
            .unwrap();
        let status = handle.status().await.unwrap();
        assert_eq!(status.requested_mask, AdapterEventMask::STATUS_REPORT);
        assert!(!handle.is_master().await.unwrap());

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_invalid_config_never_spawns() {
        let mut config = ConfigLoader::load_from_str(CONFIG, ConfigFormat::Toml).unwrap();
        config.sync_request_timeout_ms = 0;
        let result = LocApiHandle::spawn(
            Arc::new(MockTransport::new()),
            Arc::new(RecordingEngine::new()),
            config,
        );
        assert!(matches!(result, Err(LocApiError::Config(_))));
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::future::Future;
    use std::sync::Arc;
    use std::time::Duration;

    use bytes::Bytes;
    use contracts::{
        AdapterConfig, AdapterEventMask, ClientError, EngineState, EngineStatus, FixCriteria,
        Indication, MessageId, NativeEventMask, NiNotifyVerifyReqInd, NiNotifyVerifyType,
        NiResponse, NiSuplPayload, NiUserResponse, Request, ServiceError, TransportEvent,
        WwanPositionInd, ZppResponse,
    };
    use loc_api::{EngineCall, LocApiHandle, MockTransport, Phase, RecordingEngine};
    use tokio::time::timeout;

    struct Harness {
        handle: LocApiHandle<MockTransport>,
        transport: Arc<MockTransport>,
        engine: Arc<RecordingEngine>,
    }

    fn harness() -> Harness {
        let config = AdapterConfig {
            sync_request_timeout_ms: 200,
            ..Default::default()
        };
        let transport = Arc::new(MockTransport::new());
        let engine = Arc::new(RecordingEngine::new());
        let handle = LocApiHandle::spawn(Arc::clone(&transport), engine.clone(), config).unwrap();
        Harness {
            handle,
            transport,
            engine,
        }
    }

    async fn within<F: Future>(fut: F) -> F::Output {
        timeout(Duration::from_secs(2), fut)
            .await
            .expect("timed out")
    }

    fn emit(transport: &MockTransport, ind: Indication) {
        assert!(transport.emit(TransportEvent::Indication(ind)));
    }

    /// Full fix session: mask gating follows session and engine state
    #[tokio::test]
    async fn test_e2e_fix_session() {
        let Harness {
            handle,
            transport,
            engine,
        } = harness();
        let mask = AdapterEventMask::POSITION_REPORT | AdapterEventMask::NI_NOTIFY_VERIFY_REQUEST;

        handle.open(mask).await.unwrap();
        assert_eq!(
            handle.status().await.unwrap().registered_mask,
            NativeEventMask::NI_NOTIFY_VERIFY_REQ
        );

        handle.start_fix(FixCriteria::default()).await.unwrap();
        emit(&transport, Indication::EngineState(EngineState::On));
        let status = handle.status().await.unwrap();
        assert_eq!(status.phase, Phase::OpenInSession);
        assert!(status.engine_on);
        assert!(status
            .registered_mask
            .contains(NativeEventMask::POSITION_REPORT));

        // Engine still on: gated bits stay until it reports off
        handle.stop_fix().await.unwrap();
        assert!(handle
            .status()
            .await
            .unwrap()
            .registered_mask
            .contains(NativeEventMask::POSITION_REPORT));

        emit(&transport, Indication::EngineState(EngineState::Off));
        let status = handle.status().await.unwrap();
        assert_eq!(status.phase, Phase::OpenIdle);
        assert_eq!(status.registered_mask, NativeEventMask::NI_NOTIFY_VERIFY_REQ);

        let statuses: Vec<EngineStatus> = engine
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                EngineCall::Status(s) => Some(s),
                _ => None,
            })
            .collect();
        assert_eq!(
            statuses,
            vec![
                EngineStatus::EngineOn,
                EngineStatus::SessionBegin,
                EngineStatus::SessionEnd,
                EngineStatus::EngineOff,
            ]
        );

        within(handle.shutdown()).await;
        assert_eq!(transport.close_count(), 1);
    }

    /// Busy request is replayed once the engine turns off
    #[tokio::test]
    async fn test_e2e_busy_replay() {
        let Harness {
            handle, transport, ..
        } = harness();
        handle.open(AdapterEventMask::empty()).await.unwrap();
        transport.fail_once(MessageId::SetNmeaTypes, ClientError::EngineBusy);

        assert!(handle.set_nmea_types(0x1F).await.is_err());
        let status = handle.status().await.unwrap();
        assert_eq!(status.pending_replays, 1);
        assert!(status.registered_mask.contains(NativeEventMask::ENGINE_STATE));

        emit(&transport, Indication::EngineState(EngineState::Off));
        assert_eq!(handle.status().await.unwrap().pending_replays, 0);

        let sent: Vec<bool> = transport
            .requests()
            .into_iter()
            .filter(|r| r.request.id() == MessageId::SetNmeaTypes)
            .map(|r| r.sync)
            .collect();
        assert_eq!(sent, vec![true, false]);
        assert_eq!(handle.metrics().busy_replays_sent(), 1);

        within(handle.shutdown()).await;
    }

    /// NI request reaches the engine and the response quotes it back
    #[tokio::test]
    async fn test_e2e_ni_round_trip() {
        let Harness {
            handle,
            transport,
            engine,
        } = harness();
        handle
            .open(AdapterEventMask::NI_NOTIFY_VERIFY_REQUEST)
            .await
            .unwrap();

        let request = NiNotifyVerifyReqInd {
            notification_type: NiNotifyVerifyType::NotifyVerifyAllowNoResp,
            vx: None,
            umts_cp: None,
            supl: Some(NiSuplPayload::default()),
            vx_service_interaction: None,
            supl_ver2_ext: None,
            supl_emergency: None,
        };
        emit(
            &transport,
            Indication::NiNotifyVerifyReq(Box::new(request.clone())),
        );
        handle.status().await.unwrap();

        let token = engine
            .calls()
            .into_iter()
            .find_map(|c| match c {
                EngineCall::NiNotify(_, token) => Some(token),
                _ => None,
            })
            .expect("NI notification forwarded");

        handle
            .inform_ni_response(NiResponse::Accept, token)
            .await
            .unwrap();
        assert_eq!(
            transport.requests_for(MessageId::NiUserResponse),
            vec![Request::NiUserResponse {
                response: NiUserResponse::Accept,
                request: Box::new(request),
            }]
        );

        within(handle.shutdown()).await;
    }

    /// Service loss closes the adapter; a later open reconnects
    #[tokio::test]
    async fn test_e2e_engine_down_and_reopen() {
        let Harness {
            handle,
            transport,
            engine,
        } = harness();
        handle.open(AdapterEventMask::STATUS_REPORT).await.unwrap();

        assert!(transport.emit(TransportEvent::Error(ServiceError::ServiceUnavailable)));
        assert_eq!(handle.status().await.unwrap().phase, Phase::Closed);
        assert!(engine.calls().contains(&EngineCall::EngineDown));

        handle.open(AdapterEventMask::STATUS_REPORT).await.unwrap();
        assert_eq!(handle.status().await.unwrap().phase, Phase::OpenIdle);
        assert_eq!(transport.open_count(), 2);

        within(handle.shutdown()).await;
    }

    /// Service loss during a stalled request still closes the adapter
    #[tokio::test]
    async fn test_e2e_service_loss_while_request_stalled() {
        let config = AdapterConfig {
            queue_capacity: 1,
            sync_request_timeout_ms: 200,
            ..Default::default()
        };
        let transport = Arc::new(MockTransport::new());
        let engine = Arc::new(RecordingEngine::new());
        let handle = LocApiHandle::spawn(Arc::clone(&transport), engine.clone(), config).unwrap();
        handle.open(AdapterEventMask::STATUS_REPORT).await.unwrap();
        transport.stall(MessageId::InjectUtcTime);

        let (result, ()) = tokio::join!(handle.set_time(1_700_000_000_000, 0, 10), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            emit(&transport, Indication::EngineState(EngineState::On));
            assert!(transport.emit(TransportEvent::Error(ServiceError::ServiceUnavailable)));
        });
        assert!(result.is_err());

        assert_eq!(handle.status().await.unwrap().phase, Phase::Closed);
        assert!(engine.calls().contains(&EngineCall::EngineDown));
        assert_eq!(handle.metrics().dropped_events(), 0);

        within(handle.shutdown()).await;
    }

    /// XTRA data split into acknowledged parts
    #[tokio::test]
    async fn test_e2e_xtra_injection() {
        let Harness {
            handle, transport, ..
        } = harness();
        handle.open(AdapterEventMask::empty()).await.unwrap();

        let injected = handle
            .set_xtra_data(Bytes::from(vec![0xA5u8; 2500]))
            .await
            .unwrap();
        assert_eq!(injected, 2500);
        assert_eq!(
            transport
                .requests_for(MessageId::InjectPredictedOrbitsData)
                .len(),
            3
        );

        within(handle.shutdown()).await;
    }

    /// WWAN position query answered through a response indication
    #[tokio::test]
    async fn test_e2e_zpp_query() {
        let Harness {
            handle,
            transport,
            engine,
        } = harness();
        handle.open(AdapterEventMask::empty()).await.unwrap();
        handle.get_wwan_zpp_fix().await.unwrap();
        assert_eq!(
            transport.requests_for(MessageId::GetAvailWwanPosition).len(),
            1
        );

        assert!(
            transport.emit(TransportEvent::Response(ZppResponse::WwanPosition(
                WwanPositionInd {
                    latitude: Some(48.1),
                    longitude: Some(11.6),
                    hor_unc_circular: Some(500.0),
                    timestamp_utc_ms: Some(1_700_000_000_000),
                    ..Default::default()
                }
            )))
        );

        handle.status().await.unwrap();

        let fix = engine
            .calls()
            .into_iter()
            .find_map(|c| match c {
                EngineCall::WwanZppFix(location) => Some(location),
                _ => None,
            })
            .expect("ZPP fix reported");
        assert_eq!(fix.accuracy, Some(500.0));
        assert_eq!(fix.timestamp_ms, 1_700_000_000_000);

        within(handle.shutdown()).await;
    }
}
