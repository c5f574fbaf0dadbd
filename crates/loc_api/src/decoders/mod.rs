//! Inbound indication decoders
//!
//! Each indication kind maps to exactly one decoder function through [`decoder_for`];
//! the match is exhaustive, so a new [`IndicationKind`] does not compile until it has a
//! decoder. Decoders only see the state they are handed in [`DecodeContext`] and never
//! fail: absent optional fields are left out of the normalized report.

pub(crate) mod ephemeris;
pub(crate) mod events;
pub(crate) mod gnss_measurement;
pub(crate) mod measurement;
pub(crate) mod ni;
pub(crate) mod position;
pub(crate) mod sv;
pub(crate) mod zpp;

use contracts::{
    AdapterConfig, Indication, IndicationKind, LocationEngine, ServiceError, Transport,
    TransportEvent, ZppResponse,
};
use tracing::{debug, warn};

use crate::adapter::LocApi;
use crate::metrics::AdapterMetrics;
use crate::state::AdapterState;

/// Everything a decoder may read or update
pub(crate) struct DecodeContext<'a> {
    pub engine: &'a dyn LocationEngine,
    pub state: &'a mut AdapterState,
    pub config: &'a AdapterConfig,
    pub metrics: &'a AdapterMetrics,
}

/// Work a decoder asks the worker to do once decoding is over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Followup {
    /// Engine turned off: re-register the mask and resend busy requests
    EngineOff,
}

pub(crate) type Decoder = fn(&mut DecodeContext<'_>, &Indication) -> Option<Followup>;

pub(crate) fn decoder_for(kind: IndicationKind) -> Decoder {
    match kind {
        IndicationKind::Position => position::decode_position,
        IndicationKind::UnpropagatedPosition => position::decode_unpropagated_position,
        IndicationKind::SvInfo => sv::decode_sv_info,
        IndicationKind::EngineState => events::decode_engine_state,
        IndicationKind::FixSessionState => events::decode_fix_session_state,
        IndicationKind::Nmea => events::decode_nmea,
        IndicationKind::InjectPredictedOrbitsReq => events::decode_xtra_request,
        IndicationKind::InjectTimeReq => events::decode_time_request,
        IndicationKind::InjectPositionReq => events::decode_position_request,
        IndicationKind::NiNotifyVerifyReq => ni::decode_ni_request,
        IndicationKind::LocationServerConnectionReq => events::decode_atl_request,
        IndicationKind::GnssMeasurement => decode_measurement,
        IndicationKind::SvPolynomial => events::decode_sv_polynomial,
        IndicationKind::Ephemeris => ephemeris::decode_ephemeris,
        IndicationKind::GetBlacklistSv => events::decode_blacklist,
        IndicationKind::GetConstellationControl => events::decode_constellation_config,
        IndicationKind::WifiReq => events::decode_wifi_request,
        IndicationKind::EventReport => events::decode_event_report,
        IndicationKind::SystemInfo => events::decode_system_info,
    }
}

/// One measurement fragment feeds both the raw set and the processed epoch
fn decode_measurement(ctx: &mut DecodeContext<'_>, ind: &Indication) -> Option<Followup> {
    let Indication::GnssMeasurement(fragment) = ind else {
        return None;
    };
    measurement::accumulate(ctx, fragment);
    gnss_measurement::accumulate(ctx, fragment);
    None
}

impl<T: Transport + Sync + 'static> LocApi<T> {
    /// Route a transport event; called only from the worker
    pub(crate) async fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Indication(ind) => self.handle_indication(&ind).await,
            TransportEvent::Response(resp) => self.handle_response(&resp),
            TransportEvent::Error(ServiceError::ServiceUnavailable) => self.handle_engine_down(),
            TransportEvent::Error(err) => warn!(?err, "Transport error ignored"),
        }
    }

    pub(crate) async fn handle_indication(&mut self, ind: &Indication) {
        let kind = ind.kind();
        self.metrics.inc_indication_count();
        observability::record_indication(kind);
        debug!(kind = kind.as_str(), "Decoding indication");

        let followup = {
            let mut ctx = DecodeContext {
                engine: self.engine.as_ref(),
                state: &mut self.state,
                config: &self.config,
                metrics: &self.metrics,
            };
            decoder_for(kind)(&mut ctx, ind)
        };

        if let Some(Followup::EngineOff) = followup {
            self.restore_event_mask().await;
            self.drain_replays().await;
        }
    }

    pub(crate) fn handle_response(&mut self, resp: &ZppResponse) {
        match resp {
            ZppResponse::WwanPosition(ind) => zpp::decode_wwan_position(self.engine.as_ref(), ind),
            ZppResponse::BestAvailablePosition(ind) => {
                zpp::decode_best_available_position(self.engine.as_ref(), ind)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::test_support::adapter;
    use crate::mock::EngineCall;
    use contracts::{EngineState, EngineStatus, NmeaInd};

    #[test]
    fn test_every_kind_has_a_decoder() {
        // Decoders are total: a mismatched variant is ignored, never a panic
        let (mut api, _, engine) = adapter(AdapterConfig::default());
        for kind in IndicationKind::ALL {
            let mut ctx = DecodeContext {
                engine: api.engine.as_ref(),
                state: &mut api.state,
                config: &api.config,
                metrics: &api.metrics,
            };
            assert!(decoder_for(kind)(&mut ctx, &Indication::InjectTimeReq).is_none());
        }
        // Only the time request decoder matched its own variant
        assert_eq!(engine.calls(), vec![EngineCall::RequestTime]);
    }

    #[tokio::test]
    async fn test_indications_are_counted() {
        let (mut api, _, engine) = adapter(AdapterConfig::default());
        api.handle_indication(&Indication::Nmea(NmeaInd {
            nmea: "$GPGSA".to_string(),
            expanded_nmea: None,
        }))
        .await;
        assert_eq!(api.metrics.indication_count(), 1);
        assert_eq!(engine.calls(), vec![EngineCall::Nmea("$GPGSA".to_string())]);
    }

    #[tokio::test]
    async fn test_service_unavailable_is_engine_down() {
        let (mut api, _, engine) = adapter(AdapterConfig::default());
        api.open(contracts::AdapterEventMask::empty()).await.unwrap();
        api.handle_transport_event(TransportEvent::Error(ServiceError::ServiceUnavailable))
            .await;
        assert_eq!(api.status().phase, crate::state::Phase::Closed);
        assert!(engine.calls().contains(&EngineCall::EngineDown));

        api.handle_transport_event(TransportEvent::Error(ServiceError::Other))
            .await;
        assert_eq!(
            engine
                .calls()
                .iter()
                .filter(|c| **c == EngineCall::EngineDown)
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_engine_off_drains_replays() {
        let (mut api, transport, engine) = adapter(AdapterConfig::default());
        api.open(contracts::AdapterEventMask::empty()).await.unwrap();
        api.replays.push_back(contracts::Request::GetBlacklistSv);
        transport.clear_requests();

        api.handle_indication(&Indication::EngineState(EngineState::Off))
            .await;
        assert!(api.replays.is_empty());
        assert_eq!(
            transport.requests_for(contracts::MessageId::GetBlacklistSv).len(),
            1
        );
        assert_eq!(
            engine.calls(),
            vec![
                EngineCall::FeatureConfig,
                EngineCall::Status(EngineStatus::SessionEnd),
                EngineCall::Status(EngineStatus::EngineOff),
            ]
        );
    }
}
