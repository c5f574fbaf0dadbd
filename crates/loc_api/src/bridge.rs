//! Synchronous request bridge with busy replay
//!
//! A synchronous request is bounded by the configured timeout. An "engine busy" verdict
//! is returned unchanged; a copy of the request is queued and resent fire-and-forget
//! once the engine goes idle.

use std::time::Instant;

use contracts::{
    ClientError, IndStatus, LocationError, LocationResult, NativeEventMask, Request, Response,
    Transport,
};
use tracing::{debug, instrument, warn};

use crate::adapter::LocApi;

/// Label of a synchronous outcome, shared by logs and metrics
fn outcome_label(result: &Result<Response, ClientError>) -> &'static str {
    match result {
        Ok(resp) if resp.status.is_success() => "success",
        Ok(resp) if resp.status == IndStatus::EngineBusy => "busy",
        Ok(_) => "failure",
        Err(ClientError::Timeout) => "timeout",
        Err(ClientError::EngineBusy) => "busy",
        Err(_) => "transport_error",
    }
}

fn is_busy(result: &Result<Response, ClientError>) -> bool {
    match result {
        Ok(resp) => resp.status == IndStatus::EngineBusy,
        Err(e) => *e == ClientError::EngineBusy,
    }
}

/// Caller-visible result of a synchronous request
pub(crate) fn location_result(result: &Result<Response, ClientError>) -> LocationResult {
    match result {
        Ok(resp) => match resp.status {
            IndStatus::Success => Ok(()),
            IndStatus::InvalidParameter => Err(LocationError::InvalidParameter),
            IndStatus::Unsupported | IndStatus::ConfigNotSupported => {
                Err(LocationError::NotSupported)
            }
            _ => Err(LocationError::GeneralFailure),
        },
        Err(ClientError::InvalidParameter) => Err(LocationError::InvalidParameter),
        Err(ClientError::Unsupported) => Err(LocationError::NotSupported),
        Err(_) => Err(LocationError::GeneralFailure),
    }
}

/// Success only; every other verdict collapses to a general failure
pub(crate) fn success_or_general_failure(
    result: &Result<Response, ClientError>,
) -> LocationResult {
    match result {
        Ok(resp) if resp.status.is_success() => Ok(()),
        _ => Err(LocationError::GeneralFailure),
    }
}

impl<T: Transport + Sync + 'static> LocApi<T> {
    /// Send a request and wait for its response indication
    #[instrument(name = "loc_api_sync_send", skip(self, request), fields(id = ?request.id()))]
    pub(crate) async fn sync_send(&mut self, request: Request) -> Result<Response, ClientError> {
        let id = request.id();
        let Some(handle) = self.state.handle else {
            warn!(?id, "Synchronous request without an open connection");
            return Err(ClientError::InvalidHandle);
        };

        let started = Instant::now();
        let result = match tokio::time::timeout(
            self.config.sync_request_timeout(),
            self.transport.send_sync(handle, request.clone()),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ClientError::Timeout),
        };
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.sync_latency.push(latency_ms);

        let outcome = outcome_label(&result);
        observability::record_sync_request(id, outcome, latency_ms);

        if is_busy(&result) {
            self.queue_replay(request).await;
        }
        if outcome != "success" {
            self.metrics.inc_sync_failures();
            match &result {
                Ok(resp) => debug!(?id, status = ?resp.status, "Synchronous request not accepted"),
                Err(e) => warn!(?id, error = %e, "Synchronous request failed"),
            }
        }
        result
    }

    /// Send a request without waiting for its response indication
    pub(crate) async fn send(&self, request: Request) -> Result<(), ClientError> {
        let id = request.id();
        let handle = self.state.handle.ok_or(ClientError::InvalidHandle)?;
        self.transport
            .send(handle, request)
            .await
            .inspect_err(|e| warn!(?id, error = %e, "Request send failed"))
    }

    /// Queue a busy request; the first one subscribes to engine state changes
    async fn queue_replay(&mut self, request: Request) {
        let registered = self.state.registered_mask;
        if self.replays.is_empty() && !registered.contains(NativeEventMask::ENGINE_STATE) {
            if let Some(handle) = self.state.handle {
                let mask = registered | NativeEventMask::ENGINE_STATE;
                if self
                    .transport
                    .register_event_mask(handle, mask, self.is_master())
                    .await
                {
                    self.state.registered_mask = mask;
                    observability::record_registered_mask(mask.bits());
                } else {
                    warn!(mask = mask.bits(), "Engine state subscription rejected");
                }
            }
        }

        let id = request.id();
        self.replays.push_back(request);
        self.metrics.inc_busy_replays_queued();
        observability::record_busy_replay_queued(id);
        debug!(?id, pending = self.replays.len(), "Engine busy, request queued for replay");
    }

    /// Resend every queued request once, in order
    pub(crate) async fn drain_replays(&mut self) {
        if self.replays.is_empty() {
            return;
        }
        let pending = std::mem::take(&mut self.replays);
        let count = pending.len();
        let mut failed = 0;
        for request in pending {
            // A failed replay is not queued again
            if self.send(request).await.is_err() {
                failed += 1;
            }
        }
        self.metrics.add_busy_replays_sent((count - failed) as u64);
        self.metrics.add_busy_replays_failed(failed as u64);
        observability::record_busy_replays_drained(count - failed, failed);
        debug!(count, failed, "Busy replays drained");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::test_support::adapter;
    use contracts::{AdapterConfig, ClientHandle, MessageId};

    fn open_config() -> AdapterConfig {
        AdapterConfig {
            sync_request_timeout_ms: 50,
            ..Default::default()
        }
    }

    #[test]
    fn test_location_result_mapping() {
        assert_eq!(location_result(&Ok(Response::default())), Ok(()));
        assert_eq!(
            location_result(&Ok(Response::new(IndStatus::InvalidParameter))),
            Err(LocationError::InvalidParameter)
        );
        assert_eq!(
            location_result(&Err(ClientError::Unsupported)),
            Err(LocationError::NotSupported)
        );
        assert_eq!(
            location_result(&Err(ClientError::Timeout)),
            Err(LocationError::GeneralFailure)
        );
        assert_eq!(
            success_or_general_failure(&Ok(Response::new(IndStatus::InvalidParameter))),
            Err(LocationError::GeneralFailure)
        );
    }

    #[tokio::test]
    async fn test_sync_send_without_handle() {
        let (mut api, transport, _) = adapter(open_config());
        let result = api.sync_send(Request::GetSupportedFeature).await;
        assert_eq!(result, Err(ClientError::InvalidHandle));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_busy_subscribes_once_and_queues_replays() {
        let (mut api, transport, _) = adapter(open_config());
        api.state.handle = Some(ClientHandle(1));
        api.state.registered_mask = NativeEventMask::NI_NOTIFY_VERIFY_REQ;
        transport.respond_with(
            MessageId::SetNmeaTypes,
            Response::new(IndStatus::EngineBusy),
        );

        let req = Request::SetNmeaTypes { sentence_types: 3 };
        let result = api.sync_send(req.clone()).await;
        assert_eq!(result.map(|r| r.status), Ok(IndStatus::EngineBusy));

        let registered = transport.registered_masks();
        assert_eq!(registered.len(), 1);
        assert_eq!(
            registered[0],
            NativeEventMask::NI_NOTIFY_VERIFY_REQ | NativeEventMask::ENGINE_STATE
        );
        assert_eq!(api.replays.len(), 1);

        // A second busy response queues without another subscription
        let _ = api.sync_send(req.clone()).await;
        assert_eq!(transport.registered_masks().len(), 1);
        assert_eq!(api.replays.len(), 2);
        assert_eq!(api.metrics.busy_replays_queued(), 2);

        transport.clear_requests();
        api.drain_replays().await;
        let sent = transport.requests();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|r| !r.sync && r.request == req));
        assert!(api.replays.is_empty());
        assert_eq!(api.metrics.busy_replays_sent(), 2);
        assert_eq!(api.metrics.busy_replays_failed(), 0);
    }

    #[tokio::test]
    async fn test_failed_replays_are_counted() {
        let (mut api, transport, _) = adapter(open_config());
        api.state.handle = Some(ClientHandle(1));
        api.state.registered_mask = NativeEventMask::ENGINE_STATE;
        transport.respond_with(
            MessageId::SetNmeaTypes,
            Response::new(IndStatus::EngineBusy),
        );

        let req = Request::SetNmeaTypes { sentence_types: 3 };
        let _ = api.sync_send(req.clone()).await;
        let _ = api.sync_send(req.clone()).await;
        assert_eq!(api.replays.len(), 2);

        transport.clear_requests();
        transport.fail_once(MessageId::SetNmeaTypes, ClientError::GeneralFailure);
        api.drain_replays().await;

        // Both are attempted; the failed one is not queued again
        assert_eq!(transport.requests().len(), 2);
        assert!(api.replays.is_empty());
        assert_eq!(api.metrics.busy_replays_sent(), 1);
        assert_eq!(api.metrics.busy_replays_failed(), 1);
    }

    #[tokio::test]
    async fn test_busy_client_error_also_queues() {
        let (mut api, transport, _) = adapter(open_config());
        api.state.handle = Some(ClientHandle(1));
        api.state.registered_mask = NativeEventMask::ENGINE_STATE;
        transport.fail_once(MessageId::InjectUtcTime, ClientError::EngineBusy);

        let result = api
            .sync_send(Request::InjectUtcTime(contracts::InjectUtcTimeReq {
                time_utc_ms: 1,
                time_unc_ms: 1,
            }))
            .await;
        assert_eq!(result, Err(ClientError::EngineBusy));
        // Already subscribed: no registration
        assert!(transport.registered_masks().is_empty());
        assert_eq!(api.replays.len(), 1);
    }

    #[tokio::test]
    async fn test_sync_send_times_out() {
        let (mut api, transport, _) = adapter(open_config());
        api.state.handle = Some(ClientHandle(1));
        transport.stall(MessageId::GetSupportedFeature);

        let result = api.sync_send(Request::GetSupportedFeature).await;
        assert_eq!(result, Err(ClientError::Timeout));
        assert_eq!(api.metrics.sync_failures(), 1);
        assert_eq!(api.sync_latency().count(), 1);
        assert!(api.replays.is_empty());
    }
}
