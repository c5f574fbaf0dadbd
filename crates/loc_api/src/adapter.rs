//! LocApi - the protocol adapter owned by the worker task
//!
//! Every method takes `&mut self`; the worker is the only caller, so adapter state needs
//! no locking. Behavior is split across modules:
//! - `bridge`: synchronous requests and busy replays
//! - `session`: open/close, event masks, fix sessions
//! - `negotiation`: master capability probing
//! - `commands`: outbound command encoders
//! - `decoders`: indication decoders

use std::collections::VecDeque;
use std::sync::Arc;

use contracts::{
    AdapterConfig, AdapterEventMask, CapabilityStore, LocationEngine, NativeEventMask, Request,
    SupportedMessages, Transport, TransportCallback,
};
use observability::RunningStats;

use crate::metrics::AdapterMetrics;
use crate::state::{AdapterState, Phase};

/// Point-in-time view of the adapter state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterStatus {
    pub phase: Phase,
    pub requested_mask: AdapterEventMask,
    pub registered_mask: NativeEventMask,
    pub engine_on: bool,
    pub pending_replays: usize,
    pub use_new_delete_api: bool,
    pub master_registration_unsupported: bool,
}

pub struct LocApi<T> {
    pub(crate) transport: Arc<T>,
    pub(crate) engine: Arc<dyn LocationEngine>,
    pub(crate) capabilities: Arc<CapabilityStore>,
    pub(crate) config: AdapterConfig,
    pub(crate) metrics: Arc<AdapterMetrics>,
    pub(crate) state: AdapterState,
    /// Requests answered with "engine busy", resent once the engine goes idle
    pub(crate) replays: VecDeque<Request>,
    /// Round-trip latency of synchronous requests (ms)
    pub(crate) sync_latency: RunningStats,
    /// Handed to the transport on open
    pub(crate) callback: TransportCallback,
}

impl<T: Transport + Sync + 'static> LocApi<T> {
    pub fn new(
        transport: Arc<T>,
        engine: Arc<dyn LocationEngine>,
        capabilities: Arc<CapabilityStore>,
        config: AdapterConfig,
        metrics: Arc<AdapterMetrics>,
        callback: TransportCallback,
    ) -> Self {
        Self {
            transport,
            engine,
            capabilities,
            config,
            metrics,
            state: AdapterState::default(),
            replays: VecDeque::new(),
            sync_latency: RunningStats::default(),
            callback,
        }
    }

    /// Master rights: configured, or implied when the engine does not know the concept
    pub fn is_master(&self) -> bool {
        self.config.master_client || self.state.master_registration_unsupported
    }

    pub(crate) fn batched_breach_supported(&self) -> bool {
        self.capabilities
            .is_supported(SupportedMessages::BATCHED_GEOFENCE_BREACH)
    }

    pub fn status(&self) -> AdapterStatus {
        AdapterStatus {
            phase: self.state.phase(),
            requested_mask: self.state.requested_mask,
            registered_mask: self.state.registered_mask,
            engine_on: self.state.engine_on,
            pending_replays: self.replays.len(),
            use_new_delete_api: self.state.use_new_delete_api,
            master_registration_unsupported: self.state.master_registration_unsupported,
        }
    }

    pub fn sync_latency(&self) -> &RunningStats {
        &self.sync_latency
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::mock::{MockTransport, RecordingEngine};

    /// Adapter wired to a mock transport and a recording engine
    pub(crate) fn adapter(
        config: AdapterConfig,
    ) -> (LocApi<MockTransport>, Arc<MockTransport>, Arc<RecordingEngine>) {
        let transport = Arc::new(MockTransport::new());
        let engine = Arc::new(RecordingEngine::new());
        let api = LocApi::new(
            Arc::clone(&transport),
            engine.clone(),
            Arc::new(CapabilityStore::new()),
            config,
            Arc::new(AdapterMetrics::new()),
            Arc::new(|_| {}),
        );
        (api, transport, engine)
    }
}
