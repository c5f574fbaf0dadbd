//! Capability negotiation, run once per connection open

use contracts::{
    AonCapability, ClientError, EngineCapabilities, MessageId, NativeEventMask, Request,
    ResponsePayload, SupportedMessages, Transport, MASTER_CLIENT_KEY,
};
use tracing::{debug, info, warn};

use crate::adapter::LocApi;

/// Probed in this order; bit `i` of the answer maps to `SupportedMessages` bit `i`
const PROBED_MESSAGES: [MessageId; 3] = [
    MessageId::GetBatchSize,
    MessageId::GeofenceBatchedBreachInd,
    MessageId::StartDbt,
];

/// Session id presented with the always-on configuration query
const AON_TRANSACTION_ID: u32 = 1;

const AON_MAP: &[(AonCapability, SupportedMessages)] = &[
    (
        AonCapability::AUTO_BATCHING,
        SupportedMessages::ADAPTIVE_LOCATION_BATCHING,
    ),
    (
        AonCapability::DISTANCE_BASED_BATCHING,
        SupportedMessages::DISTANCE_BASED_LOCATION_BATCHING,
    ),
    (
        AonCapability::UPDATE_TBF,
        SupportedMessages::UPDATE_TBF_ON_THE_FLY,
    ),
    (
        AonCapability::OUTDOOR_TRIP_BATCHING,
        SupportedMessages::OUTDOOR_TRIP_BATCHING,
    ),
];

fn aon_messages(capability: AonCapability) -> SupportedMessages {
    AON_MAP
        .iter()
        .filter(|(aon, _)| capability.contains(*aon))
        .fold(SupportedMessages::empty(), |acc, (_, msg)| acc | *msg)
}

impl<T: Transport + Sync + 'static> LocApi<T> {
    /// Claim master rights, probe what the engine supports and publish it
    ///
    /// Failures are logged and leave the corresponding capability unset. Only master
    /// instances negotiate; everyone else reads the published store.
    pub(crate) async fn negotiate(&mut self) {
        self.register_master_client().await;
        let gnss_measurement_supported = self
            .set_sv_measurement_constellation(NativeEventMask::GNSS_MEASUREMENT_REPORT)
            .await;
        if gnss_measurement_supported {
            self.state.registered_mask |= NativeEventMask::GNSS_MEASUREMENT_REPORT;
        }

        let mut supported = self.probe_messages().await;
        if supported.contains(SupportedMessages::LOCATION_BATCHING) {
            supported |= self.query_aon_config().await;
        }
        let features = self.query_supported_features().await;

        let capabilities = EngineCapabilities {
            supported_messages: supported,
            features,
            gnss_measurement_supported,
        };
        info!(
            supported = supported.bits(),
            gnss_measurement_supported, "Engine capabilities negotiated"
        );
        if !self.capabilities.publish(capabilities) {
            debug!("Capabilities already published by another instance");
        }

        self.engine.inject_feature_config();
    }

    /// Claim master rights; an engine that does not know the concept grants them implicitly
    async fn register_master_client(&mut self) {
        let result = self
            .sync_send(Request::RegisterMasterClient {
                key: MASTER_CLIENT_KEY,
            })
            .await;
        match result {
            Ok(resp) if resp.status.is_success() => {
                self.state.master_registration_unsupported = false;
            }
            Err(ClientError::InvalidMessageId | ClientError::Unsupported) => {
                warn!("Master registration not supported by the engine");
                self.state.master_registration_unsupported = true;
            }
            other => {
                warn!(result = ?other, "Master registration failed");
                self.state.master_registration_unsupported = false;
            }
        }
    }

    async fn probe_messages(&self) -> SupportedMessages {
        let Some(handle) = self.state.handle else {
            return SupportedMessages::empty();
        };
        match self
            .transport
            .support_msg_check(handle, &PROBED_MESSAGES)
            .await
        {
            Ok(bits) => SupportedMessages::from_bits_truncate(bits & 0b111),
            Err(e) => {
                warn!(error = %e, "Message support check failed");
                SupportedMessages::empty()
            }
        }
    }

    async fn query_aon_config(&mut self) -> SupportedMessages {
        let result = self
            .sync_send(Request::QueryAonConfig {
                transaction_id: AON_TRANSACTION_ID,
            })
            .await;
        match result {
            Ok(resp) if resp.status.is_success() => match resp.payload {
                ResponsePayload::AonCapability(Some(capability)) => {
                    debug!(capability = capability.bits(), "Always-on capability");
                    aon_messages(capability)
                }
                _ => {
                    warn!("Always-on capability missing from reply");
                    SupportedMessages::empty()
                }
            },
            Err(ClientError::Unsupported) => {
                debug!("Always-on configuration query not supported");
                SupportedMessages::empty()
            }
            other => {
                warn!(result = ?other, "Always-on configuration query failed");
                SupportedMessages::empty()
            }
        }
    }

    async fn query_supported_features(&mut self) -> Vec<u8> {
        match self.sync_send(Request::GetSupportedFeature).await {
            Ok(resp) => match resp.payload {
                ResponsePayload::SupportedFeatures(features) => features,
                _ => Vec::new(),
            },
            Err(e) => {
                warn!(error = %e, "Supported feature query failed");
                Vec::new()
            }
        }
    }
}
