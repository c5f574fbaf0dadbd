//! Capability store shared by every adapter instance of a process
//!
//! Single writer: the elected master publishes once, everyone else reads.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::SupportedMessages;

/// Capabilities confirmed by master negotiation
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EngineCapabilities {
    pub supported_messages: SupportedMessages,
    /// Feature bitmap, bit `n` of byte `n / 8` per feature id
    pub features: Vec<u8>,
    pub gnss_measurement_supported: bool,
}

impl EngineCapabilities {
    pub fn is_feature_supported(&self, feature_id: u8) -> bool {
        let byte = usize::from(feature_id / 8);
        let bit = feature_id % 8;
        self.features
            .get(byte)
            .is_some_and(|b| b & (1 << bit) != 0)
    }
}

/// Write-once capability cache
#[derive(Debug, Default)]
pub struct CapabilityStore {
    inner: OnceLock<EngineCapabilities>,
}

impl CapabilityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish negotiated capabilities
    ///
    /// Returns false when another instance already published.
    pub fn publish(&self, capabilities: EngineCapabilities) -> bool {
        self.inner.set(capabilities).is_ok()
    }

    pub fn get(&self) -> Option<&EngineCapabilities> {
        self.inner.get()
    }

    pub fn is_published(&self) -> bool {
        self.inner.get().is_some()
    }

    /// Message support; false until negotiation publishes
    pub fn is_supported(&self, messages: SupportedMessages) -> bool {
        self.inner
            .get()
            .is_some_and(|c| c.supported_messages.contains(messages))
    }

    pub fn gnss_measurement_supported(&self) -> bool {
        self.inner
            .get()
            .is_some_and(|c| c.gnss_measurement_supported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_once() {
        let store = CapabilityStore::new();
        assert!(!store.is_supported(SupportedMessages::LOCATION_BATCHING));

        let caps = EngineCapabilities {
            supported_messages: SupportedMessages::LOCATION_BATCHING,
            features: vec![0b0000_0100],
            gnss_measurement_supported: true,
        };
        assert!(store.publish(caps));
        assert!(!store.publish(EngineCapabilities::default()));

        assert!(store.is_supported(SupportedMessages::LOCATION_BATCHING));
        assert!(store.gnss_measurement_supported());
    }

    #[test]
    fn test_feature_bits() {
        let caps = EngineCapabilities {
            features: vec![0b0000_0100, 0b1000_0000],
            ..Default::default()
        };
        assert!(caps.is_feature_supported(2));
        assert!(caps.is_feature_supported(15));
        assert!(!caps.is_feature_supported(3));
        assert!(!caps.is_feature_supported(200));
    }
}
