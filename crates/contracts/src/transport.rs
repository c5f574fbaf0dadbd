//! Transport trait - message channel to the remote positioning engine
//!
//! The transport owns the wire encoding; the adapter only sees typed requests,
//! responses and indications.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    BestAvailablePositionInd, ClientError, Indication, MessageId, NativeEventMask, Request,
    Response, ServiceError, WwanPositionInd,
};

/// Connection handle returned by [`Transport::open`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientHandle(pub u64);

/// Response indication of a fire-and-forget position query
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ZppResponse {
    WwanPosition(WwanPositionInd),
    BestAvailablePosition(BestAvailablePositionInd),
}

/// Everything the transport delivers outside a synchronous call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TransportEvent {
    /// Asynchronous event indication
    Indication(Indication),
    /// Response indication not claimed by a synchronous request
    Response(ZppResponse),
    /// Fatal transport error
    Error(ServiceError),
}

/// Transport event callback
///
/// Invoked on the transport's own delivery context; implementations must not block.
pub type TransportCallback = Arc<dyn Fn(TransportEvent) + Send + Sync>;

/// Message channel to the remote engine
///
/// A call that reaches the engine returns `Ok(..)`. The engine verdict travels in
/// [`Response::status`].
#[trait_variant::make(Transport: Send)]
pub trait LocalTransport {
    /// Open a client connection; events are delivered through `callback`
    async fn open(&self, callback: TransportCallback) -> Result<ClientHandle, ClientError>;

    /// Close a client connection
    async fn close(&self, handle: ClientHandle) -> Result<(), ClientError>;

    /// Send a request without waiting for its response indication
    async fn send(&self, handle: ClientHandle, request: Request) -> Result<(), ClientError>;

    /// Send a request and wait for its response indication
    ///
    /// No timeout is applied here; the caller bounds the wait.
    async fn send_sync(&self, handle: ClientHandle, request: Request)
        -> Result<Response, ClientError>;

    /// Register the native event mask; `true` on success
    async fn register_event_mask(
        &self,
        handle: ClientHandle,
        mask: NativeEventMask,
        is_master: bool,
    ) -> bool;

    /// Whether the remote engine understands a message
    async fn is_message_supported(&self, id: MessageId) -> bool;

    /// Batched support query; bit `i` of the result answers `ids[i]`
    async fn support_msg_check(
        &self,
        handle: ClientHandle,
        ids: &[MessageId],
    ) -> Result<u64, ClientError>;
}
