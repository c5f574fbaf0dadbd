//! # LocApi
//!
//! Client side of the QMI LOC protocol.
//!
//! Responsibilities:
//! - open a session with the remote positioning engine and negotiate capabilities
//! - keep the registered event mask in step with the fix session
//! - encode outbound commands and bound synchronous requests with a timeout
//! - decode asynchronous indications into normalized reports for the location engine
//!
//! [`LocApiHandle`] owns a worker task holding the adapter; commands and transport events
//! are serialized through its two queues.

pub mod adapter;
mod bridge;
pub mod clock;
mod commands;
pub mod convert;
mod decoders;
pub mod error;
pub mod handle;
pub mod mask;
pub mod metrics;
pub mod mock;
mod negotiation;
mod session;
mod state;
mod worker;

pub use adapter::{AdapterStatus, LocApi};
pub use contracts::{LocationEngine, Transport};
pub use error::{LocApiError, Result};
pub use handle::LocApiHandle;
pub use metrics::{AdapterMetrics, MetricsSnapshot};
pub use mock::{EngineCall, MockConfig, MockTransport, RecordingEngine, SentRequest};
pub use state::Phase;
