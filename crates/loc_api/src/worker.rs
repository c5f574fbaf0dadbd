//! Adapter worker - the single owner of [`LocApi`]
//!
//! Commands from the handle arrive on a bounded queue, events from the transport callback
//! on an unbounded one. Both are drained by this task only, so protocol state is never
//! touched concurrently. Pending events are always handled before the next command.

use std::future::Future;
use std::pin::Pin;

use contracts::{Transport, TransportEvent};
use tokio::sync::mpsc;
use tracing::{debug, error, instrument};

use crate::adapter::LocApi;
use crate::state::Phase;

pub(crate) type BoxFuture<'a, R> = Pin<Box<dyn Future<Output = R> + Send + 'a>>;

/// Closure run against the adapter on the worker
pub(crate) type Job<T> = Box<dyn for<'a> FnOnce(&'a mut LocApi<T>) -> BoxFuture<'a, ()> + Send>;

/// Box a closure as a [`Job`]; the bound gives the closure its higher-ranked signature
pub(crate) fn job<T, F>(f: F) -> Job<T>
where
    F: for<'a> FnOnce(&'a mut LocApi<T>) -> BoxFuture<'a, ()> + Send + 'static,
{
    Box::new(f)
}

/// Worker task that decodes events and runs commands
///
/// Stops once every command sender is gone; events left in their queue are discarded.
#[instrument(name = "loc_api_worker_loop", skip(api, commands, events))]
pub(crate) async fn run<T>(
    mut api: LocApi<T>,
    mut commands: mpsc::Receiver<Job<T>>,
    mut events: mpsc::UnboundedReceiver<TransportEvent>,
) where
    T: Transport + Send + Sync + 'static,
{
    debug!("Adapter worker started");

    loop {
        tokio::select! {
            biased;

            Some(event) = events.recv() => api.handle_transport_event(event).await,
            job = commands.recv() => {
                let Some(job) = job else { break };
                api.metrics.inc_command_count();
                job(&mut api).await;
            }
        }

        // Update queue length
        let depth = commands.len() + events.len();
        api.metrics.set_queue_len(depth);
        observability::record_queue_depth(depth);
    }

    // Cleanup
    if api.status().phase != Phase::Closed {
        if let Err(err) = api.close().await {
            error!(error = %err, "Close failed on shutdown");
        }
    }

    debug!("Adapter worker stopped");
}
