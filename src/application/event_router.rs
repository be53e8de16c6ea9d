//! Trunk event router
//!
//! The trunk adapter pushes events into a bounded channel; a single task
//! drains it and hands each event to the orchestrator. Session updates are
//! quick, so one consumer keeps per-call ordering without blocking other
//! calls for long.

use crate::application::orchestrator::{CallOrchestrator, EventRouting};
use crate::application::shutdown_requested;
use crate::domain::trunk::TrunkEvent;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub const EVENT_CHANNEL_CAPACITY: usize = 1000;

pub fn trunk_event_channel() -> (mpsc::Sender<TrunkEvent>, mpsc::Receiver<TrunkEvent>) {
    mpsc::channel(EVENT_CHANNEL_CAPACITY)
}

/// Spawn the router task
///
/// Stops when every sender is dropped or shutdown is signalled.
pub fn spawn_event_router(
    orchestrator: Arc<CallOrchestrator>,
    mut events: mpsc::Receiver<TrunkEvent>,
) -> JoinHandle<()> {
    let mut shutdown = orchestrator.subscribe_shutdown();

    tokio::spawn(async move {
        info!("Trunk event router started");
        loop {
            tokio::select! {
                maybe_event = events.recv() => {
                    let Some(event) = maybe_event else {
                        debug!("Trunk event channel closed");
                        break;
                    };
                    let correlation_id = event.correlation_id.clone();
                    let kind = event.kind;
                    if orchestrator.on_trunk_event(event).await == EventRouting::UnknownSession {
                        debug!("{:?} for {} had no live session", kind, correlation_id);
                    }
                }
                _ = shutdown_requested(&mut shutdown) => break,
            }
        }
        info!("Trunk event router stopped");
    })
}
