//! Application layer - Use cases and application services
//!
//! This layer orchestrates domain objects to fulfill use cases.
//! It's responsible for:
//! - Owning the live correlation id -> call session mapping
//! - Routing trunk events and transfer intents to sessions
//! - Running the background event router and silence watchdog

pub mod error;
pub mod event_router;
pub mod orchestrator;
pub mod registry;
pub mod settings;
pub mod transfer;
pub mod watchdog;

pub use error::{DispatchError, SessionNotFound, TransferError};
pub use event_router::{spawn_event_router, trunk_event_channel, EVENT_CHANNEL_CAPACITY};
pub use orchestrator::{CallOrchestrator, EventRouting, ShutdownReport};
pub use registry::SessionRegistry;
pub use settings::OrchestratorSettings;
pub use transfer::TransferCoordinator;
pub use watchdog::SilenceWatchdog;

use tokio::sync::watch;

/// Resolves once shutdown has been signalled
///
/// Pends forever if the sender is gone, so a dropped orchestrator never
/// looks like a shutdown request.
pub(crate) async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|stopping| *stopping).await.is_err() {
        std::future::pending::<()>().await;
    }
}
