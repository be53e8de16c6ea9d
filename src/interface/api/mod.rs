//! API interface implementations

pub mod calls_handler;
pub mod dto;
pub mod metrics_handler;
pub mod router;
pub mod trunk_handler;

pub use dto::ApiResponse;
pub use router::build_router;

use crate::application::CallOrchestrator;
use crate::domain::trunk::TrunkEvent;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Shared state for API handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<CallOrchestrator>,
    /// Provider events go through the router so per-call order is kept
    pub trunk_events: mpsc::Sender<TrunkEvent>,
}
