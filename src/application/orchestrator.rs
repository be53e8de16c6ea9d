//! Call orchestrator
//!
//! Entry point for dispatch jobs, trunk events and transfer intents. Owns
//! the live session registry; each session is mutated under its own lock
//! and the lock is never held across a trunk round trip.

use crate::application::error::{DispatchError, SessionNotFound, TransferError};
use crate::application::registry::{SessionRegistry, SessionSlot, TransferResolution};
use crate::application::settings::OrchestratorSettings;
use crate::application::shutdown_requested;
use crate::application::transfer::TransferCoordinator;
use crate::domain::call::{CallSession, CallState, EndReason, EventDisposition};
use crate::domain::dial_gate::DialGate;
use crate::domain::dispatch::DialRequest;
use crate::domain::shared::value_objects::{CorrelationId, PhoneNumber};
use crate::domain::transfer::{TransferIntent, TransferOutcome};
use crate::domain::trunk::{DialHandle, SipTrunkClient, TrunkEvent, TrunkEventKind};
use crate::infrastructure::metrics;
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// What happened to a routed trunk event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventRouting {
    Applied { from: CallState, to: CallState },
    /// Handed to an in-flight transfer
    TransferResolved,
    /// Session exists but the event was late or redundant
    Discarded,
    /// No live session; the trunk may report after local cleanup
    UnknownSession,
}

/// Summary of a shutdown drain
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    pub sessions_closed: usize,
    pub hangups_issued: usize,
    pub hangups_failed: usize,
    pub timed_out: bool,
}

pub struct CallOrchestrator {
    settings: OrchestratorSettings,
    trunk: Arc<dyn SipTrunkClient>,
    registry: Arc<SessionRegistry>,
    transfers: TransferCoordinator,
    shutdown_tx: watch::Sender<bool>,
}

impl CallOrchestrator {
    pub fn new(settings: OrchestratorSettings, trunk: Arc<dyn SipTrunkClient>) -> Self {
        let registry = Arc::new(SessionRegistry::new(settings.max_history));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let transfers = TransferCoordinator::new(
            registry.clone(),
            trunk.clone(),
            settings.default_transfer_number.clone(),
            settings.transfer_timeout,
            settings.auto_transfer_on_failure,
            shutdown_rx,
        );

        Self {
            settings,
            trunk,
            registry,
            transfers,
            shutdown_tx,
        }
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    pub fn transfers(&self) -> &TransferCoordinator {
        &self.transfers
    }

    /// Place one outbound call
    ///
    /// Returns the session as it stands once the dial command has been
    /// answered by the trunk (or refused by the gate). A gated request is a
    /// `Failed` session with reason `gated`, not an error.
    pub async fn dispatch(&self, request: DialRequest) -> Result<CallSession, DispatchError> {
        if self.is_shutting_down() {
            return Err(DispatchError::ShuttingDown);
        }
        if request.correlation_id.as_str().trim().is_empty() {
            return Err(DispatchError::InvalidRequest(
                "correlation id must not be empty".to_string(),
            ));
        }

        let trunk_id = if request.trunk_id.trim().is_empty() {
            self.settings.trunk_id.clone()
        } else {
            request.trunk_id.clone()
        };
        let correlation_id = request.correlation_id.clone();
        let session = CallSession::new(
            correlation_id.clone(),
            request.destination_number.clone(),
            trunk_id.clone(),
        );
        let slot = self.registry.insert(session).await?;
        self.observe_active().await;

        let decision = DialGate::evaluate(
            self.settings.enable_outbound_calls,
            &request.destination_number,
        );
        let destination = match PhoneNumber::parse(&request.destination_number) {
            Ok(number) if decision.allowed => number,
            _ => {
                warn!(
                    "Dial gate refused call {} to {}: {}",
                    correlation_id, request.destination_number, decision.reason
                );
                metrics::record_dispatch("gated");
                return Ok(self
                    .finish_with(&slot, |session| {
                        session.fail(EndReason::Gated, Some(decision.reason.clone()))
                    })
                    .await);
            }
        };

        {
            let mut live = slot.lock().await;
            if let Err(e) = live.session.begin_dialing() {
                // Hung up between registration and dialing
                debug!("Call {} not dialed: {}", correlation_id, e);
                return Ok(live.session.clone());
            }
        }

        info!(
            "Dialing {} for call {} via trunk {}",
            destination, correlation_id, trunk_id
        );
        metrics::record_dispatch("dialing");

        let dialed = self.dial(&trunk_id, &destination, &correlation_id).await;

        match dialed {
            Ok(handle) => Ok(self.attach_handle(&slot, handle).await),
            Err((reason, detail)) => {
                warn!("Dial failed for call {}: {}", correlation_id, detail);
                metrics::record_dispatch("failed");
                Ok(self
                    .finish_with(&slot, |session| session.fail(reason, Some(detail.clone())))
                    .await)
            }
        }
    }

    /// Route an event reported by the trunk to its session
    pub async fn on_trunk_event(&self, event: TrunkEvent) -> EventRouting {
        let Some(slot) = self.registry.get(&event.correlation_id).await else {
            info!(
                "Ignoring {:?} event for unknown call {}",
                event.kind, event.correlation_id
            );
            metrics::record_trunk_event("unknown");
            return EventRouting::UnknownSession;
        };

        let mut live = slot.lock().await;

        if event.kind.is_transfer_result() {
            let Some(waiter) = live.transfer_waiter.take() else {
                debug!(
                    "No transfer waiting on call {}, discarding {:?}",
                    event.correlation_id, event.kind
                );
                metrics::record_trunk_event("discarded");
                return EventRouting::Discarded;
            };

            let resolution = match event.kind {
                TrunkEventKind::TransferCompleted => TransferResolution::Completed,
                _ => TransferResolution::Failed(
                    event
                        .detail
                        .clone()
                        .unwrap_or_else(|| "transfer failed".to_string()),
                ),
            };
            if waiter.send(resolution).is_err() {
                debug!("Transfer waiter for call {} already gone", event.correlation_id);
            }
            metrics::record_trunk_event("transfer");
            return EventRouting::TransferResolved;
        }

        // A remote `ended` mid-transfer is the provider's confirmation; the
        // transfer coordinator settles the session
        if event.kind == TrunkEventKind::Ended && live.session.state() == CallState::Transferring {
            if let Some(waiter) = live.transfer_waiter.take() {
                if waiter.send(TransferResolution::Completed).is_err() {
                    debug!("Transfer waiter for call {} already gone", event.correlation_id);
                }
                metrics::record_trunk_event("transfer");
                return EventRouting::TransferResolved;
            }
        }

        match live.session.apply_trunk_event(&event) {
            EventDisposition::Applied { from, to } => {
                info!(
                    "Call {} {} -> {} on {:?}",
                    event.correlation_id, from, to, event.kind
                );
                metrics::record_trunk_event("applied");

                if to == CallState::Answered {
                    live.last_activity = Instant::now();
                }
                if from == CallState::Transferring {
                    live.transfer_waiter = None;
                }

                if to.is_terminal() {
                    live.handle = None;
                    let snapshot = live.session.clone();
                    drop(live);
                    self.retire(&slot, snapshot).await;
                }

                EventRouting::Applied { from, to }
            }
            EventDisposition::Discarded => {
                debug!(
                    "Discarded {:?} event for call {} in state {}",
                    event.kind,
                    event.correlation_id,
                    live.session.state()
                );
                metrics::record_trunk_event("discarded");
                EventRouting::Discarded
            }
        }
    }

    /// Hand a transfer intent to the transfer coordinator
    pub async fn on_transfer_intent(
        &self,
        intent: TransferIntent,
    ) -> Result<TransferOutcome, TransferError> {
        self.transfers.request_transfer(intent).await
    }

    /// The conversational pipeline gave up on a call (greeting or reply failed)
    pub async fn on_conversation_failure(
        &self,
        correlation_id: CorrelationId,
        reason: &str,
    ) -> Result<Option<TransferOutcome>, TransferError> {
        self.transfers.auto_transfer(correlation_id, reason).await
    }

    /// Note that the callee or the agent just spoke
    pub async fn record_activity(&self, correlation_id: &CorrelationId) -> Result<(), SessionNotFound> {
        let slot = self
            .registry
            .get(correlation_id)
            .await
            .ok_or_else(|| SessionNotFound(correlation_id.clone()))?;

        slot.lock().await.last_activity = Instant::now();
        Ok(())
    }

    /// Answered calls silent for at least `threshold`
    ///
    /// Each call is reported once; it is marked so later sweeps skip it.
    pub async fn take_silent_sessions(&self, threshold: Duration) -> Vec<CorrelationId> {
        let mut silent = Vec::new();
        for slot in self.registry.live_slots().await {
            let mut live = slot.lock().await;
            if live.session.state() == CallState::Answered
                && !live.auto_transfer_attempted
                && live.last_activity.elapsed() >= threshold
            {
                live.auto_transfer_attempted = true;
                silent.push(live.session.correlation_id().clone());
            }
        }
        silent
    }

    /// End a call on request
    ///
    /// Hanging up a call that already finished returns its final state.
    pub async fn hangup(&self, correlation_id: &CorrelationId) -> Result<CallSession, SessionNotFound> {
        let Some(slot) = self.registry.get(correlation_id).await else {
            return self
                .registry
                .find_retired(correlation_id)
                .await
                .ok_or_else(|| SessionNotFound(correlation_id.clone()));
        };

        let (snapshot, handle) = {
            let mut live = slot.lock().await;
            if live.session.is_terminal() {
                return Ok(live.session.clone());
            }
            if let Err(e) = live.session.end(EndReason::Hangup) {
                error!("Failed to end call {}: {}", correlation_id, e);
                return Ok(live.session.clone());
            }
            live.transfer_waiter = None;
            (live.session.clone(), live.handle.take())
        };

        info!("Call {} hung up on request", correlation_id);
        self.retire(&slot, snapshot.clone()).await;

        if let Some(handle) = handle {
            self.send_hangup(&handle).await;
        }

        Ok(snapshot)
    }

    /// Current state of a call, live or retired
    pub async fn status(&self, correlation_id: &CorrelationId) -> Result<CallSession, SessionNotFound> {
        if let Some(slot) = self.registry.get(correlation_id).await {
            return Ok(slot.lock().await.session.clone());
        }

        self.registry
            .find_retired(correlation_id)
            .await
            .ok_or_else(|| SessionNotFound(correlation_id.clone()))
    }

    pub async fn live_sessions(&self) -> Vec<CallSession> {
        let mut sessions = Vec::new();
        for slot in self.registry.live_slots().await {
            sessions.push(slot.lock().await.session.clone());
        }
        sessions.sort_by(|a, b| a.created_at().cmp(b.created_at()));
        sessions
    }

    pub async fn recent_history(&self, count: usize) -> Vec<CallSession> {
        self.registry.recent_history(count).await
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    pub fn subscribe_shutdown(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Tear down every live call
    ///
    /// Outstanding dial and transfer waits are cancelled, sessions are marked
    /// `Failed` with reason `shutdown`, and hangups are sent best-effort
    /// within the drain timeout.
    pub async fn shutdown(&self) -> ShutdownReport {
        self.shutdown_tx.send_replace(true);
        info!("Shutting down call orchestrator");

        let mut report = ShutdownReport::default();
        let mut handles = Vec::new();

        for slot in self.registry.drain().await {
            let snapshot = {
                let mut live = slot.lock().await;
                if !live.session.is_terminal() {
                    if let Err(e) = live.session.fail(EndReason::Shutdown, None) {
                        error!("Failed to close call {}: {}", live.session.correlation_id(), e);
                    }
                    report.sessions_closed += 1;
                }
                live.transfer_waiter = None;
                if let Some(handle) = live.handle.take() {
                    handles.push(handle);
                }
                live.session.clone()
            };
            if snapshot.state() == CallState::Failed {
                metrics::record_call_finished("failed", "shutdown");
            }
            self.registry.archive(snapshot).await;
        }
        self.observe_active().await;

        report.hangups_issued = handles.len();
        let hangups = join_all(handles.iter().map(|handle| self.trunk.hangup(handle)));
        match tokio::time::timeout(self.settings.drain_timeout, hangups).await {
            Ok(results) => {
                report.hangups_failed = results.iter().filter(|r| r.is_err()).count();
            }
            Err(_) => {
                warn!(
                    "Hangups did not finish within {}s drain timeout",
                    self.settings.drain_timeout.as_secs()
                );
                report.timed_out = true;
            }
        }

        info!(
            "Shutdown complete: {} sessions closed, {} hangups ({} failed)",
            report.sessions_closed, report.hangups_issued, report.hangups_failed
        );
        report
    }

    /// Issue the dial command, bounded by the dial timeout and shutdown
    async fn dial(
        &self,
        trunk_id: &str,
        destination: &PhoneNumber,
        correlation_id: &CorrelationId,
    ) -> Result<DialHandle, (EndReason, String)> {
        let mut shutdown = self.subscribe_shutdown();
        tokio::select! {
            result = tokio::time::timeout(
                self.settings.dial_timeout,
                self.trunk.dial(trunk_id, destination, correlation_id),
            ) => match result {
                Ok(Ok(handle)) => Ok(handle),
                Ok(Err(e)) => Err((e.end_reason(), e.to_string())),
                Err(_) => Err((
                    EndReason::TrunkError,
                    format!("dial timed out after {:?}", self.settings.dial_timeout),
                )),
            },
            _ = shutdown_requested(&mut shutdown) => {
                Err((EndReason::Shutdown, "dial cancelled by shutdown".to_string()))
            }
        }
    }

    /// Store the dial handle, or release the call if it ended meanwhile
    async fn attach_handle(&self, slot: &SessionSlot, handle: DialHandle) -> CallSession {
        let snapshot = {
            let mut live = slot.lock().await;
            if !live.session.is_terminal() {
                live.handle = Some(handle);
                return live.session.clone();
            }
            live.session.clone()
        };

        // Hung up or shut down while the dial was in flight
        debug!(
            "Call {} finished before dial returned, releasing {}",
            snapshot.correlation_id(),
            handle
        );
        self.send_hangup(&handle).await;
        snapshot
    }

    /// Apply a terminal transition and retire the session
    async fn finish_with<F>(&self, slot: &SessionSlot, transition: F) -> CallSession
    where
        F: FnOnce(&mut CallSession) -> crate::domain::Result<()>,
    {
        let (snapshot, finished_here) = {
            let mut live = slot.lock().await;
            // Whoever moved the session to a terminal state already retired it
            let finished_here = !live.session.is_terminal();
            if finished_here {
                if let Err(e) = transition(&mut live.session) {
                    error!("Failed to finish call {}: {}", live.session.correlation_id(), e);
                }
            }
            live.handle = None;
            (live.session.clone(), finished_here)
        };

        if finished_here && snapshot.is_terminal() {
            self.retire(slot, snapshot.clone()).await;
        }
        snapshot
    }

    async fn retire(&self, slot: &SessionSlot, snapshot: CallSession) {
        if let Some(reason) = snapshot.end_reason() {
            metrics::record_call_finished(snapshot.state().as_str(), reason.as_str());
        }
        self.registry.retire(slot, snapshot).await;
        self.observe_active().await;
    }

    async fn send_hangup(&self, handle: &DialHandle) {
        match tokio::time::timeout(self.settings.drain_timeout, self.trunk.hangup(handle)).await {
            Ok(Ok(())) => debug!("Hangup sent for {}", handle),
            Ok(Err(e)) => warn!("Hangup for {} failed: {}", handle, e),
            Err(_) => warn!("Hangup for {} timed out", handle),
        }
    }

    async fn observe_active(&self) {
        metrics::update_active_sessions(self.registry.live_count().await);
    }
}
