//! Transfer coordinator
//!
//! Arbitrates transfer intents against live sessions. The `Transferring`
//! state is the per-call transfer slot: it is claimed under the session
//! lock, the trunk is driven without the lock, and the slot is released by
//! moving back to `Answered` or on to `Ended`.

use crate::application::error::TransferError;
use crate::application::registry::{SessionRegistry, SessionSlot, TransferResolution};
use crate::application::shutdown_requested;
use crate::domain::call::CallState;
use crate::domain::shared::value_objects::{CorrelationId, PhoneNumber};
use crate::domain::transfer::{TransferIntent, TransferOutcome, TransferTarget};
use crate::domain::trunk::{DialHandle, SipTrunkClient};
use crate::infrastructure::metrics;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tracing::{error, info, warn};

/// How a claimed transfer attempt ended, before it is applied to the session
#[derive(Debug)]
enum Attempt {
    Resolved(TransferResolution),
    CallEnded,
    TimedOut,
    Cancelled,
}

pub struct TransferCoordinator {
    registry: Arc<SessionRegistry>,
    trunk: Arc<dyn SipTrunkClient>,
    default_transfer_number: PhoneNumber,
    transfer_timeout: Duration,
    auto_transfer_on_failure: bool,
    shutdown: watch::Receiver<bool>,
}

impl TransferCoordinator {
    pub fn new(
        registry: Arc<SessionRegistry>,
        trunk: Arc<dyn SipTrunkClient>,
        default_transfer_number: PhoneNumber,
        transfer_timeout: Duration,
        auto_transfer_on_failure: bool,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            registry,
            trunk,
            default_transfer_number,
            transfer_timeout,
            auto_transfer_on_failure,
            shutdown,
        }
    }

    /// Transfer the far end of an answered call
    ///
    /// Contract violations are errors and leave the call untouched. Once the
    /// transfer is attempted the result is always a [`TransferOutcome`]; a
    /// failed attempt keeps the original call up.
    pub async fn request_transfer(
        &self,
        intent: TransferIntent,
    ) -> Result<TransferOutcome, TransferError> {
        let correlation_id = intent.correlation_id.clone();
        let slot = self
            .registry
            .get(&correlation_id)
            .await
            .ok_or_else(|| TransferError::SessionNotFound(correlation_id.clone()))?;

        let (handle, target, resolved) = self.claim(&correlation_id, &slot, &intent.target).await?;

        info!(
            "Transferring call {} to {} (handle {})",
            correlation_id, target, handle
        );

        let attempt = self.attempt(&handle, &target, resolved).await;
        Ok(self.settle(&correlation_id, &slot, &target, attempt).await)
    }

    /// Transfer to the default number after a conversation failure
    ///
    /// Returns `Ok(None)` when auto-transfer is switched off.
    pub async fn auto_transfer(
        &self,
        correlation_id: CorrelationId,
        reason: &str,
    ) -> Result<Option<TransferOutcome>, TransferError> {
        if !self.auto_transfer_on_failure {
            warn!("Auto-transfer disabled, leaving call {} as is. reason={}", correlation_id, reason);
            return Ok(None);
        }

        warn!(
            "Auto-transfer triggered for call {}. reason={}, destination={}",
            correlation_id, reason, self.default_transfer_number
        );
        self.request_transfer(TransferIntent::to_default(correlation_id))
            .await
            .map(Some)
    }

    /// Resolve the target number for a call dialed to `destination`
    pub fn resolve_target(
        &self,
        target: &TransferTarget,
        destination: &str,
    ) -> Result<PhoneNumber, TransferError> {
        let number = match target {
            TransferTarget::Default => self.default_transfer_number.clone(),
            TransferTarget::Number(raw) => {
                PhoneNumber::parse(raw).map_err(|e| TransferError::InvalidTarget(e.to_string()))?
            }
        };

        if number.as_str() == destination {
            return Err(TransferError::InvalidTarget(format!(
                "{} is the call's own destination",
                number
            )));
        }

        Ok(number)
    }

    /// Validate and claim the transfer slot under the session lock
    async fn claim(
        &self,
        correlation_id: &CorrelationId,
        slot: &SessionSlot,
        target: &TransferTarget,
    ) -> Result<(DialHandle, PhoneNumber, oneshot::Receiver<TransferResolution>), TransferError> {
        let mut live = slot.lock().await;

        match live.session.state() {
            CallState::Answered => {}
            CallState::Transferring => {
                return Err(TransferError::TransferInProgress(correlation_id.clone()));
            }
            state => {
                return Err(TransferError::InvalidState {
                    correlation_id: correlation_id.clone(),
                    state,
                });
            }
        }

        let number = self.resolve_target(target, live.session.destination_number())?;

        // Answered before the dial command returned its handle
        let handle = live.handle.clone().ok_or_else(|| TransferError::InvalidState {
            correlation_id: correlation_id.clone(),
            state: CallState::Answered,
        })?;

        if let Err(e) = live.session.begin_transfer(number.clone()) {
            warn!("Could not claim transfer for call {}: {}", correlation_id, e);
            return Err(TransferError::InvalidState {
                correlation_id: correlation_id.clone(),
                state: live.session.state(),
            });
        }

        let (tx, rx) = oneshot::channel();
        live.transfer_waiter = Some(tx);

        Ok((handle, number, rx))
    }

    /// Drive the trunk without holding the session lock
    async fn attempt(
        &self,
        handle: &DialHandle,
        target: &PhoneNumber,
        resolved: oneshot::Receiver<TransferResolution>,
    ) -> Attempt {
        let exchange = async {
            if let Err(e) = self.trunk.transfer(handle, target).await {
                return Attempt::Resolved(TransferResolution::Failed(e.to_string()));
            }
            match resolved.await {
                Ok(resolution) => Attempt::Resolved(resolution),
                Err(_) => Attempt::CallEnded,
            }
        };

        let mut shutdown = self.shutdown.clone();
        tokio::select! {
            result = tokio::time::timeout(self.transfer_timeout, exchange) => {
                result.unwrap_or(Attempt::TimedOut)
            }
            _ = shutdown_requested(&mut shutdown) => Attempt::Cancelled,
        }
    }

    /// Apply the attempt to the session and release the slot
    async fn settle(
        &self,
        correlation_id: &CorrelationId,
        slot: &SessionSlot,
        target: &PhoneNumber,
        attempt: Attempt,
    ) -> TransferOutcome {
        let mut live = slot.lock().await;
        live.transfer_waiter = None;

        if live.session.state() != CallState::Transferring {
            info!(
                "Call {} left transfer state ({}) before the transfer resolved",
                correlation_id,
                live.session.state()
            );
            metrics::record_transfer("call_ended");
            return TransferOutcome::Failed {
                reason: "call ended before transfer completed".to_string(),
                call_active: false,
            };
        }

        let reason = match attempt {
            Attempt::Resolved(TransferResolution::Completed) => {
                if let Err(e) = live.session.transfer_completed() {
                    error!("Failed to complete transfer for call {}: {}", correlation_id, e);
                }
                let snapshot = live.session.clone();
                drop(live);

                info!("Call {} transferred to {}", correlation_id, target);
                metrics::record_transfer("transferred");
                metrics::record_call_finished("ended", "transferred");
                self.registry.retire(slot, snapshot).await;
                metrics::update_active_sessions(self.registry.live_count().await);

                return TransferOutcome::Transferred {
                    target: target.to_string(),
                };
            }
            Attempt::Resolved(TransferResolution::Failed(reason)) => reason,
            Attempt::TimedOut => format!(
                "transfer timed out after {}s",
                self.transfer_timeout.as_secs()
            ),
            Attempt::Cancelled => "transfer cancelled by shutdown".to_string(),
            Attempt::CallEnded => "transfer abandoned by trunk".to_string(),
        };

        if let Err(e) = live.session.transfer_failed(reason.clone()) {
            error!("Failed to restore call {} after transfer: {}", correlation_id, e);
        }

        warn!(
            "Transfer of call {} to {} failed: {}. Continuing call ({} failed transfers)",
            correlation_id,
            target,
            reason,
            live.session.transfer_failures()
        );
        metrics::record_transfer("failed");

        TransferOutcome::Failed {
            reason,
            call_active: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::call::CallSession;
    use crate::domain::trunk::{MockSipTrunkClient, TrunkError};
    use tokio_test::{assert_err, assert_ok};

    const DESTINATION: &str = "+919988776655";

    fn coordinator(
        trunk: MockSipTrunkClient,
        registry: Arc<SessionRegistry>,
        shutdown: watch::Receiver<bool>,
    ) -> TransferCoordinator {
        TransferCoordinator::new(
            registry,
            Arc::new(trunk),
            PhoneNumber::parse("+15551234567").unwrap(),
            Duration::from_millis(200),
            true,
            shutdown,
        )
    }

    async fn answered(registry: &SessionRegistry, id: &str) -> SessionSlot {
        let mut session = CallSession::new(
            CorrelationId::new(id),
            DESTINATION.to_string(),
            "ST_trunk".to_string(),
        );
        session.begin_dialing().unwrap();
        session.ring().unwrap();
        session.answer().unwrap();

        let slot = registry.insert(session).await.unwrap();
        slot.lock().await.handle = Some(DialHandle::new("sip_919988776655"));
        slot
    }

    #[test]
    fn test_resolve_target() {
        let (_tx, rx) = watch::channel(false);
        let coordinator = coordinator(
            MockSipTrunkClient::new(),
            Arc::new(SessionRegistry::new(10)),
            rx,
        );

        let number = assert_ok!(coordinator.resolve_target(&TransferTarget::Default, DESTINATION));
        assert_eq!(number.as_str(), "+15551234567");

        assert_err!(coordinator.resolve_target(
            &TransferTarget::Number("555-0000".to_string()),
            DESTINATION
        ));
        assert_eq!(
            coordinator.resolve_target(&TransferTarget::Number(DESTINATION.to_string()), DESTINATION),
            Err(TransferError::InvalidTarget(format!(
                "{} is the call's own destination",
                DESTINATION
            )))
        );
    }

    #[tokio::test]
    async fn test_self_transfer_never_reaches_trunk() {
        let mut trunk = MockSipTrunkClient::new();
        trunk.expect_transfer().times(0);

        let registry = Arc::new(SessionRegistry::new(10));
        let slot = answered(&registry, "c1").await;
        let (_tx, rx) = watch::channel(false);
        let coordinator = coordinator(trunk, registry, rx);

        let result = coordinator
            .request_transfer(TransferIntent::new(
                CorrelationId::new("c1"),
                TransferTarget::Number(DESTINATION.to_string()),
            ))
            .await;

        assert!(matches!(result, Err(TransferError::InvalidTarget(_))));
        assert_eq!(slot.lock().await.session.state(), CallState::Answered);
    }

    #[tokio::test]
    async fn test_trunk_rejection_keeps_call() {
        let mut trunk = MockSipTrunkClient::new();
        trunk
            .expect_transfer()
            .times(1)
            .returning(|_, _| Err(TrunkError::Unreachable("+15550000000".to_string())));

        let registry = Arc::new(SessionRegistry::new(10));
        let slot = answered(&registry, "c1").await;
        let (_tx, rx) = watch::channel(false);
        let coordinator = coordinator(trunk, registry, rx);

        let outcome = coordinator
            .request_transfer(TransferIntent::new(
                CorrelationId::new("c1"),
                TransferTarget::Number("+15550000000".to_string()),
            ))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            TransferOutcome::Failed {
                reason: "target unreachable: +15550000000".to_string(),
                call_active: true,
            }
        );
        let live = slot.lock().await;
        assert_eq!(live.session.state(), CallState::Answered);
        assert_eq!(live.session.transfer_failures(), 1);
        assert!(live.transfer_waiter.is_none());
    }

    #[tokio::test]
    async fn test_transfer_times_out_without_confirmation() {
        let mut trunk = MockSipTrunkClient::new();
        trunk.expect_transfer().times(1).returning(|_, _| Ok(()));

        let registry = Arc::new(SessionRegistry::new(10));
        let slot = answered(&registry, "c1").await;
        let (_tx, rx) = watch::channel(false);
        let coordinator = coordinator(trunk, registry, rx);

        let outcome = coordinator
            .request_transfer(TransferIntent::to_default(CorrelationId::new("c1")))
            .await
            .unwrap();

        assert!(matches!(outcome, TransferOutcome::Failed { call_active: true, .. }));
        assert_eq!(slot.lock().await.session.state(), CallState::Answered);
    }

    #[tokio::test]
    async fn test_unanswered_call_is_invalid_state() {
        let mut trunk = MockSipTrunkClient::new();
        trunk.expect_transfer().times(0);

        let registry = Arc::new(SessionRegistry::new(10));
        let mut session = CallSession::new(
            CorrelationId::new("c1"),
            DESTINATION.to_string(),
            "ST_trunk".to_string(),
        );
        session.begin_dialing().unwrap();
        registry.insert(session).await.unwrap();

        let (_tx, rx) = watch::channel(false);
        let coordinator = coordinator(trunk, registry, rx);

        let result = coordinator
            .request_transfer(TransferIntent::to_default(CorrelationId::new("c1")))
            .await;
        assert_eq!(
            result,
            Err(TransferError::InvalidState {
                correlation_id: CorrelationId::new("c1"),
                state: CallState::Dialing,
            })
        );
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let (_tx, rx) = watch::channel(false);
        let coordinator = coordinator(
            MockSipTrunkClient::new(),
            Arc::new(SessionRegistry::new(10)),
            rx,
        );

        let result = coordinator
            .request_transfer(TransferIntent::to_default(CorrelationId::new("missing")))
            .await;
        assert_eq!(
            result,
            Err(TransferError::SessionNotFound(CorrelationId::new("missing")))
        );
    }

    #[tokio::test]
    async fn test_auto_transfer_disabled() {
        let mut trunk = MockSipTrunkClient::new();
        trunk.expect_transfer().times(0);

        let registry = Arc::new(SessionRegistry::new(10));
        answered(&registry, "c1").await;
        let (_tx, rx) = watch::channel(false);
        let coordinator = TransferCoordinator::new(
            registry,
            Arc::new(trunk),
            PhoneNumber::parse("+15551234567").unwrap(),
            Duration::from_millis(200),
            false,
            rx,
        );

        let result = coordinator
            .auto_transfer(CorrelationId::new("c1"), "greeting_failed")
            .await;
        assert_eq!(result, Ok(None));
    }
}
