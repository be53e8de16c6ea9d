//! Silence watchdog
//!
//! Periodically looks for answered calls where nobody has spoken for the
//! configured threshold and treats them as a conversation failure.

use crate::application::orchestrator::CallOrchestrator;
use crate::application::shutdown_requested;
use crate::domain::transfer::TransferOutcome;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub struct SilenceWatchdog {
    orchestrator: Arc<CallOrchestrator>,
    threshold: Duration,
    check_interval: Duration,
}

impl SilenceWatchdog {
    /// `None` when the silence threshold is not configured
    pub fn new(orchestrator: Arc<CallOrchestrator>) -> Option<Self> {
        let threshold = orchestrator.settings().silence_threshold?;
        let check_interval = orchestrator.settings().silence_check_interval;

        Some(Self {
            orchestrator,
            threshold,
            check_interval,
        })
    }

    /// Run one check; returns how many calls were handed to auto-transfer
    pub async fn sweep(&self) -> usize {
        let silent = self.orchestrator.take_silent_sessions(self.threshold).await;
        if silent.is_empty() {
            return 0;
        }

        let reason = format!("silence>{}s", self.threshold.as_secs());
        let attempts = silent.iter().map(|correlation_id| {
            self.orchestrator
                .on_conversation_failure(correlation_id.clone(), &reason)
        });

        for (correlation_id, result) in silent.iter().zip(join_all(attempts).await) {
            match result {
                Ok(Some(TransferOutcome::Transferred { target })) => {
                    info!("Silent call {} transferred to {}", correlation_id, target)
                }
                Ok(Some(TransferOutcome::Failed { reason, .. })) => {
                    warn!("Silent call {} could not be transferred: {}", correlation_id, reason)
                }
                Ok(None) => {}
                Err(e) => warn!("Silent call {} skipped: {}", correlation_id, e),
            }
        }

        silent.len()
    }

    pub fn spawn(self) -> JoinHandle<()> {
        let mut shutdown = self.orchestrator.subscribe_shutdown();

        tokio::spawn(async move {
            info!(
                "Silence watchdog started (threshold {}s, every {}s)",
                self.threshold.as_secs(),
                self.check_interval.as_secs()
            );
            let mut ticker = tokio::time::interval(self.check_interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.sweep().await;
                    }
                    _ = shutdown_requested(&mut shutdown) => break,
                }
            }
            info!("Silence watchdog stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::OrchestratorSettings;
    use crate::domain::call::CallState;
    use crate::domain::dispatch::DialRequest;
    use crate::domain::shared::value_objects::{CorrelationId, PhoneNumber};
    use crate::domain::trunk::{DialHandle, MockSipTrunkClient, TrunkEvent, TrunkEventKind};

    fn settings() -> OrchestratorSettings {
        OrchestratorSettings::new("ST_trunk", PhoneNumber::parse("+15551234567").unwrap())
            .with_outbound_calls(true)
            .with_transfer_timeout(Duration::from_millis(100))
    }

    #[test]
    fn test_disabled_without_threshold() {
        let orchestrator = Arc::new(CallOrchestrator::new(
            settings(),
            Arc::new(MockSipTrunkClient::new()),
        ));
        assert!(SilenceWatchdog::new(orchestrator).is_none());
    }

    #[tokio::test]
    async fn test_sweep_transfers_silent_call_to_default() {
        let mut trunk = MockSipTrunkClient::new();
        trunk
            .expect_dial()
            .returning(|_, _, _| Ok(DialHandle::new("h1")));
        trunk
            .expect_transfer()
            .withf(|_, target| target.as_str() == "+15551234567")
            .times(1)
            .returning(|_, _| Ok(()));

        let orchestrator = Arc::new(CallOrchestrator::new(
            settings().with_silence_threshold(Duration::ZERO, Duration::from_secs(1)),
            Arc::new(trunk),
        ));
        orchestrator
            .dispatch(DialRequest::new(CorrelationId::new("c1"), "+919988776655", "ST_trunk"))
            .await
            .unwrap();
        orchestrator
            .on_trunk_event(TrunkEvent::new(CorrelationId::new("c1"), TrunkEventKind::Answered))
            .await;

        let watchdog = SilenceWatchdog::new(orchestrator.clone()).unwrap();
        // No completion event arrives, so the transfer times out and the call stays up
        assert_eq!(watchdog.sweep().await, 1);
        assert_eq!(watchdog.sweep().await, 0);

        let session = orchestrator.status(&CorrelationId::new("c1")).await.unwrap();
        assert_eq!(session.state(), CallState::Answered);
        assert_eq!(session.transfer_failures(), 1);
    }
}
