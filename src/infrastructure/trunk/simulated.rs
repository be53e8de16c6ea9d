//! Simulated telephony provider
//!
//! Accepts commands like a real trunk and reports call progress on the
//! trunk event channel after configurable delays. Used for dry runs and by
//! the integration tests.

use crate::domain::shared::value_objects::{CorrelationId, PhoneNumber};
use crate::domain::trunk::{DialHandle, SipTrunkClient, TrunkError, TrunkEvent, TrunkEventKind};
use crate::infrastructure::trunk::destination::{format_transfer_destination, participant_identity};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

/// How a dialed number behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialBehavior {
    /// Rings, then answers
    Answer,
    /// Reports busy
    Busy,
    /// Rings, then gives up
    NoAnswer,
    /// Rings, then declines
    Reject,
    /// Dial command fails outright
    Unreachable,
    /// Accepts the dial and reports nothing; events are injected by hand
    Manual,
}

/// How a transfer target behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferBehavior {
    /// Accepted, then reported complete
    Complete,
    /// Refused synchronously
    Reject,
    /// Accepted, then reported failed
    FailAsync,
    /// Accepted and never reported
    NoResponse,
}

/// A transfer command as it would go on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    pub participant_identity: String,
    pub transfer_to: String,
}

#[derive(Debug, Clone)]
struct ActiveCall {
    correlation_id: CorrelationId,
    destination: PhoneNumber,
}

pub struct SimulatedTrunk {
    events: mpsc::Sender<TrunkEvent>,
    sip_domain: Option<String>,
    ring_delay: Duration,
    answer_delay: Duration,
    default_dial: DialBehavior,
    default_transfer: TransferBehavior,
    dial_overrides: RwLock<HashMap<String, DialBehavior>>,
    transfer_overrides: RwLock<HashMap<String, TransferBehavior>>,
    calls: RwLock<HashMap<DialHandle, ActiveCall>>,
    dialed: RwLock<Vec<(String, PhoneNumber, CorrelationId)>>,
    transfers: RwLock<Vec<TransferRecord>>,
    hangups: RwLock<Vec<DialHandle>>,
}

impl SimulatedTrunk {
    pub fn new(events: mpsc::Sender<TrunkEvent>) -> Self {
        Self {
            events,
            sip_domain: None,
            ring_delay: Duration::from_millis(500),
            answer_delay: Duration::from_millis(2000),
            default_dial: DialBehavior::Answer,
            default_transfer: TransferBehavior::Complete,
            dial_overrides: RwLock::new(HashMap::new()),
            transfer_overrides: RwLock::new(HashMap::new()),
            calls: RwLock::new(HashMap::new()),
            dialed: RwLock::new(Vec::new()),
            transfers: RwLock::new(Vec::new()),
            hangups: RwLock::new(Vec::new()),
        }
    }

    pub fn with_sip_domain(mut self, sip_domain: Option<String>) -> Self {
        self.sip_domain = sip_domain;
        self
    }

    pub fn with_delays(mut self, ring_delay: Duration, answer_delay: Duration) -> Self {
        self.ring_delay = ring_delay;
        self.answer_delay = answer_delay;
        self
    }

    pub fn with_default_dial(mut self, behavior: DialBehavior) -> Self {
        self.default_dial = behavior;
        self
    }

    pub fn with_default_transfer(mut self, behavior: TransferBehavior) -> Self {
        self.default_transfer = behavior;
        self
    }

    pub async fn set_dial_behavior(&self, number: &str, behavior: DialBehavior) {
        self.dial_overrides
            .write()
            .await
            .insert(number.to_string(), behavior);
    }

    pub async fn set_transfer_behavior(&self, number: &str, behavior: TransferBehavior) {
        self.transfer_overrides
            .write()
            .await
            .insert(number.to_string(), behavior);
    }

    /// Inject an event as if the provider had sent it
    pub async fn emit(&self, event: TrunkEvent) {
        if self.events.send(event).await.is_err() {
            warn!("Trunk event channel closed, dropping simulated event");
        }
    }

    /// Correlation ids of every dial command received, in order
    pub async fn dialed(&self) -> Vec<CorrelationId> {
        self.dialed
            .read()
            .await
            .iter()
            .map(|(_, _, correlation_id)| correlation_id.clone())
            .collect()
    }

    pub async fn transfers(&self) -> Vec<TransferRecord> {
        self.transfers.read().await.clone()
    }

    pub async fn hangups(&self) -> Vec<DialHandle> {
        self.hangups.read().await.clone()
    }

    /// Send `events` for one call in the background, each after its delay
    fn schedule(&self, correlation_id: CorrelationId, script: Vec<(Duration, TrunkEvent)>) {
        let events = self.events.clone();
        tokio::spawn(async move {
            for (delay, event) in script {
                tokio::time::sleep(delay).await;
                if events.send(event).await.is_err() {
                    debug!("Event channel closed, stopping script for {}", correlation_id);
                    return;
                }
            }
        });
    }
}

#[async_trait]
impl SipTrunkClient for SimulatedTrunk {
    async fn dial(
        &self,
        trunk_id: &str,
        destination: &PhoneNumber,
        correlation_id: &CorrelationId,
    ) -> Result<DialHandle, TrunkError> {
        self.dialed.write().await.push((
            trunk_id.to_string(),
            destination.clone(),
            correlation_id.clone(),
        ));

        let behavior = self
            .dial_overrides
            .read()
            .await
            .get(destination.as_str())
            .copied()
            .unwrap_or(self.default_dial);

        info!(
            "Simulated dial {} via {} for {} ({:?})",
            destination, trunk_id, correlation_id, behavior
        );

        if behavior == DialBehavior::Unreachable {
            return Err(TrunkError::Unreachable(destination.to_string()));
        }

        let handle = DialHandle::new(format!(
            "{}/{}",
            participant_identity(destination.as_str()),
            correlation_id
        ));
        self.calls.write().await.insert(
            handle.clone(),
            ActiveCall {
                correlation_id: correlation_id.clone(),
                destination: destination.clone(),
            },
        );

        let event = |kind| TrunkEvent::new(correlation_id.clone(), kind);
        let script = match behavior {
            DialBehavior::Answer => vec![
                (self.ring_delay, event(TrunkEventKind::Ringing)),
                (self.answer_delay, event(TrunkEventKind::Answered)),
            ],
            DialBehavior::Busy => vec![(self.ring_delay, event(TrunkEventKind::Busy))],
            DialBehavior::NoAnswer => vec![
                (self.ring_delay, event(TrunkEventKind::Ringing)),
                (self.answer_delay, event(TrunkEventKind::NoAnswer)),
            ],
            DialBehavior::Reject => vec![
                (self.ring_delay, event(TrunkEventKind::Ringing)),
                (
                    self.answer_delay,
                    event(TrunkEventKind::Rejected).with_detail("declined by callee"),
                ),
            ],
            DialBehavior::Manual | DialBehavior::Unreachable => Vec::new(),
        };
        if !script.is_empty() {
            self.schedule(correlation_id.clone(), script);
        }

        Ok(handle)
    }

    async fn transfer(&self, handle: &DialHandle, target: &PhoneNumber) -> Result<(), TrunkError> {
        let call = self
            .calls
            .read()
            .await
            .get(handle)
            .cloned()
            .ok_or_else(|| TrunkError::UnknownHandle(handle.to_string()))?;

        let record = TransferRecord {
            participant_identity: participant_identity(call.destination.as_str()),
            transfer_to: format_transfer_destination(target.as_str(), self.sip_domain.as_deref()),
        };
        info!(
            "Simulated transfer of {} to {}",
            record.participant_identity, record.transfer_to
        );
        self.transfers.write().await.push(record);

        let behavior = self
            .transfer_overrides
            .read()
            .await
            .get(target.as_str())
            .copied()
            .unwrap_or(self.default_transfer);

        let event = |kind| TrunkEvent::new(call.correlation_id.clone(), kind);
        match behavior {
            TransferBehavior::Reject => return Err(TrunkError::Unreachable(target.to_string())),
            TransferBehavior::Complete => self.schedule(
                call.correlation_id.clone(),
                vec![(self.ring_delay, event(TrunkEventKind::TransferCompleted))],
            ),
            TransferBehavior::FailAsync => self.schedule(
                call.correlation_id.clone(),
                vec![(
                    self.ring_delay,
                    event(TrunkEventKind::TransferFailed).with_detail("transfer target did not answer"),
                )],
            ),
            TransferBehavior::NoResponse => {}
        }

        Ok(())
    }

    async fn hangup(&self, handle: &DialHandle) -> Result<(), TrunkError> {
        self.hangups.write().await.push(handle.clone());

        match self.calls.write().await.remove(handle) {
            Some(call) => {
                info!("Simulated hangup for {}", call.correlation_id);
                Ok(())
            }
            None => Err(TrunkError::UnknownHandle(handle.to_string())),
        }
    }
}
