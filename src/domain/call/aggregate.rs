//! Call session aggregate root

use crate::domain::call::event::StateTransition;
use crate::domain::call::value_object::{CallState, EndReason};
use crate::domain::shared::error::DomainError;
use crate::domain::shared::error::Result;
use crate::domain::shared::value_objects::{CorrelationId, PhoneNumber};
use crate::domain::trunk::{TrunkEvent, TrunkEventKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a trunk event did to a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDisposition {
    Applied { from: CallState, to: CallState },
    /// Late, duplicate or out-of-order event; the session is unchanged
    Discarded,
}

/// Call session aggregate root
///
/// Owns the state of exactly one outbound call attempt from dispatch to
/// termination. Every state change goes through [`CallSession::transition_to`]
/// and is recorded as a [`StateTransition`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSession {
    correlation_id: CorrelationId,
    /// Destination as requested, which may be malformed for gated sessions
    destination_number: String,
    trunk_id: String,
    state: CallState,
    created_at: DateTime<Utc>,
    dialed_at: Option<DateTime<Utc>>,
    answered_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    end_reason: Option<EndReason>,
    failure_detail: Option<String>,
    transfer_failures: u32,
    last_transfer_target: Option<PhoneNumber>,
    last_transfer_error: Option<String>,
    transitions: Vec<StateTransition>,
}

impl CallSession {
    /// Create a new session in `Created`
    pub fn new(correlation_id: CorrelationId, destination_number: String, trunk_id: String) -> Self {
        Self {
            correlation_id,
            destination_number,
            trunk_id,
            state: CallState::Created,
            created_at: Utc::now(),
            dialed_at: None,
            answered_at: None,
            ended_at: None,
            end_reason: None,
            failure_detail: None,
            transfer_failures: 0,
            last_transfer_target: None,
            last_transfer_error: None,
            transitions: Vec::new(),
        }
    }

    /// Dial command is about to be issued
    pub fn begin_dialing(&mut self) -> Result<()> {
        self.transition_to(CallState::Dialing)?;
        self.dialed_at = Some(Utc::now());
        Ok(())
    }

    /// Far end is being alerted
    pub fn ring(&mut self) -> Result<()> {
        self.transition_to(CallState::Ringing)
    }

    /// Far end picked up
    pub fn answer(&mut self) -> Result<()> {
        self.transition_to(CallState::Answered)?;
        self.answered_at = Some(Utc::now());
        Ok(())
    }

    /// Claim the call for a transfer to `target`
    pub fn begin_transfer(&mut self, target: PhoneNumber) -> Result<()> {
        if self.state != CallState::Answered {
            return Err(DomainError::InvalidStateTransition(format!(
                "Cannot transfer a call in state {}",
                self.state
            )));
        }

        self.transition_to(CallState::Transferring)?;
        self.last_transfer_target = Some(target);
        Ok(())
    }

    /// Transfer did not go through; the original call continues
    pub fn transfer_failed(&mut self, reason: impl Into<String>) -> Result<()> {
        if self.state != CallState::Transferring {
            return Err(DomainError::InvalidStateTransition(format!(
                "No transfer in progress (state {})",
                self.state
            )));
        }

        self.transition_to(CallState::Answered)?;
        self.transfer_failures += 1;
        self.last_transfer_error = Some(reason.into());
        Ok(())
    }

    /// Transfer went through; the call is handed off
    pub fn transfer_completed(&mut self) -> Result<()> {
        if self.state != CallState::Transferring {
            return Err(DomainError::InvalidStateTransition(format!(
                "No transfer in progress (state {})",
                self.state
            )));
        }

        self.end(EndReason::Transferred)
    }

    /// Move to `Failed`
    pub fn fail(&mut self, reason: EndReason, detail: Option<String>) -> Result<()> {
        self.transition_to(CallState::Failed)?;
        self.finish(reason);
        self.failure_detail = detail;
        Ok(())
    }

    /// Move to `Ended`
    pub fn end(&mut self, reason: EndReason) -> Result<()> {
        self.transition_to(CallState::Ended)?;
        self.finish(reason);
        Ok(())
    }

    /// Apply an event reported by the trunk
    ///
    /// Events that make no sense in the current state are discarded rather
    /// than rejected: the trunk may deliver duplicates or late events.
    pub fn apply_trunk_event(&mut self, event: &TrunkEvent) -> EventDisposition {
        use CallState::*;

        let from = self.state;
        let detail = event.detail.clone();

        let result = match (event.kind, from) {
            (TrunkEventKind::Ringing, Dialing) => self.ring(),
            (TrunkEventKind::Answered, Dialing | Ringing) => self.answer(),
            (TrunkEventKind::Busy, Dialing | Ringing) => self.fail(EndReason::Busy, detail),
            (TrunkEventKind::NoAnswer, Dialing | Ringing) => self.fail(EndReason::NoAnswer, detail),
            (TrunkEventKind::Rejected, Dialing | Ringing) => self.fail(EndReason::Rejected, detail),
            (TrunkEventKind::TrunkError, Dialing | Ringing | Transferring) => {
                self.fail(EndReason::TrunkError, detail)
            }
            (TrunkEventKind::TrunkError, Answered) => {
                self.failure_detail = detail;
                self.end(EndReason::TrunkError)
            }
            // Remote teardown before answer counts as a rejection
            (TrunkEventKind::Ended, Dialing | Ringing) => self.fail(EndReason::Rejected, detail),
            (TrunkEventKind::Ended, Answered) => self.end(EndReason::Completed),
            // Provider confirms a transfer by tearing down the original leg
            (TrunkEventKind::Ended, Transferring) => self.transfer_completed(),
            _ => return EventDisposition::Discarded,
        };

        match result {
            Ok(()) => EventDisposition::Applied {
                from,
                to: self.state,
            },
            Err(_) => EventDisposition::Discarded,
        }
    }

    fn finish(&mut self, reason: EndReason) {
        self.ended_at = Some(Utc::now());
        self.end_reason = Some(reason);
    }

    /// Transition to a new state
    fn transition_to(&mut self, new_state: CallState) -> Result<()> {
        if !self.state.can_transition_to(&new_state) {
            return Err(DomainError::InvalidStateTransition(format!(
                "Cannot transition from {} to {}",
                self.state, new_state
            )));
        }

        self.transitions.push(StateTransition::new(
            self.correlation_id.clone(),
            self.state,
            new_state,
        ));
        self.state = new_state;
        Ok(())
    }

    // Getters
    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    pub fn destination_number(&self) -> &str {
        &self.destination_number
    }

    pub fn trunk_id(&self) -> &str {
        &self.trunk_id
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    pub fn created_at(&self) -> &DateTime<Utc> {
        &self.created_at
    }

    pub fn dialed_at(&self) -> Option<&DateTime<Utc>> {
        self.dialed_at.as_ref()
    }

    pub fn answered_at(&self) -> Option<&DateTime<Utc>> {
        self.answered_at.as_ref()
    }

    pub fn ended_at(&self) -> Option<&DateTime<Utc>> {
        self.ended_at.as_ref()
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        self.end_reason
    }

    pub fn failure_detail(&self) -> Option<&str> {
        self.failure_detail.as_deref()
    }

    pub fn transfer_failures(&self) -> u32 {
        self.transfer_failures
    }

    pub fn last_transfer_target(&self) -> Option<&PhoneNumber> {
        self.last_transfer_target.as_ref()
    }

    pub fn last_transfer_error(&self) -> Option<&str> {
        self.last_transfer_error.as_deref()
    }

    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    /// Every state the session has been in, oldest first
    pub fn state_history(&self) -> Vec<CallState> {
        std::iter::once(CallState::Created)
            .chain(self.transitions.iter().map(|t| t.to))
            .collect()
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Talk time between answer and end
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.answered_at
            .and_then(|answered| self.ended_at.map(|ended| ended - answered))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_session() -> CallSession {
        CallSession::new(
            CorrelationId::new("c1"),
            "+919988776655".to_string(),
            "ST_trunk".to_string(),
        )
    }

    fn event(kind: TrunkEventKind) -> TrunkEvent {
        TrunkEvent::new(CorrelationId::new("c1"), kind)
    }

    fn answered_session() -> CallSession {
        let mut session = create_test_session();
        session.begin_dialing().unwrap();
        session.ring().unwrap();
        session.answer().unwrap();
        session
    }

    #[test]
    fn test_session_lifecycle() {
        let mut session = create_test_session();
        assert_eq!(session.state(), CallState::Created);

        session.begin_dialing().unwrap();
        assert!(session.dialed_at().is_some());

        session.apply_trunk_event(&event(TrunkEventKind::Ringing));
        session.apply_trunk_event(&event(TrunkEventKind::Answered));
        assert_eq!(session.state(), CallState::Answered);
        assert!(session.answered_at().is_some());

        session.apply_trunk_event(&event(TrunkEventKind::Ended));
        assert_eq!(session.state(), CallState::Ended);
        assert_eq!(session.end_reason(), Some(EndReason::Completed));
        assert!(session.duration().is_some());

        assert_eq!(
            session.state_history(),
            vec![
                CallState::Created,
                CallState::Dialing,
                CallState::Ringing,
                CallState::Answered,
                CallState::Ended
            ]
        );
    }

    #[test]
    fn test_dial_failures_map_to_reasons() {
        let cases = [
            (TrunkEventKind::Busy, EndReason::Busy),
            (TrunkEventKind::NoAnswer, EndReason::NoAnswer),
            (TrunkEventKind::Rejected, EndReason::Rejected),
            (TrunkEventKind::TrunkError, EndReason::TrunkError),
            (TrunkEventKind::Ended, EndReason::Rejected),
        ];

        for (kind, reason) in cases {
            let mut session = create_test_session();
            session.begin_dialing().unwrap();
            session.ring().unwrap();

            let disposition = session.apply_trunk_event(&event(kind).with_detail("sip 486"));
            assert_eq!(
                disposition,
                EventDisposition::Applied {
                    from: CallState::Ringing,
                    to: CallState::Failed
                }
            );
            assert_eq!(session.end_reason(), Some(reason));
            assert_eq!(session.failure_detail(), Some("sip 486"));
        }
    }

    #[test]
    fn test_terminal_session_discards_events() {
        let mut session = answered_session();
        session.end(EndReason::Completed).unwrap();

        for kind in [
            TrunkEventKind::Ringing,
            TrunkEventKind::Answered,
            TrunkEventKind::Busy,
            TrunkEventKind::Ended,
            TrunkEventKind::TrunkError,
        ] {
            assert_eq!(session.apply_trunk_event(&event(kind)), EventDisposition::Discarded);
            assert_eq!(session.state(), CallState::Ended);
        }
        assert_eq!(session.end_reason(), Some(EndReason::Completed));
    }

    #[test]
    fn test_duplicate_ringing_is_absorbed() {
        let mut session = create_test_session();
        session.begin_dialing().unwrap();
        session.apply_trunk_event(&event(TrunkEventKind::Ringing));

        assert_eq!(
            session.apply_trunk_event(&event(TrunkEventKind::Ringing)),
            EventDisposition::Discarded
        );
        assert_eq!(session.transitions().len(), 2);
    }

    #[test]
    fn test_transfer_failure_returns_to_answered() {
        let mut session = answered_session();
        let target = PhoneNumber::parse("+15550000000").unwrap();

        session.begin_transfer(target.clone()).unwrap();
        assert_eq!(session.state(), CallState::Transferring);
        assert_eq!(session.last_transfer_target(), Some(&target));

        session.transfer_failed("target unreachable").unwrap();
        assert_eq!(session.state(), CallState::Answered);
        assert_eq!(session.transfer_failures(), 1);
        assert_eq!(session.last_transfer_error(), Some("target unreachable"));
    }

    #[test]
    fn test_transfer_completed_ends_session() {
        let mut session = answered_session();
        session
            .begin_transfer(PhoneNumber::parse("+15551234567").unwrap())
            .unwrap();
        session.transfer_completed().unwrap();

        assert_eq!(session.state(), CallState::Ended);
        assert_eq!(session.end_reason(), Some(EndReason::Transferred));
    }

    #[test]
    fn test_remote_end_while_transferring_completes_transfer() {
        let mut session = answered_session();
        session
            .begin_transfer(PhoneNumber::parse("+15551234567").unwrap())
            .unwrap();

        let disposition = session.apply_trunk_event(&event(TrunkEventKind::Ended));
        assert_eq!(
            disposition,
            EventDisposition::Applied {
                from: CallState::Transferring,
                to: CallState::Ended
            }
        );
        assert_eq!(session.end_reason(), Some(EndReason::Transferred));
    }

    #[test]
    fn test_cannot_transfer_unanswered_call() {
        let mut session = create_test_session();
        session.begin_dialing().unwrap();

        let result = session.begin_transfer(PhoneNumber::parse("+15551234567").unwrap());
        assert!(result.is_err());
        assert_eq!(session.state(), CallState::Dialing);
    }

    #[test]
    fn test_gated_session_fails_from_created() {
        let mut session = create_test_session();
        session
            .fail(EndReason::Gated, Some("outbound calling disabled by safety toggle".to_string()))
            .unwrap();

        assert_eq!(session.state(), CallState::Failed);
        assert_eq!(session.end_reason(), Some(EndReason::Gated));
        assert!(session.dialed_at().is_none());
        assert!(session.begin_dialing().is_err());
    }

    #[test]
    fn test_answered_trunk_error_ends_call() {
        let mut session = answered_session();
        session.apply_trunk_event(&event(TrunkEventKind::TrunkError).with_detail("media timeout"));

        assert_eq!(session.state(), CallState::Ended);
        assert_eq!(session.end_reason(), Some(EndReason::TrunkError));
        assert_eq!(session.failure_detail(), Some("media timeout"));
    }
}
