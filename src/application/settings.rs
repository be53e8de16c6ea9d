//! Orchestrator settings

use crate::domain::shared::value_objects::PhoneNumber;
use std::time::Duration;

/// Runtime settings injected into the orchestrator at construction
///
/// Read-only for the lifetime of the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub enable_outbound_calls: bool,
    pub trunk_id: String,
    pub default_transfer_number: PhoneNumber,
    pub auto_transfer_on_failure: bool,
    /// Silence after which an answered call is auto-transferred
    pub silence_threshold: Option<Duration>,
    pub silence_check_interval: Duration,
    pub dial_timeout: Duration,
    pub transfer_timeout: Duration,
    pub drain_timeout: Duration,
    pub max_history: usize,
}

impl OrchestratorSettings {
    /// Settings with dialing disabled and default timeouts
    pub fn new(trunk_id: impl Into<String>, default_transfer_number: PhoneNumber) -> Self {
        Self {
            enable_outbound_calls: false,
            trunk_id: trunk_id.into(),
            default_transfer_number,
            auto_transfer_on_failure: true,
            silence_threshold: None,
            silence_check_interval: Duration::from_secs(5),
            dial_timeout: Duration::from_secs(30),
            transfer_timeout: Duration::from_secs(30),
            drain_timeout: Duration::from_secs(5),
            max_history: 1000,
        }
    }

    pub fn with_outbound_calls(mut self, enabled: bool) -> Self {
        self.enable_outbound_calls = enabled;
        self
    }

    pub fn with_auto_transfer(mut self, enabled: bool) -> Self {
        self.auto_transfer_on_failure = enabled;
        self
    }

    pub fn with_silence_threshold(mut self, threshold: Duration, check_interval: Duration) -> Self {
        self.silence_threshold = Some(threshold);
        self.silence_check_interval = check_interval;
        self
    }

    pub fn with_dial_timeout(mut self, timeout: Duration) -> Self {
        self.dial_timeout = timeout;
        self
    }

    pub fn with_transfer_timeout(mut self, timeout: Duration) -> Self {
        self.transfer_timeout = timeout;
        self
    }

    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }
}
