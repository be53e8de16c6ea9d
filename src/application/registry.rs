//! Live session registry
//!
//! The correlation id -> session map is the only structure shared between
//! sessions. Each entry is its own `Mutex`, so events for different calls
//! never wait on each other, and the map lock is never held while a session
//! lock is taken.

use crate::application::error::DispatchError;
use crate::domain::call::CallSession;
use crate::domain::shared::value_objects::CorrelationId;
use crate::domain::trunk::DialHandle;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{oneshot, Mutex, RwLock};

/// How the trunk resolved an in-flight transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TransferResolution {
    Completed,
    Failed(String),
}

/// A session plus the bookkeeping that only matters while it is live
pub(crate) struct LiveSession {
    pub session: CallSession,
    pub handle: Option<DialHandle>,
    /// Present while a transfer is in flight; dropping it wakes the waiter
    pub transfer_waiter: Option<oneshot::Sender<TransferResolution>>,
    pub last_activity: Instant,
    pub auto_transfer_attempted: bool,
}

impl LiveSession {
    fn new(session: CallSession) -> Self {
        Self {
            session,
            handle: None,
            transfer_waiter: None,
            last_activity: Instant::now(),
            auto_transfer_attempted: false,
        }
    }
}

pub(crate) type SessionSlot = Arc<Mutex<LiveSession>>;

/// Live sessions and the terminal log
pub struct SessionRegistry {
    live: RwLock<HashMap<CorrelationId, SessionSlot>>,
    history: RwLock<VecDeque<CallSession>>,
    max_history: usize,
}

impl SessionRegistry {
    pub fn new(max_history: usize) -> Self {
        Self {
            live: RwLock::new(HashMap::new()),
            history: RwLock::new(VecDeque::new()),
            max_history,
        }
    }

    /// Insert a new session, refusing a correlation id that is still live
    pub(crate) async fn insert(&self, session: CallSession) -> Result<SessionSlot, DispatchError> {
        let mut live = self.live.write().await;
        match live.entry(session.correlation_id().clone()) {
            Entry::Occupied(entry) => Err(DispatchError::DuplicateCorrelationId(entry.key().clone())),
            Entry::Vacant(entry) => {
                let slot = Arc::new(Mutex::new(LiveSession::new(session)));
                entry.insert(slot.clone());
                Ok(slot)
            }
        }
    }

    pub(crate) async fn get(&self, correlation_id: &CorrelationId) -> Option<SessionSlot> {
        self.live.read().await.get(correlation_id).cloned()
    }

    /// Evict a terminal session and append it to the terminal log
    ///
    /// Only the exact slot is removed; a newer session that reused the
    /// correlation id stays untouched.
    pub(crate) async fn retire(&self, slot: &SessionSlot, session: CallSession) {
        {
            let mut live = self.live.write().await;
            let same_slot = live
                .get(session.correlation_id())
                .map(|current| Arc::ptr_eq(current, slot))
                .unwrap_or(false);
            if same_slot {
                live.remove(session.correlation_id());
            }
        }
        self.archive(session).await;
    }

    /// Remove every live session at once
    pub(crate) async fn drain(&self) -> Vec<SessionSlot> {
        self.live.write().await.drain().map(|(_, slot)| slot).collect()
    }

    pub(crate) async fn archive(&self, session: CallSession) {
        let mut history = self.history.write().await;
        history.push_back(session);
        while history.len() > self.max_history {
            history.pop_front();
        }
    }

    pub(crate) async fn live_slots(&self) -> Vec<SessionSlot> {
        self.live.read().await.values().cloned().collect()
    }

    pub async fn live_count(&self) -> usize {
        self.live.read().await.len()
    }

    /// Most recent terminal record for a correlation id
    pub async fn find_retired(&self, correlation_id: &CorrelationId) -> Option<CallSession> {
        self.history
            .read()
            .await
            .iter()
            .rev()
            .find(|session| session.correlation_id() == correlation_id)
            .cloned()
    }

    /// Newest terminal records first
    pub async fn recent_history(&self, count: usize) -> Vec<CallSession> {
        self.history
            .read()
            .await
            .iter()
            .rev()
            .take(count)
            .cloned()
            .collect()
    }
}
