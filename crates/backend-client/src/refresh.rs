//! Single-in-flight token refresh gate.
//!
//! The first request to hit a 401 becomes the leader and performs the
//! refresh; every request arriving before it settles parks as a waiter
//! and resumes with the leader's outcome. The gate is owned by the client
//! instance, so independent clients (and tests) cannot interfere with
//! each other.

use tokio::sync::{oneshot, Mutex};
use tracing::debug;

/// Outcome distributed to waiters when a refresh settles.
#[derive(Debug, Clone)]
pub(crate) enum RefreshOutcome {
    /// New access token; retry with it.
    Token(String),
    /// Refresh was rejected; credentials are gone.
    AuthFailed,
    /// Refresh failed in transit; credentials were kept.
    Transient(String),
}

enum GateState {
    Idle,
    Refreshing {
        waiters: Vec<oneshot::Sender<RefreshOutcome>>,
    },
}

/// How a caller entered the gate.
pub(crate) enum Entry {
    /// This caller must perform the refresh and then call
    /// [`RefreshGate::finish`].
    Leader,
    /// Another refresh is in flight; await its outcome.
    Waiter(oneshot::Receiver<RefreshOutcome>),
}

/// One-at-a-time refresh coordination. See module docs.
#[derive(Default)]
pub struct RefreshGate {
    state: Mutex<GateState>,
}

impl Default for GateState {
    fn default() -> Self {
        Self::Idle
    }
}

impl RefreshGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn enter(&self) -> Entry {
        let mut state = self.state.lock().await;
        match &mut *state {
            GateState::Idle => {
                *state = GateState::Refreshing {
                    waiters: Vec::new(),
                };
                Entry::Leader
            }
            GateState::Refreshing { waiters } => {
                let (tx, rx) = oneshot::channel();
                waiters.push(tx);
                debug!(queued = waiters.len(), "401 parked behind in-flight refresh");
                Entry::Waiter(rx)
            }
        }
    }

    pub(crate) async fn finish(&self, outcome: RefreshOutcome) {
        let mut state = self.state.lock().await;
        if let GateState::Refreshing { waiters } = std::mem::replace(&mut *state, GateState::Idle) {
            for waiter in waiters {
                let _ = waiter.send(outcome.clone());
            }
        }
    }
}
