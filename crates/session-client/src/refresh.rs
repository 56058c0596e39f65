//! Single-flight session renewal bookkeeping
//!
//! `RefreshGate` owns the "renewal in progress" flag and the FIFO queue of
//! requests waiting on the renewal outcome. Both are only reachable through
//! `enqueue` and `settle`, each a single critical section on a std `Mutex`
//! that is never held across an `.await`. That makes the check-and-set
//! atomic: however many 401s land at once, exactly one caller is told to
//! start the renewal.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::oneshot;
use transport::{RequestAttempt, TransportResponse};

use crate::error::Result;

/// A request waiting for the renewal outcome, with the handle that resolves
/// its caller.
#[derive(Debug)]
pub struct PendingRequest {
    pub attempt: RequestAttempt,
    pub reply: oneshot::Sender<Result<TransportResponse>>,
}

#[derive(Debug, Default)]
struct RefreshState {
    in_progress: bool,
    queue: VecDeque<PendingRequest>,
}

/// Renewal flag plus waiting queue.
#[derive(Debug, Default)]
pub struct RefreshGate {
    state: Mutex<RefreshState>,
}

impl RefreshGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `pending` behind the renewal.
    ///
    /// Returns `true` when no renewal was in flight: the flag is now set and
    /// the caller must launch the renewal. Returns `false` when one is already
    /// running and will pick this request up when it settles.
    pub fn enqueue(&self, pending: PendingRequest) -> bool {
        let mut state = self.lock();
        state.queue.push_back(pending);
        !std::mem::replace(&mut state.in_progress, true)
    }

    /// Take every waiting request in arrival order and clear the flag.
    ///
    /// Called once when the renewal call settles, whatever its outcome.
    pub fn settle(&self) -> Vec<PendingRequest> {
        let mut state = self.lock();
        state.in_progress = false;
        state.queue.drain(..).collect()
    }

    /// Whether a renewal is currently in flight.
    pub fn in_progress(&self) -> bool {
        self.lock().in_progress
    }

    fn lock(&self) -> MutexGuard<'_, RefreshState> {
        // A panic while holding the lock cannot leave the state half-written:
        // every critical section is a single push, swap or drain.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
