//! Session invalidation collaborator
//!
//! The client never reads session state. It only tells the store, once per
//! failed renewal, that the local session is gone. What happens next (clearing
//! cached user data, sending the user back to sign-in) is up to whoever
//! watches the store.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;
use tracing::{info, warn};

/// Receiver of the one-way invalidation signal.
///
/// Must not block: the call happens on the renewal path.
pub trait SessionStore: Send + Sync {
    fn invalidate_session(&self);
}

/// Local view of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    Invalidated,
}

/// Watchable session status.
///
/// Starts `Active`. A failed renewal flips it to `Invalidated`; a caller that
/// signs in again flips it back with `mark_active`.
pub struct SessionState {
    status: watch::Sender<SessionStatus>,
    invalidations: AtomicU64,
}

impl SessionState {
    pub fn new() -> Self {
        let (status, _) = watch::channel(SessionStatus::Active);
        Self {
            status,
            invalidations: AtomicU64::new(0),
        }
    }

    pub fn status(&self) -> SessionStatus {
        *self.status.borrow()
    }

    /// Subscribe to status changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    /// Record a fresh sign-in.
    pub fn mark_active(&self) {
        let previous = self.status.send_replace(SessionStatus::Active);
        if previous == SessionStatus::Invalidated {
            info!("session active again");
        }
    }

    /// Number of invalidations received over the lifetime of this store.
    pub fn invalidations(&self) -> u64 {
        self.invalidations.load(Ordering::Relaxed)
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for SessionState {
    fn invalidate_session(&self) {
        self.invalidations.fetch_add(1, Ordering::Relaxed);
        self.status.send_replace(SessionStatus::Invalidated);
        warn!("session invalidated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_active() {
        let state = SessionState::new();
        assert_eq!(state.status(), SessionStatus::Active);
        assert_eq!(state.invalidations(), 0);
    }

    #[test]
    fn invalidate_without_subscribers_still_updates_status() {
        let state = SessionState::new();
        state.invalidate_session();
        assert_eq!(state.status(), SessionStatus::Invalidated);
        assert_eq!(state.invalidations(), 1);
    }

    #[test]
    fn mark_active_restores_session() {
        let state = SessionState::new();
        state.invalidate_session();
        state.mark_active();
        assert_eq!(state.status(), SessionStatus::Active);
        assert_eq!(state.invalidations(), 1, "history is kept");
    }

    #[tokio::test]
    async fn subscribers_see_invalidation() {
        let state = SessionState::new();
        let mut rx = state.subscribe();
        assert_eq!(*rx.borrow(), SessionStatus::Active);

        state.invalidate_session();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), SessionStatus::Invalidated);
    }
}
