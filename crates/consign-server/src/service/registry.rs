//! Registry of live `ProcessOrders` sessions.
//!
//! Tracks which sessions are running so the server can report them and cancel
//! them all at shutdown. It holds no shipment state; each session keeps its
//! accumulator to itself.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::generate_id;
use crate::observability::metrics::{record_session_finished, record_sessions_active};

/// Registry tracking active streaming sessions.
///
/// Each session is registered with a child of the registry's shutdown token;
/// cancelling the registry cancels every session.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    /// Map of active sessions: session ID -> start time
    active: Arc<Mutex<HashMap<String, Instant>>>,
    shutdown: CancellationToken,
}

impl SessionRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session.
    ///
    /// The returned guard unregisters the session when dropped.
    pub fn register(&self) -> SessionGuard {
        let id = generate_id();
        let active = {
            let mut sessions = self.active.lock().unwrap_or_else(PoisonError::into_inner);
            sessions.insert(id.clone(), Instant::now());
            sessions.len()
        };
        record_sessions_active(active);
        tracing::debug!(session_id = %id, active, "Session registered");

        SessionGuard {
            id,
            cancel: self.shutdown.child_token(),
            registry: self.clone(),
            outcome: "completed",
        }
    }

    /// Cancel every registered session, and any registered later.
    pub fn cancel_all(&self) {
        tracing::info!(active = self.active_count(), "Cancelling active sessions");
        self.shutdown.cancel();
    }

    /// Whether `cancel_all` has been called.
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Get the number of active sessions.
    pub fn active_count(&self) -> usize {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn unregister(&self, id: &str, outcome: &str) {
        let (started, active) = {
            let mut sessions = self.active.lock().unwrap_or_else(PoisonError::into_inner);
            (sessions.remove(id), sessions.len())
        };
        record_sessions_active(active);
        if let Some(started) = started {
            record_session_finished(outcome, started.elapsed().as_secs_f64());
        }
        tracing::debug!(session_id = %id, outcome, active, "Session unregistered");
    }
}

/// Registration handle for one live session.
#[derive(Debug)]
pub struct SessionGuard {
    id: String,
    cancel: CancellationToken,
    registry: SessionRegistry,
    outcome: &'static str,
}

impl SessionGuard {
    /// The session ID.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Token cancelled when the server shuts down.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Label the session's outcome for metrics (default "completed").
    pub fn set_outcome(&mut self, outcome: &'static str) {
        self.outcome = outcome;
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.registry.unregister(&self.id, self.outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_unregister() {
        let registry = SessionRegistry::new();

        let guard = registry.register();
        assert_eq!(registry.active_count(), 1);
        assert_eq!(guard.id().len(), 36);

        drop(guard);
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn test_sessions_have_distinct_ids() {
        let registry = SessionRegistry::new();

        let a = registry.register();
        let b = registry.register();
        assert_ne!(a.id(), b.id());
        assert_eq!(registry.active_count(), 2);
    }

    #[tokio::test]
    async fn test_cancel_all_signals_sessions() {
        let registry = SessionRegistry::new();
        let guard = registry.register();
        let token = guard.cancellation().clone();

        registry.cancel_all();

        // cancelled() resolves immediately once the parent is cancelled
        token.cancelled().await;
        assert!(guard.cancellation().is_cancelled());
    }

    #[test]
    fn test_sessions_after_cancel_start_cancelled() {
        let registry = SessionRegistry::new();
        assert!(!registry.is_shutting_down());
        registry.cancel_all();
        assert!(registry.is_shutting_down());

        let guard = registry.register();
        assert!(guard.cancellation().is_cancelled());
    }

    #[test]
    fn test_clones_share_state() {
        let registry = SessionRegistry::new();
        let clone = registry.clone();

        let _guard = clone.register();
        assert_eq!(registry.active_count(), 1);
    }
}
