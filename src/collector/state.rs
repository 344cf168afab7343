//! Lifecycle state tracking and cooperative stop signaling.
//!
//! Implementations of [`Collector`](crate::Collector) must answer status
//! queries while a collection cycle is in flight, which forces their state
//! into shared, synchronized storage. [`StateCell`] packages that pattern:
//! an observable cell over `tokio::sync::watch` that only admits the legal
//! lifecycle transitions. [`StopSignal`] is the matching interruption
//! primitive: a non-blocking, idempotent request flag that in-flight work
//! polls or awaits.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{watch, Notify};

/// Error raised by [`StateCell::advance`] on an illegal transition.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid lifecycle transition: {from} -> {to}")]
pub struct StateError {
    /// State the cell was in when the transition was attempted.
    pub from: CollectorState,
    /// State the transition attempted to reach.
    pub to: CollectorState,
}

/// Lifecycle state of a collector.
///
/// The transition set is intentionally small:
///
/// ```text
/// Uninitialized -> Configured
/// Configured    -> Configured (reconfigure) | Running
/// Running       -> Stopped | Complete | Failed
/// ```
///
/// `Stopped`, `Complete` and `Failed` are terminal: no further collection
/// progress occurs from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectorState {
    /// Constructed but not yet configured; collection is not meaningful.
    Uninitialized,
    /// Configuration accepted; ready to collect.
    Configured,
    /// A collection cycle is in progress.
    Running,
    /// Interrupted by a stop request before completing.
    Stopped,
    /// Collection reached its terminal successful state.
    Complete,
    /// Collection hit an unrecoverable error.
    Failed,
}

impl CollectorState {
    /// Whether this state admits no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::Complete | Self::Failed)
    }

    /// Whether the transition `self -> to` is legal.
    pub fn can_transition_to(self, to: Self) -> bool {
        match self {
            Self::Uninitialized => matches!(to, Self::Configured),
            Self::Configured => matches!(to, Self::Configured | Self::Running),
            Self::Running => matches!(to, Self::Stopped | Self::Complete | Self::Failed),
            Self::Stopped | Self::Complete | Self::Failed => false,
        }
    }

    /// Stable lowercase descriptor, suitable for status strings and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Configured => "configured",
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for CollectorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observable lifecycle cell enforcing the [`CollectorState`] transitions.
///
/// Cheap to query from any thread; writers go through [`advance`], which
/// applies the transition atomically or fails with [`StateError`]. Readers
/// either sample with [`get`] or await a condition with [`wait_until`],
/// so status queries never block behind an in-flight collection.
///
/// [`advance`]: StateCell::advance
/// [`get`]: StateCell::get
/// [`wait_until`]: StateCell::wait_until
#[derive(Debug)]
pub struct StateCell {
    tx: watch::Sender<CollectorState>,
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

impl StateCell {
    /// Create a cell in [`CollectorState::Uninitialized`].
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(CollectorState::Uninitialized);
        Self { tx }
    }

    /// Current state.
    pub fn get(&self) -> CollectorState {
        *self.tx.borrow()
    }

    /// Attempt the transition to `next`.
    ///
    /// The check-and-set is atomic with respect to concurrent `advance`
    /// calls; losers of a race observe the winner's state as `from`.
    ///
    /// # Errors
    /// Returns [`StateError`] when the transition is not in the lifecycle
    /// transition set.
    pub fn advance(&self, next: CollectorState) -> Result<(), StateError> {
        let mut result = Ok(());
        self.tx.send_if_modified(|current| {
            if current.can_transition_to(next) {
                *current = next;
                true
            } else {
                result = Err(StateError {
                    from: *current,
                    to: next,
                });
                false
            }
        });
        result
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<CollectorState> {
        self.tx.subscribe()
    }

    /// Wait until the state satisfies `predicate`, returning that state.
    pub async fn wait_until(
        &self,
        mut predicate: impl FnMut(CollectorState) -> bool,
    ) -> CollectorState {
        let mut rx = self.tx.subscribe();
        // wait_for only fails when the sender is dropped, and we hold it.
        let state = *rx
            .wait_for(|s| predicate(*s))
            .await
            .unwrap_or_else(|_| unreachable!("state sender lives as long as the cell"));
        state
    }
}

/// Cooperative stop request.
///
/// [`request`] is non-blocking, idempotent and safe to call from any thread,
/// including concurrently with an in-flight collection. Workers poll with
/// [`is_requested`] between units of work, or await [`wait`] inside a
/// `select!`. There is no reset: a signal belongs to one collection run.
///
/// [`request`]: StopSignal::request
/// [`is_requested`]: StopSignal::is_requested
/// [`wait`]: StopSignal::wait
#[derive(Debug, Default)]
pub struct StopSignal {
    requested: AtomicBool,
    notify: Notify,
}

impl StopSignal {
    /// Create an unsignaled stop signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop. No-op when already requested.
    pub fn request(&self) {
        self.requested.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    /// Whether a stop has been requested.
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    /// Wait until a stop is requested. Returns immediately if it already was.
    ///
    /// Cancel-safe: dropping the future loses no signal.
    pub async fn wait(&self) {
        loop {
            // Register interest before checking to close the request/wait race.
            let notified = self.notify.notified();
            if self.is_requested() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_terminal_states() {
        assert!(CollectorState::Stopped.is_terminal());
        assert!(CollectorState::Complete.is_terminal());
        assert!(CollectorState::Failed.is_terminal());
        assert!(!CollectorState::Uninitialized.is_terminal());
        assert!(!CollectorState::Configured.is_terminal());
        assert!(!CollectorState::Running.is_terminal());
    }

    #[test]
    fn test_transition_table() {
        use CollectorState::*;
        assert!(Uninitialized.can_transition_to(Configured));
        assert!(!Uninitialized.can_transition_to(Running));
        // Reconfiguring while idle is allowed
        assert!(Configured.can_transition_to(Configured));
        assert!(Configured.can_transition_to(Running));
        assert!(Running.can_transition_to(Stopped));
        assert!(Running.can_transition_to(Complete));
        assert!(Running.can_transition_to(Failed));
        // Terminal states admit nothing
        for terminal in [Stopped, Complete, Failed] {
            for to in [Uninitialized, Configured, Running, Stopped, Complete, Failed] {
                assert!(!terminal.can_transition_to(to));
            }
        }
    }

    #[test]
    fn test_state_display() {
        assert_eq!(CollectorState::Running.to_string(), "running");
        assert_eq!(CollectorState::Uninitialized.to_string(), "uninitialized");
    }

    #[test]
    fn test_state_serde() {
        let json = serde_json::to_string(&CollectorState::Complete).unwrap();
        assert_eq!(json, "\"complete\"");
        let back: CollectorState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, CollectorState::Complete);
    }

    #[test]
    fn test_state_cell_advance() {
        let cell = StateCell::new();
        assert_eq!(cell.get(), CollectorState::Uninitialized);

        cell.advance(CollectorState::Configured).unwrap();
        cell.advance(CollectorState::Running).unwrap();
        cell.advance(CollectorState::Complete).unwrap();
        assert_eq!(cell.get(), CollectorState::Complete);
    }

    #[test]
    fn test_state_cell_rejects_illegal_transition() {
        let cell = StateCell::new();
        let err = cell.advance(CollectorState::Running).unwrap_err();
        assert_eq!(err.from, CollectorState::Uninitialized);
        assert_eq!(err.to, CollectorState::Running);
        // Failed attempt leaves the state untouched
        assert_eq!(cell.get(), CollectorState::Uninitialized);
    }

    #[tokio::test]
    async fn test_state_cell_wait_until() {
        let cell = Arc::new(StateCell::new());
        let waiter = {
            let cell = Arc::clone(&cell);
            tokio::spawn(async move { cell.wait_until(|s| s.is_terminal()).await })
        };

        cell.advance(CollectorState::Configured).unwrap();
        cell.advance(CollectorState::Running).unwrap();
        cell.advance(CollectorState::Stopped).unwrap();

        let observed = waiter.await.unwrap();
        assert_eq!(observed, CollectorState::Stopped);
    }

    #[tokio::test]
    async fn test_stop_signal_wakes_waiter() {
        let signal = Arc::new(StopSignal::new());
        assert!(!signal.is_requested());

        let waiter = {
            let signal = Arc::clone(&signal);
            tokio::spawn(async move { signal.wait().await })
        };

        // Give the waiter a chance to park first.
        tokio::time::sleep(Duration::from_millis(10)).await;
        signal.request();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("stop waiter should wake")
            .unwrap();
    }

    #[tokio::test]
    async fn test_stop_signal_wait_after_request() {
        let signal = StopSignal::new();
        signal.request();
        signal.request(); // idempotent
        assert!(signal.is_requested());
        // Must return immediately even though no waiter was parked.
        tokio::time::timeout(Duration::from_millis(100), signal.wait())
            .await
            .expect("wait after request must not block");
    }
}
