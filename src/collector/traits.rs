//! Core collector trait and error types.

use thiserror::Error;

use crate::collector::state::StateError;

/// Errors raised by [`Collector::configure`].
///
/// Configuration failure is exceptional: a malformed or incomplete payload
/// means the collector cannot operate, and the caller must intervene.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The payload could not be parsed by the concrete strategy.
    #[error("malformed configuration: {0}")]
    Malformed(String),

    /// The payload parsed, but a required setting is absent.
    #[error("missing required configuration field: {0}")]
    MissingField(String),

    /// Reading referenced configuration (e.g. a file path payload) failed.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// Reconfiguration was rejected because a collection is in progress.
    #[error("cannot reconfigure while a collection is in progress")]
    Busy,
}

/// Errors raised by [`Collector::collect`] on unrecoverable failure.
///
/// Ordinary, expected non-success of a cycle is **not** an error; it is the
/// `Ok(false)` return. This channel is reserved for conditions that make
/// further collection pointless without intervention.
#[derive(Debug, Error)]
pub enum CollectError {
    /// `collect` was invoked before a successful `configure`.
    #[error("collector is not configured")]
    NotConfigured,

    /// I/O failure during gathering.
    #[error("I/O error during collection: {0}")]
    Io(#[from] std::io::Error),

    /// The gathering operation exceeded its deadline.
    #[error("collection timed out")]
    Timeout,

    /// Strategy-specific unrecoverable failure.
    #[error("unrecoverable collection failure: {0}")]
    Fatal(String),

    /// Internal lifecycle bookkeeping was driven through an illegal edge.
    #[error(transparent)]
    State(#[from] StateError),
}

/// Core capability trait for data collectors.
///
/// A collector is a long-lived object driven through a simple lifecycle:
/// configure it once (or again while idle), invoke [`collect`] repeatedly
/// until [`is_complete`] reports true or a stop is requested, then drop it.
/// Dropping the last handle releases every resource the concrete strategy
/// owns, whichever type sits behind the `dyn Collector`.
///
/// All methods take `&self`: the queries and [`request_stop`] must be safe
/// to call from other tasks while a `collect` cycle is in flight, so
/// implementations keep their mutable state behind interior synchronization
/// ([`StateCell`](crate::StateCell) and [`StopSignal`](crate::StopSignal)
/// cover the common cases).
///
/// # Error Handling Philosophy
///
/// `collect` separates **ordinary non-success** from **unrecoverable
/// failure**:
///
/// - `Ok(true)`: the cycle made successful progress (possibly finishing
///   collection — check [`is_complete`]).
/// - `Ok(false)`: the cycle ended without progress for a benign reason, most
///   commonly a stop request honoured mid-flight. Not an error; callers may
///   retry or give up.
/// - `Err(CollectError)`: the collector cannot function without
///   intervention. Callers must not retry blindly.
///
/// Implementations must not collapse the two channels: reporting an
/// unrecoverable failure as `Ok(false)` hides it, and reporting a benign
/// stop as an error turns every shutdown into a false alarm.
///
/// [`collect`]: Collector::collect
/// [`is_complete`]: Collector::is_complete
/// [`request_stop`]: Collector::request_stop
#[async_trait::async_trait]
pub trait Collector: Send + Sync + 'static {
    /// Stable identifier for this collector instance, used in logs and run
    /// bookkeeping.
    fn name(&self) -> &str;

    /// Apply an opaque configuration payload.
    ///
    /// The payload format is owned entirely by the concrete strategy
    /// (structured text, a file path, serialized parameters). Must succeed
    /// before [`collect`](Collector::collect) is meaningful.
    ///
    /// Calling `configure` while a collection is in flight is
    /// implementation-defined; implementations must document their choice.
    /// The doubles in this crate reject it with [`ConfigError::Busy`].
    ///
    /// # Errors
    /// [`ConfigError`] when the payload is malformed or incomplete for this
    /// strategy.
    fn configure(&self, payload: &str) -> Result<(), ConfigError>;

    /// Start or resume the collection process.
    ///
    /// May be long-running; no timing contract is imposed here. See the
    /// trait-level notes for the `Ok(true)` / `Ok(false)` / `Err` split.
    ///
    /// # Errors
    /// [`CollectError`] on unrecoverable failure, including
    /// [`CollectError::NotConfigured`] when invoked before a successful
    /// [`configure`](Collector::configure).
    async fn collect(&self) -> Result<bool, CollectError>;

    /// Request a graceful interruption of an in-progress collection.
    ///
    /// Non-blocking and infallible; a no-op when nothing is collecting.
    /// Implementations make interruption safe: no resource leaks, and no
    /// partial output reported as complete.
    fn request_stop(&self);

    /// Human-readable descriptor of the current state.
    ///
    /// Free-form; [`CollectorState`](crate::CollectorState) provides the
    /// conventional vocabulary. Must not mutate observable state and must
    /// not block indefinitely.
    fn status(&self) -> String;

    /// Whether collection has reached a terminal **successful** state.
    ///
    /// A collector that was stopped or failed reports `false`. Must not
    /// mutate observable state.
    fn is_complete(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// Minimal conforming implementation, used to pin object safety.
    struct NullCollector {
        configured: AtomicBool,
        done: AtomicBool,
    }

    impl NullCollector {
        fn new() -> Self {
            Self {
                configured: AtomicBool::new(false),
                done: AtomicBool::new(false),
            }
        }
    }

    #[async_trait::async_trait]
    impl Collector for NullCollector {
        fn name(&self) -> &str {
            "null"
        }

        fn configure(&self, payload: &str) -> Result<(), ConfigError> {
            if payload.is_empty() {
                return Err(ConfigError::Malformed("empty payload".into()));
            }
            self.configured.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn collect(&self) -> Result<bool, CollectError> {
            if !self.configured.load(Ordering::SeqCst) {
                return Err(CollectError::NotConfigured);
            }
            self.done.store(true, Ordering::SeqCst);
            Ok(true)
        }

        fn request_stop(&self) {}

        fn status(&self) -> String {
            if self.done.load(Ordering::SeqCst) {
                "complete".to_string()
            } else {
                "idle".to_string()
            }
        }

        fn is_complete(&self) -> bool {
            self.done.load(Ordering::SeqCst)
        }
    }

    #[tokio::test]
    async fn test_trait_is_object_safe() {
        let collector: Arc<dyn Collector> = Arc::new(NullCollector::new());
        collector.configure("anything").unwrap();
        assert!(collector.collect().await.unwrap());
        assert!(collector.is_complete());
        assert!(!collector.status().is_empty());
    }

    #[tokio::test]
    async fn test_collect_before_configure_errors() {
        let collector = NullCollector::new();
        let err = collector.collect().await.unwrap_err();
        assert!(matches!(err, CollectError::NotConfigured));
    }

    #[test]
    fn test_configure_rejects_malformed_payload() {
        let collector = NullCollector::new();
        let err = collector.configure("").unwrap_err();
        assert!(err.to_string().contains("malformed"));
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            CollectError::NotConfigured.to_string(),
            "collector is not configured"
        );
        assert_eq!(
            ConfigError::MissingField("target".into()).to_string(),
            "missing required configuration field: target"
        );
        assert_eq!(
            ConfigError::Busy.to_string(),
            "cannot reconfigure while a collection is in progress"
        );
    }
}
