//! Supervisor for driving collectors to a terminal outcome.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::collector::state::StopSignal;
use crate::collector::{CollectError, Collector};

/// Default pause between collection cycles (1 second).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default timeout for graceful shutdown (5 seconds).
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

fn default_poll_interval() -> Duration {
    DEFAULT_POLL_INTERVAL
}

fn default_shutdown_timeout() -> Duration {
    DEFAULT_SHUTDOWN_TIMEOUT
}

/// Errors raised by [`Supervisor`] operations.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The given run id is not registered.
    #[error("no run with id {0}")]
    NotFound(Uuid),

    /// The collector task panicked instead of returning an outcome.
    #[error("collector task panicked: {0}")]
    Panicked(String),
}

/// Supervisor tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Pause between collection cycles (default: 1s).
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Grace period for [`Supervisor::shutdown`] (default: 5s).
    #[serde(default = "default_shutdown_timeout", with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl SupervisorConfig {
    /// Set the pause between collection cycles.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the graceful shutdown timeout.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

/// Terminal outcome of a supervised run.
#[derive(Debug)]
pub enum RunOutcome {
    /// The collector reported `is_complete() == true`.
    Completed,
    /// A stop request ended the run before completion.
    Stopped,
    /// The collector raised an unrecoverable error.
    Failed(CollectError),
}

/// Point-in-time snapshot of a supervised run.
///
/// `status` and `complete` are live reads of the collector's query
/// operations, taken while the run may still be collecting.
#[derive(Debug, Clone, Serialize)]
pub struct RunStatus {
    /// Run UUID.
    pub id: Uuid,
    /// Collector name.
    pub name: String,
    /// Free-form status descriptor from the collector.
    pub status: String,
    /// Whether the collector reports terminal successful completion.
    pub complete: bool,
    /// When the run was spawned.
    pub started_at: DateTime<Utc>,
}

/// Bookkeeping for one spawned run.
struct RunHandle {
    name: String,
    started_at: DateTime<Utc>,
    collector: Arc<dyn Collector>,
    stop: Arc<StopSignal>,
    task: JoinHandle<RunOutcome>,
}

/// Drives collectors to a terminal state on dedicated tokio tasks.
///
/// Each spawned collector gets a drive loop that invokes `collect()`
/// repeatedly, pausing [`SupervisorConfig::poll_interval`] between cycles,
/// until the collector completes, a stop is requested, or an unrecoverable
/// error surfaces. Stops are always cooperative: the in-flight cycle is
/// never aborted, except as a last resort when graceful shutdown times out.
pub struct Supervisor {
    config: SupervisorConfig,
    runs: Arc<RwLock<HashMap<Uuid, RunHandle>>>,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new(SupervisorConfig::default())
    }
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("config", &self.config)
            .field(
                "run_count",
                &self.runs.try_read().map(|r| r.len()).unwrap_or(0),
            )
            .finish_non_exhaustive()
    }
}

impl Supervisor {
    /// Create a supervisor with the given configuration.
    pub fn new(config: SupervisorConfig) -> Self {
        Self {
            config,
            runs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Spawn a drive loop for `collector` and return its run id.
    ///
    /// The collector is expected to be configured; an unconfigured one will
    /// surface `CollectError::NotConfigured` as [`RunOutcome::Failed`].
    pub async fn spawn(&self, collector: Arc<dyn Collector>) -> Uuid {
        let run_id = Uuid::new_v4();
        let name = collector.name().to_string();
        let stop = Arc::new(StopSignal::new());

        let task = tokio::spawn(drive(
            Arc::clone(&collector),
            name.clone(),
            Arc::clone(&stop),
            self.config.poll_interval,
        ));

        self.runs.write().await.insert(
            run_id,
            RunHandle {
                name: name.clone(),
                started_at: Utc::now(),
                collector,
                stop,
                task,
            },
        );

        tracing::info!(collector = %name, run_id = %run_id, "Collector run spawned");
        run_id
    }

    /// Request a graceful stop of one run.
    ///
    /// Forwards [`Collector::request_stop`] and wakes the drive loop; the
    /// run ends after the in-flight cycle returns. A no-op for a run that
    /// already reached a terminal state.
    ///
    /// # Errors
    /// [`SupervisorError::NotFound`] when the id is not registered.
    pub async fn stop(&self, run_id: &Uuid) -> Result<(), SupervisorError> {
        let runs = self.runs.read().await;
        let handle = runs.get(run_id).ok_or(SupervisorError::NotFound(*run_id))?;
        handle.collector.request_stop();
        handle.stop.request();
        tracing::info!(collector = %handle.name, run_id = %run_id, "Stop requested");
        Ok(())
    }

    /// Request a graceful stop of every registered run.
    pub async fn stop_all(&self) {
        let runs = self.runs.read().await;
        for (run_id, handle) in runs.iter() {
            handle.collector.request_stop();
            handle.stop.request();
            tracing::debug!(collector = %handle.name, run_id = %run_id, "Stop requested");
        }
    }

    /// Wait for one run to reach its terminal outcome, removing it.
    ///
    /// # Errors
    /// [`SupervisorError::NotFound`] for an unknown id,
    /// [`SupervisorError::Panicked`] if the drive task panicked.
    pub async fn wait(&self, run_id: Uuid) -> Result<RunOutcome, SupervisorError> {
        let handle = self
            .runs
            .write()
            .await
            .remove(&run_id)
            .ok_or(SupervisorError::NotFound(run_id))?;

        handle
            .task
            .await
            .map_err(|e| SupervisorError::Panicked(e.to_string()))
    }

    /// Live status snapshots of all registered runs.
    ///
    /// Queries `status()` and `is_complete()` on each collector while its
    /// drive loop may be mid-cycle; the trait contract makes that safe.
    pub async fn statuses(&self) -> Vec<RunStatus> {
        let runs = self.runs.read().await;
        runs.iter()
            .map(|(id, handle)| RunStatus {
                id: *id,
                name: handle.name.clone(),
                status: handle.collector.status(),
                complete: handle.collector.is_complete(),
                started_at: handle.started_at,
            })
            .collect()
    }

    /// Number of registered runs.
    pub async fn run_count(&self) -> usize {
        self.runs.read().await.len()
    }

    /// Gracefully shut down all runs with the configured timeout.
    pub async fn shutdown(self) {
        let timeout = self.config.shutdown_timeout;
        self.shutdown_with_timeout(timeout).await;
    }

    /// Shut down all runs, waiting at most `timeout` overall.
    ///
    /// Requests a stop on every run, then awaits the drive tasks. Tasks
    /// still running when the deadline passes are aborted and logged at
    /// warn; their collectors keep the stop request and can be queried by
    /// any surviving handles.
    pub async fn shutdown_with_timeout(self, timeout: Duration) {
        self.stop_all().await;

        let handles: Vec<(Uuid, RunHandle)> = self.runs.write().await.drain().collect();
        let deadline = tokio::time::Instant::now() + timeout;

        for (run_id, mut handle) in handles {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            match tokio::time::timeout(remaining, &mut handle.task).await {
                Ok(Ok(outcome)) => {
                    tracing::debug!(collector = %handle.name, run_id = %run_id, ?outcome,
                        "Run finished during shutdown");
                }
                Ok(Err(e)) => {
                    tracing::warn!(collector = %handle.name, run_id = %run_id, error = %e,
                        "Run task failed during shutdown");
                }
                Err(_) => {
                    tracing::warn!(collector = %handle.name, run_id = %run_id,
                        "Run did not stop within shutdown timeout, aborting");
                    handle.task.abort();
                }
            }
        }

        tracing::info!("Supervisor shutdown complete");
    }
}

/// Drive one collector until it reaches a terminal outcome.
async fn drive(
    collector: Arc<dyn Collector>,
    name: String,
    stop: Arc<StopSignal>,
    poll_interval: Duration,
) -> RunOutcome {
    let started = std::time::Instant::now();

    loop {
        if stop.is_requested() {
            tracing::info!(collector = %name, "Run stopped before cycle start");
            return RunOutcome::Stopped;
        }
        if collector.is_complete() {
            tracing::info!(collector = %name, "Collection already complete");
            return RunOutcome::Completed;
        }

        let cycle_start = std::time::Instant::now();
        match collector.collect().await {
            Ok(progressed) => {
                let duration_ms = cycle_start.elapsed().as_millis();
                tracing::debug!(collector = %name, duration_ms, progressed, "Cycle finished");

                if collector.is_complete() {
                    let total_ms = started.elapsed().as_millis();
                    tracing::info!(collector = %name, total_ms, "Collection complete");
                    return RunOutcome::Completed;
                }
                if stop.is_requested() {
                    tracing::info!(collector = %name, "Collection stopped");
                    return RunOutcome::Stopped;
                }

                // Pause between cycles, waking early on a stop request.
                tokio::select! {
                    _ = stop.wait() => {
                        tracing::info!(collector = %name, "Collection stopped while idle");
                        return RunOutcome::Stopped;
                    }
                    _ = tokio::time::sleep(poll_interval) => {}
                }
            }
            Err(e) => {
                tracing::error!(collector = %name, error = %e, "Collection failed");
                return RunOutcome::Failed(e);
            }
        }
    }
}
