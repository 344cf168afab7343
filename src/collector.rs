//! Collector Layer
//!
//! The capability contract for pluggable data collectors, plus the lifecycle
//! helpers conforming implementations lean on. Each supervised collector runs
//! in its own Tokio task.
//!
//! # Architecture
//!
//! - [`Collector`]: core trait every collection strategy implements
//! - [`CollectorState`] / [`StateCell`]: observable lifecycle state
//! - [`StopSignal`]: cooperative interruption primitive
//! - [`Supervisor`]: drives collectors to a terminal outcome
//!
//! # Example
//!
//! ```rust,ignore
//! use gatherer::{Collector, Supervisor, SupervisorConfig};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn demo(collector: Arc<dyn Collector>) -> Result<(), Box<dyn std::error::Error>> {
//! collector.configure("device=cam-7 frames=120")?;
//!
//! let supervisor = Supervisor::new(
//!     SupervisorConfig::default().with_poll_interval(Duration::from_millis(250)),
//! );
//! let run_id = supervisor.spawn(collector).await;
//! let outcome = supervisor.wait(run_id).await?;
//! # Ok(())
//! # }
//! ```

mod state;
mod supervisor;
mod traits;

pub use state::{CollectorState, StateCell, StateError, StopSignal};
pub use supervisor::{RunOutcome, RunStatus, Supervisor, SupervisorConfig, SupervisorError};
pub use traits::{CollectError, Collector, ConfigError};
