//! Gatherer - Collector Capability Contract
//!
//! This crate defines a uniform contract for heterogeneous data-gathering
//! strategies, so that calling code holding only an `Arc<dyn Collector>` can
//! drive and query any concrete collector interchangeably. It also ships the
//! machinery such a contract needs in practice: an observable lifecycle state
//! cell, a cooperative stop signal, and a supervisor that drives collectors
//! to a terminal state on tokio tasks.
//!
//! # Architecture
//!
//! - [`Collector`]: the capability trait (configure, collect, stop, query)
//! - [`CollectorState`] / [`StateCell`]: lifecycle tracking for implementations
//! - [`Supervisor`]: drives collectors and reports run outcomes
//!
//! Concrete collection strategies are deliberately out of scope: this crate
//! is the boundary they conform to, not a collection engine.
//!
//! # Example
//!
//! ```rust,ignore
//! use gatherer::{Collector, Supervisor};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let collector: Arc<dyn Collector> = Arc::new(MyCollector::default());
//!     collector.configure(r#"{"target": "sensors/rack-4"}"#)?;
//!
//!     let supervisor = Supervisor::default();
//!     let run_id = supervisor.spawn(Arc::clone(&collector)).await;
//!     let outcome = supervisor.wait(run_id).await?;
//!     println!("{} finished: {:?}", collector.name(), outcome);
//!     Ok(())
//! }
//! ```

pub mod collector;

pub use collector::{
    CollectError, Collector, CollectorState, ConfigError, RunOutcome, RunStatus, StateCell,
    StateError, StopSignal, Supervisor, SupervisorConfig, SupervisorError,
};
