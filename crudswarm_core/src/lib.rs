//! Virtual user load generation core.
//!
//! Describe a kind of user with [`UserType`]: weighted [`Task`]s plus
//! optional `on_start`/`on_stop` hooks, each an async function over the
//! user's own [`Session`]. [`start_run`] spawns users at the configured
//! rate; every user loops `select -> think -> execute -> record` until
//! [`stop_run`] or the run time limit stops it. Outcomes go to an
//! [`OutcomeSink`] supplied by the caller.
//!
//! ```no_run
//! use std::sync::Arc;
//! use crudswarm_core::{start_run, OutcomeLog, RunConfig, Session, Task, TaskFuture, TaskStatus, UserType};
//!
//! fn list(session: &mut Session<()>) -> TaskFuture<'_> {
//!     Box::pin(async move {
//!         let response = session.client.get("/todos").await?;
//!         Ok(TaskStatus::Done(Some(response.status)))
//!     })
//! }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let user_type = UserType::new("Reader", || ()).task(Task::new("list", 1, list));
//! let handle = start_run(RunConfig::default(), user_type, Arc::new(OutcomeLog::new()))?;
//! let report = handle.stop_and_wait().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod outcome;
pub mod scheduler;
pub mod selector;
pub mod task;
pub mod user;

pub use config::{RunConfig, ThinkTime};
pub use error::{ConfigError, LifecycleError, RequestFailure, RunError};
pub use http::{ApiClient, ApiResponse};
pub use lifecycle::{PhaseCounts, UserBoard, UserPhase};
pub use outcome::{Outcome, OutcomeLog, OutcomeSink};
pub use scheduler::{start_run, stop_run, RunHandle, RunReport, RunStopper};
pub use selector::WeightedSelector;
pub use task::{Task, TaskFn, TaskFuture, TaskResult, TaskStatus};
pub use user::{Session, TrackedIds, UserType};
