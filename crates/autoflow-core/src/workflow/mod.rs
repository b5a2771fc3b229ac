//! Workflow engine core: templating, step dispatch, execution, scheduling.
//!
//! - `definition` -- document parsing and structural validation
//! - `context` -- per-run state holding trigger data and step results
//! - `template` -- `{{...}}` placeholder resolution over step configs
//! - `step_runner` -- `StepKind` -> handler dispatch and the transport ports
//! - `transform` -- `Transformer` extension point with the JEXL default
//! - `executor` -- sequential, fail-fast execution engine
//! - `scheduler` -- delayed job queue, reconciliation, worker
//! - `trigger` -- webhook resolution and asynchronous dispatch

pub mod context;
pub mod definition;
pub mod executor;
pub mod scheduler;
pub mod step_runner;
pub mod template;
pub mod transform;
pub mod trigger;
