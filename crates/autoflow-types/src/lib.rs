//! Shared domain types for autoflow.
//!
//! Workflow definitions, stored workflows, execution records, configuration,
//! and the error types shared between the core and infrastructure layers.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod error;
pub mod workflow;
