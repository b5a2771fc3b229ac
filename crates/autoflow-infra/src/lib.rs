//! Infrastructure layer for autoflow.
//!
//! Contains implementations of the ports defined in `autoflow-core`:
//! SQLite storage, the reqwest HTTP transport, the HTTP mail relay, and the
//! configuration loader.

pub mod config;
pub mod sqlite;
pub mod workflow;
