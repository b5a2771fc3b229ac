//! Business logic and repository trait definitions for autoflow.
//!
//! This crate defines the "ports" (repository trait, HTTP and mail
//! transports, transformer) that the infrastructure layer implements, plus
//! the execution engine and scheduler built on top of them. It depends only
//! on `autoflow-types` -- never on `autoflow-infra` or any database/IO crate.

pub mod repository;
pub mod service;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;
