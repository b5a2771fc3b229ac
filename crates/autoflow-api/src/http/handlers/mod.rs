//! HTTP request handlers for the REST API.

pub mod execution;
pub mod scheduler;
pub mod webhook;
pub mod workflow;
