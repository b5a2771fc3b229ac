//! Custom axum extractors.

pub mod query;
pub mod user;
