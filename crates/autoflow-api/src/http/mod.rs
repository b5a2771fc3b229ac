//! HTTP/REST API layer for autoflow.
//!
//! Axum-based REST API at `/api/v1/` with envelope responses, `X-User-Id`
//! attribution, and CORS support.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod router;
