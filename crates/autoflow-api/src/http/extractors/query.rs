//! Query parameter extractors for list endpoints.

use serde::Deserialize;

/// Query parameters for the execution history endpoint.
#[derive(Debug, Deserialize, Default)]
pub struct ExecutionListQuery {
    /// Maximum results. Defaults to 50, capped at 200 by the store.
    pub limit: Option<u32>,
}
