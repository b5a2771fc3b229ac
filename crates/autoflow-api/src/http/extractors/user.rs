//! Acting-user extractor.
//!
//! Requests are attributed to the user named by the `X-User-Id` header.
//! Without the header the configured default user is used.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::http::error::AppError;
use crate::state::AppState;

/// Header carrying the acting user's numeric id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The user a request acts on behalf of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActingUser {
    pub id: i64,
    /// Whether the id came from the request rather than the default.
    pub explicit: bool,
}

impl FromRequestParts<AppState> for ActingUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match parts.headers.get(USER_ID_HEADER) {
            Some(value) => {
                let id = value
                    .to_str()
                    .ok()
                    .and_then(|v| v.trim().parse::<i64>().ok())
                    .ok_or_else(|| {
                        AppError::Validation("X-User-Id must be an integer".to_string())
                    })?;
                Ok(ActingUser { id, explicit: true })
            }
            None => Ok(ActingUser {
                id: state.config.default_user_id,
                explicit: false,
            }),
        }
    }
}
