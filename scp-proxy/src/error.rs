//! Error types for scp-proxy
//!
//! Maps the shared failure taxonomy onto HTTP status codes. Every failing
//! response carries the same body shape: `{ "error": "<message>" }`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use scp_common::catalog::ErrorBody;
use scp_common::error::{NO_MEDIA_MESSAGE, STREAM_NOT_FOUND_MESSAGE, TRACK_NOT_FOUND_MESSAGE};
use thiserror::Error;

/// Public message for upstream faults; details stay in the server log
pub const CATALOG_FAULT_MESSAGE: &str = "Catalog unavailable";

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("{0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("{0}")]
    BadRequest(String),

    /// Internal server error (500)
    #[error("{0}")]
    Internal(String),
}

impl From<scp_common::Error> for ApiError {
    fn from(err: scp_common::Error) -> Self {
        use scp_common::Error;

        match err {
            Error::StreamNotFound(_) => ApiError::NotFound(STREAM_NOT_FOUND_MESSAGE.to_string()),
            Error::NoMediaAvailable(_) => ApiError::NotFound(NO_MEDIA_MESSAGE.to_string()),
            Error::TrackNotFound(_) => ApiError::NotFound(TRACK_NOT_FOUND_MESSAGE.to_string()),
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            Error::CatalogUnavailable(_) | Error::AudioOutputFault(_) | Error::Config(_) => {
                ApiError::Internal(CATALOG_FAULT_MESSAGE.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorBody {
            error: self.to_string(),
        });

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
