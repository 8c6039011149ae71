//! JSON error envelope returned by every endpoint.
//!
//! ```json
//! {
//!   "error": {
//!     "message": "Invalid request field 'content_size': must be >= 0, got -1",
//!     "type": "invalid_request_error",
//!     "code": "invalid_request"
//!   }
//! }
//! ```

use crate::scoring::RoutingError;
use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};

/// Error response body.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiError {
    pub error: ApiErrorBody,
}

/// Error details.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiErrorBody {
    pub message: String,
    pub r#type: String,
    pub code: String,
}

impl ApiError {
    fn new(message: impl Into<String>, r#type: &str, code: &str) -> Self {
        Self {
            error: ApiErrorBody {
                message: message.into(),
                r#type: r#type.to_string(),
                code: code.to_string(),
            },
        }
    }

    /// Create a bad request error (400).
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(message, "invalid_request_error", "invalid_request")
    }

    /// Create an internal error (500).
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(message, "server_error", "internal_error")
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self.error.code.as_str() {
            "invalid_request" => StatusCode::BAD_REQUEST,
            "backend_not_found" => StatusCode::NOT_FOUND,
            "duplicate_backend" => StatusCode::CONFLICT,
            "no_available_backends" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RoutingError> for ApiError {
    fn from(err: RoutingError) -> Self {
        let r#type = match &err {
            RoutingError::InvalidRequest { .. } => "invalid_request_error",
            RoutingError::BackendNotFound(_) => "not_found_error",
            RoutingError::DuplicateBackend(_) => "conflict_error",
            RoutingError::NoAvailableBackends { .. }
            | RoutingError::BackendRegistryUnavailable(_) => "server_error",
        };
        Self::new(err.to_string(), r#type, err.kind())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_error_status_codes() {
        let cases = [
            (
                RoutingError::invalid("content_type", "must not be empty"),
                StatusCode::BAD_REQUEST,
            ),
            (
                RoutingError::NoAvailableBackends {
                    requested: vec!["ipfs".to_string()],
                },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                RoutingError::BackendRegistryUnavailable("lock poisoned".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                RoutingError::BackendNotFound("s3".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (
                RoutingError::DuplicateBackend("s3".to_string()),
                StatusCode::CONFLICT,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn test_envelope_shape() {
        let error = ApiError::from(RoutingError::invalid("content_size", "must be >= 0"));
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["error"]["type"], "invalid_request_error");
        assert_eq!(json["error"]["code"], "invalid_request");
        assert!(json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("content_size"));
    }

    #[test]
    fn test_internal_error_is_500() {
        assert_eq!(
            ApiError::internal("boom").into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
