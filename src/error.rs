// HTTP API Error Types
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};

use crate::listing::ListingError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    Validation {
        code: &'static str,
        message: String,
        field: Option<&'static str>,
    },
    InvalidJson(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 429 Too Many Requests
    TooManyRequests {
        message: String,
        retry_after_secs: u64,
    },

    // 500 Internal Server Error. `detail` is only set in diagnostic mode.
    InternalServerError {
        code: &'static str,
        message: String,
        detail: Option<String>,
    },
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::InvalidJson(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::InternalServerError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::Validation { message, .. } => message,
            ApiError::InvalidJson(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::TooManyRequests { message, .. } => message,
            ApiError::InternalServerError { message, .. } => message,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Validation { code, .. } => *code,
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::Unauthorized(_) => "UNAUTHENTICATED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::TooManyRequests { .. } => "TOO_MANY_REQUESTS",
            ApiError::InternalServerError { code, .. } => *code,
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        let mut error = json!({
            "code": self.error_code(),
            "message": self.message(),
        });

        match self {
            ApiError::Validation { field: Some(field), .. } => {
                error["field"] = json!(field);
            }
            ApiError::InternalServerError { detail: Some(detail), .. } => {
                error["detail"] = json!(detail);
            }
            _ => {}
        }

        json!({
            "success": false,
            "error": error
        })
    }

    /// Map a pipeline rejection. `expose_detail` is true only when the
    /// environment allows diagnostics.
    pub fn from_listing(err: ListingError, expose_detail: bool) -> Self {
        let message = err.to_string();
        match err {
            ListingError::Unauthenticated => ApiError::Unauthorized(message),
            ListingError::Forbidden => ApiError::Forbidden(message),
            ListingError::NotFound(_) => ApiError::NotFound(message),
            ListingError::PersistenceFailure { detail } => ApiError::InternalServerError {
                code: "PERSISTENCE_FAILURE",
                message,
                detail: expose_detail.then_some(detail),
            },
            other => ApiError::Validation {
                code: other.kind(),
                message,
                field: other.field(),
            },
        }
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    pub fn too_many_requests(message: impl Into<String>, retry_after_secs: u64) -> Self {
        ApiError::TooManyRequests {
            message: message.into(),
            retry_after_secs,
        }
    }
}

/// Never exposes persistence detail. Handlers that know the environment use
/// [`ApiError::from_listing`] instead.
impl From<ListingError> for ApiError {
    fn from(err: ListingError) -> Self {
        ApiError::from_listing(err, false)
    }
}

impl From<axum::extract::rejection::JsonRejection> for ApiError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        ApiError::invalid_json(rejection.body_text())
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let mut response = (self.status_code(), Json(self.to_json())).into_response();
        if let ApiError::TooManyRequests { retry_after_secs, .. } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::validators::ValidationError;

    #[test]
    fn validation_kinds_are_400_with_field() {
        let err = ApiError::from(ListingError::from(ValidationError::InvalidPhone));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        let body = err.to_json();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "INVALID_PHONE");
        assert_eq!(body["error"]["message"], "must have 11 digits");
        assert_eq!(body["error"]["field"], "contactPhone");
    }

    #[test]
    fn auth_kinds_map_to_distinct_statuses() {
        assert_eq!(ApiError::from(ListingError::Unauthenticated).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::from(ListingError::Forbidden).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::from(ListingError::NotFound(3)).status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn persistence_detail_only_in_diagnostic_mode() {
        let failure = || ListingError::persistence("relation \"listings\" does not exist");

        let hidden = ApiError::from_listing(failure(), false).to_json();
        assert_eq!(hidden["error"]["code"], "PERSISTENCE_FAILURE");
        assert!(hidden["error"].get("detail").is_none());
        assert!(!hidden.to_string().contains("relation"));

        let shown = ApiError::from_listing(failure(), true).to_json();
        assert_eq!(shown["error"]["detail"], "relation \"listings\" does not exist");
    }

    #[test]
    fn rate_limit_sets_retry_after() {
        let response = ApiError::too_many_requests("slow down", 42).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
    }
}
