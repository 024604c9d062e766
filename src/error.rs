// HTTP API error types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::store::StoreError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 500 Internal Server Error
    InternalServerError(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::InternalServerError(_) => 500,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        json!({
            "error": true,
            "message": self.message(),
            "code": self.error_code()
        })
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(e) => ApiError::bad_request(e.to_string()),
            StoreError::IncorrectPassword => ApiError::forbidden(err.to_string()),
            StoreError::AccessDenied => ApiError::unauthorized(err.to_string()),
            StoreError::NotFound(_) => ApiError::not_found(err.to_string()),
            // Duplicate user/member reads as an authorization failure to the
            // client, matching the contract the frontend was built against.
            StoreError::Conflict(msg) => ApiError::unauthorized(msg),
            StoreError::Database(e) => {
                tracing::error!("database error: {}", e);
                ApiError::internal_server_error("Something went wrong")
            }
            StoreError::Hash(e) => {
                tracing::error!("password hashing error: {}", e);
                ApiError::internal_server_error("Something went wrong")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationError;

    #[test]
    fn store_errors_map_to_expected_statuses() {
        let cases: Vec<(StoreError, u16)> = vec![
            (
                StoreError::Validation(ValidationError {
                    field: "username",
                    message: "Username is invalid".to_string(),
                }),
                400,
            ),
            (StoreError::IncorrectPassword, 403),
            (StoreError::AccessDenied, 401),
            (StoreError::NotFound("Project"), 404),
            (StoreError::Conflict("User already exists".to_string()), 401),
            (StoreError::Database(sqlx::Error::PoolTimedOut), 500),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }

    #[test]
    fn internal_errors_hide_details() {
        let api: ApiError = StoreError::Database(sqlx::Error::PoolTimedOut).into();
        assert_eq!(api.message(), "Something went wrong");
    }

    #[test]
    fn not_found_carries_entity_name() {
        let api: ApiError = StoreError::NotFound("Message").into();
        assert_eq!(api.message(), "Message not found");
        assert_eq!(api.to_json()["code"], "NOT_FOUND");
    }
}
