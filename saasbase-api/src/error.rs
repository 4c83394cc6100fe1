/// Error handling for the API server
///
/// This module provides a unified error type that maps to HTTP responses.
/// All handlers return `Result<T, ApiError>` which automatically converts
/// to the appropriate HTTP status code.
///
/// Error bodies carry machine-readable keys in an `errors` array, e.g.
/// `{"errors": ["accountNotFound"]}`. Validation failures additionally
/// carry a per-field `details` list.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use saasbase_shared::auth::jwt::JwtError;
use saasbase_shared::auth::password::PasswordError;
use saasbase_shared::binding::BindError;
use saasbase_shared::reset::ResetError;
use saasbase_shared::store::StoreError;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400) with a machine-readable error key
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403)
    Forbidden(String),

    /// Not found (404) with a machine-readable error key
    NotFound(String),

    /// Submitted form data failed validation (400)
    ValidationError(Vec<ValidationErrorDetail>),

    /// Internal server error (500)
    InternalError(String),
}

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error keys (e.g., "accountNotFound")
    pub errors: Vec<String>,

    /// Optional per-field validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(key) => write!(f, "Bad request: {}", key),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(key) => write!(f, "Not found: {}", key),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, errors, details) = match self {
            ApiError::BadRequest(key) => (StatusCode::BAD_REQUEST, vec![key], None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, vec![msg], None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, vec![msg], None),
            ApiError::NotFound(key) => (StatusCode::NOT_FOUND, vec![key], None),
            ApiError::ValidationError(errors) => {
                let keys = errors.iter().map(|e| e.message.clone()).collect();
                (StatusCode::BAD_REQUEST, keys, Some(errors))
            }
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    vec!["internalError".to_string()],
                    None,
                )
            }
        };

        let body = Json(ErrorResponse { errors, details });

        (status, body).into_response()
    }
}

/// Convert storage errors to API errors
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::InternalError(format!("Storage error: {}", err))
    }
}

/// Convert password-reset errors to API errors
impl From<ResetError> for ApiError {
    fn from(err: ResetError) -> Self {
        match err {
            ResetError::AccountNotFound => {
                ApiError::NotFound("accountNotFound".to_string())
            }
            ResetError::TooSoon => ApiError::BadRequest("notEnoughTimeAgo".to_string()),
            ResetError::MissingToken => {
                ApiError::BadRequest("noConfirmationToken".to_string())
            }
            ResetError::InvalidToken => {
                ApiError::NotFound("noValidConfirmationToken".to_string())
            }
            ResetError::ValidationFailed(fields) => ApiError::ValidationError(
                fields
                    .into_iter()
                    .map(|e| ValidationErrorDetail {
                        field: e.field,
                        message: e.message,
                    })
                    .collect(),
            ),
            ResetError::Store(err) => err.into(),
            ResetError::Password(err) => err.into(),
        }
    }
}

/// Convert subscription-binding errors to API errors
impl From<BindError> for ApiError {
    fn from(err: BindError) -> Self {
        match err {
            BindError::Unauthenticated => {
                ApiError::Unauthorized("unauthenticated".to_string())
            }
            BindError::InvalidBinding => {
                ApiError::BadRequest("invalidSubscriptionBinding".to_string())
            }
            BindError::Store(err) => err.into(),
        }
    }
}

/// Convert password errors to API errors
impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

/// Convert JWT errors to API errors
impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => ApiError::Unauthorized("tokenExpired".to_string()),
            JwtError::Create(_) => {
                ApiError::InternalError("Token creation failed".to_string())
            }
            _ => ApiError::Unauthorized("invalidToken".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("notEnoughTimeAgo".to_string());
        assert_eq!(err.to_string(), "Bad request: notEnoughTimeAgo");

        let err = ApiError::NotFound("accountNotFound".to_string());
        assert_eq!(err.to_string(), "Not found: accountNotFound");
    }

    #[test]
    fn test_reset_error_mapping() {
        let err: ApiError = ResetError::AccountNotFound.into();
        assert!(matches!(err, ApiError::NotFound(ref key) if key == "accountNotFound"));

        let err: ApiError = ResetError::TooSoon.into();
        assert!(matches!(err, ApiError::BadRequest(ref key) if key == "notEnoughTimeAgo"));

        let err: ApiError = ResetError::MissingToken.into();
        assert!(matches!(err, ApiError::BadRequest(ref key) if key == "noConfirmationToken"));

        let err: ApiError = ResetError::InvalidToken.into();
        assert!(matches!(err, ApiError::NotFound(ref key) if key == "noValidConfirmationToken"));
    }

    #[test]
    fn test_validation_error_display() {
        let errors = vec![
            ValidationErrorDetail {
                field: "email".to_string(),
                message: "invalidEmail".to_string(),
            },
            ValidationErrorDetail {
                field: "plainPassword".to_string(),
                message: "passwordTooShort".to_string(),
            },
        ];

        let err = ApiError::ValidationError(errors);
        assert_eq!(err.to_string(), "Validation failed: 2 errors");
    }
}
