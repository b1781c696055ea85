//! Centralized error handling.
//!
//! Provides a unified error type for the entire application,
//! with automatic HTTP response conversion.

use axum::{
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::domain::TransitionError;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication & Authorization
    #[error("Authentication required")]
    Unauthorized,

    #[error("Access denied")]
    Forbidden,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token has been revoked")]
    TokenRevoked,

    #[error("Invalid admin secret")]
    InvalidAdminSecret,

    #[error("Account is {0}")]
    AccountInactive(String),

    // Resource errors
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0} already exists")]
    Conflict(String),

    // Validation
    #[error("{0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    BadRequest(String),

    #[error("You already have a pending loan application")]
    PendingLoanExists { application_number: String },

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    #[error("Too many requests")]
    TooManyRequests { retry_after: u64 },

    // External service errors
    #[error("Database error")]
    Database(#[from] sea_orm::DbErr),

    #[error("Authentication error")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Cache error: {0}")]
    Cache(String),

    // Internal
    #[error("Internal server error")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
struct ErrorResponse {
    message: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    application_number: Option<String>,
}

impl AppError {
    /// Get error code for client
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Forbidden => "FORBIDDEN",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::TokenRevoked => "TOKEN_REVOKED",
            AppError::InvalidAdminSecret => "INVALID_ADMIN_SECRET",
            AppError::AccountInactive(_) => "ACCOUNT_INACTIVE",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::PendingLoanExists { .. } => "PENDING_LOAN_EXISTS",
            AppError::InvalidTransition(_) => "INVALID_STATUS_TRANSITION",
            AppError::TooManyRequests { .. } => "RATE_LIMITED",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Jwt(_) => "AUTH_ERROR",
            AppError::Cache(_) => "CACHE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get HTTP status code
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized
            | AppError::InvalidCredentials
            | AppError::TokenRevoked
            | AppError::InvalidAdminSecret
            | AppError::Jwt(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden | AppError::AccountInactive(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation(_)
            | AppError::BadRequest(_)
            | AppError::PendingLoanExists { .. }
            | AppError::InvalidTransition(_) => StatusCode::BAD_REQUEST,
            AppError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Database(_) | AppError::Cache(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get user-facing message (hides internal details)
    fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) | AppError::BadRequest(msg) => msg.clone(),
            AppError::TooManyRequests { .. } => {
                "Too many requests. Please try again later.".to_string()
            }

            // Hide details for internal/security errors
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "A database error occurred".to_string()
            }
            AppError::Jwt(e) => {
                tracing::warn!("JWT error: {:?}", e);
                "Invalid or expired token".to_string()
            }
            AppError::Cache(msg) => {
                tracing::error!("Cache error: {}", msg);
                "An internal error occurred".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }

            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.user_message();

        if status.is_client_error() {
            tracing::warn!(status = status.as_u16(), code = self.code(), %message, "Request rejected");
        }

        let retry_after = match &self {
            AppError::TooManyRequests { retry_after } => Some(*retry_after),
            _ => None,
        };

        let body = ErrorResponse {
            code: self.code(),
            application_number: match self {
                AppError::PendingLoanExists { application_number } => Some(application_number),
                _ => None,
            },
            message,
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(seconds) = retry_after {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(seconds));
            response
                .headers_mut()
                .insert("X-RateLimit-Remaining", HeaderValue::from_static("0"));
        }
        response
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Extension trait for Option -> AppError conversion
pub trait OptionExt<T> {
    fn ok_or_not_found(self, entity: &'static str) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, entity: &'static str) -> AppResult<T> {
        self.ok_or(AppError::NotFound(entity))
    }
}

/// Convenience constructors
impl AppError {
    pub fn conflict(entity: impl Into<String>) -> Self {
        AppError::Conflict(entity.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        AppError::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LoanAction, LoanStatus};

    async fn body_json(error: AppError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_validation_error_body() {
        let (status, body) = body_json(AppError::validation("Loan term is required")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Loan term is required");
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert!(body.get("application_number").is_none());
    }

    #[tokio::test]
    async fn test_pending_loan_error_carries_application_number() {
        let (status, body) = body_json(AppError::PendingLoanExists {
            application_number: "LN20250101000042".to_string(),
        })
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["application_number"], "LN20250101000042");
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let (status, body) = body_json(AppError::internal("pool exhausted at 10.0.0.3")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "An internal error occurred");
    }

    #[tokio::test]
    async fn test_transition_error_maps_to_bad_request() {
        let error = LoanStatus::Approved.apply(LoanAction::Reject).unwrap_err();
        let (status, body) = body_json(AppError::from(error)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Loan is already approved, cannot change status");
    }

    #[test]
    fn test_rate_limit_sets_retry_after() {
        let response = AppError::TooManyRequests { retry_after: 60 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[RETRY_AFTER], "60");
    }

    #[test]
    fn test_not_found_names_entity() {
        let missing: Option<u8> = None;
        let error = missing.ok_or_not_found("Withdrawal").unwrap_err();
        assert_eq!(error.to_string(), "Withdrawal not found");
        assert_eq!(error.status(), StatusCode::NOT_FOUND);
    }
}
