//! Fixed-window rate limiting keyed by client address.

use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};

use crate::api::extractors::client_identifier;
use crate::api::AppState;
use crate::config::{
    RATE_LIMIT_AUTH_REQUESTS, RATE_LIMIT_AUTH_WINDOW_SECONDS, RATE_LIMIT_REQUESTS,
    RATE_LIMIT_WINDOW_SECONDS,
};
use crate::errors::AppError;

#[derive(Debug, Clone, Copy)]
struct Tier {
    name: &'static str,
    max_requests: u64,
    window_seconds: u64,
}

const GENERAL: Tier = Tier {
    name: "general",
    max_requests: RATE_LIMIT_REQUESTS,
    window_seconds: RATE_LIMIT_WINDOW_SECONDS,
};

const AUTH: Tier = Tier {
    name: "auth",
    max_requests: RATE_LIMIT_AUTH_REQUESTS,
    window_seconds: RATE_LIMIT_AUTH_WINDOW_SECONDS,
};

async fn enforce(
    state: &AppState,
    tier: Tier,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client_id = client_identifier(request.headers(), request.extensions())
        .unwrap_or_else(|| "unknown".to_string());
    let key = format!("{}:{}", tier.name, client_id);

    let decision = match state
        .cache
        .check_rate_limit(&key, tier.max_requests, tier.window_seconds)
        .await
    {
        Ok(decision) => decision,
        Err(e) => {
            // Fail closed when the cache is unreachable.
            tracing::error!(error = %e, tier = tier.name, "Rate limit check failed - denying request");
            return Err(AppError::TooManyRequests {
                retry_after: tier.window_seconds,
            });
        }
    };

    if !decision.allowed {
        tracing::warn!(
            client = %client_id,
            tier = tier.name,
            count = decision.count,
            "Rate limit exceeded"
        );
        return Err(AppError::TooManyRequests {
            retry_after: tier.window_seconds,
        });
    }

    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Limit", HeaderValue::from(decision.limit));
    headers.insert("X-RateLimit-Remaining", HeaderValue::from(decision.remaining()));

    Ok(response)
}

/// General rate limiting middleware.
/// Limits requests to RATE_LIMIT_REQUESTS per RATE_LIMIT_WINDOW_SECONDS.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    enforce(&state, GENERAL, request, next).await
}

/// Stricter rate limiting for authentication endpoints.
/// Limits requests to RATE_LIMIT_AUTH_REQUESTS per RATE_LIMIT_AUTH_WINDOW_SECONDS.
pub async fn rate_limit_auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    enforce(&state, AUTH, request, next).await
}
