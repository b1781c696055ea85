//! Authentication handlers.

use axum::{extract::State, middleware, response::Json, routing::post, Router};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::{auth_middleware, require_role, CurrentUser};
use crate::api::AppState;
use crate::domain::validation::{email_rule, password_rule, phone_rule};
use crate::domain::{UserResponse, UserRole};
use crate::errors::AppResult;
use crate::services::{AccessTokenResponse, LoginResponse};
use crate::types::{Created, MessageResponse};

/// Borrower registration request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 80, message = "Username must be 1-80 characters"))]
    #[schema(example = "bob")]
    pub username: String,
    #[validate(custom(function = "phone_rule"))]
    #[schema(example = "+15551234567")]
    pub phone_number: String,
    #[validate(custom(function = "password_rule"))]
    #[schema(example = "Abcd1234!", min_length = 8)]
    pub password: String,
}

/// Borrower login request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Phone number is required"))]
    #[schema(example = "+15551234567")]
    pub phone_number: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Admin registration request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AdminRegisterRequest {
    #[validate(length(min = 1, max = 80, message = "Username must be 1-80 characters"))]
    pub username: String,
    #[validate(custom(function = "email_rule"))]
    #[schema(example = "ops@example.com")]
    pub email: String,
    #[validate(custom(function = "password_rule"))]
    pub password: String,
    /// Must equal the configured admin registration secret
    pub admin_secret: String,
}

/// Admin login request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AdminLoginRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    #[schema(example = "ops@example.com")]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

/// Routes open to anonymous callers
pub fn public_auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/admin/login", post(admin_login))
        .route("/auth/refresh", post(refresh))
}

/// Routes that need an access token
pub fn protected_auth_routes(state: AppState) -> Router<AppState> {
    let admin_only = Router::new()
        .route("/auth/admin/register", post(admin_register))
        .route_layer(middleware::from_fn_with_state(UserRole::Admin, require_role));

    Router::new()
        .route("/auth/logout", post(logout))
        .merge(admin_only)
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Register a borrower and sign them in
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Authentication",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = LoginResponse),
        (status = 400, description = "Validation error"),
        (status = 409, description = "User already exists")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> AppResult<Created<LoginResponse>> {
    let response = state
        .auth_service
        .register_user(payload.username, payload.phone_number, payload.password)
        .await?;

    Ok(Created(response))
}

/// Borrower login by phone number
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account is not active")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let response = state
        .auth_service
        .login_user(payload.phone_number, payload.password)
        .await?;

    Ok(Json(response))
}

/// Create another admin account
#[utoipa::path(
    post,
    path = "/api/auth/admin/register",
    tag = "Authentication",
    request_body = AdminRegisterRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Admin created", body = UserResponse),
        (status = 401, description = "Invalid admin secret"),
        (status = 403, description = "Caller is not an admin"),
        (status = 409, description = "User already exists")
    )
)]
pub async fn admin_register(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedJson(payload): ValidatedJson<AdminRegisterRequest>,
) -> AppResult<Created<UserResponse>> {
    let admin = state
        .auth_service
        .register_admin(
            payload.username,
            payload.email,
            payload.password,
            payload.admin_secret,
        )
        .await?;

    tracing::info!(created_by = %user.id, admin_id = %admin.id, "Admin registered");
    Ok(Created(UserResponse::from(admin)))
}

/// Admin login by email
#[utoipa::path(
    post,
    path = "/api/auth/admin/login",
    tag = "Authentication",
    request_body = AdminLoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn admin_login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<AdminLoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let response = state
        .auth_service
        .login_admin(payload.email, payload.password)
        .await?;

    Ok(Json(response))
}

/// Exchange a refresh token for a new access token
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    tag = "Authentication",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token", body = AccessTokenResponse),
        (status = 401, description = "Invalid, expired or revoked refresh token")
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RefreshRequest>,
) -> AppResult<Json<AccessTokenResponse>> {
    let response = state.auth_service.refresh(payload.refresh_token).await?;
    Ok(Json(response))
}

/// Revoke the presented access token and its refresh token
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Token revoked", body = MessageResponse),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<MessageResponse>> {
    state.auth_service.logout(user.jti, user.session).await?;
    tracing::info!(user_id = %user.id, "Logged out");
    Ok(Json(MessageResponse::new("Successfully logged out")))
}
