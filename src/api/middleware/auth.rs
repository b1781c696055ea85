//! JWT authentication and role middleware.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use uuid::Uuid;

use crate::api::AppState;
use crate::domain::{AuditContext, UserRole};
use crate::errors::AppError;

/// Authenticated caller extracted from the access token
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: Uuid,
    pub role: UserRole,
    /// Token id, revoked on logout
    pub jti: String,
    /// Login session, revoked on logout together with its refresh token
    pub session: String,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Audit context for an admin mutation issued by this caller.
    pub fn audit(&self, ip_address: Option<String>) -> AuditContext {
        AuditContext::new(self.id, ip_address)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

/// JWT authentication middleware.
///
/// Validates the bearer access token (refresh tokens and revoked ids are
/// refused), then injects the CurrentUser into the request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(AppError::Unauthorized)?;

    let claims = state
        .auth_service
        .authenticate(bearer.token().to_string())
        .await?;

    let current_user = CurrentUser {
        id: claims.sub,
        role: claims.role(),
        jti: claims.jti,
        session: claims.sid,
    };

    request.extensions_mut().insert(current_user);

    Ok(next.run(request).await)
}

/// Refuse callers whose role does not cover `required`.
///
/// Runs after `auth_middleware`; registered with
/// `middleware::from_fn_with_state(UserRole::Admin, require_role)`.
pub async fn require_role(
    State(required): State<UserRole>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = request
        .extensions()
        .get::<CurrentUser>()
        .ok_or(AppError::Unauthorized)?;

    if !user.role.can_access(&required) {
        tracing::warn!(user_id = %user.id, required = %required, "Role check failed");
        return Err(AppError::Forbidden);
    }

    Ok(next.run(request).await)
}
