//! Authentication service: registration, login, token refresh and revocation.
//!
//! Borrowers sign in with their phone number and admins with their email.
//! Every token carries a `jti`, and both tokens of a login share a session
//! id (`sid`), so that logout revokes the access token and its refresh token.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::{
    Config, SECONDS_PER_MINUTE, TOKEN_KIND_ACCESS, TOKEN_KIND_REFRESH, TOKEN_TYPE_BEARER,
};
use crate::domain::{NewUser, Password, User, UserRole};
use crate::errors::{AppError, AppResult};
use crate::infra::UnitOfWork;

/// JWT claims payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: String,
    /// `access` or `refresh`
    pub token_type: String,
    pub jti: String,
    /// Login session shared by an access token and its refresh token
    pub sid: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn role(&self) -> UserRole {
        UserRole::from(self.role.as_str())
    }

    pub fn is_access(&self) -> bool {
        self.token_type == TOKEN_KIND_ACCESS
    }

    pub fn is_refresh(&self) -> bool {
        self.token_type == TOKEN_KIND_REFRESH
    }
}

/// Access and refresh tokens issued on login
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub access_token: String,
    pub refresh_token: String,
    #[schema(example = "Bearer")]
    pub token_type: String,
    /// Access token lifetime in seconds
    #[schema(example = 3600)]
    pub expires_in: i64,
}

/// Fresh access token returned by refresh
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccessTokenResponse {
    pub access_token: String,
    #[schema(example = "Bearer")]
    pub token_type: String,
    #[schema(example = 3600)]
    pub expires_in: i64,
}

/// Account summary embedded in login responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
    #[schema(example = "user")]
    pub role: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            role: user.role.to_string(),
            email: user.email.clone(),
            phone_number: user.phone_number.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub user: AuthUser,
    pub tokens: TokenPair,
}

#[async_trait]
pub trait AuthService: Send + Sync {
    /// Create a borrower account and sign it in.
    async fn register_user(
        &self,
        username: String,
        phone_number: String,
        password: String,
    ) -> AppResult<LoginResponse>;

    async fn login_user(&self, phone_number: String, password: String) -> AppResult<LoginResponse>;

    /// Create an admin account; `admin_secret` must match the configured secret.
    async fn register_admin(
        &self,
        username: String,
        email: String,
        password: String,
        admin_secret: String,
    ) -> AppResult<User>;

    /// Create an admin account without the shared secret (CLI bootstrap).
    async fn create_admin(&self, username: String, email: String, password: String)
        -> AppResult<User>;

    async fn login_admin(&self, email: String, password: String) -> AppResult<LoginResponse>;

    /// Exchange a refresh token for a new access token.
    async fn refresh(&self, refresh_token: String) -> AppResult<AccessTokenResponse>;

    /// Revoke the token identified by `jti` and every token of its login session.
    async fn logout(&self, jti: String, session: String) -> AppResult<()>;

    /// Verify an access token and make sure it has not been revoked.
    async fn authenticate(&self, token: String) -> AppResult<Claims>;

    /// Verify signature and expiry only.
    fn verify_token(&self, token: &str) -> AppResult<Claims>;
}

// Verified when the account does not exist so that unknown logins take as long as bad passwords.
static DUMMY_HASH: Lazy<Option<Password>> = Lazy::new(|| Password::new("Dummy-passw0rd!").ok());

fn sign(
    user: &User,
    kind: &str,
    lifetime: Duration,
    session: &str,
    config: &Config,
) -> AppResult<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id,
        role: user.role.to_string(),
        token_type: kind.to_string(),
        jti: Uuid::new_v4().to_string(),
        sid: session.to_string(),
        exp: (now + lifetime).timestamp(),
        iat: now.timestamp(),
    };

    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret_bytes()),
    )?)
}

fn access_lifetime(config: &Config) -> (Duration, i64) {
    (
        Duration::minutes(config.access_token_minutes),
        config.access_token_minutes * SECONDS_PER_MINUTE,
    )
}

fn issue_tokens(user: &User, config: &Config) -> AppResult<LoginResponse> {
    let (lifetime, expires_in) = access_lifetime(config);
    let session = Uuid::new_v4().to_string();
    let tokens = TokenPair {
        access_token: sign(user, TOKEN_KIND_ACCESS, lifetime, &session, config)?,
        refresh_token: sign(
            user,
            TOKEN_KIND_REFRESH,
            Duration::days(config.refresh_token_days),
            &session,
            config,
        )?,
        token_type: TOKEN_TYPE_BEARER.to_string(),
        expires_in,
    };
    Ok(LoginResponse {
        user: AuthUser::from(user),
        tokens,
    })
}

/// Check the password, then the account status.
fn check_credentials(user: Option<User>, password: &str) -> AppResult<User> {
    let Some(user) = user else {
        if let Some(dummy) = DUMMY_HASH.as_ref() {
            dummy.verify(password);
        }
        return Err(AppError::InvalidCredentials);
    };

    if !Password::from_hash(user.password_hash.clone()).verify(password) {
        return Err(AppError::InvalidCredentials);
    }
    if !user.is_active() {
        return Err(AppError::AccountInactive(user.account_status.to_string()));
    }
    Ok(user)
}

/// Concrete implementation of AuthService using Unit of Work.
pub struct Authenticator<U: UnitOfWork> {
    uow: Arc<U>,
    config: Config,
}

impl<U: UnitOfWork> Authenticator<U> {
    pub fn new(uow: Arc<U>, config: Config) -> Self {
        Self { uow, config }
    }

    /// Reject a token whose own id or login session has been revoked.
    async fn ensure_not_revoked(&self, claims: &Claims) -> AppResult<()> {
        let tokens = self.uow.tokens();
        if tokens.is_revoked(&claims.jti).await? || tokens.is_revoked(&claims.sid).await? {
            return Err(AppError::TokenRevoked);
        }
        Ok(())
    }
}

#[async_trait]
impl<U: UnitOfWork> AuthService for Authenticator<U> {
    async fn register_user(
        &self,
        username: String,
        phone_number: String,
        password: String,
    ) -> AppResult<LoginResponse> {
        let username = username.trim().to_string();
        if self
            .uow
            .users()
            .identity_taken(username.clone(), None, Some(phone_number.clone()))
            .await?
        {
            return Err(AppError::conflict("User"));
        }

        let password_hash = Password::new(&password)?.into_string();
        let user = self
            .uow
            .users()
            .create(NewUser::borrower(username, phone_number, password_hash))
            .await?;

        tracing::info!(user_id = %user.id, "Borrower registered");
        issue_tokens(&user, &self.config)
    }

    async fn login_user(&self, phone_number: String, password: String) -> AppResult<LoginResponse> {
        let user = self.uow.users().find_by_phone(&phone_number).await?;
        let user = check_credentials(user, &password)?;
        issue_tokens(&user, &self.config)
    }

    async fn register_admin(
        &self,
        username: String,
        email: String,
        password: String,
        admin_secret: String,
    ) -> AppResult<User> {
        match self.config.admin_register_secret() {
            Some(expected) if expected == admin_secret => {}
            _ => return Err(AppError::InvalidAdminSecret),
        }
        self.create_admin(username, email, password).await
    }

    async fn create_admin(
        &self,
        username: String,
        email: String,
        password: String,
    ) -> AppResult<User> {
        let username = username.trim().to_string();
        let email = email.trim().to_lowercase();
        if self
            .uow
            .users()
            .identity_taken(username.clone(), Some(email.clone()), None)
            .await?
        {
            return Err(AppError::conflict("User"));
        }

        let password_hash = Password::new(&password)?.into_string();
        let admin = self
            .uow
            .users()
            .create(NewUser::admin(username, email, password_hash))
            .await?;

        tracing::info!(admin_id = %admin.id, "Admin account created");
        Ok(admin)
    }

    async fn login_admin(&self, email: String, password: String) -> AppResult<LoginResponse> {
        let user = self
            .uow
            .users()
            .find_by_email(&email.trim().to_lowercase())
            .await?
            .filter(User::is_admin);
        let admin = check_credentials(user, &password)?;
        issue_tokens(&admin, &self.config)
    }

    async fn refresh(&self, refresh_token: String) -> AppResult<AccessTokenResponse> {
        let claims = self.verify_token(&refresh_token)?;
        if !claims.is_refresh() {
            return Err(AppError::Unauthorized);
        }
        self.ensure_not_revoked(&claims).await?;

        let user = self
            .uow
            .users()
            .find_by_id(claims.sub)
            .await?
            .ok_or(AppError::Unauthorized)?;
        if !user.is_active() {
            return Err(AppError::AccountInactive(user.account_status.to_string()));
        }

        let (lifetime, expires_in) = access_lifetime(&self.config);
        Ok(AccessTokenResponse {
            access_token: sign(&user, TOKEN_KIND_ACCESS, lifetime, &claims.sid, &self.config)?,
            token_type: TOKEN_TYPE_BEARER.to_string(),
            expires_in,
        })
    }

    async fn logout(&self, jti: String, session: String) -> AppResult<()> {
        let tokens = self.uow.tokens();
        tokens.revoke(&jti).await?;
        tokens.revoke(&session).await?;
        tracing::info!(%jti, %session, "Token and session revoked");
        Ok(())
    }

    async fn authenticate(&self, token: String) -> AppResult<Claims> {
        let claims = self.verify_token(&token)?;
        if !claims.is_access() {
            return Err(AppError::Unauthorized);
        }
        self.ensure_not_revoked(&claims).await?;
        Ok(claims)
    }

    fn verify_token(&self, token: &str) -> AppResult<Claims> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret_bytes()),
            &Validation::default(),
        )?;
        Ok(data.claims)
    }
}
