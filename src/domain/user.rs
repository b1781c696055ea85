//! User domain entity and related types.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::{
    ACCOUNT_ACTIVE, ACCOUNT_BANNED, ACCOUNT_INACTIVE, ACCOUNT_SUSPENDED, ROLE_ADMIN, ROLE_USER,
};
use crate::errors::AppError;

/// User roles enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

impl UserRole {
    /// Check if this role has admin privileges
    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    /// Check if this role can access a required role
    pub fn can_access(&self, required: &UserRole) -> bool {
        match self {
            UserRole::Admin => true,
            UserRole::User => matches!(required, UserRole::User),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => ROLE_ADMIN,
            UserRole::User => ROLE_USER,
        }
    }
}

impl From<&str> for UserRole {
    fn from(s: &str) -> Self {
        match s {
            ROLE_ADMIN => UserRole::Admin,
            _ => UserRole::User,
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a user account. Only active accounts may sign in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountStatus {
    Active,
    Inactive,
    Banned,
    Suspended,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => ACCOUNT_ACTIVE,
            AccountStatus::Inactive => ACCOUNT_INACTIVE,
            AccountStatus::Banned => ACCOUNT_BANNED,
            AccountStatus::Suspended => ACCOUNT_SUSPENDED,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, AccountStatus::Active)
    }
}

impl FromStr for AccountStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ACCOUNT_ACTIVE => Ok(AccountStatus::Active),
            ACCOUNT_INACTIVE => Ok(AccountStatus::Inactive),
            ACCOUNT_BANNED => Ok(AccountStatus::Banned),
            ACCOUNT_SUSPENDED => Ok(AccountStatus::Suspended),
            other => Err(AppError::validation(format!("Invalid account status: {}", other))),
        }
    }
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User domain entity.
///
/// Borrowers sign in with their phone number, admins with their email.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub password_hash: String,
    pub role: UserRole,
    pub account_status: AccountStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Check if user has admin role
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn is_active(&self) -> bool {
        self.account_status.is_active()
    }

    /// Cascading deactivation applied when an admin deletes one of the user's loans.
    pub fn deactivate(&mut self, now: DateTime<Utc>) {
        self.account_status = AccountStatus::Inactive;
        self.updated_at = now;
    }
}

/// Data needed to insert a user row
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub password_hash: String,
    pub role: UserRole,
}

impl NewUser {
    pub fn borrower(username: String, phone_number: String, password_hash: String) -> Self {
        Self {
            username,
            email: None,
            phone_number: Some(phone_number),
            password_hash,
            role: UserRole::User,
        }
    }

    pub fn admin(username: String, email: String, password_hash: String) -> Self {
        Self {
            username,
            email: Some(email),
            phone_number: None,
            password_hash,
            role: UserRole::Admin,
        }
    }
}

/// User response (safe to return to client)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    /// Unique user identifier
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,
    #[schema(example = "bob")]
    pub username: String,
    #[schema(example = "admin@example.com")]
    pub email: Option<String>,
    #[schema(example = "+15551234567")]
    pub phone_number: Option<String>,
    #[schema(example = "user")]
    pub role: String,
    #[schema(example = "active")]
    pub account_status: String,
    /// Account creation timestamp
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            phone_number: user.phone_number,
            role: user.role.to_string(),
            account_status: user.account_status.to_string(),
            created_at: user.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_can_access_user_routes() {
        assert!(UserRole::Admin.can_access(&UserRole::User));
        assert!(UserRole::Admin.can_access(&UserRole::Admin));
        assert!(!UserRole::User.can_access(&UserRole::Admin));
    }

    #[test]
    fn test_account_status_round_trip() {
        for status in [
            AccountStatus::Active,
            AccountStatus::Inactive,
            AccountStatus::Banned,
            AccountStatus::Suspended,
        ] {
            assert_eq!(status.as_str().parse::<AccountStatus>().unwrap(), status);
        }
        assert!("deleted".parse::<AccountStatus>().is_err());
    }

    #[test]
    fn test_deactivate() {
        let now = Utc::now();
        let mut user = User {
            id: Uuid::new_v4(),
            username: "bob".into(),
            email: None,
            phone_number: Some("+15551234567".into()),
            password_hash: "hash".into(),
            role: UserRole::User,
            account_status: AccountStatus::Active,
            created_at: now,
            updated_at: now,
        };
        user.deactivate(now);
        assert!(!user.is_active());
        assert_eq!(UserResponse::from(user).account_status, "inactive");
    }
}
