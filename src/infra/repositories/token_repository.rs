use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, Set, SqlErr,
};
use uuid::Uuid;

use super::entities::token_blocklist::{self, Entity as TokenEntity};
use crate::errors::AppResult;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Blocklist of revoked token ids (`jti`).
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Revoking the same token twice is a no-op.
    async fn revoke(&self, jti: &str) -> AppResult<()>;

    async fn is_revoked(&self, jti: &str) -> AppResult<bool>;
}

pub struct TokenStore {
    db: DatabaseConnection,
}

impl TokenStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn is_duplicate(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[async_trait]
impl TokenRepository for TokenStore {
    async fn revoke(&self, jti: &str) -> AppResult<()> {
        let entry = token_blocklist::ActiveModel {
            id: Set(Uuid::new_v4()),
            jti: Set(jti.to_string()),
            created_at: Set(Utc::now()),
        };
        match entry.insert(&self.db).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate(&e) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn is_revoked(&self, jti: &str) -> AppResult<bool> {
        let count = TokenEntity::find()
            .filter(token_blocklist::Column::Jti.eq(jti))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }
}
