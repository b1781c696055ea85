use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use super::entities::activity_log;
use super::entities::otp::{self, Entity as OtpEntity};
use crate::domain::{NewActivityLog, Otp};
use crate::errors::AppResult;
use crate::infra::unit_of_work::with_transaction;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait OtpRepository: Send + Sync {
    /// Store a freshly issued code together with its audit entry.
    async fn issue(&self, otp: Otp, entry: NewActivityLog) -> AppResult<Otp>;

    /// Most recently issued code for the user
    async fn latest_for_user(&self, user_id: Uuid) -> AppResult<Option<Otp>>;
}

pub struct OtpStore {
    db: DatabaseConnection,
}

impl OtpStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OtpRepository for OtpStore {
    async fn issue(&self, otp: Otp, entry: NewActivityLog) -> AppResult<Otp> {
        with_transaction(&self.db, |txn| {
            Box::pin(async move {
                let model = otp::ActiveModel {
                    id: Set(otp.id),
                    user_id: Set(otp.user_id),
                    otp_code: Set(otp.otp_code),
                    created_at: Set(otp.created_at),
                }
                .insert(txn)
                .await?;
                activity_log::ActiveModel::from_entry(entry, Utc::now())
                    .insert(txn)
                    .await?;
                Ok(Otp::from(model))
            })
        })
        .await
    }

    async fn latest_for_user(&self, user_id: Uuid) -> AppResult<Option<Otp>> {
        let model = OtpEntity::find()
            .filter(otp::Column::UserId.eq(user_id))
            .order_by_desc(otp::Column::CreatedAt)
            .one(&self.db)
            .await?;
        Ok(model.map(Otp::from))
    }
}
