use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QueryTrait,
};
use uuid::Uuid;

use super::entities::activity_log;
use super::entities::withdrawal::{self, Entity as WithdrawalEntity};
use super::filters::conflict_on_unique;
use crate::domain::{NewActivityLog, Withdrawal, WithdrawalStatus};
use crate::errors::AppResult;
use crate::infra::unit_of_work::with_transaction;
use crate::types::{PageRequest, Paginated};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait WithdrawalRepository: Send + Sync {
    async fn create(&self, withdrawal: Withdrawal) -> AppResult<Withdrawal>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Withdrawal>>;

    /// The withdrawal, only if `user_id` owns it.
    async fn find_owned(&self, id: Uuid, user_id: Uuid) -> AppResult<Option<Withdrawal>>;

    /// Newest first
    async fn list_for_user(
        &self,
        user_id: Uuid,
        status: Option<WithdrawalStatus>,
        page: PageRequest,
    ) -> AppResult<Paginated<Withdrawal>>;

    async fn save(&self, withdrawal: Withdrawal) -> AppResult<Withdrawal>;

    /// Persist the withdrawal and its audit entry atomically.
    async fn save_with_audit(
        &self,
        withdrawal: Withdrawal,
        entry: NewActivityLog,
    ) -> AppResult<Withdrawal>;
}

pub struct WithdrawalStore {
    db: DatabaseConnection,
}

impl WithdrawalStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl WithdrawalRepository for WithdrawalStore {
    async fn create(&self, withdrawal: Withdrawal) -> AppResult<Withdrawal> {
        let model = withdrawal::ActiveModel::from(&withdrawal)
            .insert(&self.db)
            .await
            .map_err(|e| conflict_on_unique(e, "Withdrawal"))?;
        Withdrawal::try_from(model)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Withdrawal>> {
        WithdrawalEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(Withdrawal::try_from)
            .transpose()
    }

    async fn find_owned(&self, id: Uuid, user_id: Uuid) -> AppResult<Option<Withdrawal>> {
        WithdrawalEntity::find_by_id(id)
            .filter(withdrawal::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?
            .map(Withdrawal::try_from)
            .transpose()
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        status: Option<WithdrawalStatus>,
        page: PageRequest,
    ) -> AppResult<Paginated<Withdrawal>> {
        let paginator = WithdrawalEntity::find()
            .filter(withdrawal::Column::UserId.eq(user_id))
            .apply_if(status, |query, status| {
                query.filter(withdrawal::Column::Status.eq(status.as_str()))
            })
            .order_by_desc(withdrawal::Column::CreatedAt)
            .order_by_asc(withdrawal::Column::Id)
            .paginate(&self.db, page.per_page);

        let total = paginator.num_items().await?;
        let withdrawals = paginator
            .fetch_page(page.index())
            .await?
            .into_iter()
            .map(Withdrawal::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Paginated::new(withdrawals, total, page))
    }

    async fn save(&self, withdrawal: Withdrawal) -> AppResult<Withdrawal> {
        let model = withdrawal::ActiveModel::from(&withdrawal)
            .update(&self.db)
            .await?;
        Withdrawal::try_from(model)
    }

    async fn save_with_audit(
        &self,
        withdrawal: Withdrawal,
        entry: NewActivityLog,
    ) -> AppResult<Withdrawal> {
        with_transaction(&self.db, |txn| {
            Box::pin(async move {
                let model = withdrawal::ActiveModel::from(&withdrawal)
                    .update(txn)
                    .await?;
                activity_log::ActiveModel::from_entry(entry, Utc::now())
                    .insert(txn)
                    .await?;
                Withdrawal::try_from(model)
            })
        })
        .await
    }
}
