use async_trait::async_trait;
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait, QueryOrder};

use super::entities::activity_log::{self, Entity as ActivityLogEntity};
use crate::domain::ActivityLog;
use crate::errors::AppResult;
use crate::types::{PageRequest, Paginated};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Read side of the audit trail. Entries are only ever written alongside
/// the mutation they describe.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait ActivityLogRepository: Send + Sync {
    /// Newest first
    async fn list(&self, page: PageRequest) -> AppResult<Paginated<ActivityLog>>;
}

pub struct ActivityLogStore {
    db: DatabaseConnection,
}

impl ActivityLogStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ActivityLogRepository for ActivityLogStore {
    async fn list(&self, page: PageRequest) -> AppResult<Paginated<ActivityLog>> {
        let paginator = ActivityLogEntity::find()
            .order_by_desc(activity_log::Column::CreatedAt)
            .order_by_asc(activity_log::Column::Id)
            .paginate(&self.db, page.per_page);

        let total = paginator.num_items().await?;
        let entries = paginator
            .fetch_page(page.index())
            .await?
            .into_iter()
            .map(ActivityLog::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Paginated::new(entries, total, page))
    }
}
