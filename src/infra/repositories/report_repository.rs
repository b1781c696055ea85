//! Aggregate queries behind the admin dashboard.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};

use super::entities::loan::{self, Entity as LoanEntity};
use super::entities::user::{self, Entity as UserEntity};
use super::entities::withdrawal::{self, Entity as WithdrawalEntity};
use crate::config::RECENT_ACTIVITY_LIMIT;
use crate::domain::{
    DashboardStats, Loan, LoanStats, LoanStatus, RecentActivity, User, UserStats, Withdrawal,
    WithdrawalStats, WithdrawalStatus,
};
use crate::errors::AppResult;
use crate::infra::unit_of_work::with_transaction;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait ReportRepository: Send + Sync {
    /// Platform-wide figures as of `now`.
    async fn dashboard(&self, now: DateTime<Utc>) -> AppResult<DashboardStats>;
}

pub struct ReportStore {
    db: DatabaseConnection,
    statement_timeout_secs: u64,
}

impl ReportStore {
    pub fn new(db: DatabaseConnection, statement_timeout_secs: u64) -> Self {
        Self {
            db,
            statement_timeout_secs,
        }
    }
}

async fn user_stats(txn: &DatabaseTransaction, now: DateTime<Utc>) -> AppResult<UserStats> {
    let created_since = |days: i64| {
        UserEntity::find().filter(user::Column::CreatedAt.gte(now - Duration::days(days)))
    };
    Ok(UserStats {
        total: UserEntity::find().count(txn).await?,
        new_last_24h: created_since(1).count(txn).await?,
        new_last_7d: created_since(7).count(txn).await?,
        new_last_30d: created_since(30).count(txn).await?,
    })
}

async fn loan_stats(txn: &DatabaseTransaction) -> AppResult<LoanStats> {
    let by_status: BTreeMap<String, u64> = LoanEntity::find()
        .select_only()
        .column(loan::Column::Status)
        .column_as(loan::Column::Id.count(), "count")
        .group_by(loan::Column::Status)
        .into_tuple::<(String, i64)>()
        .all(txn)
        .await?
        .into_iter()
        .map(|(status, count)| (status, count.max(0) as u64))
        .collect();

    let total_amount = LoanEntity::find()
        .select_only()
        .column_as(loan::Column::LoanAmount.sum(), "total")
        .into_tuple::<Option<f64>>()
        .one(txn)
        .await?
        .flatten()
        .unwrap_or_default();

    let approved_amount = LoanEntity::find()
        .select_only()
        .column_as(loan::Column::LoanAmount.sum(), "total")
        .filter(loan::Column::Status.eq(LoanStatus::Approved.as_str()))
        .into_tuple::<Option<f64>>()
        .one(txn)
        .await?
        .flatten()
        .unwrap_or_default();

    Ok(LoanStats {
        total: by_status.values().sum(),
        total_amount,
        approved_amount,
        by_status,
    })
}

async fn withdrawal_stats(txn: &DatabaseTransaction) -> AppResult<WithdrawalStats> {
    let with_status = |status: WithdrawalStatus| {
        WithdrawalEntity::find().filter(withdrawal::Column::Status.eq(status.as_str()))
    };
    let total_amount = WithdrawalEntity::find()
        .select_only()
        .column_as(withdrawal::Column::Amount.sum(), "total")
        .into_tuple::<Option<f64>>()
        .one(txn)
        .await?
        .flatten()
        .unwrap_or_default();

    Ok(WithdrawalStats {
        total: WithdrawalEntity::find().count(txn).await?,
        total_amount,
        completed: with_status(WithdrawalStatus::Completed).count(txn).await?,
        pending: with_status(WithdrawalStatus::Pending).count(txn).await?,
    })
}

async fn recent_activity(txn: &DatabaseTransaction) -> AppResult<RecentActivity> {
    let loans = LoanEntity::find()
        .order_by_desc(loan::Column::CreatedAt)
        .limit(RECENT_ACTIVITY_LIMIT)
        .all(txn)
        .await?
        .into_iter()
        .map(|model| Loan::try_from(model).map(Into::into))
        .collect::<AppResult<Vec<_>>>()?;
    let users = UserEntity::find()
        .order_by_desc(user::Column::CreatedAt)
        .limit(RECENT_ACTIVITY_LIMIT)
        .all(txn)
        .await?
        .into_iter()
        .map(|model| User::try_from(model).map(Into::into))
        .collect::<AppResult<Vec<_>>>()?;
    let withdrawals = WithdrawalEntity::find()
        .order_by_desc(withdrawal::Column::CreatedAt)
        .limit(RECENT_ACTIVITY_LIMIT)
        .all(txn)
        .await?
        .into_iter()
        .map(|model| Withdrawal::try_from(model).map(Into::into))
        .collect::<AppResult<Vec<_>>>()?;

    Ok(RecentActivity {
        loans,
        users,
        withdrawals,
    })
}

#[async_trait]
impl ReportRepository for ReportStore {
    async fn dashboard(&self, now: DateTime<Utc>) -> AppResult<DashboardStats> {
        let timeout = self.statement_timeout_secs;
        with_transaction(&self.db, move |txn| {
            Box::pin(async move {
                if txn.get_database_backend() == DbBackend::Postgres {
                    txn.execute_unprepared(&format!(
                        "SET LOCAL statement_timeout = '{}s'",
                        timeout
                    ))
                    .await?;
                }

                Ok(DashboardStats {
                    users: user_stats(txn, now).await?,
                    loans: loan_stats(txn).await?,
                    withdrawals: withdrawal_stats(txn).await?,
                    recent: recent_activity(txn).await?,
                })
            })
        })
        .await
    }
}
