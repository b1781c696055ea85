//! Loan repository: borrower-side lookups and the admin listing.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QueryTrait,
};
use uuid::Uuid;

use super::entities::activity_log;
use super::entities::loan::{self, Entity as LoanEntity};
use super::entities::user::{self, Entity as UserEntity};
use super::filters::{conflict_on_unique, contains_pattern, date_range, lower_like, order};
use crate::domain::{Loan, LoanStatus, NewActivityLog, User};
use crate::errors::AppResult;
use crate::infra::unit_of_work::with_transaction;
use crate::types::{LoanFilter, LoanSortKey, PageRequest, Paginated};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// A loan with its borrower, when the borrower row still exists.
pub type LoanWithBorrower = (Loan, Option<User>);

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait LoanRepository: Send + Sync {
    /// Insert a new application. A second pending loan for the same user is a conflict.
    async fn create(&self, loan: Loan) -> AppResult<Loan>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Loan>>;

    /// The loan, only if `user_id` owns it.
    async fn find_owned(&self, id: Uuid, user_id: Uuid) -> AppResult<Option<Loan>>;

    async fn find_pending_for_user(&self, user_id: Uuid) -> AppResult<Option<Loan>>;

    /// Newest first
    async fn list_for_user(
        &self,
        user_id: Uuid,
        status: Option<LoanStatus>,
        page: PageRequest,
    ) -> AppResult<Paginated<Loan>>;

    async fn save(&self, loan: Loan) -> AppResult<Loan>;

    /// Persist the loan and its audit entry atomically.
    async fn save_with_audit(&self, loan: Loan, entry: NewActivityLog) -> AppResult<Loan>;

    /// Persist the loan, its borrower and the audit entry atomically.
    async fn save_with_borrower(
        &self,
        loan: Loan,
        borrower: Option<User>,
        entry: NewActivityLog,
    ) -> AppResult<LoanWithBorrower>;

    async fn find_with_borrower(&self, application_number: &str)
        -> AppResult<Option<LoanWithBorrower>>;

    async fn list_with_borrowers(&self, filter: LoanFilter)
        -> AppResult<Paginated<LoanWithBorrower>>;
}

pub struct LoanStore {
    db: DatabaseConnection,
}

impl LoanStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn sort_column(key: LoanSortKey) -> loan::Column {
    match key {
        LoanSortKey::CreatedAt => loan::Column::CreatedAt,
        LoanSortKey::LoanAmount => loan::Column::LoanAmount,
        LoanSortKey::ApplicationDate => loan::Column::ApplicationDate,
        LoanSortKey::Status => loan::Column::Status,
        LoanSortKey::TermMonths => loan::Column::TermMonths,
        LoanSortKey::InterestRate => loan::Column::InterestRate,
        LoanSortKey::ApplicationNumber => loan::Column::ApplicationNumber,
    }
}

fn with_borrower(
    (loan, borrower): (loan::Model, Option<user::Model>),
) -> AppResult<LoanWithBorrower> {
    Ok((
        Loan::try_from(loan)?,
        borrower.map(User::try_from).transpose()?,
    ))
}

#[async_trait]
impl LoanRepository for LoanStore {
    async fn create(&self, loan: Loan) -> AppResult<Loan> {
        let model = loan::ActiveModel::from(&loan)
            .insert(&self.db)
            .await
            .map_err(|e| conflict_on_unique(e, "Loan application"))?;
        Loan::try_from(model)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Loan>> {
        LoanEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(Loan::try_from)
            .transpose()
    }

    async fn find_owned(&self, id: Uuid, user_id: Uuid) -> AppResult<Option<Loan>> {
        LoanEntity::find_by_id(id)
            .filter(loan::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?
            .map(Loan::try_from)
            .transpose()
    }

    async fn find_pending_for_user(&self, user_id: Uuid) -> AppResult<Option<Loan>> {
        LoanEntity::find()
            .filter(loan::Column::UserId.eq(user_id))
            .filter(loan::Column::Status.eq(LoanStatus::Pending.as_str()))
            .one(&self.db)
            .await?
            .map(Loan::try_from)
            .transpose()
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        status: Option<LoanStatus>,
        page: PageRequest,
    ) -> AppResult<Paginated<Loan>> {
        let paginator = LoanEntity::find()
            .filter(loan::Column::UserId.eq(user_id))
            .apply_if(status, |query, status| {
                query.filter(loan::Column::Status.eq(status.as_str()))
            })
            .order_by_desc(loan::Column::CreatedAt)
            .order_by_asc(loan::Column::Id)
            .paginate(&self.db, page.per_page);

        let total = paginator.num_items().await?;
        let loans = paginator
            .fetch_page(page.index())
            .await?
            .into_iter()
            .map(Loan::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Paginated::new(loans, total, page))
    }

    async fn save(&self, loan: Loan) -> AppResult<Loan> {
        let model = loan::ActiveModel::from(&loan).update(&self.db).await?;
        Loan::try_from(model)
    }

    async fn save_with_audit(&self, loan: Loan, entry: NewActivityLog) -> AppResult<Loan> {
        with_transaction(&self.db, |txn| {
            Box::pin(async move {
                let model = loan::ActiveModel::from(&loan).update(txn).await?;
                activity_log::ActiveModel::from_entry(entry, Utc::now())
                    .insert(txn)
                    .await?;
                Loan::try_from(model)
            })
        })
        .await
    }

    async fn save_with_borrower(
        &self,
        loan: Loan,
        borrower: Option<User>,
        entry: NewActivityLog,
    ) -> AppResult<LoanWithBorrower> {
        with_transaction(&self.db, |txn| {
            Box::pin(async move {
                let borrower = match borrower {
                    Some(user) => Some(
                        user::ActiveModel::from(&user)
                            .update(txn)
                            .await
                            .map_err(|e| conflict_on_unique(e, "User"))?,
                    ),
                    None => None,
                };
                let model = loan::ActiveModel::from(&loan)
                    .update(txn)
                    .await
                    .map_err(|e| conflict_on_unique(e, "Loan application"))?;
                activity_log::ActiveModel::from_entry(entry, Utc::now())
                    .insert(txn)
                    .await?;
                with_borrower((model, borrower))
            })
        })
        .await
    }

    async fn find_with_borrower(
        &self,
        application_number: &str,
    ) -> AppResult<Option<LoanWithBorrower>> {
        LoanEntity::find()
            .filter(loan::Column::ApplicationNumber.eq(application_number))
            .find_also_related(UserEntity)
            .one(&self.db)
            .await?
            .map(with_borrower)
            .transpose()
    }

    async fn list_with_borrowers(
        &self,
        filter: LoanFilter,
    ) -> AppResult<Paginated<LoanWithBorrower>> {
        let query = LoanEntity::find()
            .apply_if(filter.status, |query, status| {
                query.filter(loan::Column::Status.eq(status.as_str()))
            })
            .apply_if(filter.min_amount, |query, min| {
                query.filter(loan::Column::LoanAmount.gte(min))
            })
            .apply_if(filter.max_amount, |query, max| {
                query.filter(loan::Column::LoanAmount.lte(max))
            })
            .filter(
                date_range(loan::Column::CreatedAt, &filter.created)
                    .into_iter()
                    .fold(Condition::all(), Condition::add),
            )
            .find_also_related(UserEntity)
            .apply_if(filter.search.as_deref(), |query, search| {
                let pattern = contains_pattern(search);
                query.filter(
                    Condition::any()
                        .add(lower_like(
                            (LoanEntity, loan::Column::ApplicationNumber),
                            &pattern,
                        ))
                        .add(lower_like((UserEntity, user::Column::Username), &pattern))
                        .add(lower_like((UserEntity, user::Column::Email), &pattern))
                        .add(lower_like((UserEntity, user::Column::PhoneNumber), &pattern)),
                )
            })
            .order_by(sort_column(filter.sort.key), order(filter.sort.direction))
            .order_by_asc(loan::Column::Id);

        let paginator = query.paginate(&self.db, filter.page.per_page);
        let total = paginator.num_items().await?;
        let rows = paginator
            .fetch_page(filter.page.index())
            .await?
            .into_iter()
            .map(with_borrower)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Paginated::new(rows, total, filter.page))
    }
}
