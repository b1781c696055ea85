//! User repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QueryTrait, Set,
};
use uuid::Uuid;

use super::entities::user::{self, ActiveModel, Entity as UserEntity};
use super::filters::{conflict_on_unique, contains_pattern, lower_like, order};
use crate::config::ACCOUNT_ACTIVE;
use crate::domain::{NewUser, User};
use crate::errors::AppResult;
use crate::types::{Paginated, UserFilter, UserSortKey};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// User repository trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Borrower login key
    async fn find_by_phone(&self, phone_number: &str) -> AppResult<Option<User>>;

    /// Admin login key
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Whether any account already uses this username, email or phone number.
    async fn identity_taken(
        &self,
        username: String,
        email: Option<String>,
        phone_number: Option<String>,
    ) -> AppResult<bool>;

    async fn create(&self, user: NewUser) -> AppResult<User>;

    async fn list(&self, filter: UserFilter) -> AppResult<Paginated<User>>;
}

/// Concrete implementation of UserRepository
pub struct UserStore {
    db: DatabaseConnection,
}

impl UserStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn sort_column(key: UserSortKey) -> user::Column {
    match key {
        UserSortKey::CreatedAt => user::Column::CreatedAt,
        UserSortKey::Username => user::Column::Username,
        UserSortKey::Email => user::Column::Email,
        UserSortKey::PhoneNumber => user::Column::PhoneNumber,
        UserSortKey::Role => user::Column::Role,
        UserSortKey::AccountStatus => user::Column::AccountStatus,
    }
}

#[async_trait]
impl UserRepository for UserStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        UserEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_by_phone(&self, phone_number: &str) -> AppResult<Option<User>> {
        UserEntity::find()
            .filter(user::Column::PhoneNumber.eq(phone_number))
            .one(&self.db)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn identity_taken(
        &self,
        username: String,
        email: Option<String>,
        phone_number: Option<String>,
    ) -> AppResult<bool> {
        let condition = Condition::any()
            .add(user::Column::Username.eq(username))
            .add_option(email.map(|email| user::Column::Email.eq(email)))
            .add_option(phone_number.map(|phone| user::Column::PhoneNumber.eq(phone)));

        let matches = UserEntity::find().filter(condition).count(&self.db).await?;
        Ok(matches > 0)
    }

    async fn create(&self, new_user: NewUser) -> AppResult<User> {
        let now = Utc::now();
        let active_model = ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(new_user.username),
            email: Set(new_user.email),
            phone_number: Set(new_user.phone_number),
            password_hash: Set(new_user.password_hash),
            role: Set(new_user.role.to_string()),
            account_status: Set(ACCOUNT_ACTIVE.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = active_model
            .insert(&self.db)
            .await
            .map_err(|e| conflict_on_unique(e, "User"))?;
        User::try_from(model)
    }

    async fn list(&self, filter: UserFilter) -> AppResult<Paginated<User>> {
        let query = UserEntity::find()
            .apply_if(filter.search.as_deref(), |query, search| {
                let pattern = contains_pattern(search);
                query.filter(
                    Condition::any()
                        .add(lower_like(user::Column::Username, &pattern))
                        .add(lower_like(user::Column::Email, &pattern))
                        .add(lower_like(user::Column::PhoneNumber, &pattern)),
                )
            })
            .apply_if(filter.role, |query, role| {
                query.filter(user::Column::Role.eq(role.as_str()))
            })
            .apply_if(filter.status, |query, status| {
                query.filter(user::Column::AccountStatus.eq(status.as_str()))
            })
            .order_by(sort_column(filter.sort.key), order(filter.sort.direction))
            .order_by_asc(user::Column::Id);

        let paginator = query.paginate(&self.db, filter.page.per_page);
        let total = paginator.num_items().await?;
        let users = paginator
            .fetch_page(filter.page.index())
            .await?
            .into_iter()
            .map(User::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Paginated::new(users, total, filter.page))
    }
}

