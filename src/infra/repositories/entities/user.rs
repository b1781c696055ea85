//! User database entity for SeaORM.

use sea_orm::entity::prelude::*;

use crate::domain::{User, UserRole};
use crate::errors::AppError;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub username: String,
    #[sea_orm(unique)]
    pub email: Option<String>,
    #[sea_orm(unique)]
    pub phone_number: Option<String>,
    pub password_hash: String,
    pub role: String,
    pub account_status: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::loan::Entity")]
    Loans,
    #[sea_orm(has_many = "super::withdrawal::Entity")]
    Withdrawals,
}

impl Related<super::loan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Loans.def()
    }
}

impl Related<super::withdrawal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Withdrawals.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for User {
    type Error = AppError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(User {
            id: model.id,
            username: model.username,
            email: model.email,
            phone_number: model.phone_number,
            password_hash: model.password_hash,
            role: UserRole::from(model.role.as_str()),
            account_status: model.account_status.parse()?,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

impl From<&User> for ActiveModel {
    fn from(user: &User) -> Self {
        use sea_orm::Set;

        ActiveModel {
            id: Set(user.id),
            username: Set(user.username.clone()),
            email: Set(user.email.clone()),
            phone_number: Set(user.phone_number.clone()),
            password_hash: Set(user.password_hash.clone()),
            role: Set(user.role.to_string()),
            account_status: Set(user.account_status.to_string()),
            created_at: Set(user.created_at),
            updated_at: Set(user.updated_at),
        }
    }
}
