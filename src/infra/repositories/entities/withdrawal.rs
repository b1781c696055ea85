//! Withdrawal database entity for SeaORM.

use sea_orm::entity::prelude::*;

use crate::domain::Withdrawal;
use crate::errors::AppError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "withdrawals")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: f64,
    pub otp: String,
    pub status: String,
    #[sea_orm(unique)]
    pub transaction_id: String,
    pub processed_date: Option<DateTimeUtc>,
    pub notes: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Withdrawal {
    type Error = AppError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let status = model.status.parse().map_err(|_| {
            AppError::internal(format!(
                "Withdrawal {} has unknown status {}",
                model.id, model.status
            ))
        })?;
        Ok(Withdrawal {
            id: model.id,
            user_id: model.user_id,
            amount: model.amount,
            otp: model.otp,
            status,
            transaction_id: model.transaction_id,
            processed_date: model.processed_date,
            notes: model.notes,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

impl From<&Withdrawal> for ActiveModel {
    fn from(withdrawal: &Withdrawal) -> Self {
        use sea_orm::Set;

        ActiveModel {
            id: Set(withdrawal.id),
            user_id: Set(withdrawal.user_id),
            amount: Set(withdrawal.amount),
            otp: Set(withdrawal.otp.clone()),
            status: Set(withdrawal.status.to_string()),
            transaction_id: Set(withdrawal.transaction_id.clone()),
            processed_date: Set(withdrawal.processed_date),
            notes: Set(withdrawal.notes.clone()),
            created_at: Set(withdrawal.created_at),
            updated_at: Set(withdrawal.updated_at),
        }
    }
}
