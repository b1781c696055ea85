use sea_orm::entity::prelude::*;

use crate::domain::{ActivityLog, NewActivityLog};
use crate::errors::AppError;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "activity_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub admin_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub loan_id: Option<Uuid>,
    pub action: String,
    pub description: String,
    pub ip_address: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AdminId",
        to = "super::user::Column::Id"
    )]
    Admin,
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for ActivityLog {
    type Error = AppError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(ActivityLog {
            id: model.id,
            admin_id: model.admin_id,
            customer_id: model.customer_id,
            loan_id: model.loan_id,
            action: model.action.parse()?,
            description: model.description,
            ip_address: model.ip_address,
            created_at: model.created_at,
        })
    }
}

impl ActiveModel {
    pub fn from_entry(entry: NewActivityLog, now: DateTimeUtc) -> Self {
        use sea_orm::Set;

        ActiveModel {
            id: Set(Uuid::new_v4()),
            admin_id: Set(entry.admin_id),
            customer_id: Set(entry.customer_id),
            loan_id: Set(entry.loan_id),
            action: Set(entry.action.to_string()),
            description: Set(entry.description),
            ip_address: Set(entry.ip_address),
            created_at: Set(now),
        }
    }
}
