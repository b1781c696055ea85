//! Loan database entity for SeaORM.

use sea_orm::entity::prelude::*;

use crate::domain::Loan;
use crate::errors::AppError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "loans")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub application_number: String,
    pub user_id: Uuid,
    pub national_id: Option<String>,
    pub address: Option<String>,
    pub loan_amount: f64,
    pub interest_rate: f64,
    pub term_months: i32,
    pub status: String,
    pub purpose: String,
    pub employment_status: Option<String>,
    pub employer: Option<String>,
    pub employment_duration: Option<String>,
    pub monthly_income: Option<f64>,
    pub bank_name: Option<String>,
    pub account_name: Option<String>,
    pub account_number: Option<String>,
    pub application_date: DateTimeUtc,
    pub approval_date: Option<DateTimeUtc>,
    pub due_date: Option<DateTimeUtc>,
    pub processed_date: Option<DateTimeUtc>,
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

impl TryFrom<Model> for Loan {
    type Error = AppError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let status = model.status.parse().map_err(|_| {
            AppError::internal(format!(
                "Loan {} has unknown status {}",
                model.id, model.status
            ))
        })?;
        Ok(Loan {
            id: model.id,
            application_number: model.application_number,
            user_id: model.user_id,
            national_id: model.national_id,
            address: model.address,
            loan_amount: model.loan_amount,
            interest_rate: model.interest_rate,
            term_months: model.term_months,
            status,
            purpose: model.purpose,
            employment_status: model.employment_status,
            employer: model.employer,
            employment_duration: model.employment_duration,
            monthly_income: model.monthly_income,
            bank_name: model.bank_name,
            account_name: model.account_name,
            account_number: model.account_number,
            application_date: model.application_date,
            approval_date: model.approval_date,
            due_date: model.due_date,
            processed_date: model.processed_date,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

impl From<&Loan> for ActiveModel {
    fn from(loan: &Loan) -> Self {
        use sea_orm::Set;

        ActiveModel {
            id: Set(loan.id),
            application_number: Set(loan.application_number.clone()),
            user_id: Set(loan.user_id),
            national_id: Set(loan.national_id.clone()),
            address: Set(loan.address.clone()),
            loan_amount: Set(loan.loan_amount),
            interest_rate: Set(loan.interest_rate),
            term_months: Set(loan.term_months),
            status: Set(loan.status.to_string()),
            purpose: Set(loan.purpose.clone()),
            employment_status: Set(loan.employment_status.clone()),
            employer: Set(loan.employer.clone()),
            employment_duration: Set(loan.employment_duration.clone()),
            monthly_income: Set(loan.monthly_income),
            bank_name: Set(loan.bank_name.clone()),
            account_name: Set(loan.account_name.clone()),
            account_number: Set(loan.account_number.clone()),
            application_date: Set(loan.application_date),
            approval_date: Set(loan.approval_date),
            due_date: Set(loan.due_date),
            processed_date: Set(loan.processed_date),
            created_at: Set(loan.created_at),
            updated_at: Set(loan.updated_at),
        }
    }
}
