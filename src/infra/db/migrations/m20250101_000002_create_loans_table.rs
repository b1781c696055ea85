use sea_orm_migration::prelude::*;

use super::m20250101_000001_create_users_table::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

const ONE_PENDING_PER_USER: &str = "idx_loans_one_pending_per_user";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Loans::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Loans::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Loans::ApplicationNumber)
                            .string_len(32)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Loans::UserId).uuid().not_null())
                    .col(ColumnDef::new(Loans::NationalId).string_len(50).null())
                    .col(ColumnDef::new(Loans::Address).text().null())
                    .col(ColumnDef::new(Loans::LoanAmount).double().not_null())
                    .col(ColumnDef::new(Loans::InterestRate).double().not_null())
                    .col(ColumnDef::new(Loans::TermMonths).integer().not_null())
                    .col(ColumnDef::new(Loans::Status).string_len(40).not_null())
                    .col(ColumnDef::new(Loans::Purpose).string_len(255).not_null())
                    .col(ColumnDef::new(Loans::EmploymentStatus).string_len(50).null())
                    .col(ColumnDef::new(Loans::Employer).string_len(100).null())
                    .col(ColumnDef::new(Loans::EmploymentDuration).string_len(50).null())
                    .col(ColumnDef::new(Loans::MonthlyIncome).double().null())
                    .col(ColumnDef::new(Loans::BankName).string_len(100).null())
                    .col(ColumnDef::new(Loans::AccountName).string_len(100).null())
                    .col(ColumnDef::new(Loans::AccountNumber).string_len(50).null())
                    .col(
                        ColumnDef::new(Loans::ApplicationDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Loans::ApprovalDate).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(Loans::DueDate).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(Loans::ProcessedDate).timestamp_with_time_zone().null())
                    .col(
                        ColumnDef::new(Loans::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Loans::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_loans_user_id")
                            .from(Loans::Table, Loans::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        for (name, column) in [
            ("idx_loans_user_id", Loans::UserId),
            ("idx_loans_status", Loans::Status),
            ("idx_loans_created_at", Loans::CreatedAt),
        ] {
            manager
                .create_index(
                    Index::create()
                        .name(name)
                        .table(Loans::Table)
                        .col(column)
                        .to_owned(),
                )
                .await?;
        }

        // At most one pending application per borrower.
        manager
            .get_connection()
            .execute_unprepared(&format!(
                "CREATE UNIQUE INDEX {} ON loans (user_id) WHERE status = 'pending'",
                ONE_PENDING_PER_USER
            ))
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(&format!("DROP INDEX IF EXISTS {}", ONE_PENDING_PER_USER))
            .await?;
        manager
            .drop_table(Table::drop().table(Loans::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Loans {
    Table,
    Id,
    ApplicationNumber,
    UserId,
    NationalId,
    Address,
    LoanAmount,
    InterestRate,
    TermMonths,
    Status,
    Purpose,
    EmploymentStatus,
    Employer,
    EmploymentDuration,
    MonthlyIncome,
    BankName,
    AccountName,
    AccountNumber,
    ApplicationDate,
    ApprovalDate,
    DueDate,
    ProcessedDate,
    CreatedAt,
    UpdatedAt,
}
