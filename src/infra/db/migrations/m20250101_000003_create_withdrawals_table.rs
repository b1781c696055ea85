use sea_orm_migration::prelude::*;

use super::m20250101_000001_create_users_table::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Withdrawals::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Withdrawals::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Withdrawals::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(Withdrawals::Amount)
                            .double()
                            .not_null()
                            .check(Expr::col(Withdrawals::Amount).gt(0)),
                    )
                    .col(ColumnDef::new(Withdrawals::Otp).string_len(10).not_null())
                    .col(ColumnDef::new(Withdrawals::Status).string_len(40).not_null())
                    .col(
                        ColumnDef::new(Withdrawals::TransactionId)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Withdrawals::ProcessedDate)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Withdrawals::Notes).text().null())
                    .col(
                        ColumnDef::new(Withdrawals::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Withdrawals::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_withdrawals_user_id")
                            .from(Withdrawals::Table, Withdrawals::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_withdrawals_user_id")
                    .table(Withdrawals::Table)
                    .col(Withdrawals::UserId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Withdrawals::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Withdrawals {
    Table,
    Id,
    UserId,
    Amount,
    Otp,
    Status,
    TransactionId,
    ProcessedDate,
    Notes,
    CreatedAt,
    UpdatedAt,
}
