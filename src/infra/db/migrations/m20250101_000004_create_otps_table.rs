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
                    .table(Otps::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Otps::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Otps::UserId).uuid().not_null())
                    .col(ColumnDef::new(Otps::OtpCode).string_len(10).not_null())
                    .col(
                        ColumnDef::new(Otps::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_otps_user_id")
                            .from(Otps::Table, Otps::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_otps_user_id_created_at")
                    .table(Otps::Table)
                    .col(Otps::UserId)
                    .col(Otps::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Otps::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Otps {
    Table,
    Id,
    UserId,
    OtpCode,
    CreatedAt,
}
