//! Database migrations.
//!
//! Migration names follow the pattern: m{YYYYMMDD}_{NNNNNN}_{description}

use sea_orm_migration::prelude::*;

mod m20250101_000001_create_users_table;
mod m20250101_000002_create_loans_table;
mod m20250101_000003_create_withdrawals_table;
mod m20250101_000004_create_otps_table;
mod m20250101_000005_create_activity_logs_table;
mod m20250101_000006_create_token_blocklist_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_users_table::Migration),
            Box::new(m20250101_000002_create_loans_table::Migration),
            Box::new(m20250101_000003_create_withdrawals_table::Migration),
            Box::new(m20250101_000004_create_otps_table::Migration),
            Box::new(m20250101_000005_create_activity_logs_table::Migration),
            Box::new(m20250101_000006_create_token_blocklist_table::Migration),
        ]
    }
}
