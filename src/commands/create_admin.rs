//! Create-admin command - Bootstraps an admin account.
//!
//! The HTTP admin registration route needs an admin token, so the first
//! admin has to come from here.

use std::sync::Arc;

use crate::cli::args::CreateAdminArgs;
use crate::config::Config;
use crate::errors::AppResult;
use crate::infra::{Database, Persistence};
use crate::services::{AuthService, Authenticator};

/// Execute the create-admin command
pub async fn execute(args: CreateAdminArgs, config: Config) -> AppResult<()> {
    let db = Database::connect_and_migrate(&config).await?;
    let uow = Arc::new(Persistence::new(
        db.get_connection(),
        config.statement_timeout_secs,
    ));

    let admin = Authenticator::new(uow, config)
        .create_admin(args.username, args.email, args.password)
        .await?;

    println!("Created admin {} ({})", admin.username, admin.id);
    Ok(())
}
