//! Application state - Dependency injection container.
//!
//! Provides centralized access to all application services and infrastructure.

use std::sync::Arc;

use crate::config::Config;
use crate::infra::{Cache, Database};
use crate::services::{
    AdminService, AuthService, LoanService, ServiceContainer, Services, WithdrawalService,
};

/// Application state shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<dyn AuthService>,
    pub loan_service: Arc<dyn LoanService>,
    pub withdrawal_service: Arc<dyn WithdrawalService>,
    pub admin_service: Arc<dyn AdminService>,
    /// Rate limit counters and cached statistics
    pub cache: Cache,
    /// Database pool, used by the health check
    pub database: Arc<Database>,
}

impl AppState {
    /// Build the sea-orm backed services over `database` and `cache`.
    pub fn from_config(database: Arc<Database>, cache: Cache, config: &Config) -> Self {
        let services = Services::from_connection(database.get_connection(), cache.clone(), config);
        Self::new(&services, cache, database)
    }

    /// Create application state from an already wired service container.
    pub fn new(services: &impl ServiceContainer, cache: Cache, database: Arc<Database>) -> Self {
        Self {
            auth_service: services.auth(),
            loan_service: services.loans(),
            withdrawal_service: services.withdrawals(),
            admin_service: services.admin(),
            cache,
            database,
        }
    }
}
