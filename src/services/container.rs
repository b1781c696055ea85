//! Service container: builds every service over one shared unit of work.

use std::sync::Arc;

use super::{
    AdminManager, AdminService, AuthService, Authenticator, LoanManager, LoanService,
    WithdrawalManager, WithdrawalService,
};
use crate::config::Config;
use crate::infra::{Cache, Persistence};

/// Service container trait for dependency injection.
pub trait ServiceContainer: Send + Sync {
    fn auth(&self) -> Arc<dyn AuthService>;

    fn loans(&self) -> Arc<dyn LoanService>;

    fn withdrawals(&self) -> Arc<dyn WithdrawalService>;

    fn admin(&self) -> Arc<dyn AdminService>;
}

/// Concrete implementation of ServiceContainer
#[derive(Clone)]
pub struct Services {
    auth_service: Arc<dyn AuthService>,
    loan_service: Arc<dyn LoanService>,
    withdrawal_service: Arc<dyn WithdrawalService>,
    admin_service: Arc<dyn AdminService>,
}

impl Services {
    pub fn new(
        auth_service: Arc<dyn AuthService>,
        loan_service: Arc<dyn LoanService>,
        withdrawal_service: Arc<dyn WithdrawalService>,
        admin_service: Arc<dyn AdminService>,
    ) -> Self {
        Self {
            auth_service,
            loan_service,
            withdrawal_service,
            admin_service,
        }
    }

    /// Wire the sea-orm backed services around one connection pool and cache.
    pub fn from_connection(db: sea_orm::DatabaseConnection, cache: Cache, config: &Config) -> Self {
        let uow = Arc::new(Persistence::new(db, config.statement_timeout_secs));

        Self {
            auth_service: Arc::new(Authenticator::new(uow.clone(), config.clone())),
            loan_service: Arc::new(LoanManager::new(uow.clone(), cache.clone(), config)),
            withdrawal_service: Arc::new(WithdrawalManager::new(uow.clone(), cache.clone())),
            admin_service: Arc::new(AdminManager::new(uow, cache, config)),
        }
    }
}

impl ServiceContainer for Services {
    fn auth(&self) -> Arc<dyn AuthService> {
        self.auth_service.clone()
    }

    fn loans(&self) -> Arc<dyn LoanService> {
        self.loan_service.clone()
    }

    fn withdrawals(&self) -> Arc<dyn WithdrawalService> {
        self.withdrawal_service.clone()
    }

    fn admin(&self) -> Arc<dyn AdminService> {
        self.admin_service.clone()
    }
}
