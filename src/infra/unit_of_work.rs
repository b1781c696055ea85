//! Unit of Work: one access point for every repository, plus the
//! transaction helper the stores use for multi-row writes.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use sea_orm::{AccessMode, DatabaseConnection, DatabaseTransaction, IsolationLevel, TransactionTrait};

use super::repositories::{
    ActivityLogRepository, ActivityLogStore, LoanRepository, LoanStore, OtpRepository, OtpStore,
    ReportRepository, ReportStore, TokenRepository, TokenStore, UserRepository, UserStore,
    WithdrawalRepository, WithdrawalStore,
};
use crate::errors::{AppError, AppResult};

/// Boxed future borrowed from an open transaction.
pub type TxFuture<'a, T> = Pin<Box<dyn Future<Output = AppResult<T>> + Send + 'a>>;

/// Run `f` inside a read-committed transaction.
///
/// Commits when `f` succeeds. Any error rolls the transaction back before it propagates.
pub async fn with_transaction<F, T>(db: &DatabaseConnection, f: F) -> AppResult<T>
where
    F: for<'a> FnOnce(&'a DatabaseTransaction) -> TxFuture<'a, T> + Send,
    T: Send,
{
    let txn = db
        .begin_with_config(Some(IsolationLevel::ReadCommitted), Some(AccessMode::ReadWrite))
        .await
        .map_err(AppError::from)?;

    match f(&txn).await {
        Ok(result) => {
            txn.commit().await.map_err(AppError::from)?;
            Ok(result)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Rolling back transaction");
            if let Err(rollback_err) = txn.rollback().await {
                tracing::error!("Transaction rollback failed: {}", rollback_err);
            }
            Err(e)
        }
    }
}

/// Repository access for the services.
pub trait UnitOfWork: Send + Sync {
    fn users(&self) -> Arc<dyn UserRepository>;
    fn loans(&self) -> Arc<dyn LoanRepository>;
    fn withdrawals(&self) -> Arc<dyn WithdrawalRepository>;
    fn otps(&self) -> Arc<dyn OtpRepository>;
    fn activity_logs(&self) -> Arc<dyn ActivityLogRepository>;
    fn tokens(&self) -> Arc<dyn TokenRepository>;
    fn reports(&self) -> Arc<dyn ReportRepository>;
}

/// Concrete implementation of UnitOfWork over one connection pool
pub struct Persistence {
    users: Arc<UserStore>,
    loans: Arc<LoanStore>,
    withdrawals: Arc<WithdrawalStore>,
    otps: Arc<OtpStore>,
    activity_logs: Arc<ActivityLogStore>,
    tokens: Arc<TokenStore>,
    reports: Arc<ReportStore>,
}

impl Persistence {
    /// `statement_timeout_secs` bounds the admin report queries.
    pub fn new(db: DatabaseConnection, statement_timeout_secs: u64) -> Self {
        Self {
            users: Arc::new(UserStore::new(db.clone())),
            loans: Arc::new(LoanStore::new(db.clone())),
            withdrawals: Arc::new(WithdrawalStore::new(db.clone())),
            otps: Arc::new(OtpStore::new(db.clone())),
            activity_logs: Arc::new(ActivityLogStore::new(db.clone())),
            tokens: Arc::new(TokenStore::new(db.clone())),
            reports: Arc::new(ReportStore::new(db, statement_timeout_secs)),
        }
    }
}

impl UnitOfWork for Persistence {
    fn users(&self) -> Arc<dyn UserRepository> {
        self.users.clone()
    }

    fn loans(&self) -> Arc<dyn LoanRepository> {
        self.loans.clone()
    }

    fn withdrawals(&self) -> Arc<dyn WithdrawalRepository> {
        self.withdrawals.clone()
    }

    fn otps(&self) -> Arc<dyn OtpRepository> {
        self.otps.clone()
    }

    fn activity_logs(&self) -> Arc<dyn ActivityLogRepository> {
        self.activity_logs.clone()
    }

    fn tokens(&self) -> Arc<dyn TokenRepository> {
        self.tokens.clone()
    }

    fn reports(&self) -> Arc<dyn ReportRepository> {
        self.reports.clone()
    }
}

/// Unit of work over `mockall` repositories. Unset repositories are fresh
/// mocks with no expectations, so any call to them fails the test.
#[cfg(any(test, feature = "test-utils"))]
pub mod testing {
    use super::*;
    use crate::infra::repositories::{
        MockActivityLogRepository, MockLoanRepository, MockOtpRepository, MockReportRepository,
        MockTokenRepository, MockUserRepository, MockWithdrawalRepository,
    };

    pub struct MockUnitOfWork {
        pub users: Arc<dyn UserRepository>,
        pub loans: Arc<dyn LoanRepository>,
        pub withdrawals: Arc<dyn WithdrawalRepository>,
        pub otps: Arc<dyn OtpRepository>,
        pub activity_logs: Arc<dyn ActivityLogRepository>,
        pub tokens: Arc<dyn TokenRepository>,
        pub reports: Arc<dyn ReportRepository>,
    }

    impl Default for MockUnitOfWork {
        fn default() -> Self {
            Self {
                users: Arc::new(MockUserRepository::new()),
                loans: Arc::new(MockLoanRepository::new()),
                withdrawals: Arc::new(MockWithdrawalRepository::new()),
                otps: Arc::new(MockOtpRepository::new()),
                activity_logs: Arc::new(MockActivityLogRepository::new()),
                tokens: Arc::new(MockTokenRepository::new()),
                reports: Arc::new(MockReportRepository::new()),
            }
        }
    }

    impl MockUnitOfWork {
        pub fn with_users(mut self, repo: MockUserRepository) -> Self {
            self.users = Arc::new(repo);
            self
        }

        pub fn with_loans(mut self, repo: MockLoanRepository) -> Self {
            self.loans = Arc::new(repo);
            self
        }

        pub fn with_withdrawals(mut self, repo: MockWithdrawalRepository) -> Self {
            self.withdrawals = Arc::new(repo);
            self
        }

        pub fn with_otps(mut self, repo: MockOtpRepository) -> Self {
            self.otps = Arc::new(repo);
            self
        }

        pub fn with_activity_logs(mut self, repo: MockActivityLogRepository) -> Self {
            self.activity_logs = Arc::new(repo);
            self
        }

        pub fn with_tokens(mut self, repo: MockTokenRepository) -> Self {
            self.tokens = Arc::new(repo);
            self
        }

        pub fn with_reports(mut self, repo: MockReportRepository) -> Self {
            self.reports = Arc::new(repo);
            self
        }
    }

    impl UnitOfWork for MockUnitOfWork {
        fn users(&self) -> Arc<dyn UserRepository> {
            self.users.clone()
        }

        fn loans(&self) -> Arc<dyn LoanRepository> {
            self.loans.clone()
        }

        fn withdrawals(&self) -> Arc<dyn WithdrawalRepository> {
            self.withdrawals.clone()
        }

        fn otps(&self) -> Arc<dyn OtpRepository> {
            self.otps.clone()
        }

        fn activity_logs(&self) -> Arc<dyn ActivityLogRepository> {
            self.activity_logs.clone()
        }

        fn tokens(&self) -> Arc<dyn TokenRepository> {
            self.tokens.clone()
        }

        fn reports(&self) -> Arc<dyn ReportRepository> {
            self.reports.clone()
        }
    }
}
