//! Admin dashboard: statistics, listings, loan edits and OTP issuance.
//!
//! Every mutation here writes its activity log entry in the same
//! transaction as the change itself, and drops the cached statistics.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::config::Config;
use crate::domain::{
    ActivityLog, AuditAction, AuditContext, DashboardStats, GenerateOtpRequest, LoanAmendment,
    Otp, User,
};
use crate::errors::{AppResult, OptionExt};
use crate::infra::repositories::LoanWithBorrower;
use crate::infra::{Cache, UnitOfWork};
use crate::types::{LoanFilter, PageRequest, Paginated, UserFilter};

#[async_trait]
pub trait AdminService: Send + Sync {
    /// Platform statistics, served from cache while fresh.
    async fn stats(&self) -> AppResult<DashboardStats>;

    async fn list_loans(&self, filter: LoanFilter) -> AppResult<Paginated<LoanWithBorrower>>;

    async fn get_loan(&self, application_number: String) -> AppResult<LoanWithBorrower>;

    /// Edit loan and borrower fields, including a direct status override.
    async fn update_loan(
        &self,
        application_number: String,
        amendment: LoanAmendment,
        audit: AuditContext,
    ) -> AppResult<LoanWithBorrower>;

    /// Soft-delete the loan and deactivate its borrower.
    async fn delete_loan(&self, application_number: String, audit: AuditContext)
        -> AppResult<()>;

    async fn list_users(&self, filter: UserFilter) -> AppResult<Paginated<User>>;

    async fn generate_otp(
        &self,
        request: GenerateOtpRequest,
        audit: AuditContext,
    ) -> AppResult<Otp>;

    async fn activity(&self, page: PageRequest) -> AppResult<Paginated<ActivityLog>>;
}

pub struct AdminManager<U: UnitOfWork> {
    uow: Arc<U>,
    cache: Cache,
    stats_ttl_seconds: u64,
}

impl<U: UnitOfWork> AdminManager<U> {
    pub fn new(uow: Arc<U>, cache: Cache, config: &Config) -> Self {
        Self {
            uow,
            cache,
            stats_ttl_seconds: config.stats_cache_ttl_seconds,
        }
    }
}

#[async_trait]
impl<U: UnitOfWork> AdminService for AdminManager<U> {
    async fn stats(&self) -> AppResult<DashboardStats> {
        match self.cache.get_stats().await {
            Ok(Some(stats)) => return Ok(stats),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Stats cache read failed"),
        }

        let stats = self.uow.reports().dashboard(Utc::now()).await?;
        if let Err(e) = self.cache.set_stats(&stats, self.stats_ttl_seconds).await {
            tracing::warn!(error = %e, "Stats cache write failed");
        }
        Ok(stats)
    }

    async fn list_loans(&self, filter: LoanFilter) -> AppResult<Paginated<LoanWithBorrower>> {
        self.uow.loans().list_with_borrowers(filter).await
    }

    async fn get_loan(&self, application_number: String) -> AppResult<LoanWithBorrower> {
        self.uow
            .loans()
            .find_with_borrower(&application_number)
            .await?
            .ok_or_not_found("Loan")
    }

    async fn update_loan(
        &self,
        application_number: String,
        amendment: LoanAmendment,
        audit: AuditContext,
    ) -> AppResult<LoanWithBorrower> {
        let (mut loan, mut borrower) = self.get_loan(application_number).await?;

        let changes = amendment.apply(&mut loan, borrower.as_mut(), Utc::now())?;
        let entry = audit
            .entry(AuditAction::CustomerLoanUpdate, changes.describe())
            .customer(loan.user_id)
            .loan(loan.id);
        let updated = self
            .uow
            .loans()
            .save_with_borrower(loan, borrower, entry)
            .await?;

        tracing::info!(
            admin_id = %audit.admin_id,
            loan_id = %updated.0.id,
            changes = %changes.describe(),
            "Customer loan updated"
        );
        self.cache.invalidate_stats().await;
        Ok(updated)
    }

    async fn delete_loan(
        &self,
        application_number: String,
        audit: AuditContext,
    ) -> AppResult<()> {
        let (mut loan, mut borrower) = self.get_loan(application_number).await?;
        let now = Utc::now();

        loan.mark_deleted(now)?;
        if let Some(user) = borrower.as_mut() {
            user.deactivate(now);
        }
        let username = borrower
            .as_ref()
            .map(|user| user.username.as_str())
            .unwrap_or("unknown");
        let entry = audit
            .entry(
                AuditAction::CustomerLoanDelete,
                format!(
                    "Loan {} and Customer {} marked as INACTIVE",
                    loan.application_number, username
                ),
            )
            .customer(loan.user_id)
            .loan(loan.id);
        let (loan, _) = self
            .uow
            .loans()
            .save_with_borrower(loan, borrower, entry)
            .await?;

        tracing::info!(admin_id = %audit.admin_id, loan_id = %loan.id, "Customer loan deleted");
        self.cache.invalidate_stats().await;
        Ok(())
    }

    async fn list_users(&self, filter: UserFilter) -> AppResult<Paginated<User>> {
        self.uow.users().list(filter).await
    }

    async fn generate_otp(
        &self,
        request: GenerateOtpRequest,
        audit: AuditContext,
    ) -> AppResult<Otp> {
        let customer = self
            .uow
            .users()
            .find_by_id(request.customer_id)
            .await?
            .ok_or_not_found("Customer")?;

        let length = request.length();
        let otp = Otp::issue(customer.id, length, Utc::now())?;
        let entry = audit
            .entry(
                AuditAction::OtpGenerate,
                format!(
                    "Generated {}-digit OTP for customer {}",
                    length, customer.username
                ),
            )
            .customer(customer.id);
        let otp = self.uow.otps().issue(otp, entry).await?;

        tracing::info!(admin_id = %audit.admin_id, customer_id = %customer.id, "OTP issued");
        Ok(otp)
    }

    async fn activity(&self, page: PageRequest) -> AppResult<Paginated<ActivityLog>> {
        self.uow.activity_logs().list(page).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        AccountStatus, Loan, LoanApplication, LoanStatus, UserRole, UserStats,
    };
    use crate::errors::AppError;
    use crate::infra::repositories::{
        MockLoanRepository, MockOtpRepository, MockReportRepository, MockUserRepository,
    };
    use crate::infra::unit_of_work::testing::MockUnitOfWork;
    use serde_json::json;
    use uuid::Uuid;

    fn service(uow: MockUnitOfWork) -> AdminManager<MockUnitOfWork> {
        let config = Config::new("db", "redis", "t".repeat(40));
        AdminManager::new(Arc::new(uow), Cache::in_memory(), &config)
    }

    fn borrower() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            username: "bob".into(),
            email: None,
            phone_number: Some("+15551234567".into()),
            password_hash: "hash".into(),
            role: UserRole::User,
            account_status: AccountStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    fn loan_of(user: &User) -> Loan {
        let application =
            LoanApplication::from_payload(&json!({"amount": 150000, "termMonths": 24})).unwrap();
        Loan::submit(user.id, application, Utc::now())
    }

    fn audit() -> AuditContext {
        AuditContext::new(Uuid::new_v4(), Some("10.0.0.9".into()))
    }

    #[tokio::test]
    async fn test_stats_are_cached() {
        let mut reports = MockReportRepository::new();
        reports.expect_dashboard().times(1).returning(|_| {
            Ok(DashboardStats {
                users: UserStats {
                    total: 3,
                    ..Default::default()
                },
                ..Default::default()
            })
        });
        let admin = service(MockUnitOfWork::default().with_reports(reports));

        assert_eq!(admin.stats().await.unwrap().users.total, 3);
        assert_eq!(admin.stats().await.unwrap().users.total, 3);
    }

    #[tokio::test]
    async fn test_update_loan_audits_changes() {
        let user = borrower();
        let loan = loan_of(&user);
        let row = (loan, Some(user));
        let mut loans = MockLoanRepository::new();
        loans
            .expect_find_with_borrower()
            .returning(move |_| Ok(Some(row.clone())));
        loans
            .expect_save_with_borrower()
            .withf(|loan, borrower, entry| {
                entry.action == AuditAction::CustomerLoanUpdate
                    && entry.description
                        == "username changed from bob to robert | Status changed from pending to under_review"
                    && loan.status == LoanStatus::UnderReview
                    && borrower.as_ref().map(|u| u.username.as_str()) == Some("robert")
            })
            .times(1)
            .returning(|loan, borrower, _| Ok((loan, borrower)));

        let (loan, _) = service(MockUnitOfWork::default().with_loans(loans))
            .update_loan(
                "LN20250101000001".into(),
                LoanAmendment {
                    username: Some("robert".into()),
                    status: Some("under_review".into()),
                    ..Default::default()
                },
                audit(),
            )
            .await
            .unwrap();
        assert_eq!(loan.status, LoanStatus::UnderReview);
    }

    #[tokio::test]
    async fn test_delete_loan_deactivates_borrower() {
        let user = borrower();
        let loan = loan_of(&user);
        let expected = format!(
            "Loan {} and Customer bob marked as INACTIVE",
            loan.application_number
        );
        let row = (loan, Some(user));
        let mut loans = MockLoanRepository::new();
        loans
            .expect_find_with_borrower()
            .returning(move |_| Ok(Some(row.clone())));
        loans
            .expect_save_with_borrower()
            .withf(move |loan, borrower, entry| {
                loan.status == LoanStatus::Deleted
                    && borrower.as_ref().map(|u| u.account_status) == Some(AccountStatus::Inactive)
                    && entry.action == AuditAction::CustomerLoanDelete
                    && entry.description == expected
            })
            .times(1)
            .returning(|loan, borrower, _| Ok((loan, borrower)));

        service(MockUnitOfWork::default().with_loans(loans))
            .delete_loan("LN20250101000001".into(), audit())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_missing_loan_is_not_found() {
        let mut loans = MockLoanRepository::new();
        loans.expect_find_with_borrower().returning(|_| Ok(None));

        let err = service(MockUnitOfWork::default().with_loans(loans))
            .delete_loan("LN00000000000000".into(), audit())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound("Loan")));
    }

    #[tokio::test]
    async fn test_generate_otp_for_customer() {
        let user = borrower();
        let customer_id = user.id;
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_id()
            .returning(move |_| Ok(Some(user.clone())));
        let mut otps = MockOtpRepository::new();
        otps.expect_issue()
            .withf(move |otp, entry| {
                otp.user_id == customer_id
                    && entry.action == AuditAction::OtpGenerate
                    && entry.customer_id == Some(customer_id)
            })
            .times(1)
            .returning(|otp, _| Ok(otp));

        let otp = service(MockUnitOfWork::default().with_users(users).with_otps(otps))
            .generate_otp(
                GenerateOtpRequest {
                    customer_id,
                    otp_length: Some(8),
                },
                audit(),
            )
            .await
            .unwrap();
        assert_eq!(otp.otp_code.len(), 8);
    }

    #[tokio::test]
    async fn test_generate_otp_for_unknown_customer() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|_| Ok(None));

        let err = service(MockUnitOfWork::default().with_users(users))
            .generate_otp(
                GenerateOtpRequest {
                    customer_id: Uuid::new_v4(),
                    otp_length: None,
                },
                audit(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Customer not found");
    }
}
