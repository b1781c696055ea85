//! Loan service: borrower applications and the admin approve/reject decision.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::config::Config;
use crate::domain::{
    check_amount_band, AuditAction, AuditContext, Loan, LoanAction, LoanApplication,
    LoanRevision, LoanStatus,
};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::{Cache, UnitOfWork};
use crate::types::{PageRequest, Paginated};

#[async_trait]
pub trait LoanService: Send + Sync {
    /// Validate and store a new pending application.
    async fn apply(&self, user_id: Uuid, payload: Value) -> AppResult<Loan>;

    async fn list_own(
        &self,
        user_id: Uuid,
        status: Option<LoanStatus>,
        page: PageRequest,
    ) -> AppResult<Paginated<Loan>>;

    async fn get_own(&self, user_id: Uuid, id: Uuid) -> AppResult<Loan>;

    /// Edit amount, term or purpose of a pending application.
    async fn revise(&self, user_id: Uuid, id: Uuid, revision: LoanRevision) -> AppResult<Loan>;

    /// Cancel a pending application.
    async fn cancel(&self, user_id: Uuid, id: Uuid) -> AppResult<Loan>;

    /// Approve or reject a pending loan. `status` is the raw requested status.
    async fn decide(
        &self,
        id: Uuid,
        status: Option<String>,
        audit: AuditContext,
    ) -> AppResult<Loan>;
}

/// Concrete implementation of LoanService using Unit of Work.
pub struct LoanManager<U: UnitOfWork> {
    uow: Arc<U>,
    cache: Cache,
    min_amount: f64,
    max_amount: f64,
}

impl<U: UnitOfWork> LoanManager<U> {
    pub fn new(uow: Arc<U>, cache: Cache, config: &Config) -> Self {
        Self {
            uow,
            cache,
            min_amount: config.loan_min_amount,
            max_amount: config.loan_max_amount,
        }
    }

    fn check_band(&self, amount: f64) -> AppResult<()> {
        check_amount_band(amount, self.min_amount, self.max_amount)
    }

    async fn pending_conflict(&self, user_id: Uuid) -> AppResult<Option<AppError>> {
        Ok(self
            .uow
            .loans()
            .find_pending_for_user(user_id)
            .await?
            .map(|loan| AppError::PendingLoanExists {
                application_number: loan.application_number,
            }))
    }
}

fn decision(status: Option<String>) -> AppResult<LoanAction> {
    let status = status
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::validation("Status is required"))?;
    match status.parse::<LoanStatus>() {
        Ok(LoanStatus::Approved) => Ok(LoanAction::Approve),
        Ok(LoanStatus::Rejected) => Ok(LoanAction::Reject),
        _ => Err(AppError::validation("Invalid status")),
    }
}

#[async_trait]
impl<U: UnitOfWork> LoanService for LoanManager<U> {
    async fn apply(&self, user_id: Uuid, payload: Value) -> AppResult<Loan> {
        if let Some(conflict) = self.pending_conflict(user_id).await? {
            return Err(conflict);
        }

        let application = LoanApplication::from_payload(&payload)?;
        self.check_band(application.amount)?;

        let loan = Loan::submit(user_id, application, Utc::now());
        let loan = match self.uow.loans().create(loan).await {
            Ok(loan) => loan,
            // Lost a race against a concurrent application from the same user.
            Err(AppError::Conflict(entity)) => {
                return Err(self
                    .pending_conflict(user_id)
                    .await?
                    .unwrap_or(AppError::Conflict(entity)));
            }
            Err(e) => return Err(e),
        };

        tracing::info!(
            %user_id,
            loan_id = %loan.id,
            application_number = %loan.application_number,
            "Loan application submitted"
        );
        self.cache.invalidate_stats().await;
        Ok(loan)
    }

    async fn list_own(
        &self,
        user_id: Uuid,
        status: Option<LoanStatus>,
        page: PageRequest,
    ) -> AppResult<Paginated<Loan>> {
        self.uow.loans().list_for_user(user_id, status, page).await
    }

    async fn get_own(&self, user_id: Uuid, id: Uuid) -> AppResult<Loan> {
        self.uow
            .loans()
            .find_owned(id, user_id)
            .await?
            .ok_or_not_found("Loan")
    }

    async fn revise(&self, user_id: Uuid, id: Uuid, revision: LoanRevision) -> AppResult<Loan> {
        if revision.is_empty() {
            return Err(AppError::validation("No changes provided"));
        }
        if let Some(amount) = revision.amount {
            self.check_band(amount)?;
        }

        let mut loan = self.get_own(user_id, id).await?;
        loan.revise(revision, Utc::now())?;
        let loan = self.uow.loans().save(loan).await?;

        tracing::info!(%user_id, loan_id = %loan.id, "Loan application updated");
        self.cache.invalidate_stats().await;
        Ok(loan)
    }

    async fn cancel(&self, user_id: Uuid, id: Uuid) -> AppResult<Loan> {
        let mut loan = self.get_own(user_id, id).await?;
        loan.cancel_by_owner(Utc::now())?;
        let loan = self.uow.loans().save(loan).await?;

        tracing::info!(%user_id, loan_id = %loan.id, "Loan application cancelled");
        self.cache.invalidate_stats().await;
        Ok(loan)
    }

    async fn decide(
        &self,
        id: Uuid,
        status: Option<String>,
        audit: AuditContext,
    ) -> AppResult<Loan> {
        let action = decision(status)?;
        let mut loan = self
            .uow
            .loans()
            .find_by_id(id)
            .await?
            .ok_or_not_found("Loan")?;

        let previous = loan.status;
        loan.decide(action, Utc::now())?;
        let entry = audit
            .entry(
                AuditAction::LoanStatusUpdate,
                format!(
                    "Loan {} status changed from {} to {}",
                    loan.application_number, previous, loan.status
                ),
            )
            .customer(loan.user_id)
            .loan(loan.id);
        let loan = self.uow.loans().save_with_audit(loan, entry).await?;

        tracing::info!(
            admin_id = %audit.admin_id,
            loan_id = %loan.id,
            status = %loan.status,
            "Loan status decided"
        );
        self.cache.invalidate_stats().await;
        Ok(loan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::repositories::MockLoanRepository;
    use crate::infra::unit_of_work::testing::MockUnitOfWork;
    use serde_json::json;

    fn service(loans: MockLoanRepository) -> LoanManager<MockUnitOfWork> {
        let config = Config::new("db", "redis", "t".repeat(40));
        LoanManager::new(
            Arc::new(MockUnitOfWork::default().with_loans(loans)),
            Cache::in_memory(),
            &config,
        )
    }

    fn existing_loan(user_id: Uuid) -> Loan {
        let application =
            LoanApplication::from_payload(&json!({"amount": 150000, "termMonths": 24})).unwrap();
        Loan::submit(user_id, application, Utc::now())
    }

    fn audit() -> AuditContext {
        AuditContext::new(Uuid::new_v4(), Some("127.0.0.1".into()))
    }

    #[tokio::test]
    async fn test_apply_creates_pending_loan() {
        let mut loans = MockLoanRepository::new();
        loans.expect_find_pending_for_user().returning(|_| Ok(None));
        loans.expect_create().times(1).returning(|loan| Ok(loan));
        let user_id = Uuid::new_v4();

        let loan = service(loans)
            .apply(user_id, json!({"amount": 150000, "termMonths": 24}))
            .await
            .unwrap();

        assert_eq!(loan.user_id, user_id);
        assert_eq!(loan.status, LoanStatus::Pending);
        assert!(loan.application_number.starts_with("LN"));
    }

    #[tokio::test]
    async fn test_second_pending_application_is_refused() {
        let user_id = Uuid::new_v4();
        let pending = existing_loan(user_id);
        let number = pending.application_number.clone();
        let mut loans = MockLoanRepository::new();
        loans
            .expect_find_pending_for_user()
            .returning(move |_| Ok(Some(pending.clone())));
        loans.expect_create().never();

        let err = service(loans)
            .apply(user_id, json!({"amount": 150000, "termMonths": 24}))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::PendingLoanExists { ref application_number } if *application_number == number
        ));
    }

    #[tokio::test]
    async fn test_unique_violation_reports_winning_application() {
        let user_id = Uuid::new_v4();
        let winner = existing_loan(user_id);
        let number = winner.application_number.clone();
        let mut loans = MockLoanRepository::new();
        let mut lookups = 0;
        loans
            .expect_find_pending_for_user()
            .times(2)
            .returning(move |_| {
                lookups += 1;
                Ok((lookups > 1).then(|| winner.clone()))
            });
        loans
            .expect_create()
            .returning(|_| Err(AppError::conflict("Loan application")));

        let err = service(loans)
            .apply(user_id, json!({"amount": 150000, "termMonths": 24}))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::PendingLoanExists { ref application_number } if *application_number == number
        ));
    }

    #[tokio::test]
    async fn test_amount_outside_band_is_rejected() {
        let mut loans = MockLoanRepository::new();
        loans.expect_find_pending_for_user().returning(|_| Ok(None));
        loans.expect_create().never();

        let err = service(loans)
            .apply(Uuid::new_v4(), json!({"amount": 5000, "termMonths": 24}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Loan amount must be at least PHP 100,000.00");
    }

    #[tokio::test]
    async fn test_decide_requires_status() {
        let loans = MockLoanRepository::new();
        let err = service(loans)
            .decide(Uuid::new_v4(), None, audit())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Status is required");

        let loans = MockLoanRepository::new();
        let err = service(loans)
            .decide(Uuid::new_v4(), Some("overdue".into()), audit())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid status");
    }

    #[tokio::test]
    async fn test_decide_writes_audit_entry() {
        let loan = existing_loan(Uuid::new_v4());
        let loan_id = loan.id;
        let mut loans = MockLoanRepository::new();
        loans
            .expect_find_by_id()
            .returning(move |_| Ok(Some(loan.clone())));
        loans
            .expect_save_with_audit()
            .withf(move |loan, entry| {
                entry.action == AuditAction::LoanStatusUpdate
                    && entry.loan_id == Some(loan_id)
                    && entry.description.ends_with("from pending to approved")
                    && loan.approval_date.is_some()
            })
            .times(1)
            .returning(|loan, _| Ok(loan));

        let decided = service(loans)
            .decide(loan_id, Some("approved".into()), audit())
            .await
            .unwrap();
        assert_eq!(decided.status, LoanStatus::Approved);
    }

    #[tokio::test]
    async fn test_decide_non_pending_loan_is_refused() {
        let mut loan = existing_loan(Uuid::new_v4());
        loan.status = LoanStatus::Approved;
        let mut loans = MockLoanRepository::new();
        loans
            .expect_find_by_id()
            .returning(move |_| Ok(Some(loan.clone())));
        loans.expect_save_with_audit().never();

        let err = service(loans)
            .decide(Uuid::new_v4(), Some("rejected".into()), audit())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Loan is already approved, cannot change status"
        );
    }

    #[tokio::test]
    async fn test_cancel_missing_loan_is_not_found() {
        let mut loans = MockLoanRepository::new();
        loans.expect_find_owned().returning(|_, _| Ok(None));

        let err = service(loans)
            .cancel(Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Loan not found");
    }
}
