//! Withdrawal service: OTP-gated requests, owner cancellation, admin processing.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::{
    AuditAction, AuditContext, ProcessWithdrawal, Withdrawal, WithdrawalRequest, WithdrawalStatus,
};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::{Cache, UnitOfWork};
use crate::types::{PageRequest, Paginated};

#[async_trait]
pub trait WithdrawalService: Send + Sync {
    /// Validate the payload and the caller's latest OTP, then store the request.
    async fn request(&self, user_id: Uuid, payload: Value) -> AppResult<Withdrawal>;

    async fn list_own(
        &self,
        user_id: Uuid,
        status: Option<WithdrawalStatus>,
        page: PageRequest,
    ) -> AppResult<Paginated<Withdrawal>>;

    async fn get_own(&self, user_id: Uuid, id: Uuid) -> AppResult<Withdrawal>;

    async fn cancel(&self, user_id: Uuid, id: Uuid) -> AppResult<Withdrawal>;

    /// Complete or reject a withdrawal.
    async fn process(
        &self,
        id: Uuid,
        decision: ProcessWithdrawal,
        audit: AuditContext,
    ) -> AppResult<Withdrawal>;
}

pub struct WithdrawalManager<U: UnitOfWork> {
    uow: Arc<U>,
    cache: Cache,
}

impl<U: UnitOfWork> WithdrawalManager<U> {
    pub fn new(uow: Arc<U>, cache: Cache) -> Self {
        Self { uow, cache }
    }
}

#[async_trait]
impl<U: UnitOfWork> WithdrawalService for WithdrawalManager<U> {
    async fn request(&self, user_id: Uuid, payload: Value) -> AppResult<Withdrawal> {
        let request = WithdrawalRequest::from_payload(&payload)?;

        let issued = self.uow.otps().latest_for_user(user_id).await?;
        if issued.map(|otp| otp.otp_code) != Some(request.otp_code.clone()) {
            return Err(AppError::validation("Invalid OTP code"));
        }

        let withdrawal = self
            .uow
            .withdrawals()
            .create(Withdrawal::request(user_id, request, Utc::now()))
            .await?;

        tracing::info!(
            %user_id,
            withdrawal_id = %withdrawal.id,
            amount = withdrawal.amount,
            "Withdrawal requested"
        );
        self.cache.invalidate_stats().await;
        Ok(withdrawal)
    }

    async fn list_own(
        &self,
        user_id: Uuid,
        status: Option<WithdrawalStatus>,
        page: PageRequest,
    ) -> AppResult<Paginated<Withdrawal>> {
        self.uow
            .withdrawals()
            .list_for_user(user_id, status, page)
            .await
    }

    async fn get_own(&self, user_id: Uuid, id: Uuid) -> AppResult<Withdrawal> {
        self.uow
            .withdrawals()
            .find_owned(id, user_id)
            .await?
            .ok_or_not_found("Withdrawal")
    }

    async fn cancel(&self, user_id: Uuid, id: Uuid) -> AppResult<Withdrawal> {
        let mut withdrawal = self.get_own(user_id, id).await?;
        withdrawal.cancel_by_owner(Utc::now())?;
        let withdrawal = self.uow.withdrawals().save(withdrawal).await?;

        tracing::info!(%user_id, withdrawal_id = %withdrawal.id, "Withdrawal cancelled");
        self.cache.invalidate_stats().await;
        Ok(withdrawal)
    }

    async fn process(
        &self,
        id: Uuid,
        decision: ProcessWithdrawal,
        audit: AuditContext,
    ) -> AppResult<Withdrawal> {
        let action = decision.action()?;
        let mut withdrawal = self
            .uow
            .withdrawals()
            .find_by_id(id)
            .await?
            .ok_or_not_found("Withdrawal")?;

        let previous = withdrawal.process(action, decision.notes, Utc::now())?;
        let entry = audit
            .entry(
                AuditAction::WithdrawalProcess,
                format!(
                    "Withdrawal {} changed from {} to {}",
                    withdrawal.transaction_id, previous, withdrawal.status
                ),
            )
            .customer(withdrawal.user_id);
        let withdrawal = self
            .uow
            .withdrawals()
            .save_with_audit(withdrawal, entry)
            .await?;

        tracing::info!(
            admin_id = %audit.admin_id,
            withdrawal_id = %withdrawal.id,
            status = %withdrawal.status,
            "Withdrawal processed"
        );
        self.cache.invalidate_stats().await;
        Ok(withdrawal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Otp;
    use crate::infra::repositories::{MockOtpRepository, MockWithdrawalRepository};
    use crate::infra::unit_of_work::testing::MockUnitOfWork;
    use serde_json::json;

    fn service(uow: MockUnitOfWork) -> WithdrawalManager<MockUnitOfWork> {
        WithdrawalManager::new(Arc::new(uow), Cache::in_memory())
    }

    fn otp(user_id: Uuid, code: &str) -> Otp {
        Otp {
            id: Uuid::new_v4(),
            user_id,
            otp_code: code.to_string(),
            created_at: Utc::now(),
        }
    }

    fn pending(user_id: Uuid) -> Withdrawal {
        let request = WithdrawalRequest::from_payload(&json!({
            "amount": 5000,
            "otp-code": "123456",
        }))
        .unwrap();
        Withdrawal::request(user_id, request, Utc::now())
    }

    #[tokio::test]
    async fn test_request_with_matching_otp() {
        let user_id = Uuid::new_v4();
        let mut otps = MockOtpRepository::new();
        otps.expect_latest_for_user()
            .returning(move |id| Ok(Some(otp(id, "123456"))));
        let mut withdrawals = MockWithdrawalRepository::new();
        withdrawals
            .expect_create()
            .times(1)
            .returning(|withdrawal| Ok(withdrawal));

        let withdrawal = service(
            MockUnitOfWork::default()
                .with_otps(otps)
                .with_withdrawals(withdrawals),
        )
        .request(
            user_id,
            json!({"amount": 5000, "otp-code": "123456", "notes": "  rent  "}),
        )
        .await
        .unwrap();

        assert_eq!(withdrawal.user_id, user_id);
        assert_eq!(withdrawal.status, WithdrawalStatus::Pending);
        assert_eq!(withdrawal.notes.as_deref(), Some("rent"));
    }

    #[tokio::test]
    async fn test_request_with_stale_otp_is_rejected() {
        let mut otps = MockOtpRepository::new();
        otps.expect_latest_for_user()
            .returning(|id| Ok(Some(otp(id, "654321"))));
        let mut withdrawals = MockWithdrawalRepository::new();
        withdrawals.expect_create().never();

        let err = service(
            MockUnitOfWork::default()
                .with_otps(otps)
                .with_withdrawals(withdrawals),
        )
        .request(Uuid::new_v4(), json!({"amount": 5000, "otp_code": "123456"}))
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Invalid OTP code");
    }

    #[tokio::test]
    async fn test_second_cancel_is_refused() {
        let user_id = Uuid::new_v4();
        let mut cancelled = pending(user_id);
        cancelled.status = WithdrawalStatus::Cancelled;
        let mut withdrawals = MockWithdrawalRepository::new();
        withdrawals
            .expect_find_owned()
            .returning(move |_, _| Ok(Some(cancelled.clone())));
        withdrawals.expect_save().never();

        let err = service(MockUnitOfWork::default().with_withdrawals(withdrawals))
            .cancel(user_id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot cancel withdrawal that is not in pending status"
        );
    }

    #[tokio::test]
    async fn test_process_is_audited() {
        let withdrawal = pending(Uuid::new_v4());
        let user_id = withdrawal.user_id;
        let mut withdrawals = MockWithdrawalRepository::new();
        withdrawals
            .expect_find_by_id()
            .returning(move |_| Ok(Some(withdrawal.clone())));
        withdrawals
            .expect_save_with_audit()
            .withf(move |w, entry| {
                entry.action == AuditAction::WithdrawalProcess
                    && entry.customer_id == Some(user_id)
                    && w.processed_date.is_some()
            })
            .times(1)
            .returning(|w, _| Ok(w));

        let processed = service(MockUnitOfWork::default().with_withdrawals(withdrawals))
            .process(
                Uuid::new_v4(),
                ProcessWithdrawal {
                    status: "completed".into(),
                    notes: Some(" paid out ".into()),
                },
                AuditContext::new(Uuid::new_v4(), None),
            )
            .await
            .unwrap();

        assert_eq!(processed.status, WithdrawalStatus::Completed);
        assert_eq!(processed.notes.as_deref(), Some("paid out"));
    }
}
