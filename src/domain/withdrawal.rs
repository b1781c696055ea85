//! Withdrawal request entity.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::lifecycle::{TransitionError, WithdrawalAction};
use super::otp::is_valid_otp_code;
use super::validation::{self, as_number, as_text, field, OTP_KEYS};
use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WithdrawalStatus {
    Processing,
    Completed,
    Successful,
    OnHold,
    Exception,
    Rejected,
    Failed,
    Paid,
    Issued,
    Pending,
    InvalidBankDetails,
    AccountFrozen,
    Overdue,
    TaxPaymentRequired,
    Frozen,
    Cancelled,
}

impl WithdrawalStatus {
    pub const ALL: [WithdrawalStatus; 16] = [
        WithdrawalStatus::Processing,
        WithdrawalStatus::Completed,
        WithdrawalStatus::Successful,
        WithdrawalStatus::OnHold,
        WithdrawalStatus::Exception,
        WithdrawalStatus::Rejected,
        WithdrawalStatus::Failed,
        WithdrawalStatus::Paid,
        WithdrawalStatus::Issued,
        WithdrawalStatus::Pending,
        WithdrawalStatus::InvalidBankDetails,
        WithdrawalStatus::AccountFrozen,
        WithdrawalStatus::Overdue,
        WithdrawalStatus::TaxPaymentRequired,
        WithdrawalStatus::Frozen,
        WithdrawalStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawalStatus::Processing => "processing",
            WithdrawalStatus::Completed => "completed",
            WithdrawalStatus::Successful => "successful",
            WithdrawalStatus::OnHold => "on_hold",
            WithdrawalStatus::Exception => "exception",
            WithdrawalStatus::Rejected => "rejected",
            WithdrawalStatus::Failed => "failed",
            WithdrawalStatus::Paid => "paid",
            WithdrawalStatus::Issued => "issued",
            WithdrawalStatus::Pending => "pending",
            WithdrawalStatus::InvalidBankDetails => "invalid_bank_details",
            WithdrawalStatus::AccountFrozen => "account_frozen",
            WithdrawalStatus::Overdue => "overdue",
            WithdrawalStatus::TaxPaymentRequired => "tax_payment_required",
            WithdrawalStatus::Frozen => "frozen",
            WithdrawalStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for WithdrawalStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        WithdrawalStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| AppError::validation("Invalid status"))
    }
}

impl std::fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Withdrawal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: f64,
    pub otp: String,
    pub status: WithdrawalStatus,
    pub transaction_id: String,
    pub processed_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Withdrawal {
    pub fn request(user_id: Uuid, request: WithdrawalRequest, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            amount: request.amount,
            otp: request.otp_code,
            status: WithdrawalStatus::Pending,
            transaction_id: Uuid::new_v4().to_string(),
            processed_date: None,
            notes: request.notes,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn cancel_by_owner(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        self.status = self.status.apply(WithdrawalAction::OwnerCancel)?;
        self.updated_at = now;
        Ok(())
    }

    /// Admin completion or rejection. Notes replace whatever was stored before.
    pub fn process(
        &mut self,
        action: WithdrawalAction,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<WithdrawalStatus, TransitionError> {
        let previous = self.status;
        self.status = self.status.apply(action)?;
        if let Some(notes) = notes {
            self.notes = Some(notes.trim().to_string());
        }
        self.processed_date = Some(now);
        self.updated_at = now;
        Ok(previous)
    }
}

/// Parsed withdrawal payload
#[derive(Debug, Clone, PartialEq, Deserialize, ToSchema)]
pub struct WithdrawalRequest {
    #[schema(example = 5000.0)]
    pub amount: f64,
    #[serde(rename = "otp-code", alias = "otp_code")]
    #[schema(example = "482913")]
    pub otp_code: String,
    pub notes: Option<String>,
}

impl WithdrawalRequest {
    pub fn from_payload(payload: &Value) -> AppResult<Self> {
        if let Some(message) = validation::validate_withdrawal_request(payload) {
            return Err(AppError::validation(message));
        }

        let amount = field(payload, &["amount"])
            .and_then(as_number)
            .ok_or_else(|| AppError::validation("Invalid amount format"))?;
        let otp_code = field(payload, OTP_KEYS)
            .and_then(as_text)
            .filter(|code| is_valid_otp_code(code))
            .ok_or_else(|| AppError::validation("Invalid OTP format"))?;
        let notes = field(payload, &["notes"]).and_then(as_text);

        Ok(Self {
            amount,
            otp_code,
            notes,
        })
    }
}

/// Admin decision on a withdrawal
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ProcessWithdrawal {
    /// `completed` or `rejected`
    #[validate(length(min = 1, message = "Status is required"))]
    #[schema(example = "completed")]
    pub status: String,
    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub notes: Option<String>,
}

impl ProcessWithdrawal {
    pub fn action(&self) -> AppResult<WithdrawalAction> {
        match self.status.trim().to_lowercase().as_str() {
            "completed" => Ok(WithdrawalAction::Complete),
            "rejected" => Ok(WithdrawalAction::Reject),
            _ => Err(AppError::validation("Invalid processing status")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WithdrawalResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    #[schema(example = 5000.0)]
    pub amount: f64,
    #[schema(example = "pending")]
    pub status: String,
    pub transaction_id: String,
    pub processed_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Withdrawal> for WithdrawalResponse {
    fn from(withdrawal: Withdrawal) -> Self {
        Self {
            id: withdrawal.id,
            user_id: withdrawal.user_id,
            amount: withdrawal.amount,
            status: withdrawal.status.to_string(),
            transaction_id: withdrawal.transaction_id,
            processed_date: withdrawal.processed_date,
            notes: withdrawal.notes,
            created_at: withdrawal.created_at,
            updated_at: withdrawal.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pending(now: DateTime<Utc>) -> Withdrawal {
        let request = WithdrawalRequest::from_payload(
            &json!({"amount": 2500, "otp-code": "123456", "notes": "  rent  "}),
        )
        .unwrap();
        Withdrawal::request(Uuid::new_v4(), request, now)
    }

    #[test]
    fn test_request_trims_notes_and_generates_transaction_id() {
        let withdrawal = pending(Utc::now());
        assert_eq!(withdrawal.notes.as_deref(), Some("rent"));
        assert_eq!(withdrawal.status, WithdrawalStatus::Pending);
        assert!(Uuid::parse_str(&withdrawal.transaction_id).is_ok());
    }

    #[test]
    fn test_request_rejects_malformed_otp() {
        let err = WithdrawalRequest::from_payload(&json!({"amount": 10, "otp_code": "12ab"}))
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid OTP format");
    }

    #[test]
    fn test_second_cancel_fails() {
        let now = Utc::now();
        let mut withdrawal = pending(now);
        withdrawal.cancel_by_owner(now).unwrap();
        assert!(withdrawal.cancel_by_owner(now).is_err());
        assert_eq!(withdrawal.status, WithdrawalStatus::Cancelled);
    }

    #[test]
    fn test_process_overwrites_notes() {
        let now = Utc::now();
        let mut withdrawal = pending(now);
        let previous = withdrawal
            .process(WithdrawalAction::Complete, Some(" paid out ".into()), now)
            .unwrap();

        assert_eq!(previous, WithdrawalStatus::Pending);
        assert_eq!(withdrawal.status, WithdrawalStatus::Completed);
        assert_eq!(withdrawal.notes.as_deref(), Some("paid out"));
        assert_eq!(withdrawal.processed_date, Some(now));
    }

    #[test]
    fn test_process_status_parsing() {
        let request = ProcessWithdrawal {
            status: "approved".into(),
            notes: None,
        };
        assert_eq!(
            request.action().unwrap_err().to_string(),
            "Invalid processing status"
        );
    }
}
