//! Loan application entity.

use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::lifecycle::{LoanAction, TransitionError};
use super::user::{User, UserResponse};
use super::validation::{self, as_integer, as_number, as_text, field, TERM_KEYS};
use crate::config::{
    APPLICATION_NUMBER_PREFIX, DEFAULT_INTEREST_RATE, DEFAULT_LOAN_PURPOSE,
    DUE_DATE_DAYS_PER_TERM_MONTH,
};
use crate::errors::{AppError, AppResult};

/// Every status a loan can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoanStatus {
    Pending,
    UnderReview,
    Approved,
    Rejected,
    Otp6DigitRequired,
    Otp8DigitRequired,
    Otp10DigitRequired,
    AmlcInvestigation,
    InvalidBankDetails,
    LoanCancellation,
    InvalidWithdrawalAmount,
    Overdue,
    Deleted,
    OnHold,
    Closed,
    Penalties,
    InsufficientCreditScore,
    Restructured,
    Defaulted,
    TaxPaymentRequired,
    Cancelled,
    AccountFrozen,
    Paid,
}

impl LoanStatus {
    pub const ALL: [LoanStatus; 23] = [
        LoanStatus::Pending,
        LoanStatus::UnderReview,
        LoanStatus::Approved,
        LoanStatus::Rejected,
        LoanStatus::Otp6DigitRequired,
        LoanStatus::Otp8DigitRequired,
        LoanStatus::Otp10DigitRequired,
        LoanStatus::AmlcInvestigation,
        LoanStatus::InvalidBankDetails,
        LoanStatus::LoanCancellation,
        LoanStatus::InvalidWithdrawalAmount,
        LoanStatus::Overdue,
        LoanStatus::Deleted,
        LoanStatus::OnHold,
        LoanStatus::Closed,
        LoanStatus::Penalties,
        LoanStatus::InsufficientCreditScore,
        LoanStatus::Restructured,
        LoanStatus::Defaulted,
        LoanStatus::TaxPaymentRequired,
        LoanStatus::Cancelled,
        LoanStatus::AccountFrozen,
        LoanStatus::Paid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Pending => "pending",
            LoanStatus::UnderReview => "under_review",
            LoanStatus::Approved => "approved",
            LoanStatus::Rejected => "rejected",
            LoanStatus::Otp6DigitRequired => "otp_6_digit_required",
            LoanStatus::Otp8DigitRequired => "otp_8_digit_required",
            LoanStatus::Otp10DigitRequired => "otp_10_digit_required",
            LoanStatus::AmlcInvestigation => "amlc_investigation",
            LoanStatus::InvalidBankDetails => "invalid_bank_details",
            LoanStatus::LoanCancellation => "loan_cancellation",
            LoanStatus::InvalidWithdrawalAmount => "invalid_withdrawal_amount",
            LoanStatus::Overdue => "overdue",
            LoanStatus::Deleted => "deleted",
            LoanStatus::OnHold => "on_hold",
            LoanStatus::Closed => "closed",
            LoanStatus::Penalties => "penalties",
            LoanStatus::InsufficientCreditScore => "insufficient_credit_score",
            LoanStatus::Restructured => "restructured",
            LoanStatus::Defaulted => "defaulted",
            LoanStatus::TaxPaymentRequired => "tax_payment_required",
            LoanStatus::Cancelled => "cancelled",
            LoanStatus::AccountFrozen => "account_frozen",
            LoanStatus::Paid => "paid",
        }
    }
}

impl FromStr for LoanStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        LoanStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| AppError::validation("Invalid status"))
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Loan domain entity
#[derive(Debug, Clone, PartialEq)]
pub struct Loan {
    pub id: Uuid,
    pub application_number: String,
    pub user_id: Uuid,
    pub national_id: Option<String>,
    pub address: Option<String>,
    pub loan_amount: f64,
    pub interest_rate: f64,
    pub term_months: i32,
    pub status: LoanStatus,
    pub purpose: String,
    pub employment_status: Option<String>,
    pub employer: Option<String>,
    pub employment_duration: Option<String>,
    pub monthly_income: Option<f64>,
    pub bank_name: Option<String>,
    pub account_name: Option<String>,
    pub account_number: Option<String>,
    pub application_date: DateTime<Utc>,
    pub approval_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub processed_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Loan {
    /// Build a fresh pending application for `user_id`.
    pub fn submit(user_id: Uuid, application: LoanApplication, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            application_number: generate_application_number(now),
            user_id,
            national_id: application.national_id,
            address: application.address,
            loan_amount: application.amount,
            interest_rate: application.interest_rate,
            term_months: application.term_months,
            status: LoanStatus::Pending,
            purpose: application.purpose,
            employment_status: application.employment_status,
            employer: application.employer,
            employment_duration: application.employment_duration,
            monthly_income: application.monthly_income,
            bank_name: application.bank_name,
            account_name: application.account_name,
            account_number: application.account_number,
            application_date: now,
            approval_date: None,
            due_date: None,
            processed_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Approve or reject a pending application, stamping the decision dates.
    pub fn decide(&mut self, action: LoanAction, now: DateTime<Utc>) -> Result<(), TransitionError> {
        let next = self.status.apply(action)?;
        if next == LoanStatus::Approved {
            self.stamp_approval(now);
        }
        self.status = next;
        self.processed_date = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Borrower-side edit of amount, term or purpose while pending.
    pub fn revise(&mut self, update: LoanRevision, now: DateTime<Utc>) -> Result<(), TransitionError> {
        self.status.apply(LoanAction::OwnerEdit)?;
        if let Some(amount) = update.amount {
            self.loan_amount = amount;
        }
        if let Some(term) = update.term_months {
            self.term_months = term;
        }
        if let Some(purpose) = update.purpose {
            self.purpose = purpose.trim().to_string();
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn cancel_by_owner(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        self.status = self.status.apply(LoanAction::OwnerCancel)?;
        self.updated_at = now;
        Ok(())
    }

    pub fn mark_deleted(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        self.status = self.status.apply(LoanAction::AdminDelete)?;
        self.updated_at = now;
        Ok(())
    }

    /// Direct admin status edit. Returns whether the approval date was stamped.
    pub fn override_status(
        &mut self,
        to: LoanStatus,
        now: DateTime<Utc>,
    ) -> Result<bool, TransitionError> {
        self.status = self.status.override_to(to)?;
        self.updated_at = now;
        if to == LoanStatus::Approved && self.approval_date.is_none() {
            self.stamp_approval(now);
            return Ok(true);
        }
        Ok(false)
    }

    fn stamp_approval(&mut self, now: DateTime<Utc>) {
        if self.approval_date.is_none() {
            self.approval_date = Some(now);
        }
        self.due_date =
            Some(now + Duration::days(DUE_DATE_DAYS_PER_TERM_MONTH * i64::from(self.term_months)));
    }

    pub fn is_pending(&self) -> bool {
        self.status == LoanStatus::Pending
    }
}

/// `LN` + date + six random digits.
pub fn generate_application_number(now: DateTime<Utc>) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!(
        "{}{}{:06}",
        APPLICATION_NUMBER_PREFIX,
        now.format("%Y%m%d"),
        suffix
    )
}

/// Parsed loan application payload
#[derive(Debug, Clone, PartialEq, Deserialize, ToSchema)]
pub struct LoanApplication {
    #[schema(example = 150000.0)]
    pub amount: f64,
    #[serde(rename = "termMonths", alias = "term_months")]
    #[schema(example = 24)]
    pub term_months: i32,
    #[schema(example = 5.5)]
    pub interest_rate: f64,
    #[schema(example = "Personal Loan")]
    pub purpose: String,
    pub national_id: Option<String>,
    pub address: Option<String>,
    pub employment_status: Option<String>,
    pub employer: Option<String>,
    pub employment_duration: Option<String>,
    pub monthly_income: Option<f64>,
    pub bank_name: Option<String>,
    pub account_name: Option<String>,
    pub account_number: Option<String>,
}

impl LoanApplication {
    /// Validate a raw payload and extract the typed application.
    pub fn from_payload(payload: &Value) -> AppResult<Self> {
        if let Some(message) = validation::validate_loan_request(payload) {
            return Err(AppError::validation(message));
        }

        let amount = field(payload, &["amount"])
            .and_then(as_number)
            .ok_or_else(|| AppError::validation("Invalid loan amount"))?;
        let term_months = field(payload, TERM_KEYS)
            .and_then(as_integer)
            .and_then(|term| i32::try_from(term).ok())
            .ok_or_else(|| AppError::validation("Invalid loan term"))?;
        let interest_rate = field(payload, &["interest_rate"])
            .and_then(as_number)
            .unwrap_or(DEFAULT_INTEREST_RATE);
        let monthly_income = match field(payload, &["monthly_income"]) {
            Some(value) => Some(
                as_number(value).ok_or_else(|| AppError::validation("Invalid monthly income"))?,
            ),
            None => None,
        };
        let text = |key: &str| field(payload, &[key]).and_then(as_text);

        Ok(Self {
            amount,
            term_months,
            interest_rate,
            purpose: text("purpose").unwrap_or_else(|| DEFAULT_LOAN_PURPOSE.to_string()),
            national_id: text("national_id"),
            address: text("address"),
            employment_status: text("employment_status"),
            employer: text("employer"),
            employment_duration: text("employment_duration"),
            monthly_income,
            bank_name: text("bank_name"),
            account_name: text("account_name"),
            account_number: text("account_number"),
        })
    }
}

/// Borrower edit of a pending application
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct LoanRevision {
    #[validate(range(exclusive_min = 0.0, message = "Loan amount must be greater than zero"))]
    pub amount: Option<f64>,
    #[serde(alias = "termMonths")]
    #[validate(range(min = 1, max = 360, message = "Loan term must be between 1 and 360 months"))]
    pub term_months: Option<i32>,
    #[validate(length(min = 1, max = 255, message = "Purpose must be 1-255 characters"))]
    pub purpose: Option<String>,
}

impl LoanRevision {
    pub fn is_empty(&self) -> bool {
        self.amount.is_none() && self.term_months.is_none() && self.purpose.is_none()
    }
}

/// Loan response (safe to return to client)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoanResponse {
    pub id: Uuid,
    #[schema(example = "LN20250101004217")]
    pub application_number: String,
    pub user_id: Uuid,
    pub national_id: Option<String>,
    pub address: Option<String>,
    #[schema(example = 150000.0)]
    pub loan_amount: f64,
    #[schema(example = 5.5)]
    pub interest_rate: f64,
    #[schema(example = 24)]
    pub term_months: i32,
    #[schema(example = "pending")]
    pub status: String,
    pub purpose: String,
    pub employment_status: Option<String>,
    pub employer: Option<String>,
    pub employment_duration: Option<String>,
    pub monthly_income: Option<f64>,
    pub bank_name: Option<String>,
    pub account_name: Option<String>,
    pub account_number: Option<String>,
    pub application_date: DateTime<Utc>,
    pub approval_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub processed_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Loan> for LoanResponse {
    fn from(loan: Loan) -> Self {
        Self {
            id: loan.id,
            application_number: loan.application_number,
            user_id: loan.user_id,
            national_id: loan.national_id,
            address: loan.address,
            loan_amount: loan.loan_amount,
            interest_rate: loan.interest_rate,
            term_months: loan.term_months,
            status: loan.status.to_string(),
            purpose: loan.purpose,
            employment_status: loan.employment_status,
            employer: loan.employer,
            employment_duration: loan.employment_duration,
            monthly_income: loan.monthly_income,
            bank_name: loan.bank_name,
            account_name: loan.account_name,
            account_number: loan.account_number,
            application_date: loan.application_date,
            approval_date: loan.approval_date,
            due_date: loan.due_date,
            processed_date: loan.processed_date,
            created_at: loan.created_at,
            updated_at: loan.updated_at,
        }
    }
}

/// Loan together with its borrower, as listed on the admin dashboard
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdminLoanResponse {
    #[serde(flatten)]
    pub loan: LoanResponse,
    pub borrower: Option<UserResponse>,
}

impl From<(Loan, Option<User>)> for AdminLoanResponse {
    fn from((loan, borrower): (Loan, Option<User>)) -> Self {
        Self {
            loan: loan.into(),
            borrower: borrower.map(UserResponse::from),
        }
    }
}

/// Principal must fall inside the configured band.
pub fn check_amount_band(amount: f64, min: f64, max: f64) -> AppResult<()> {
    if amount < min {
        return Err(AppError::validation(format!(
            "Loan amount must be at least PHP {}",
            format_php(min)
        )));
    }
    if amount > max {
        return Err(AppError::validation(format!(
            "Loan amount cannot exceed PHP {}",
            format_php(max)
        )));
    }
    Ok(())
}

/// `1234567.5` -> `1,234,567.50`
fn format_php(amount: f64) -> String {
    let fixed = format!("{:.2}", amount);
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let digits: Vec<char> = whole.chars().collect();
    let mut grouped = String::new();
    for (i, digit) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*digit);
    }
    format!("{}.{}", grouped, cents)
}
