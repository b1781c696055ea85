//! Append-only audit trail of admin mutations.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    CustomerLoanUpdate,
    CustomerLoanDelete,
    LoanStatusUpdate,
    WithdrawalProcess,
    OtpGenerate,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::CustomerLoanUpdate => "CUSTOMER_LOAN_UPDATE",
            AuditAction::CustomerLoanDelete => "CUSTOMER_LOAN_DELETE",
            AuditAction::LoanStatusUpdate => "LOAN_STATUS_UPDATE",
            AuditAction::WithdrawalProcess => "WITHDRAWAL_PROCESS",
            AuditAction::OtpGenerate => "OTP_GENERATE",
        }
    }
}

impl FromStr for AuditAction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            AuditAction::CustomerLoanUpdate,
            AuditAction::CustomerLoanDelete,
            AuditAction::LoanStatusUpdate,
            AuditAction::WithdrawalProcess,
            AuditAction::OtpGenerate,
        ]
        .into_iter()
        .find(|action| action.as_str() == s)
        .ok_or_else(|| AppError::internal(format!("Unknown audit action: {}", s)))
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who performed an admin mutation, and from where.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditContext {
    pub admin_id: Uuid,
    pub ip_address: Option<String>,
}

impl AuditContext {
    pub fn new(admin_id: Uuid, ip_address: Option<String>) -> Self {
        Self {
            admin_id,
            ip_address,
        }
    }

    pub fn entry(&self, action: AuditAction, description: impl Into<String>) -> NewActivityLog {
        NewActivityLog {
            admin_id: self.admin_id,
            customer_id: None,
            loan_id: None,
            action,
            description: description.into(),
            ip_address: self.ip_address.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewActivityLog {
    pub admin_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub loan_id: Option<Uuid>,
    pub action: AuditAction,
    pub description: String,
    pub ip_address: Option<String>,
}

impl NewActivityLog {
    pub fn customer(mut self, customer_id: Uuid) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    pub fn loan(mut self, loan_id: Uuid) -> Self {
        self.loan_id = Some(loan_id);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityLog {
    pub id: Uuid,
    pub admin_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub loan_id: Option<Uuid>,
    pub action: AuditAction,
    pub description: String,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ActivityLogResponse {
    pub id: Uuid,
    pub admin_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub loan_id: Option<Uuid>,
    #[schema(example = "LOAN_STATUS_UPDATE")]
    pub action: String,
    pub description: String,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<ActivityLog> for ActivityLogResponse {
    fn from(log: ActivityLog) -> Self {
        Self {
            id: log.id,
            admin_id: log.admin_id,
            customer_id: log.customer_id,
            loan_id: log.loan_id,
            action: log.action.to_string(),
            description: log.description,
            ip_address: log.ip_address,
            created_at: log.created_at,
        }
    }
}

// =============================================================================
// Field-level diffs
// =============================================================================

/// How a field value is rendered inside an audit description.
pub trait AuditValue {
    fn render(&self) -> String;
}

impl AuditValue for String {
    fn render(&self) -> String {
        self.clone()
    }
}

impl AuditValue for f64 {
    fn render(&self) -> String {
        self.to_string()
    }
}

impl AuditValue for i32 {
    fn render(&self) -> String {
        self.to_string()
    }
}

impl<T: AuditValue> AuditValue for Option<T> {
    fn render(&self) -> String {
        match self {
            Some(value) => value.render(),
            None => "none".to_string(),
        }
    }
}

/// Collects one line per changed field.
#[derive(Debug, Default, Clone)]
pub struct ChangeSet {
    lines: Vec<String>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `incoming` into `target` when present and different, recording the change.
    pub fn apply<T>(&mut self, field: &str, target: &mut T, incoming: Option<T>) -> bool
    where
        T: AuditValue + PartialEq,
    {
        match incoming {
            Some(value) if *target != value => {
                self.lines.push(format!(
                    "{} changed from {} to {}",
                    field,
                    target.render(),
                    value.render()
                ));
                *target = value;
                true
            }
            _ => false,
        }
    }

    pub fn note(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn describe(&self) -> String {
        self.lines.join(" | ")
    }
}
