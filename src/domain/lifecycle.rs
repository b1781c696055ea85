//! Status lifecycles for loans and withdrawals.
//!
//! Each lifecycle is an explicit `(status, action) -> status` table. Anything
//! missing from a table is an illegal transition and yields [`TransitionError`].

use std::collections::HashMap;

use once_cell::sync::Lazy;
use thiserror::Error;

use super::loan::LoanStatus;
use super::withdrawal::WithdrawalStatus;

/// Actions that move a loan between statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoanAction {
    /// Admin approval through the status endpoint
    Approve,
    /// Admin rejection through the status endpoint
    Reject,
    /// Borrower withdraws their own application
    OwnerCancel,
    /// Borrower edits amount, term or purpose
    OwnerEdit,
    /// Admin soft delete
    AdminDelete,
}

impl LoanAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanAction::Approve => "approve",
            LoanAction::Reject => "reject",
            LoanAction::OwnerCancel => "cancel",
            LoanAction::OwnerEdit => "edit",
            LoanAction::AdminDelete => "delete",
        }
    }
}

impl std::fmt::Display for LoanAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actions that move a withdrawal between statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WithdrawalAction {
    OwnerCancel,
    Complete,
    Reject,
}

impl std::fmt::Display for WithdrawalAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            WithdrawalAction::OwnerCancel => "cancel",
            WithdrawalAction::Complete => "complete",
            WithdrawalAction::Reject => "reject",
        })
    }
}

/// A transition absent from the lifecycle tables.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("{}", loan_message(.from, .action))]
    Loan { from: LoanStatus, action: LoanAction },

    #[error("{}", override_message(.from, .to))]
    LoanOverride { from: LoanStatus, to: LoanStatus },

    #[error("{}", withdrawal_message(.from, .action))]
    Withdrawal {
        from: WithdrawalStatus,
        action: WithdrawalAction,
    },
}

fn loan_message(from: &LoanStatus, action: &LoanAction) -> String {
    match action {
        LoanAction::Approve | LoanAction::Reject => {
            format!("Loan is already {}, cannot change status", from)
        }
        LoanAction::OwnerCancel => "Only pending loan applications can be cancelled".to_string(),
        LoanAction::OwnerEdit => "Only pending loan applications can be updated".to_string(),
        LoanAction::AdminDelete => format!("Loan is already {}", from),
    }
}

fn override_message(from: &LoanStatus, to: &LoanStatus) -> String {
    if to == &LoanStatus::Deleted {
        "Loans can only be deleted through the delete endpoint".to_string()
    } else {
        format!("Loan is already {}", from)
    }
}

fn withdrawal_message(from: &WithdrawalStatus, action: &WithdrawalAction) -> String {
    match action {
        WithdrawalAction::OwnerCancel => {
            "Cannot cancel withdrawal that is not in pending status".to_string()
        }
        _ => format!("Cannot {} withdrawal that is {}", action, from),
    }
}

static LOAN_TRANSITIONS: Lazy<HashMap<(LoanStatus, LoanAction), LoanStatus>> = Lazy::new(|| {
    use LoanAction::*;
    use LoanStatus::*;

    let mut table = HashMap::from([
        ((Pending, Approve), Approved),
        ((Pending, Reject), Rejected),
        ((Pending, OwnerCancel), Cancelled),
        ((Pending, OwnerEdit), Pending),
    ]);
    for status in LoanStatus::ALL.into_iter().filter(|s| *s != Deleted) {
        table.insert((status, AdminDelete), Deleted);
    }
    table
});

// Processing carries no precondition on the current status.
static WITHDRAWAL_TRANSITIONS: Lazy<HashMap<(WithdrawalStatus, WithdrawalAction), WithdrawalStatus>> =
    Lazy::new(|| {
        use WithdrawalAction::*;

        let mut table = HashMap::from([(
            (WithdrawalStatus::Pending, OwnerCancel),
            WithdrawalStatus::Cancelled,
        )]);
        for status in WithdrawalStatus::ALL {
            table.insert((status, Complete), WithdrawalStatus::Completed);
            table.insert((status, Reject), WithdrawalStatus::Rejected);
        }
        table
    });

impl LoanStatus {
    /// Resolve the status reached by applying `action`, if the table allows it.
    pub fn apply(self, action: LoanAction) -> Result<LoanStatus, TransitionError> {
        LOAN_TRANSITIONS
            .get(&(self, action))
            .copied()
            .ok_or(TransitionError::Loan { from: self, action })
    }

    /// Direct admin edit of the status field. Any target other than the
    /// current status is accepted, except `deleted`.
    pub fn override_to(self, to: LoanStatus) -> Result<LoanStatus, TransitionError> {
        if to == self || to == LoanStatus::Deleted {
            return Err(TransitionError::LoanOverride { from: self, to });
        }
        Ok(to)
    }
}

impl WithdrawalStatus {
    pub fn apply(self, action: WithdrawalAction) -> Result<WithdrawalStatus, TransitionError> {
        WITHDRAWAL_TRANSITIONS
            .get(&(self, action))
            .copied()
            .ok_or(TransitionError::Withdrawal { from: self, action })
    }
}
