//! Domain layer: entities, status lifecycles and request validators.
//!
//! Nothing here touches the database or HTTP.

pub mod activity_log;
pub mod amendment;
pub mod lifecycle;
pub mod loan;
pub mod otp;
pub mod password;
pub mod stats;
pub mod user;
pub mod validation;
pub mod withdrawal;

pub use activity_log::{
    ActivityLog, ActivityLogResponse, AuditAction, AuditContext, AuditValue, ChangeSet,
    NewActivityLog,
};
pub use amendment::LoanAmendment;
pub use lifecycle::{LoanAction, TransitionError, WithdrawalAction};
pub use loan::{
    check_amount_band, AdminLoanResponse, Loan, LoanApplication, LoanResponse, LoanRevision,
    LoanStatus,
};
pub use otp::{GenerateOtpRequest, Otp, OtpResponse};
pub use password::Password;
pub use stats::{DashboardStats, LoanStats, RecentActivity, UserStats, WithdrawalStats};
pub use user::{AccountStatus, NewUser, User, UserResponse, UserRole};
pub use withdrawal::{
    ProcessWithdrawal, Withdrawal, WithdrawalRequest, WithdrawalResponse, WithdrawalStatus,
};
