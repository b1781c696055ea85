//! Repository layer: one trait per aggregate, each with a sea-orm `*Store`.

mod activity_log_repository;
pub(crate) mod entities;
mod filters;
mod loan_repository;
mod otp_repository;
mod report_repository;
mod token_repository;
mod user_repository;
mod withdrawal_repository;

pub use activity_log_repository::{ActivityLogRepository, ActivityLogStore};
pub use loan_repository::{LoanRepository, LoanStore, LoanWithBorrower};
pub use otp_repository::{OtpRepository, OtpStore};
pub use report_repository::{ReportRepository, ReportStore};
pub use token_repository::{TokenRepository, TokenStore};
pub use user_repository::{UserRepository, UserStore};
pub use withdrawal_repository::{WithdrawalRepository, WithdrawalStore};

#[cfg(any(test, feature = "test-utils"))]
pub use activity_log_repository::MockActivityLogRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use loan_repository::MockLoanRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use otp_repository::MockOtpRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use report_repository::MockReportRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use token_repository::MockTokenRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use user_repository::MockUserRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use withdrawal_repository::MockWithdrawalRepository;
