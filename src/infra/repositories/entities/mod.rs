//! SeaORM entity definitions
//!
//! These are database-specific entities separate from domain models.

pub mod activity_log;
pub mod loan;
pub mod otp;
pub mod token_blocklist;
pub mod user;
pub mod withdrawal;
