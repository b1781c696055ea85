//! Loan servicing backend.
//!
//! Borrowers register, apply for loans and request OTP-gated withdrawals.
//! Admins decide applications, process withdrawals, edit loans and read
//! an audit trail of their own actions.
//!
//! # Architecture Layers
//!
//! - **cli**: Command-line interface
//! - **commands**: CLI command implementations
//! - **config**: Application configuration and constants
//! - **domain**: Entities, status lifecycles and request validators
//! - **services**: Application use cases
//! - **infra**: Database, repositories, cache and transactions
//! - **api**: HTTP handlers, middleware, and routes
//! - **types**: Shared types (pagination, listing filters, responses)
//! - **errors**: Centralized error handling
//!
//! # CLI Usage
//!
//! ```bash
//! # Start the server
//! cargo run -- serve
//!
//! # Run migrations
//! cargo run -- migrate up
//!
//! # Bootstrap the first admin
//! cargo run -- create-admin --username root --email root@example.com --password 'Abcd1234!'
//! ```

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod infra;
pub mod services;
pub mod types;

// Re-export commonly used types at crate root
pub use api::AppState;
pub use config::Config;
pub use domain::{Loan, LoanStatus, User, UserRole, Withdrawal, WithdrawalStatus};
pub use errors::{AppError, AppResult};
pub use infra::Cache;
