//! Application services layer - Use cases and business logic.
//!
//! Services orchestrate domain logic and infrastructure to fulfill
//! application use cases. They depend on the `UnitOfWork` abstraction
//! for repository access, so tests can swap in mocks.

mod admin_service;
mod auth_service;
pub mod container;
mod loan_service;
mod withdrawal_service;

// Service Container
pub use container::{ServiceContainer, Services};

// Service traits and implementations
pub use admin_service::{AdminManager, AdminService};
pub use auth_service::{
    AccessTokenResponse, AuthService, AuthUser, Authenticator, Claims, LoginResponse, TokenPair,
};
pub use loan_service::{LoanManager, LoanService};
pub use withdrawal_service::{WithdrawalManager, WithdrawalService};
