//! HTTP request handlers.

pub mod admin_handler;
pub mod auth_handler;
pub mod loan_handler;
pub mod withdrawal_handler;

pub use admin_handler::admin_routes;
pub use auth_handler::{protected_auth_routes, public_auth_routes};
pub use loan_handler::loan_routes;
pub use withdrawal_handler::withdrawal_routes;
