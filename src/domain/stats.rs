//! Admin dashboard figures.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::loan::LoanResponse;
use super::user::UserResponse;
use super::withdrawal::WithdrawalResponse;

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct DashboardStats {
    pub users: UserStats,
    pub loans: LoanStats,
    pub withdrawals: WithdrawalStats,
    pub recent: RecentActivity,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UserStats {
    pub total: u64,
    pub new_last_24h: u64,
    pub new_last_7d: u64,
    pub new_last_30d: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct LoanStats {
    pub total: u64,
    pub total_amount: f64,
    pub approved_amount: f64,
    /// Loan count keyed by status
    pub by_status: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct WithdrawalStats {
    pub total: u64,
    pub total_amount: f64,
    pub completed: u64,
    pub pending: u64,
}

/// Latest rows of each kind
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct RecentActivity {
    pub loans: Vec<LoanResponse>,
    pub users: Vec<UserResponse>,
    pub withdrawals: Vec<WithdrawalResponse>,
}
