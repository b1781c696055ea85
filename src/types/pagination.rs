//! Pagination types for list endpoints.

use serde::Serialize;
use utoipa::ToSchema;

use crate::config::{DEFAULT_PAGE_NUMBER, MAX_PAGE_SIZE};

/// Highest page number accepted; keeps `page * per_page` within an `i64` SQL offset.
const MAX_PAGE_NUMBER: i64 = i64::MAX / MAX_PAGE_SIZE as i64;

/// Normalised page request: 1-indexed, size within `1..=MAX_PAGE_SIZE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub per_page: u64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, per_page: Option<i64>, default_size: u64) -> Self {
        let page = page
            .map(|p| p.clamp(1, MAX_PAGE_NUMBER) as u64)
            .unwrap_or(DEFAULT_PAGE_NUMBER);
        let per_page = per_page
            .map(|size| size.clamp(1, MAX_PAGE_SIZE as i64) as u64)
            .unwrap_or(default_size)
            .clamp(1, MAX_PAGE_SIZE);
        Self { page, per_page }
    }

    /// Zero-based page index, as sea-orm paginators expect.
    pub fn index(&self) -> u64 {
        self.page - 1
    }
}

/// One page of results.
#[derive(Debug, Serialize, ToSchema)]
#[aliases(
    LoanPage = Paginated<crate::domain::LoanResponse>,
    AdminLoanPage = Paginated<crate::domain::AdminLoanResponse>,
    WithdrawalPage = Paginated<crate::domain::WithdrawalResponse>,
    UserPage = Paginated<crate::domain::UserResponse>,
    ActivityLogPage = Paginated<crate::domain::ActivityLogResponse>
)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub pages: u64,
    pub current_page: u64,
    pub per_page: u64,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            pages: total.div_ceil(request.per_page),
            current_page: request.page,
            per_page: request.per_page,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            pages: self.pages,
            current_page: self.current_page,
            per_page: self.per_page,
        }
    }
}
