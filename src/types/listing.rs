//! Query-string parsing for list endpoints.
//!
//! Every parameter arrives as an optional string. Blank values mean "no
//! constraint", so `?status=` behaves exactly like a missing `status`.

use std::str::FromStr;

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use utoipa::IntoParams;

use super::pagination::PageRequest;
use crate::config::{DEFAULT_ADMIN_PAGE_SIZE, ROLE_ADMIN, ROLE_USER};
use crate::domain::{AccountStatus, LoanStatus, UserRole};
use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort<K> {
    pub key: K,
    pub direction: SortDirection,
}

/// Parse `key` or `-key`. Unknown keys fall back to `fallback` descending.
pub fn parse_sort<K: Copy>(raw: Option<&str>, keys: &[(&str, K)], fallback: K) -> Sort<K> {
    let default = Sort {
        key: fallback,
        direction: SortDirection::Desc,
    };
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return default;
    };
    let (name, direction) = match raw.strip_prefix('-') {
        Some(name) => (name, SortDirection::Desc),
        None => (raw, SortDirection::Asc),
    };
    keys.iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, key)| Sort {
            key: *key,
            direction,
        })
        .unwrap_or(default)
}

/// Upper bound of a date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpperBound {
    Inclusive(DateTime<Utc>),
    /// Bare dates cover the whole day, so the bound is the next midnight.
    Exclusive(DateTime<Utc>),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<UpperBound>,
}

impl DateRange {
    pub fn parse(from: Option<&str>, to: Option<&str>) -> AppResult<Self> {
        let from = match present(from) {
            Some(raw) => Some(match parse_timestamp(raw) {
                Some(at) => at,
                None => start_of(parse_date(raw)?),
            }),
            None => None,
        };
        let to = match present(to) {
            Some(raw) => Some(match parse_timestamp(raw) {
                Some(at) => UpperBound::Inclusive(at),
                None => {
                    let day = parse_date(raw)?;
                    let next = day
                        .checked_add_days(Days::new(1))
                        .ok_or_else(|| AppError::validation("Invalid date_to"))?;
                    UpperBound::Exclusive(start_of(next))
                }
            }),
            None => None,
        };
        Ok(Self { from, to })
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|at| at.with_timezone(&Utc))
}

fn parse_date(raw: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        AppError::validation("Invalid date format, use YYYY-MM-DD or RFC 3339")
    })
}

fn start_of(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

fn present(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_int(raw: Option<&str>, name: &str) -> AppResult<Option<i64>> {
    present(raw)
        .map(|value| {
            value
                .parse::<i64>()
                .map_err(|_| AppError::validation(format!("{} must be an integer", name)))
        })
        .transpose()
}

fn parse_amount(raw: Option<&str>, name: &str) -> AppResult<Option<f64>> {
    present(raw)
        .map(|value| {
            value
                .parse::<f64>()
                .ok()
                .filter(|amount| amount.is_finite())
                .ok_or_else(|| AppError::validation(format!("{} must be a number", name)))
        })
        .transpose()
}

fn parse_status<S: FromStr<Err = AppError>>(raw: Option<&str>) -> AppResult<Option<S>> {
    present(raw).map(str::parse).transpose()
}

// =============================================================================
// Borrower lists
// =============================================================================

/// `page`, `per_page` and `status` on a borrower's own list.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    pub page: Option<String>,
    pub per_page: Option<String>,
    pub status: Option<String>,
}

impl PageQuery {
    pub fn page_request(&self, default_size: u64) -> AppResult<PageRequest> {
        Ok(PageRequest::new(
            parse_int(self.page.as_deref(), "page")?,
            parse_int(self.per_page.as_deref(), "per_page")?,
            default_size,
        ))
    }

    pub fn status<S: FromStr<Err = AppError>>(&self) -> AppResult<Option<S>> {
        parse_status(self.status.as_deref())
    }
}

// =============================================================================
// Admin loan listing
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanSortKey {
    CreatedAt,
    LoanAmount,
    ApplicationDate,
    Status,
    TermMonths,
    InterestRate,
    ApplicationNumber,
}

const LOAN_SORT_KEYS: &[(&str, LoanSortKey)] = &[
    ("created_at", LoanSortKey::CreatedAt),
    ("loan_amount", LoanSortKey::LoanAmount),
    ("amount", LoanSortKey::LoanAmount),
    ("application_date", LoanSortKey::ApplicationDate),
    ("status", LoanSortKey::Status),
    ("term_months", LoanSortKey::TermMonths),
    ("interest_rate", LoanSortKey::InterestRate),
    ("application_number", LoanSortKey::ApplicationNumber),
];

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LoanListQuery {
    pub page: Option<String>,
    pub per_page: Option<String>,
    pub status: Option<String>,
    /// Application number or borrower username, email or phone
    pub search: Option<String>,
    /// `created_at`, `loan_amount`, `application_date`, ... with `-` for descending
    pub sort: Option<String>,
    pub min_amount: Option<String>,
    pub max_amount: Option<String>,
    /// RFC 3339 or `YYYY-MM-DD`
    pub date_from: Option<String>,
    /// RFC 3339 or `YYYY-MM-DD` (whole day)
    pub date_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoanFilter {
    pub page: PageRequest,
    pub status: Option<LoanStatus>,
    pub search: Option<String>,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
    pub created: DateRange,
    pub sort: Sort<LoanSortKey>,
}

impl LoanListQuery {
    pub fn into_filter(self) -> AppResult<LoanFilter> {
        Ok(LoanFilter {
            page: PageRequest::new(
                parse_int(self.page.as_deref(), "page")?,
                parse_int(self.per_page.as_deref(), "per_page")?,
                DEFAULT_ADMIN_PAGE_SIZE,
            ),
            status: parse_status(self.status.as_deref())?,
            search: present(self.search.as_deref()).map(str::to_string),
            min_amount: parse_amount(self.min_amount.as_deref(), "min_amount")?,
            max_amount: parse_amount(self.max_amount.as_deref(), "max_amount")?,
            created: DateRange::parse(self.date_from.as_deref(), self.date_to.as_deref())?,
            sort: parse_sort(self.sort.as_deref(), LOAN_SORT_KEYS, LoanSortKey::CreatedAt),
        })
    }
}

// =============================================================================
// Admin user listing
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserSortKey {
    CreatedAt,
    Username,
    Email,
    PhoneNumber,
    Role,
    AccountStatus,
}

const USER_SORT_KEYS: &[(&str, UserSortKey)] = &[
    ("created_at", UserSortKey::CreatedAt),
    ("username", UserSortKey::Username),
    ("email", UserSortKey::Email),
    ("phone_number", UserSortKey::PhoneNumber),
    ("role", UserSortKey::Role),
    ("account_status", UserSortKey::AccountStatus),
];

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserListQuery {
    pub page: Option<String>,
    pub per_page: Option<String>,
    /// Username, email or phone number
    pub search: Option<String>,
    /// `user` or `admin`
    pub role: Option<String>,
    /// Account status
    pub status: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserFilter {
    pub page: PageRequest,
    pub search: Option<String>,
    pub role: Option<UserRole>,
    pub status: Option<AccountStatus>,
    pub sort: Sort<UserSortKey>,
}

impl UserListQuery {
    pub fn into_filter(self) -> AppResult<UserFilter> {
        let role = match present(self.role.as_deref()).map(str::to_lowercase).as_deref() {
            None => None,
            Some(ROLE_USER) => Some(UserRole::User),
            Some(ROLE_ADMIN) => Some(UserRole::Admin),
            Some(_) => return Err(AppError::validation("Invalid role")),
        };
        Ok(UserFilter {
            page: PageRequest::new(
                parse_int(self.page.as_deref(), "page")?,
                parse_int(self.per_page.as_deref(), "per_page")?,
                DEFAULT_ADMIN_PAGE_SIZE,
            ),
            search: present(self.search.as_deref()).map(str::to_string),
            role,
            status: parse_status(self.status.as_deref())?,
            sort: parse_sort(self.sort.as_deref(), USER_SORT_KEYS, UserSortKey::CreatedAt),
        })
    }
}
