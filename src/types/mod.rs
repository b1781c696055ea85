//! Shared request and response types.

mod listing;
mod pagination;
mod response;

pub use listing::{
    parse_sort, DateRange, LoanFilter, LoanListQuery, LoanSortKey, PageQuery, Sort,
    SortDirection, UpperBound, UserFilter, UserListQuery, UserSortKey,
};
pub use pagination::{
    ActivityLogPage, AdminLoanPage, LoanPage, PageRequest, Paginated, UserPage, WithdrawalPage,
};
pub use response::{Created, MessageResponse};
