//! Query building blocks shared by the list repositories.

use sea_orm::sea_query::{Expr, Func, IntoColumnRef, LikeExpr, SimpleExpr};
use sea_orm::{ColumnTrait, DbErr, Order, SqlErr};

use crate::errors::AppError;
use crate::types::{DateRange, SortDirection, UpperBound};

const LIKE_ESCAPE: char = '\\';

/// `%term%`, lower-cased, for case-insensitive substring search. Wildcards
/// in the term are escaped so they match literally.
pub(crate) fn contains_pattern(search: &str) -> String {
    let mut pattern = String::from("%");
    for c in search.trim().to_lowercase().chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// `LOWER(column) LIKE pattern ESCAPE '\'`
pub(crate) fn lower_like<C: IntoColumnRef>(column: C, pattern: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col(column)))
        .like(LikeExpr::new(pattern).escape(LIKE_ESCAPE))
}

pub(crate) fn order(direction: SortDirection) -> Order {
    match direction {
        SortDirection::Asc => Order::Asc,
        SortDirection::Desc => Order::Desc,
    }
}

/// Conditions bounding `column` by a date range.
pub(crate) fn date_range<C: ColumnTrait>(column: C, range: &DateRange) -> Vec<SimpleExpr> {
    let mut conditions = Vec::new();
    if let Some(from) = range.from {
        conditions.push(column.gte(from));
    }
    match range.to {
        Some(UpperBound::Inclusive(to)) => conditions.push(column.lte(to)),
        Some(UpperBound::Exclusive(to)) => conditions.push(column.lt(to)),
        None => {}
    }
    conditions
}

/// Unique-key violations become a conflict on `entity`; everything else stays a database error.
pub(crate) fn conflict_on_unique(err: DbErr, entity: &str) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => {
            tracing::debug!("Unique constraint violated: {}", detail);
            AppError::conflict(entity)
        }
        _ => AppError::from(err),
    }
}
