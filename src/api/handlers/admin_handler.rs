//! Admin dashboard handlers. Every route here requires an admin token.

use axum::{
    extract::{Path, State},
    response::Json,
    routing::{get, post},
    Router,
};

use crate::api::extractors::{ClientIp, ValidatedJson, ValidatedQuery};
use crate::api::middleware::CurrentUser;
use crate::api::AppState;
use crate::config::DEFAULT_ADMIN_PAGE_SIZE;
use crate::domain::{
    ActivityLogResponse, AdminLoanResponse, DashboardStats, GenerateOtpRequest, LoanAmendment,
    OtpResponse, UserResponse,
};
use crate::errors::AppResult;
use crate::types::{LoanListQuery, MessageResponse, PageQuery, Paginated, UserListQuery};

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/stats", get(stats))
        .route("/admin/loans", get(list_loans))
        .route(
            "/admin/loans/:application_number",
            get(get_loan)
                .put(update_loan)
                .patch(update_loan)
                .delete(delete_loan),
        )
        .route("/admin/users", get(list_users))
        .route("/admin/generate-otp", post(generate_otp))
        .route("/admin/activity-logs", get(activity_logs))
}

/// Platform statistics
#[utoipa::path(
    get,
    path = "/api/admin/stats",
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Dashboard statistics", body = DashboardStats),
        (status = 403, description = "Caller is not an admin")
    )
)]
pub async fn stats(State(state): State<AppState>) -> AppResult<Json<DashboardStats>> {
    Ok(Json(state.admin_service.stats().await?))
}

/// Filtered, sorted and paginated loans with their borrowers
#[utoipa::path(
    get,
    path = "/api/admin/loans",
    tag = "Admin",
    params(LoanListQuery),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "One page of loans", body = crate::types::AdminLoanPage),
        (status = 400, description = "Malformed filter")
    )
)]
pub async fn list_loans(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<LoanListQuery>,
) -> AppResult<Json<Paginated<AdminLoanResponse>>> {
    let loans = state.admin_service.list_loans(query.into_filter()?).await?;
    Ok(Json(loans.map(AdminLoanResponse::from)))
}

#[utoipa::path(
    get,
    path = "/api/admin/loans/{application_number}",
    tag = "Admin",
    params(("application_number" = String, Path, description = "Loan application number")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Loan with borrower", body = AdminLoanResponse),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn get_loan(
    State(state): State<AppState>,
    Path(application_number): Path<String>,
) -> AppResult<Json<AdminLoanResponse>> {
    let row = state.admin_service.get_loan(application_number).await?;
    Ok(Json(row.into()))
}

/// Edit loan and borrower fields. PUT and PATCH both apply a partial update.
#[utoipa::path(
    put,
    path = "/api/admin/loans/{application_number}",
    tag = "Admin",
    params(("application_number" = String, Path, description = "Loan application number")),
    request_body = LoanAmendment,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Updated loan with borrower", body = AdminLoanResponse),
        (status = 400, description = "Validation error or no changes provided"),
        (status = 404, description = "Loan or customer not found")
    )
)]
pub async fn update_loan(
    State(state): State<AppState>,
    user: CurrentUser,
    ClientIp(ip): ClientIp,
    Path(application_number): Path<String>,
    ValidatedJson(amendment): ValidatedJson<LoanAmendment>,
) -> AppResult<Json<AdminLoanResponse>> {
    let row = state
        .admin_service
        .update_loan(application_number, amendment, user.audit(ip))
        .await?;
    Ok(Json(row.into()))
}

/// Soft-delete a loan and deactivate its borrower
#[utoipa::path(
    delete,
    path = "/api/admin/loans/{application_number}",
    tag = "Admin",
    params(("application_number" = String, Path, description = "Loan application number")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Loan deleted", body = MessageResponse),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn delete_loan(
    State(state): State<AppState>,
    user: CurrentUser,
    ClientIp(ip): ClientIp,
    Path(application_number): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    state
        .admin_service
        .delete_loan(application_number, user.audit(ip))
        .await?;
    Ok(Json(MessageResponse::new(
        "Loan and customer marked as inactive",
    )))
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    tag = "Admin",
    params(UserListQuery),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "One page of users", body = crate::types::UserPage),
        (status = 400, description = "Malformed filter")
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<UserListQuery>,
) -> AppResult<Json<Paginated<UserResponse>>> {
    let users = state.admin_service.list_users(query.into_filter()?).await?;
    Ok(Json(users.map(UserResponse::from)))
}

/// Issue a one-time code that authorises the customer's next withdrawal
#[utoipa::path(
    post,
    path = "/api/admin/generate-otp",
    tag = "Admin",
    request_body = GenerateOtpRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Code issued", body = OtpResponse),
        (status = 400, description = "Unsupported code length"),
        (status = 404, description = "Customer not found")
    )
)]
pub async fn generate_otp(
    State(state): State<AppState>,
    user: CurrentUser,
    ClientIp(ip): ClientIp,
    ValidatedJson(request): ValidatedJson<GenerateOtpRequest>,
) -> AppResult<Json<OtpResponse>> {
    let otp = state
        .admin_service
        .generate_otp(request, user.audit(ip))
        .await?;
    Ok(Json(OtpResponse {
        otp_code: otp.otp_code,
    }))
}

/// Audit trail, newest first
#[utoipa::path(
    get,
    path = "/api/admin/activity-logs",
    tag = "Admin",
    params(PageQuery),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "One page of audit entries", body = crate::types::ActivityLogPage))
)]
pub async fn activity_logs(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<PageQuery>,
) -> AppResult<Json<Paginated<ActivityLogResponse>>> {
    let page = query.page_request(DEFAULT_ADMIN_PAGE_SIZE)?;
    let logs = state.admin_service.activity(page).await?;
    Ok(Json(logs.map(ActivityLogResponse::from)))
}
