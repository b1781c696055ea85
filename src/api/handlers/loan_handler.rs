//! Borrower loan applications and the admin decision endpoint.

use axum::{
    extract::{Path, State},
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::api::extractors::{ClientIp, JsonPayload, ValidatedJson, ValidatedQuery};
use crate::api::middleware::{require_role, CurrentUser};
use crate::api::AppState;
use crate::config::DEFAULT_PAGE_SIZE;
use crate::domain::{LoanResponse, LoanRevision, LoanStatus, UserRole};
use crate::errors::AppResult;
use crate::types::{Created, MessageResponse, PageQuery, Paginated};

/// Body of a successful application
#[derive(Debug, Serialize, ToSchema)]
pub struct LoanCreatedResponse {
    #[schema(example = "Loan application submitted successfully")]
    pub message: String,
    #[schema(example = "LN20250101004217")]
    pub application_number: String,
    pub loan: LoanResponse,
}

/// Admin decision on a pending loan
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoanDecisionRequest {
    /// `approved` or `rejected`
    #[schema(example = "approved")]
    pub status: Option<String>,
}

pub fn loan_routes() -> Router<AppState> {
    let collection = post(apply_for_loan).get(list_loans);

    let borrower = Router::new()
        .route("/loans", collection.clone())
        .route("/loans/", collection)
        .route(
            "/loans/:id",
            get(get_loan).put(update_loan).delete(cancel_loan),
        );

    let admin = Router::new()
        .route("/loans/:id/status", post(decide_loan))
        .route_layer(middleware::from_fn_with_state(UserRole::Admin, require_role));

    borrower.merge(admin)
}

/// Submit a loan application
#[utoipa::path(
    post,
    path = "/api/loans",
    tag = "Loans",
    request_body(content = Object, description = "amount, termMonths and optional profile fields"),
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Application submitted", body = LoanCreatedResponse),
        (status = 400, description = "Validation error or pending application exists")
    )
)]
pub async fn apply_for_loan(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonPayload(payload): JsonPayload,
) -> AppResult<Created<LoanCreatedResponse>> {
    let loan = state.loan_service.apply(user.id, payload).await?;

    Ok(Created(LoanCreatedResponse {
        message: "Loan application submitted successfully".to_string(),
        application_number: loan.application_number.clone(),
        loan: loan.into(),
    }))
}

/// List the caller's loans, newest first
#[utoipa::path(
    get,
    path = "/api/loans",
    tag = "Loans",
    params(PageQuery),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "One page of loans", body = crate::types::LoanPage))
)]
pub async fn list_loans(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedQuery(query): ValidatedQuery<PageQuery>,
) -> AppResult<Json<Paginated<LoanResponse>>> {
    let page = query.page_request(DEFAULT_PAGE_SIZE)?;
    let status = query.status::<LoanStatus>()?;

    let loans = state.loan_service.list_own(user.id, status, page).await?;
    Ok(Json(loans.map(LoanResponse::from)))
}

#[utoipa::path(
    get,
    path = "/api/loans/{id}",
    tag = "Loans",
    params(("id" = Uuid, Path, description = "Loan id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "The loan", body = LoanResponse),
        (status = 404, description = "No such loan for this caller")
    )
)]
pub async fn get_loan(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<LoanResponse>> {
    let loan = state.loan_service.get_own(user.id, id).await?;
    Ok(Json(loan.into()))
}

/// Change amount, term or purpose of a pending application
#[utoipa::path(
    put,
    path = "/api/loans/{id}",
    tag = "Loans",
    params(("id" = Uuid, Path, description = "Loan id")),
    request_body = LoanRevision,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Updated loan", body = LoanResponse),
        (status = 400, description = "Validation error or loan is not pending"),
        (status = 404, description = "No such loan for this caller")
    )
)]
pub async fn update_loan(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    ValidatedJson(revision): ValidatedJson<LoanRevision>,
) -> AppResult<Json<LoanResponse>> {
    let loan = state.loan_service.revise(user.id, id, revision).await?;
    Ok(Json(loan.into()))
}

/// Cancel a pending application
#[utoipa::path(
    delete,
    path = "/api/loans/{id}",
    tag = "Loans",
    params(("id" = Uuid, Path, description = "Loan id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Application cancelled", body = MessageResponse),
        (status = 400, description = "Loan is not pending"),
        (status = 404, description = "No such loan for this caller")
    )
)]
pub async fn cancel_loan(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    state.loan_service.cancel(user.id, id).await?;
    Ok(Json(MessageResponse::new(
        "Loan application cancelled successfully",
    )))
}

/// Approve or reject a pending loan
#[utoipa::path(
    post,
    path = "/api/loans/{id}/status",
    tag = "Loans",
    params(("id" = Uuid, Path, description = "Loan id")),
    request_body = LoanDecisionRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Decision recorded", body = LoanResponse),
        (status = 400, description = "Invalid status or loan is not pending"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn decide_loan(
    State(state): State<AppState>,
    user: CurrentUser,
    ClientIp(ip): ClientIp,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<LoanDecisionRequest>,
) -> AppResult<Json<LoanResponse>> {
    let loan = state
        .loan_service
        .decide(id, request.status, user.audit(ip))
        .await?;
    Ok(Json(loan.into()))
}
