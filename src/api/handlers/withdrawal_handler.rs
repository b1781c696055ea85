//! Withdrawal requests.

use axum::{
    extract::{Path, State},
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use crate::api::extractors::{ClientIp, JsonPayload, ValidatedJson, ValidatedQuery};
use crate::api::middleware::{require_role, CurrentUser};
use crate::api::AppState;
use crate::config::DEFAULT_PAGE_SIZE;
use crate::domain::{ProcessWithdrawal, UserRole, WithdrawalResponse, WithdrawalStatus};
use crate::errors::AppResult;
use crate::types::{Created, PageQuery, Paginated};

pub fn withdrawal_routes() -> Router<AppState> {
    let collection = post(request_withdrawal).get(list_withdrawals);

    let borrower = Router::new()
        .route("/withdrawals", collection.clone())
        .route("/withdrawals/", collection)
        .route("/withdrawals/:id", get(get_withdrawal))
        .route("/withdrawals/:id/cancel", post(cancel_withdrawal));

    let admin = Router::new()
        .route("/withdrawals/:id/process", post(process_withdrawal))
        .route_layer(middleware::from_fn_with_state(UserRole::Admin, require_role));

    borrower.merge(admin)
}

/// Request a withdrawal, authorised by the latest OTP issued to the caller
#[utoipa::path(
    post,
    path = "/api/withdrawals",
    tag = "Withdrawals",
    request_body(content = Object, description = "amount, otp-code and optional notes"),
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Withdrawal requested", body = WithdrawalResponse),
        (status = 400, description = "Validation error or invalid OTP")
    )
)]
pub async fn request_withdrawal(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonPayload(payload): JsonPayload,
) -> AppResult<Created<WithdrawalResponse>> {
    let withdrawal = state.withdrawal_service.request(user.id, payload).await?;
    Ok(Created(withdrawal.into()))
}

#[utoipa::path(
    get,
    path = "/api/withdrawals",
    tag = "Withdrawals",
    params(PageQuery),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "One page of withdrawals", body = crate::types::WithdrawalPage))
)]
pub async fn list_withdrawals(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedQuery(query): ValidatedQuery<PageQuery>,
) -> AppResult<Json<Paginated<WithdrawalResponse>>> {
    let page = query.page_request(DEFAULT_PAGE_SIZE)?;
    let status = query.status::<WithdrawalStatus>()?;

    let withdrawals = state
        .withdrawal_service
        .list_own(user.id, status, page)
        .await?;
    Ok(Json(withdrawals.map(WithdrawalResponse::from)))
}

#[utoipa::path(
    get,
    path = "/api/withdrawals/{id}",
    tag = "Withdrawals",
    params(("id" = Uuid, Path, description = "Withdrawal id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "The withdrawal", body = WithdrawalResponse),
        (status = 404, description = "No such withdrawal for this caller")
    )
)]
pub async fn get_withdrawal(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<WithdrawalResponse>> {
    let withdrawal = state.withdrawal_service.get_own(user.id, id).await?;
    Ok(Json(withdrawal.into()))
}

#[utoipa::path(
    post,
    path = "/api/withdrawals/{id}/cancel",
    tag = "Withdrawals",
    params(("id" = Uuid, Path, description = "Withdrawal id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Withdrawal cancelled", body = WithdrawalResponse),
        (status = 400, description = "Withdrawal is not pending"),
        (status = 404, description = "No such withdrawal for this caller")
    )
)]
pub async fn cancel_withdrawal(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<WithdrawalResponse>> {
    let withdrawal = state.withdrawal_service.cancel(user.id, id).await?;
    Ok(Json(withdrawal.into()))
}

/// Complete or reject a withdrawal
#[utoipa::path(
    post,
    path = "/api/withdrawals/{id}/process",
    tag = "Withdrawals",
    params(("id" = Uuid, Path, description = "Withdrawal id")),
    request_body = ProcessWithdrawal,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Withdrawal processed", body = WithdrawalResponse),
        (status = 400, description = "Invalid processing status"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Withdrawal not found")
    )
)]
pub async fn process_withdrawal(
    State(state): State<AppState>,
    user: CurrentUser,
    ClientIp(ip): ClientIp,
    Path(id): Path<Uuid>,
    ValidatedJson(decision): ValidatedJson<ProcessWithdrawal>,
) -> AppResult<Json<WithdrawalResponse>> {
    let withdrawal = state
        .withdrawal_service
        .process(id, decision, user.audit(ip))
        .await?;
    Ok(Json(withdrawal.into()))
}
