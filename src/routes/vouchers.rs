use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};

use crate::{
    dto::vouchers::{AppliedVoucher, ApplyVoucherRequest, VoucherList},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::voucher_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_vouchers))
        .route("/check", post(check_voucher))
        .route("/apply", post(apply_voucher))
}

#[utoipa::path(
    get,
    path = "/api/vouchers",
    responses((status = 200, description = "Vouchers of the current user", body = ApiResponse<VoucherList>)),
    security(("bearer_auth" = [])),
    tag = "Vouchers"
)]
pub async fn list_vouchers(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<VoucherList>>> {
    let resp = voucher_service::list_vouchers(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/vouchers/check",
    request_body = ApplyVoucherRequest,
    responses(
        (status = 200, description = "Voucher is usable; nothing is changed", body = ApiResponse<AppliedVoucher>),
        (status = 404, description = "Unknown code"),
        (status = 409, description = "Already used")
    ),
    security(("bearer_auth" = [])),
    tag = "Vouchers"
)]
pub async fn check_voucher(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ApplyVoucherRequest>,
) -> AppResult<Json<ApiResponse<AppliedVoucher>>> {
    let resp = voucher_service::check_voucher(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/vouchers/apply",
    request_body = ApplyVoucherRequest,
    responses(
        (status = 200, description = "Voucher marked as used", body = ApiResponse<AppliedVoucher>),
        (status = 404, description = "Unknown code"),
        (status = 409, description = "Already used")
    ),
    security(("bearer_auth" = [])),
    tag = "Vouchers"
)]
pub async fn apply_voucher(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ApplyVoucherRequest>,
) -> AppResult<Json<ApiResponse<AppliedVoucher>>> {
    let resp = voucher_service::apply_voucher(&state, &user, payload).await?;
    Ok(Json(resp))
}
