use uuid::Uuid;

use crate::{
    audit,
    dto::vouchers::{
        AppliedVoucher, ApplyVoucherRequest, DeleteVoucherRequest, UpsertVoucherRequest,
        UserVouchers, VoucherList,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{User, VoucherCode, WELCOME_VOUCHER_CODE},
    response::{ApiResponse, Meta},
    state::AppState,
    store::UserPatch,
};

fn normalize_code(code: &str) -> AppResult<String> {
    let code = code.trim().to_uppercase();
    if code.is_empty() {
        return Err(AppError::BadRequest("voucher code is required".into()));
    }
    Ok(code)
}

async fn find_voucher(state: &AppState, user_id: Uuid, code: &str) -> AppResult<VoucherCode> {
    state
        .store
        .vouchers_for(user_id)
        .await?
        .into_iter()
        .find(|v| v.matches(code))
        .ok_or(AppError::InvalidVoucher)
}

/// Burns `code` for `user_id` and returns the voucher that was used.
pub async fn redeem_voucher(state: &AppState, user_id: Uuid, code: &str) -> AppResult<VoucherCode> {
    let code = normalize_code(code)?;
    let voucher = find_voucher(state, user_id, &code).await?;
    if voucher.used {
        return Err(AppError::VoucherAlreadyUsed);
    }
    // a concurrent session may have used it since the read above
    if !state.store.mark_voucher_used(user_id, &code).await? {
        return Err(AppError::VoucherAlreadyUsed);
    }

    if code == WELCOME_VOUCHER_CODE {
        let patch = UserPatch {
            welcome_voucher_used: Some(true),
            ..UserPatch::default()
        };
        state.store.update_user(user_id, patch).await?;
    }

    tracing::info!(user_id = %user_id, code = %code, amount = voucher.amount, "voucher redeemed");
    audit::record(
        state,
        Some(user_id),
        "voucher_apply",
        "vouchers",
        serde_json::json!({ "code": code, "amount": voucher.amount }),
    )
    .await;
    Ok(VoucherCode {
        used: true,
        ..voucher
    })
}

/// Compensation for a checkout that failed after its voucher was burned.
pub async fn restore_voucher(state: &AppState, user_id: Uuid, code: &str) -> AppResult<bool> {
    let code = normalize_code(code)?;
    let restored = state.store.restore_voucher(user_id, &code).await?;
    if restored {
        tracing::warn!(user_id = %user_id, code = %code, "voucher restored after failed checkout");
        audit::record(
            state,
            Some(user_id),
            "voucher_restore",
            "vouchers",
            serde_json::json!({ "code": code }),
        )
        .await;
    }
    Ok(restored)
}

pub async fn list_vouchers(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<VoucherList>> {
    let items = state.store.vouchers_for(user.user_id).await?;
    Ok(ApiResponse::success("Vouchers", VoucherList { items }, None))
}

/// Read-only lookup so a client can show the discount before checking out.
pub async fn check_voucher(
    state: &AppState,
    user: &AuthUser,
    payload: ApplyVoucherRequest,
) -> AppResult<ApiResponse<AppliedVoucher>> {
    let code = normalize_code(&payload.code)?;
    let voucher = find_voucher(state, user.user_id, &code).await?;
    if voucher.used {
        return Err(AppError::VoucherAlreadyUsed);
    }
    Ok(ApiResponse::success(
        "Voucher is valid",
        AppliedVoucher {
            code: voucher.code,
            amount: voucher.amount,
        },
        None,
    ))
}

pub async fn apply_voucher(
    state: &AppState,
    user: &AuthUser,
    payload: ApplyVoucherRequest,
) -> AppResult<ApiResponse<AppliedVoucher>> {
    let voucher = redeem_voucher(state, user.user_id, &payload.code).await?;
    Ok(ApiResponse::success(
        "Voucher applied",
        AppliedVoucher {
            code: voucher.code,
            amount: voucher.amount,
        },
        Some(Meta::empty()),
    ))
}

async fn user_by_email(state: &AppState, email: &str) -> AppResult<User> {
    state
        .store
        .find_user_by_email(email.trim())
        .await?
        .ok_or(AppError::NotFound("user"))
}

pub async fn upsert_voucher(
    state: &AppState,
    admin: &AuthUser,
    payload: UpsertVoucherRequest,
) -> AppResult<ApiResponse<UserVouchers>> {
    ensure_admin(admin)?;
    let code = normalize_code(&payload.code)?;
    if payload.amount <= 0 {
        return Err(AppError::BadRequest("amount must be greater than 0".into()));
    }
    let user = user_by_email(state, &payload.email).await?;
    state
        .store
        .upsert_voucher(user.id, &code, payload.amount)
        .await?;

    audit::record(
        state,
        Some(admin.user_id),
        "voucher_upsert",
        "vouchers",
        serde_json::json!({ "user_id": user.id, "code": code, "amount": payload.amount }),
    )
    .await;

    let vouchers = state.store.vouchers_for(user.id).await?;
    Ok(ApiResponse::success(
        "Voucher saved",
        UserVouchers { user, vouchers },
        Some(Meta::empty()),
    ))
}

pub async fn delete_voucher(
    state: &AppState,
    admin: &AuthUser,
    payload: DeleteVoucherRequest,
) -> AppResult<ApiResponse<UserVouchers>> {
    ensure_admin(admin)?;
    let code = normalize_code(&payload.code)?;
    let user = user_by_email(state, &payload.email).await?;
    if !state.store.delete_voucher(user.id, &code).await? {
        return Err(AppError::NotFound("voucher"));
    }

    audit::record(
        state,
        Some(admin.user_id),
        "voucher_delete",
        "vouchers",
        serde_json::json!({ "user_id": user.id, "code": code }),
    )
    .await;

    let vouchers = state.store.vouchers_for(user.id).await?;
    Ok(ApiResponse::success(
        "Voucher deleted",
        UserVouchers { user, vouchers },
        Some(Meta::empty()),
    ))
}

pub async fn list_user_vouchers(
    state: &AppState,
    admin: &AuthUser,
) -> AppResult<ApiResponse<Vec<UserVouchers>>> {
    ensure_admin(admin)?;
    let mut out = Vec::new();
    for user in state.store.list_users().await? {
        let vouchers = state.store.vouchers_for(user.id).await?;
        out.push(UserVouchers { user, vouchers });
    }
    let total = out.len() as i64;
    Ok(ApiResponse::success(
        "Users",
        out,
        Some(Meta::new(1, total, total)),
    ))
}
