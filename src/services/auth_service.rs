use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::Utc;
use password_hash::rand_core::OsRng;
use uuid::Uuid;

use crate::{
    audit,
    dto::auth::{
        ChangePasswordRequest, LoginRequest, LoginResponse, Profile, RegisterRequest,
        UpdateProfileRequest,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, issue_token},
    models::{Role, User, WELCOME_VOUCHER_AMOUNT, WELCOME_VOUCHER_CODE},
    response::{ApiResponse, Meta},
    state::AppState,
    store::UserPatch,
};

const MIN_PASSWORD_LEN: usize = 6;

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<User>> {
    let RegisterRequest {
        name,
        email,
        password,
        phone,
        address,
    } = payload;
    let name = name.trim().to_string();
    let email = email.trim().to_lowercase();
    if name.is_empty() || email.is_empty() {
        return Err(AppError::BadRequest("name and email are required".into()));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if state.store.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::BadRequest("Email is already taken".to_string()));
    }

    let user = state
        .store
        .insert_user(User {
            id: Uuid::new_v4(),
            name,
            email,
            password_hash: hash_password(&password)?,
            phone: non_blank(phone),
            address: non_blank(address),
            city: None,
            province: None,
            role: Role::User,
            welcome_voucher_shown: false,
            welcome_voucher_used: false,
            created_at: Utc::now(),
        })
        .await?;

    state
        .store
        .upsert_voucher(user.id, WELCOME_VOUCHER_CODE, WELCOME_VOUCHER_AMOUNT)
        .await?;

    tracing::info!(user_id = %user.id, "user registered");
    audit::record(
        state,
        Some(user.id),
        "user_register",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;
    Ok(ApiResponse::success("User created", user, None))
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let LoginRequest { email, password } = payload;
    let user = match state.store.find_user_by_email(email.trim()).await? {
        Some(u) => u,
        None => return Err(AppError::Unauthorized("Invalid email or password".into())),
    };

    if !verify_password(&password, &user.password_hash)? {
        return Err(AppError::Unauthorized("Invalid email or password".into()));
    }

    let token = issue_token(&state.config.jwt_secret, user.id, user.role)?;

    audit::record(
        state,
        Some(user.id),
        "user_login",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Logged in",
        LoginResponse {
            token: format!("Bearer {}", token),
            user,
        },
        Some(Meta::empty()),
    ))
}

/// Tokens are stateless; logging out only drops the caller's cart.
pub async fn logout(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<serde_json::Value>> {
    state.store.clear_cart(user.user_id).await?;
    audit::record(
        state,
        Some(user.user_id),
        "user_logout",
        "users",
        serde_json::json!({ "user_id": user.user_id }),
    )
    .await;
    Ok(ApiResponse::success(
        "Logged out",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn me(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Profile>> {
    let profile = state
        .store
        .get_user(user.user_id)
        .await?
        .ok_or(AppError::NotFound("user"))?;
    let vouchers = state.store.vouchers_for(user.user_id).await?;
    Ok(ApiResponse::success(
        "Profile",
        Profile {
            user: profile,
            vouchers,
        },
        None,
    ))
}

pub async fn update_profile(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateProfileRequest,
) -> AppResult<ApiResponse<User>> {
    let name = match payload.name {
        Some(name) if name.trim().is_empty() => {
            return Err(AppError::BadRequest("name must not be empty".into()));
        }
        Some(name) => Some(name.trim().to_string()),
        None => None,
    };
    let patch = UserPatch {
        name,
        phone: payload.phone.map(|v| v.trim().to_string()),
        address: payload.address.map(|v| v.trim().to_string()),
        city: payload.city.map(|v| v.trim().to_string()),
        province: payload.province.map(|v| v.trim().to_string()),
        ..UserPatch::default()
    };
    let updated = state
        .store
        .update_user(user.user_id, patch)
        .await?
        .ok_or(AppError::NotFound("user"))?;

    audit::record(
        state,
        Some(user.user_id),
        "profile_update",
        "users",
        serde_json::json!({ "user_id": user.user_id }),
    )
    .await;
    Ok(ApiResponse::success("Profile updated", updated, Some(Meta::empty())))
}

pub async fn change_password(
    state: &AppState,
    user: &AuthUser,
    payload: ChangePasswordRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let current = state
        .store
        .get_user(user.user_id)
        .await?
        .ok_or(AppError::NotFound("user"))?;
    if !verify_password(&payload.current_password, &current.password_hash)? {
        return Err(AppError::BadRequest("Current password is incorrect".into()));
    }
    if payload.new_password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let patch = UserPatch {
        password_hash: Some(hash_password(&payload.new_password)?),
        ..UserPatch::default()
    };
    state.store.update_user(user.user_id, patch).await?;

    audit::record(
        state,
        Some(user.user_id),
        "password_change",
        "users",
        serde_json::json!({ "user_id": user.user_id }),
    )
    .await;
    Ok(ApiResponse::success(
        "Password changed",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn mark_welcome_voucher_shown(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<User>> {
    let patch = UserPatch {
        welcome_voucher_shown: Some(true),
        ..UserPatch::default()
    };
    let updated = state
        .store
        .update_user(user.user_id, patch)
        .await?
        .ok_or(AppError::NotFound("user"))?;
    Ok(ApiResponse::success("Ok", updated, None))
}
