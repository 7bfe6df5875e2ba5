mod common;

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use tower::ServiceExt;
use zonaprint_api::{
    create_app,
    dto::auth::{ChangePasswordRequest, LoginRequest, RegisterRequest},
    error::AppError,
    middleware::auth::AuthUser,
    models::{Role, WELCOME_VOUCHER_AMOUNT, WELCOME_VOUCHER_CODE},
    services::auth_service,
};

fn register_payload(email: &str) -> RegisterRequest {
    RegisterRequest {
        name: "Rina".into(),
        email: email.into(),
        password: "rahasia1".into(),
        phone: Some("081234".into()),
        address: None,
    }
}

#[tokio::test]
async fn registration_grants_the_welcome_voucher() {
    let (state, _) = common::memory_state();
    let user = auth_service::register_user(&state, register_payload(" Rina@Example.com "))
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(user.email, "rina@example.com");
    assert_eq!(user.role, Role::User);

    let vouchers = state.store.vouchers_for(user.id).await.unwrap();
    assert_eq!(vouchers.len(), 1);
    assert_eq!(vouchers[0].code, WELCOME_VOUCHER_CODE);
    assert_eq!(vouchers[0].amount, WELCOME_VOUCHER_AMOUNT);
    assert!(!vouchers[0].used);

    let err = auth_service::register_user(&state, register_payload("rina@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn short_password_is_rejected() {
    let (state, _) = common::memory_state();
    let mut payload = register_payload("budi@example.com");
    payload.password = "123".into();
    let err = auth_service::register_user(&state, payload).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn login_token_opens_the_cart_endpoint() {
    let (state, _) = common::memory_state();
    auth_service::register_user(&state, register_payload("sari@example.com"))
        .await
        .unwrap();

    let wrong = auth_service::login_user(
        &state,
        LoginRequest {
            email: "sari@example.com".into(),
            password: "salah123".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(wrong, AppError::Unauthorized(_)));

    let login = auth_service::login_user(
        &state,
        LoginRequest {
            email: "sari@example.com".into(),
            password: "rahasia1".into(),
        },
    )
    .await
    .unwrap()
    .data
    .unwrap();
    assert!(login.token.starts_with("Bearer "));

    let app = create_app(state);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/cart")
                .header(header::AUTHORIZATION, &login.token)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["data"]["total"], 0);
}

#[tokio::test]
async fn customers_cannot_reach_admin_routes() {
    let (state, _) = common::memory_state();
    let user = common::customer(&state).await;
    let token = zonaprint_api::middleware::auth::issue_token(
        &state.config.jwt_secret,
        user.user_id,
        user.role,
    )
    .unwrap();

    let app = create_app(state);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/admin/orders")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn password_change_checks_the_current_one() {
    let (state, _) = common::memory_state();
    let user = auth_service::register_user(&state, register_payload("dewi@example.com"))
        .await
        .unwrap()
        .data
        .unwrap();
    let auth = AuthUser {
        user_id: user.id,
        role: user.role,
    };

    let err = auth_service::change_password(
        &state,
        &auth,
        ChangePasswordRequest {
            current_password: "bukan".into(),
            new_password: "baru12345".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    auth_service::change_password(
        &state,
        &auth,
        ChangePasswordRequest {
            current_password: "rahasia1".into(),
            new_password: "baru12345".into(),
        },
    )
    .await
    .unwrap();

    let login = auth_service::login_user(
        &state,
        LoginRequest {
            email: "dewi@example.com".into(),
            password: "baru12345".into(),
        },
    )
    .await;
    assert!(login.is_ok());
}
