mod common;

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use tower::ServiceExt;
use zonaprint_api::{create_app, routes::health::health_check};

#[tokio::test]
async fn health_check_returns_ok() {
    let response = health_check().await;
    assert_eq!(response.0.message, "Health check");

    let data = response.0.data.expect("health data");
    assert_eq!(data.status, "ok");
    assert_eq!(data.service, "zonaprint-api");
}

#[tokio::test]
async fn unknown_route_gets_json_404() {
    let (state, _) = common::memory_state();
    let app = create_app(state);

    let response = app
        .oneshot(Request::builder().uri("/api/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(json["data"]["path"], "/api/nope");
}

#[tokio::test]
async fn cart_requires_a_bearer_token() {
    let (state, _) = common::memory_state();
    let app = create_app(state);

    let response = app
        .oneshot(Request::builder().uri("/api/cart").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn product_listing_is_public() {
    let (state, _) = common::memory_state();
    common::seed_product(&state, "Kartu Nama", 45_000, 10).await;
    let app = create_app(state);

    let response = app
        .oneshot(Request::builder().uri("/api/products").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["data"][0]["name"], "Kartu Nama");
}
