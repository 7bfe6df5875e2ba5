#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use zonaprint_api::{
    config::AppConfig,
    middleware::auth::AuthUser,
    models::{Product, Role, User},
    services::auth_service::hash_password,
    state::AppState,
    store::MemoryStore,
};

pub const MANUAL_KEY: &str = "offline-key";

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: String::new(),
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: "test-secret".into(),
        manual_order_key: MANUAL_KEY.into(),
        whatsapp_purwakarta: "628118894690".into(),
        whatsapp_wanayasa: "6282246907899".into(),
    }
}

pub fn memory_state() -> (AppState, MemoryStore) {
    let store = MemoryStore::new();
    let state = AppState::new(Arc::new(store.clone()), test_config());
    (state, store)
}

pub async fn seed_product(state: &AppState, name: &str, price: i64, stock: i32) -> Product {
    seed_product_with_options(state, name, price, stock, &[]).await
}

pub async fn seed_product_with_options(
    state: &AppState,
    name: &str,
    price: i64,
    stock: i32,
    options: &[&str],
) -> Product {
    state
        .store
        .insert_product(Product {
            id: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            price,
            stock,
            category: "print".into(),
            image: String::new(),
            featured: false,
            options: options.iter().map(|o| o.to_string()).collect(),
            created_at: Utc::now(),
        })
        .await
        .expect("insert product")
}

pub async fn seed_user(state: &AppState, email: &str, role: Role) -> AuthUser {
    let user = state
        .store
        .insert_user(User {
            id: Uuid::new_v4(),
            name: email.split('@').next().unwrap_or("user").to_string(),
            email: email.into(),
            password_hash: hash_password("secret123").expect("hash"),
            phone: None,
            address: None,
            city: None,
            province: None,
            role,
            welcome_voucher_shown: false,
            welcome_voucher_used: false,
            created_at: Utc::now(),
        })
        .await
        .expect("insert user");
    AuthUser {
        user_id: user.id,
        role,
    }
}

pub async fn customer(state: &AppState) -> AuthUser {
    seed_user(state, &format!("{}@example.com", Uuid::new_v4()), Role::User).await
}

pub async fn admin(state: &AppState) -> AuthUser {
    seed_user(state, &format!("admin-{}@example.com", Uuid::new_v4()), Role::Admin).await
}

pub async fn stock_of(state: &AppState, id: Uuid) -> i32 {
    state
        .store
        .get_product(id)
        .await
        .expect("get product")
        .expect("product exists")
        .stock
}
