//! Persistence boundary for the shop.
//!
//! Services only talk to a `dyn ShopStore`. [`PgStore`] backs the server with
//! PostgreSQL; [`MemoryStore`] keeps everything in process for tests and demos.
//! Stock, order status and voucher use are changed through conditional
//! operations so two sessions cannot both win the same change.

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        CartItem, Order, OrderStatus, Product, Questionnaire, Review, User, VoucherCode,
    },
    routes::params::{ProductSortBy, SortOrder},
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub sort_by: Option<ProductSortBy>,
    pub sort_order: Option<SortOrder>,
    pub limit: u64,
    pub offset: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub stock: Option<i32>,
    pub category: Option<String>,
    pub image: Option<String>,
    pub featured: Option<bool>,
    pub options: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub password_hash: Option<String>,
    pub welcome_voucher_shown: Option<bool>,
    pub welcome_voucher_used: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub user_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
    pub sort_order: Option<SortOrder>,
    pub limit: u64,
    pub offset: u64,
}

/// Outcome of an atomic stock adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockChange {
    Applied { remaining: i32 },
    /// Nothing was written; the adjustment would have gone below zero.
    Insufficient { available: i32 },
    Missing,
}

#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub user_id: Option<Uuid>,
    pub action: String,
    pub resource: Option<String>,
    pub metadata: Option<Value>,
}

#[async_trait]
pub trait ShopStore: Send + Sync {
    async fn list_products(&self, filter: &ProductFilter) -> AppResult<Page<Product>>;
    async fn get_product(&self, id: Uuid) -> AppResult<Option<Product>>;
    async fn products_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Product>>;
    async fn insert_product(&self, product: Product) -> AppResult<Product>;
    async fn update_product(&self, id: Uuid, patch: ProductPatch) -> AppResult<Option<Product>>;
    /// Deletes the product and every cart line that points at it.
    async fn delete_product(&self, id: Uuid) -> AppResult<bool>;
    /// `stock += delta` in one step, refused when the result would be negative.
    async fn adjust_stock(&self, id: Uuid, delta: i32) -> AppResult<StockChange>;
    async fn low_stock(&self, threshold: i32, limit: u64, offset: u64) -> AppResult<Page<Product>>;

    async fn insert_user(&self, user: User) -> AppResult<User>;
    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn update_user(&self, id: Uuid, patch: UserPatch) -> AppResult<Option<User>>;
    async fn list_users(&self) -> AppResult<Vec<User>>;

    async fn vouchers_for(&self, user_id: Uuid) -> AppResult<Vec<VoucherCode>>;
    /// Inserts the code, or resets amount and `used` when the user already has it.
    async fn upsert_voucher(&self, user_id: Uuid, code: &str, amount: i64) -> AppResult<VoucherCode>;
    async fn delete_voucher(&self, user_id: Uuid, code: &str) -> AppResult<bool>;
    /// Flips `used` to true only if it is still false.
    async fn mark_voucher_used(&self, user_id: Uuid, code: &str) -> AppResult<bool>;
    async fn restore_voucher(&self, user_id: Uuid, code: &str) -> AppResult<bool>;

    async fn cart_lines(&self, user_id: Uuid) -> AppResult<Vec<CartItem>>;
    /// Replaces the whole cart of `user_id` with `lines`.
    async fn save_cart(&self, user_id: Uuid, lines: &[CartItem]) -> AppResult<()>;
    async fn clear_cart(&self, user_id: Uuid) -> AppResult<()>;

    async fn insert_order(&self, order: Order) -> AppResult<Order>;
    async fn get_order(&self, id: Uuid) -> AppResult<Option<Order>>;
    async fn list_orders(&self, filter: &OrderFilter) -> AppResult<Page<Order>>;
    async fn all_orders(&self) -> AppResult<Vec<Order>>;
    /// Compare-and-set on the current status. `None` when the order is gone or
    /// its status is no longer `from`.
    async fn transition_order(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
        stock_committed: bool,
    ) -> AppResult<Option<Order>>;
    async fn delete_order(&self, id: Uuid) -> AppResult<bool>;

    async fn insert_review(&self, review: Review) -> AppResult<Review>;
    async fn list_reviews(&self) -> AppResult<Vec<Review>>;
    async fn review_for_order(&self, order_id: Uuid) -> AppResult<Option<Review>>;
    async fn insert_questionnaire(&self, questionnaire: Questionnaire) -> AppResult<Questionnaire>;
    async fn list_questionnaires(&self) -> AppResult<Vec<Questionnaire>>;
    async fn questionnaire_for_order(&self, order_id: Uuid) -> AppResult<Option<Questionnaire>>;

    async fn record_audit(&self, entry: AuditEntry) -> AppResult<()>;
}
