use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        CartItem, Order, OrderStatus, Product, Questionnaire, Review, User, VoucherCode,
    },
    routes::params::{ProductSortBy, SortOrder},
};

use super::{
    AuditEntry, OrderFilter, Page, ProductFilter, ProductPatch, ShopStore, StockChange, UserPatch,
};

#[derive(Debug, Default)]
struct Inner {
    products: Vec<Product>,
    users: Vec<User>,
    vouchers: HashMap<Uuid, Vec<VoucherCode>>,
    carts: HashMap<Uuid, Vec<CartItem>>,
    orders: Vec<Order>,
    reviews: Vec<Review>,
    questionnaires: Vec<Questionnaire>,
    audit: Vec<AuditEntry>,
    stock_faults: HashSet<Uuid>,
}

/// In-process store with the same conditional-write semantics as [`super::PgStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    fail_order_writes: Arc<AtomicBool>,
    fail_cart_clears: Arc<AtomicBool>,
}

fn paginate<T: Clone>(items: Vec<T>, limit: u64, offset: u64) -> Page<T> {
    let total = items.len() as u64;
    let items = items
        .into_iter()
        .skip(offset as usize)
        .take(if limit == 0 { usize::MAX } else { limit as usize })
        .collect();
    Page { items, total }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes order inserts fail, to exercise persistence error paths.
    pub fn fail_order_writes(&self, fail: bool) {
        self.fail_order_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_cart_clears(&self, fail: bool) {
        self.fail_cart_clears.store(fail, Ordering::SeqCst);
    }

    /// Stock adjustments of this product error out until the store is dropped.
    pub fn fail_stock_writes_for(&self, product_id: Uuid) {
        if let Ok(mut inner) = self.lock() {
            inner.stock_faults.insert(product_id);
        }
    }

    pub fn audit_actions(&self) -> Vec<String> {
        self.lock()
            .map(|inner| inner.audit.iter().map(|e| e.action.clone()).collect())
            .unwrap_or_default()
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| AppError::Persistence("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl ShopStore for MemoryStore {
    async fn list_products(&self, filter: &ProductFilter) -> AppResult<Page<Product>> {
        let inner = self.lock()?;
        let needle = filter.search.as_ref().map(|s| s.to_lowercase());
        let mut items: Vec<Product> = inner
            .products
            .iter()
            .filter(|p| {
                needle.as_ref().is_none_or(|n| {
                    p.name.to_lowercase().contains(n) || p.description.to_lowercase().contains(n)
                })
            })
            .filter(|p| filter.category.as_ref().is_none_or(|c| &p.category == c))
            .filter(|p| filter.min_price.is_none_or(|min| p.price >= min))
            .filter(|p| filter.max_price.is_none_or(|max| p.price <= max))
            .cloned()
            .collect();

        match filter.sort_by.unwrap_or(ProductSortBy::CreatedAt) {
            ProductSortBy::CreatedAt => items.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            ProductSortBy::Price => items.sort_by(|a, b| a.price.cmp(&b.price)),
            ProductSortBy::Name => items.sort_by(|a, b| a.name.cmp(&b.name)),
        }
        if filter.sort_order.unwrap_or(SortOrder::Desc) == SortOrder::Desc {
            items.reverse();
        }
        Ok(paginate(items, filter.limit, filter.offset))
    }

    async fn get_product(&self, id: Uuid) -> AppResult<Option<Product>> {
        Ok(self.lock()?.products.iter().find(|p| p.id == id).cloned())
    }

    async fn products_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Product>> {
        Ok(self
            .lock()?
            .products
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn insert_product(&self, product: Product) -> AppResult<Product> {
        self.lock()?.products.push(product.clone());
        Ok(product)
    }

    async fn update_product(&self, id: Uuid, patch: ProductPatch) -> AppResult<Option<Product>> {
        let mut inner = self.lock()?;
        let Some(product) = inner.products.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if let Some(name) = patch.name {
            product.name = name;
        }
        if let Some(description) = patch.description {
            product.description = description;
        }
        if let Some(price) = patch.price {
            product.price = price;
        }
        if let Some(stock) = patch.stock {
            product.stock = stock;
        }
        if let Some(category) = patch.category {
            product.category = category;
        }
        if let Some(image) = patch.image {
            product.image = image;
        }
        if let Some(featured) = patch.featured {
            product.featured = featured;
        }
        if let Some(options) = patch.options {
            product.options = options;
        }
        Ok(Some(product.clone()))
    }

    async fn delete_product(&self, id: Uuid) -> AppResult<bool> {
        let mut inner = self.lock()?;
        let before = inner.products.len();
        inner.products.retain(|p| p.id != id);
        let removed = before != inner.products.len();
        if removed {
            for lines in inner.carts.values_mut() {
                lines.retain(|l| l.product_id != id);
            }
        }
        Ok(removed)
    }

    async fn adjust_stock(&self, id: Uuid, delta: i32) -> AppResult<StockChange> {
        let mut inner = self.lock()?;
        if inner.stock_faults.contains(&id) {
            return Err(AppError::Persistence("stock update rejected".into()));
        }
        let Some(product) = inner.products.iter_mut().find(|p| p.id == id) else {
            return Ok(StockChange::Missing);
        };
        let next = product
            .stock
            .checked_add(delta)
            .ok_or_else(|| AppError::BadRequest("stock adjustment out of range".into()))?;
        if next < 0 {
            return Ok(StockChange::Insufficient {
                available: product.stock,
            });
        }
        product.stock = next;
        Ok(StockChange::Applied { remaining: next })
    }

    async fn low_stock(&self, threshold: i32, limit: u64, offset: u64) -> AppResult<Page<Product>> {
        let mut items: Vec<Product> = self
            .lock()?
            .products
            .iter()
            .filter(|p| p.stock <= threshold)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.stock.cmp(&b.stock).then(b.created_at.cmp(&a.created_at)));
        Ok(paginate(items, limit, offset))
    }

    async fn insert_user(&self, user: User) -> AppResult<User> {
        let mut inner = self.lock()?;
        if inner
            .users
            .iter()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(AppError::BadRequest("Email is already taken".into()));
        }
        inner.users.push(user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.lock()?.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self
            .lock()?
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn update_user(&self, id: Uuid, patch: UserPatch) -> AppResult<Option<User>> {
        let mut inner = self.lock()?;
        let Some(user) = inner.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(name) = patch.name {
            user.name = name;
        }
        if let Some(phone) = patch.phone {
            user.phone = Some(phone);
        }
        if let Some(address) = patch.address {
            user.address = Some(address);
        }
        if let Some(city) = patch.city {
            user.city = Some(city);
        }
        if let Some(province) = patch.province {
            user.province = Some(province);
        }
        if let Some(hash) = patch.password_hash {
            user.password_hash = hash;
        }
        if let Some(shown) = patch.welcome_voucher_shown {
            user.welcome_voucher_shown = shown;
        }
        if let Some(used) = patch.welcome_voucher_used {
            user.welcome_voucher_used = used;
        }
        Ok(Some(user.clone()))
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        Ok(self.lock()?.users.clone())
    }

    async fn vouchers_for(&self, user_id: Uuid) -> AppResult<Vec<VoucherCode>> {
        Ok(self
            .lock()?
            .vouchers
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn upsert_voucher(&self, user_id: Uuid, code: &str, amount: i64) -> AppResult<VoucherCode> {
        let mut inner = self.lock()?;
        let list = inner.vouchers.entry(user_id).or_default();
        if let Some(existing) = list.iter_mut().find(|v| v.matches(code)) {
            existing.amount = amount;
            existing.used = false;
            return Ok(existing.clone());
        }
        let voucher = VoucherCode {
            code: code.trim().to_uppercase(),
            amount,
            used: false,
        };
        list.push(voucher.clone());
        Ok(voucher)
    }

    async fn delete_voucher(&self, user_id: Uuid, code: &str) -> AppResult<bool> {
        let mut inner = self.lock()?;
        let Some(list) = inner.vouchers.get_mut(&user_id) else {
            return Ok(false);
        };
        let before = list.len();
        list.retain(|v| !v.matches(code));
        Ok(before != list.len())
    }

    async fn mark_voucher_used(&self, user_id: Uuid, code: &str) -> AppResult<bool> {
        let mut inner = self.lock()?;
        let voucher = inner
            .vouchers
            .get_mut(&user_id)
            .and_then(|list| list.iter_mut().find(|v| v.matches(code) && !v.used));
        Ok(match voucher {
            Some(v) => {
                v.used = true;
                true
            }
            None => false,
        })
    }

    async fn restore_voucher(&self, user_id: Uuid, code: &str) -> AppResult<bool> {
        let mut inner = self.lock()?;
        let voucher = inner
            .vouchers
            .get_mut(&user_id)
            .and_then(|list| list.iter_mut().find(|v| v.matches(code) && v.used));
        Ok(match voucher {
            Some(v) => {
                v.used = false;
                true
            }
            None => false,
        })
    }

    async fn cart_lines(&self, user_id: Uuid) -> AppResult<Vec<CartItem>> {
        Ok(self
            .lock()?
            .carts
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_cart(&self, user_id: Uuid, lines: &[CartItem]) -> AppResult<()> {
        self.lock()?.carts.insert(user_id, lines.to_vec());
        Ok(())
    }

    async fn clear_cart(&self, user_id: Uuid) -> AppResult<()> {
        if self.fail_cart_clears.load(Ordering::SeqCst) {
            return Err(AppError::Persistence("cart clear rejected".into()));
        }
        self.lock()?.carts.remove(&user_id);
        Ok(())
    }

    async fn insert_order(&self, order: Order) -> AppResult<Order> {
        if self.fail_order_writes.load(Ordering::SeqCst) {
            return Err(AppError::Persistence("order insert rejected".into()));
        }
        self.lock()?.orders.push(order.clone());
        Ok(order)
    }

    async fn get_order(&self, id: Uuid) -> AppResult<Option<Order>> {
        Ok(self.lock()?.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn list_orders(&self, filter: &OrderFilter) -> AppResult<Page<Order>> {
        let mut items: Vec<Order> = self
            .lock()?
            .orders
            .iter()
            .filter(|o| filter.user_id.is_none_or(|id| o.user_id == Some(id)))
            .filter(|o| filter.status.is_none_or(|s| o.status == s))
            .cloned()
            .collect();
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        if filter.sort_order.unwrap_or(SortOrder::Desc) == SortOrder::Desc {
            items.reverse();
        }
        Ok(paginate(items, filter.limit, filter.offset))
    }

    async fn all_orders(&self) -> AppResult<Vec<Order>> {
        Ok(self.lock()?.orders.clone())
    }

    async fn transition_order(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
        stock_committed: bool,
    ) -> AppResult<Option<Order>> {
        if self.fail_order_writes.load(Ordering::SeqCst) {
            return Err(AppError::Persistence("order update rejected".into()));
        }
        let mut inner = self.lock()?;
        let Some(order) = inner
            .orders
            .iter_mut()
            .find(|o| o.id == id && o.status == from)
        else {
            return Ok(None);
        };
        order.status = to;
        order.stock_committed = stock_committed;
        order.updated_at = Utc::now();
        Ok(Some(order.clone()))
    }

    async fn delete_order(&self, id: Uuid) -> AppResult<bool> {
        let mut inner = self.lock()?;
        let before = inner.orders.len();
        inner.orders.retain(|o| o.id != id);
        let removed = before != inner.orders.len();
        if removed {
            inner.reviews.retain(|r| r.order_id != id);
            inner.questionnaires.retain(|q| q.order_id != id);
        }
        Ok(removed)
    }

    async fn insert_review(&self, review: Review) -> AppResult<Review> {
        self.lock()?.reviews.push(review.clone());
        Ok(review)
    }

    async fn list_reviews(&self) -> AppResult<Vec<Review>> {
        let mut reviews = self.lock()?.reviews.clone();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reviews)
    }

    async fn review_for_order(&self, order_id: Uuid) -> AppResult<Option<Review>> {
        Ok(self
            .lock()?
            .reviews
            .iter()
            .find(|r| r.order_id == order_id)
            .cloned())
    }

    async fn insert_questionnaire(&self, questionnaire: Questionnaire) -> AppResult<Questionnaire> {
        self.lock()?.questionnaires.push(questionnaire.clone());
        Ok(questionnaire)
    }

    async fn list_questionnaires(&self) -> AppResult<Vec<Questionnaire>> {
        Ok(self.lock()?.questionnaires.clone())
    }

    async fn questionnaire_for_order(&self, order_id: Uuid) -> AppResult<Option<Questionnaire>> {
        Ok(self
            .lock()?
            .questionnaires
            .iter()
            .find(|q| q.order_id == order_id)
            .cloned())
    }

    async fn record_audit(&self, entry: AuditEntry) -> AppResult<()> {
        self.lock()?.audit.push(entry);
        Ok(())
    }
}
