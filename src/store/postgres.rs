use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    sea_query::{Expr, extension::postgres::PgExpr},
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    db::DbPool,
    entity::{
        cart_items::{self, Column as CartCol, Entity as CartItems},
        orders::{self, Column as OrderCol, Entity as Orders},
        products::{self, Column as ProdCol, Entity as Products},
        questionnaires::{self, Column as QuestionnaireCol, Entity as Questionnaires},
        reviews::{self, Column as ReviewCol, Entity as Reviews},
        users::{self, Column as UserCol, Entity as Users},
        vouchers::{self, Column as VoucherCol, Entity as Vouchers},
    },
    error::{AppError, AppResult},
    models::{
        CartItem, Order, OrderStatus, Product, Questionnaire, Review, User, VoucherCode,
    },
    routes::params::{ProductSortBy, SortOrder},
};

use super::{
    AuditEntry, OrderFilter, Page, ProductFilter, ProductPatch, ShopStore, StockChange, UserPatch,
};

/// PostgreSQL store: sea-orm for the tables, the raw sqlx pool for audit rows.
#[derive(Debug, Clone)]
pub struct PgStore {
    orm: DatabaseConnection,
    pool: DbPool,
}

impl PgStore {
    pub fn new(orm: DatabaseConnection) -> Self {
        let pool = orm.get_postgres_connection_pool().clone();
        Self { orm, pool }
    }
}

fn voucher_key(code: &str) -> String {
    code.trim().to_uppercase()
}

#[async_trait]
impl ShopStore for PgStore {
    async fn list_products(&self, filter: &ProductFilter) -> AppResult<Page<Product>> {
        let mut condition = Condition::all();
        if let Some(search) = filter.search.as_ref().filter(|s| !s.is_empty()) {
            let pattern = format!("%{search}%");
            condition = condition.add(
                Condition::any()
                    .add(Expr::col(ProdCol::Name).ilike(pattern.clone()))
                    .add(Expr::col(ProdCol::Description).ilike(pattern)),
            );
        }
        if let Some(category) = filter.category.as_ref() {
            condition = condition.add(ProdCol::Category.eq(category.clone()));
        }
        if let Some(min_price) = filter.min_price {
            condition = condition.add(ProdCol::Price.gte(min_price));
        }
        if let Some(max_price) = filter.max_price {
            condition = condition.add(ProdCol::Price.lte(max_price));
        }

        let sort_col = match filter.sort_by.unwrap_or(ProductSortBy::CreatedAt) {
            ProductSortBy::CreatedAt => ProdCol::CreatedAt,
            ProductSortBy::Price => ProdCol::Price,
            ProductSortBy::Name => ProdCol::Name,
        };
        let mut finder = Products::find().filter(condition);
        finder = match filter.sort_order.unwrap_or(SortOrder::Desc) {
            SortOrder::Asc => finder.order_by_asc(sort_col),
            SortOrder::Desc => finder.order_by_desc(sort_col),
        };

        let total = finder.clone().count(&self.orm).await?;
        let items = finder
            .limit(filter.limit)
            .offset(filter.offset)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(product_from_entity)
            .collect::<AppResult<Vec<_>>>()?;
        Ok(Page { items, total })
    }

    async fn get_product(&self, id: Uuid) -> AppResult<Option<Product>> {
        Products::find_by_id(id)
            .one(&self.orm)
            .await?
            .map(product_from_entity)
            .transpose()
    }

    async fn products_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Products::find()
            .filter(ProdCol::Id.is_in(ids.iter().copied()))
            .all(&self.orm)
            .await?
            .into_iter()
            .map(product_from_entity)
            .collect()
    }

    async fn insert_product(&self, product: Product) -> AppResult<Product> {
        let active = products::ActiveModel {
            id: Set(product.id),
            name: Set(product.name),
            description: Set(product.description),
            price: Set(product.price),
            stock: Set(product.stock),
            category: Set(product.category),
            image: Set(product.image),
            featured: Set(product.featured),
            options: Set(serde_json::to_value(&product.options)?),
            created_at: Set(product.created_at.into()),
        };
        product_from_entity(active.insert(&self.orm).await?)
    }

    async fn update_product(&self, id: Uuid, patch: ProductPatch) -> AppResult<Option<Product>> {
        let Some(existing) = Products::find_by_id(id).one(&self.orm).await? else {
            return Ok(None);
        };
        let mut active: products::ActiveModel = existing.into();
        if let Some(name) = patch.name {
            active.name = Set(name);
        }
        if let Some(description) = patch.description {
            active.description = Set(description);
        }
        if let Some(price) = patch.price {
            active.price = Set(price);
        }
        if let Some(stock) = patch.stock {
            active.stock = Set(stock);
        }
        if let Some(category) = patch.category {
            active.category = Set(category);
        }
        if let Some(image) = patch.image {
            active.image = Set(image);
        }
        if let Some(featured) = patch.featured {
            active.featured = Set(featured);
        }
        if let Some(options) = patch.options {
            active.options = Set(serde_json::to_value(&options)?);
        }
        product_from_entity(active.update(&self.orm).await?).map(Some)
    }

    async fn delete_product(&self, id: Uuid) -> AppResult<bool> {
        let txn = self.orm.begin().await?;
        CartItems::delete_many()
            .filter(CartCol::ProductId.eq(id))
            .exec(&txn)
            .await?;
        let result = Products::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }

    async fn adjust_stock(&self, id: Uuid, delta: i32) -> AppResult<StockChange> {
        let out_of_range = || AppError::BadRequest("stock adjustment out of range".into());
        let floor = delta.checked_neg().ok_or_else(out_of_range)?;
        let ceiling = i32::MAX - delta.max(0);
        // single conditional UPDATE: stock stays within 0..=i32::MAX
        let updated = Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).add(delta))
            .filter(ProdCol::Id.eq(id))
            .filter(ProdCol::Stock.gte(floor))
            .filter(ProdCol::Stock.lte(ceiling))
            .exec_with_returning(&self.orm)
            .await?;
        if let Some(row) = updated.into_iter().next() {
            return Ok(StockChange::Applied {
                remaining: row.stock,
            });
        }
        match Products::find_by_id(id).one(&self.orm).await? {
            Some(row) if row.stock > ceiling => Err(out_of_range()),
            Some(row) => Ok(StockChange::Insufficient {
                available: row.stock,
            }),
            None => Ok(StockChange::Missing),
        }
    }

    async fn low_stock(&self, threshold: i32, limit: u64, offset: u64) -> AppResult<Page<Product>> {
        let finder = Products::find()
            .filter(ProdCol::Stock.lte(threshold))
            .order_by_asc(ProdCol::Stock)
            .order_by_desc(ProdCol::CreatedAt);
        let total = finder.clone().count(&self.orm).await?;
        let items = finder
            .limit(limit)
            .offset(offset)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(product_from_entity)
            .collect::<AppResult<Vec<_>>>()?;
        Ok(Page { items, total })
    }

    async fn insert_user(&self, user: User) -> AppResult<User> {
        if self.find_user_by_email(&user.email).await?.is_some() {
            return Err(AppError::BadRequest("Email is already taken".into()));
        }
        let active = users::ActiveModel {
            id: Set(user.id),
            name: Set(user.name),
            email: Set(user.email.to_lowercase()),
            password_hash: Set(user.password_hash),
            phone: Set(user.phone),
            address: Set(user.address),
            city: Set(user.city),
            province: Set(user.province),
            role: Set(user.role.as_str().to_string()),
            welcome_voucher_shown: Set(user.welcome_voucher_shown),
            welcome_voucher_used: Set(user.welcome_voucher_used),
            created_at: Set(user.created_at.into()),
        };
        user_from_entity(active.insert(&self.orm).await?)
    }

    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>> {
        Users::find_by_id(id)
            .one(&self.orm)
            .await?
            .map(user_from_entity)
            .transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Users::find()
            .filter(UserCol::Email.eq(email.trim().to_lowercase()))
            .one(&self.orm)
            .await?
            .map(user_from_entity)
            .transpose()
    }

    async fn update_user(&self, id: Uuid, patch: UserPatch) -> AppResult<Option<User>> {
        let Some(existing) = Users::find_by_id(id).one(&self.orm).await? else {
            return Ok(None);
        };
        let mut active: users::ActiveModel = existing.into();
        if let Some(name) = patch.name {
            active.name = Set(name);
        }
        if let Some(phone) = patch.phone {
            active.phone = Set(Some(phone));
        }
        if let Some(address) = patch.address {
            active.address = Set(Some(address));
        }
        if let Some(city) = patch.city {
            active.city = Set(Some(city));
        }
        if let Some(province) = patch.province {
            active.province = Set(Some(province));
        }
        if let Some(hash) = patch.password_hash {
            active.password_hash = Set(hash);
        }
        if let Some(shown) = patch.welcome_voucher_shown {
            active.welcome_voucher_shown = Set(shown);
        }
        if let Some(used) = patch.welcome_voucher_used {
            active.welcome_voucher_used = Set(used);
        }
        user_from_entity(active.update(&self.orm).await?).map(Some)
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        Users::find()
            .order_by_asc(UserCol::CreatedAt)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(user_from_entity)
            .collect()
    }

    async fn vouchers_for(&self, user_id: Uuid) -> AppResult<Vec<VoucherCode>> {
        Ok(Vouchers::find()
            .filter(VoucherCol::UserId.eq(user_id))
            .order_by_asc(VoucherCol::CreatedAt)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(voucher_from_entity)
            .collect())
    }

    async fn upsert_voucher(&self, user_id: Uuid, code: &str, amount: i64) -> AppResult<VoucherCode> {
        let code = voucher_key(code);
        let existing = Vouchers::find()
            .filter(VoucherCol::UserId.eq(user_id))
            .filter(VoucherCol::Code.eq(code.clone()))
            .one(&self.orm)
            .await?;
        let model = match existing {
            Some(existing) => {
                let mut active: vouchers::ActiveModel = existing.into();
                active.amount = Set(amount);
                active.used = Set(false);
                active.update(&self.orm).await?
            }
            None => {
                vouchers::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(user_id),
                    code: Set(code),
                    amount: Set(amount),
                    used: Set(false),
                    created_at: Set(Utc::now().into()),
                }
                .insert(&self.orm)
                .await?
            }
        };
        Ok(voucher_from_entity(model))
    }

    async fn delete_voucher(&self, user_id: Uuid, code: &str) -> AppResult<bool> {
        let result = Vouchers::delete_many()
            .filter(VoucherCol::UserId.eq(user_id))
            .filter(VoucherCol::Code.eq(voucher_key(code)))
            .exec(&self.orm)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn mark_voucher_used(&self, user_id: Uuid, code: &str) -> AppResult<bool> {
        let result = Vouchers::update_many()
            .col_expr(VoucherCol::Used, Expr::value(true))
            .filter(VoucherCol::UserId.eq(user_id))
            .filter(VoucherCol::Code.eq(voucher_key(code)))
            .filter(VoucherCol::Used.eq(false))
            .exec(&self.orm)
            .await?;
        Ok(result.rows_affected == 1)
    }

    async fn restore_voucher(&self, user_id: Uuid, code: &str) -> AppResult<bool> {
        let result = Vouchers::update_many()
            .col_expr(VoucherCol::Used, Expr::value(false))
            .filter(VoucherCol::UserId.eq(user_id))
            .filter(VoucherCol::Code.eq(voucher_key(code)))
            .filter(VoucherCol::Used.eq(true))
            .exec(&self.orm)
            .await?;
        Ok(result.rows_affected == 1)
    }

    async fn cart_lines(&self, user_id: Uuid) -> AppResult<Vec<CartItem>> {
        CartItems::find()
            .filter(CartCol::UserId.eq(user_id))
            .order_by_asc(CartCol::CreatedAt)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(cart_item_from_entity)
            .collect()
    }

    async fn save_cart(&self, user_id: Uuid, lines: &[CartItem]) -> AppResult<()> {
        let txn = self.orm.begin().await?;
        CartItems::delete_many()
            .filter(CartCol::UserId.eq(user_id))
            .exec(&txn)
            .await?;
        if !lines.is_empty() {
            let rows = lines
                .iter()
                .map(|line| {
                    Ok(cart_items::ActiveModel {
                        id: Set(line.id),
                        user_id: Set(user_id),
                        product_id: Set(line.product_id),
                        quantity: Set(line.quantity),
                        selected_option: Set(line.selected_option.clone()),
                        note: Set(line.note.clone()),
                        attachments: Set(serde_json::to_value(&line.attachments)?),
                        created_at: Set(line.created_at.into()),
                    })
                })
                .collect::<AppResult<Vec<_>>>()?;
            CartItems::insert_many(rows).exec(&txn).await?;
        }
        txn.commit().await?;
        Ok(())
    }

    async fn clear_cart(&self, user_id: Uuid) -> AppResult<()> {
        CartItems::delete_many()
            .filter(CartCol::UserId.eq(user_id))
            .exec(&self.orm)
            .await?;
        Ok(())
    }

    async fn insert_order(&self, order: Order) -> AppResult<Order> {
        let active = orders::ActiveModel {
            id: Set(order.id),
            user_id: Set(order.user_id),
            user_name: Set(order.user_name),
            user_email: Set(order.user_email),
            user_phone: Set(order.user_phone),
            user_address: Set(order.user_address),
            items: Set(serde_json::to_value(&order.items)?),
            attachments: Set(serde_json::to_value(&order.attachments)?),
            total: Set(order.total),
            status: Set(order.status.as_str().to_string()),
            payment_method: Set(order.payment_method.as_str().to_string()),
            stock_committed: Set(order.stock_committed),
            created_at: Set(order.created_at.into()),
            updated_at: Set(order.updated_at.into()),
        };
        order_from_entity(active.insert(&self.orm).await?)
    }

    async fn get_order(&self, id: Uuid) -> AppResult<Option<Order>> {
        Orders::find_by_id(id)
            .one(&self.orm)
            .await?
            .map(order_from_entity)
            .transpose()
    }

    async fn list_orders(&self, filter: &OrderFilter) -> AppResult<Page<Order>> {
        let mut condition = Condition::all();
        if let Some(user_id) = filter.user_id {
            condition = condition.add(OrderCol::UserId.eq(user_id));
        }
        if let Some(status) = filter.status {
            condition = condition.add(OrderCol::Status.eq(status.as_str()));
        }
        let mut finder = Orders::find().filter(condition);
        finder = match filter.sort_order.unwrap_or(SortOrder::Desc) {
            SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
            SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
        };

        let total = finder.clone().count(&self.orm).await?;
        let items = finder
            .limit(filter.limit)
            .offset(filter.offset)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(order_from_entity)
            .collect::<AppResult<Vec<_>>>()?;
        Ok(Page { items, total })
    }

    async fn all_orders(&self) -> AppResult<Vec<Order>> {
        Orders::find()
            .order_by_desc(OrderCol::CreatedAt)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(order_from_entity)
            .collect()
    }

    async fn transition_order(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
        stock_committed: bool,
    ) -> AppResult<Option<Order>> {
        let updated = Orders::update_many()
            .col_expr(OrderCol::Status, Expr::value(to.as_str()))
            .col_expr(OrderCol::StockCommitted, Expr::value(stock_committed))
            .col_expr(OrderCol::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
            .filter(OrderCol::Id.eq(id))
            .filter(OrderCol::Status.eq(from.as_str()))
            .exec_with_returning(&self.orm)
            .await?;
        updated.into_iter().next().map(order_from_entity).transpose()
    }

    async fn delete_order(&self, id: Uuid) -> AppResult<bool> {
        let txn = self.orm.begin().await?;
        Reviews::delete_many()
            .filter(ReviewCol::OrderId.eq(id))
            .exec(&txn)
            .await?;
        Questionnaires::delete_many()
            .filter(QuestionnaireCol::OrderId.eq(id))
            .exec(&txn)
            .await?;
        let result = Orders::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }

    async fn insert_review(&self, review: Review) -> AppResult<Review> {
        let active = reviews::ActiveModel {
            id: Set(review.id),
            order_id: Set(review.order_id),
            user_id: Set(review.user_id),
            user_name: Set(review.user_name),
            rating: Set(review.rating),
            comment: Set(review.comment),
            created_at: Set(review.created_at.into()),
        };
        Ok(review_from_entity(active.insert(&self.orm).await?))
    }

    async fn list_reviews(&self) -> AppResult<Vec<Review>> {
        Ok(Reviews::find()
            .order_by_desc(ReviewCol::CreatedAt)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(review_from_entity)
            .collect())
    }

    async fn review_for_order(&self, order_id: Uuid) -> AppResult<Option<Review>> {
        Ok(Reviews::find()
            .filter(ReviewCol::OrderId.eq(order_id))
            .one(&self.orm)
            .await?
            .map(review_from_entity))
    }

    async fn insert_questionnaire(&self, questionnaire: Questionnaire) -> AppResult<Questionnaire> {
        let active = questionnaires::ActiveModel {
            id: Set(questionnaire.id),
            order_id: Set(questionnaire.order_id),
            user_id: Set(questionnaire.user_id),
            answers: Set(serde_json::to_value(&questionnaire.answers)?),
            created_at: Set(questionnaire.created_at.into()),
        };
        questionnaire_from_entity(active.insert(&self.orm).await?)
    }

    async fn list_questionnaires(&self) -> AppResult<Vec<Questionnaire>> {
        Questionnaires::find()
            .order_by_desc(QuestionnaireCol::CreatedAt)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(questionnaire_from_entity)
            .collect()
    }

    async fn questionnaire_for_order(&self, order_id: Uuid) -> AppResult<Option<Questionnaire>> {
        Questionnaires::find()
            .filter(QuestionnaireCol::OrderId.eq(order_id))
            .one(&self.orm)
            .await?
            .map(questionnaire_from_entity)
            .transpose()
    }

    async fn record_audit(&self, entry: AuditEntry) -> AppResult<()> {
        log_audit(&self.pool, &entry).await
    }
}

fn product_from_entity(model: products::Model) -> AppResult<Product> {
    Ok(Product {
        id: model.id,
        name: model.name,
        description: model.description,
        price: model.price,
        stock: model.stock,
        category: model.category,
        image: model.image,
        featured: model.featured,
        options: serde_json::from_value(model.options)?,
        created_at: model.created_at.with_timezone(&Utc),
    })
}

fn user_from_entity(model: users::Model) -> AppResult<User> {
    Ok(User {
        id: model.id,
        name: model.name,
        email: model.email,
        password_hash: model.password_hash,
        phone: model.phone,
        address: model.address,
        city: model.city,
        province: model.province,
        role: model.role.parse()?,
        welcome_voucher_shown: model.welcome_voucher_shown,
        welcome_voucher_used: model.welcome_voucher_used,
        created_at: model.created_at.with_timezone(&Utc),
    })
}

fn voucher_from_entity(model: vouchers::Model) -> VoucherCode {
    VoucherCode {
        code: model.code,
        amount: model.amount,
        used: model.used,
    }
}

fn cart_item_from_entity(model: cart_items::Model) -> AppResult<CartItem> {
    Ok(CartItem {
        id: model.id,
        user_id: model.user_id,
        product_id: model.product_id,
        quantity: model.quantity,
        selected_option: model.selected_option,
        note: model.note,
        attachments: serde_json::from_value(model.attachments)?,
        created_at: model.created_at.with_timezone(&Utc),
    })
}

fn order_from_entity(model: orders::Model) -> AppResult<Order> {
    Ok(Order {
        id: model.id,
        user_id: model.user_id,
        user_name: model.user_name,
        user_email: model.user_email,
        user_phone: model.user_phone,
        user_address: model.user_address,
        items: serde_json::from_value(model.items)?,
        attachments: serde_json::from_value(model.attachments)?,
        total: model.total,
        status: model.status.parse()?,
        payment_method: model.payment_method.parse()?,
        stock_committed: model.stock_committed,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

fn review_from_entity(model: reviews::Model) -> Review {
    Review {
        id: model.id,
        order_id: model.order_id,
        user_id: model.user_id,
        user_name: model.user_name,
        rating: model.rating,
        comment: model.comment,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn questionnaire_from_entity(model: questionnaires::Model) -> AppResult<Questionnaire> {
    Ok(Questionnaire {
        id: model.id,
        order_id: model.order_id,
        user_id: model.user_id,
        answers: serde_json::from_value(model.answers)?,
        created_at: model.created_at.with_timezone(&Utc),
    })
}
