use uuid::Uuid;

use crate::{
    analytics::{self, Overview, ProductPerformance},
    audit,
    dto::{
        orders::OrderList,
        products::{InventoryAdjustRequest, LowStockQuery, ProductList},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, Product},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, Pagination},
    state::AppState,
    store::{OrderFilter, StockChange},
};

pub const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 5;

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();
    let filter = OrderFilter {
        user_id: None,
        status: query.status,
        sort_order: query.sort_order,
        limit: limit as u64,
        offset: offset as u64,
    };
    let result = state.store.list_orders(&filter).await?;

    let meta = Meta::new(page, limit, result.total as i64);
    Ok(ApiResponse::success(
        "Orders",
        OrderList {
            items: result.items,
        },
        Some(meta),
    ))
}

pub async fn get_order_admin(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;
    let order = state
        .store
        .get_order(id)
        .await?
        .ok_or(AppError::NotFound("order"))?;
    Ok(ApiResponse::success("Order found", order, Some(Meta::empty())))
}

pub async fn list_low_stock(
    state: &AppState,
    user: &AuthUser,
    query: LowStockQuery,
) -> AppResult<ApiResponse<ProductList>> {
    ensure_admin(user)?;
    let threshold = query.threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD);
    let (page, limit, offset) = Pagination {
        page: query.page,
        per_page: query.per_page,
    }
    .normalize();

    let result = state
        .store
        .low_stock(threshold, limit as u64, offset as u64)
        .await?;
    let meta = Meta::new(page, limit, result.total as i64);
    Ok(ApiResponse::success(
        "Low stock products",
        ProductList {
            items: result.items,
        },
        Some(meta),
    ))
}

pub async fn adjust_inventory(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: InventoryAdjustRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    if payload.delta == 0 {
        return Err(AppError::BadRequest("delta must not be 0".into()));
    }

    match state.store.adjust_stock(product_id, payload.delta).await? {
        StockChange::Applied { remaining } => {
            tracing::info!(product_id = %product_id, delta = payload.delta, remaining, "inventory adjusted");
        }
        StockChange::Insufficient { available } => {
            return Err(AppError::BadRequest(format!(
                "stock cannot go below zero ({available} available)"
            )));
        }
        StockChange::Missing => return Err(AppError::NotFound("product")),
    }

    let product = state
        .store
        .get_product(product_id)
        .await?
        .ok_or(AppError::NotFound("product"))?;

    audit::record(
        state,
        Some(user.user_id),
        "inventory_adjust",
        "products",
        serde_json::json!({ "product_id": product_id, "delta": payload.delta }),
    )
    .await;

    Ok(ApiResponse::success("Inventory adjusted", product, Some(Meta::empty())))
}

pub async fn overview(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Overview>> {
    ensure_admin(user)?;
    let orders = state.store.all_orders().await?;
    Ok(ApiResponse::success(
        "Overview",
        analytics::overview(&orders),
        None,
    ))
}

pub async fn product_performance(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<Vec<ProductPerformance>>> {
    ensure_admin(user)?;
    let orders = state.store.all_orders().await?;
    let perf = analytics::product_performance(&orders);
    let total = perf.len() as i64;
    Ok(ApiResponse::success(
        "Product performance",
        perf,
        Some(Meta::new(1, total, total)),
    ))
}
