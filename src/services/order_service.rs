//! Order lifecycle: checkout from the cart, status changes with their stock
//! side effects, deletion and walk-in orders.
//!
//! Inventory is held by an order while `stock_committed` is set. Leaving
//! `baru` commits it, returning to `baru` or deleting the order releases it.

use chrono::Utc;
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{
        CheckoutRequest, CheckoutResponse, ManualOrderRequest, OrderList, UpdateOrderStatusRequest,
    },
    error::{AppError, AppResult},
    handoff::{self, Buyer, HandoffLine},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, OrderItem, OrderStatus, PaymentMethod},
    response::{ApiResponse, Meta},
    routes::params::OrderListQuery,
    services::{
        cart_service::{cart_catalog, load_cart},
        voucher_service::{redeem_voucher, restore_voucher},
    },
    state::AppState,
    store::{OrderFilter, StockChange},
};

pub const OFFLINE_CUSTOMER_NAME: &str = "Offline Customer";
pub const OFFLINE_CUSTOMER_EMAIL: &str = "offline@zonaprint.com";

/// Buyer details frozen onto the order.
#[derive(Debug, Clone)]
pub struct CheckoutMeta {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub payment_method: PaymentMethod,
}

fn required(field: &str, value: &str) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::BadRequest(format!("{field} is required")));
    }
    Ok(value.to_string())
}

fn item_name(name: &str, option: Option<&str>) -> String {
    match option {
        Some(option) => format!("{name} ({option})"),
        None => name.to_string(),
    }
}

/// Turns the cart of `user_id` into an order with status `baru`.
///
/// Lines whose product left the catalog are dropped. The cart is cleared
/// only after the order is stored; stock is not touched.
pub async fn create_order_from_cart(
    state: &AppState,
    user_id: Uuid,
    total_override: Option<i64>,
    meta: CheckoutMeta,
) -> AppResult<Order> {
    let cart = load_cart(state, user_id).await?;
    if cart.is_empty() {
        return Err(AppError::EmptyCart);
    }
    let name = required("name", &meta.name)?;
    let email = required("email", &meta.email)?;
    if total_override.is_some_and(|t| t < 0) {
        return Err(AppError::BadRequest("total must not be negative".into()));
    }

    let catalog = cart_catalog(state, &cart).await?;
    let items: Vec<OrderItem> = cart
        .lines()
        .iter()
        .filter_map(|line| {
            catalog.get(&line.product_id).map(|product| OrderItem {
                product_id: Some(product.id),
                name: item_name(&product.name, line.selected_option.as_deref()),
                price: product.price,
                quantity: line.quantity,
            })
        })
        .collect();
    if items.is_empty() {
        return Err(AppError::EmptyCart);
    }

    let now = Utc::now();
    let total = total_override.unwrap_or_else(|| items.iter().map(OrderItem::subtotal).sum());
    let order = Order {
        id: Uuid::new_v4(),
        user_id: Some(user_id),
        user_name: name,
        user_email: email,
        user_phone: meta.phone.filter(|p| !p.trim().is_empty()),
        user_address: meta.address.filter(|a| !a.trim().is_empty()),
        items,
        attachments: cart.attachments(),
        total,
        status: OrderStatus::Baru,
        payment_method: meta.payment_method,
        stock_committed: false,
        created_at: now,
        updated_at: now,
    };

    let order = state.store.insert_order(order).await?;
    // the order exists from here on, so a stale cart must not fail checkout
    if let Err(err) = state.store.clear_cart(user_id).await {
        tracing::warn!(order_id = %order.id, user_id = %user_id, error = %err, "cart not cleared after checkout");
    }

    tracing::info!(order_id = %order.id, user_id = %user_id, total = order.total, "order created");
    audit::record(
        state,
        Some(user_id),
        "checkout",
        "orders",
        serde_json::json!({ "order_id": order.id, "total": order.total }),
    )
    .await;
    Ok(order)
}

/// Checkout as exposed over HTTP: voucher, order and WhatsApp handoff.
pub async fn place_order(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<CheckoutResponse>> {
    let name = required("name", &payload.name)?;
    let email = required("email", &payload.email)?;
    let phone = required("phone", &payload.phone)?;
    let address = required("address", &payload.address)?;

    let cart = load_cart(state, user.user_id).await?;
    let catalog = cart_catalog(state, &cart).await?;
    let lines: Vec<HandoffLine> = cart
        .lines()
        .iter()
        .filter_map(|line| {
            catalog.get(&line.product_id).map(|product| HandoffLine {
                name: product.name.clone(),
                option: line.selected_option.clone(),
                note: line.note.clone(),
                quantity: line.quantity,
                unit_price: product.price,
            })
        })
        .collect();
    // nothing to buy: fail before a voucher is burned
    if lines.is_empty() {
        return Err(AppError::EmptyCart);
    }
    let subtotal = cart.total(&catalog);

    let voucher_code = payload
        .voucher_code
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());
    let discount = match voucher_code {
        Some(code) => redeem_voucher(state, user.user_id, code).await?.amount,
        None => 0,
    };
    let total = (subtotal - discount).max(0);

    let meta = CheckoutMeta {
        name: name.clone(),
        email: email.clone(),
        phone: Some(phone.clone()),
        address: Some(address.clone()),
        payment_method: payload.payment_method,
    };
    let order = match create_order_from_cart(state, user.user_id, Some(total), meta).await {
        Ok(order) => order,
        Err(err) => {
            if let Some(code) = voucher_code {
                if let Err(restore_err) = restore_voucher(state, user.user_id, code).await {
                    tracing::error!(error = %restore_err, code, "voucher restore failed");
                }
            }
            return Err(err);
        }
    };

    let buyer = Buyer {
        name: &name,
        email: &email,
        phone: Some(&phone),
        address: Some(&address),
    };
    let message =
        handoff::compose_message(payload.branch, &lines, subtotal, discount, total, &buyer);
    let handoff = handoff::snapshot(&state.config, payload.branch, message);

    Ok(ApiResponse::success(
        "Checkout success",
        CheckoutResponse {
            order,
            subtotal,
            discount,
            handoff,
        },
        Some(Meta::empty()),
    ))
}

async fn restock(state: &AppState, applied: &[(Uuid, i32)]) {
    for (product_id, quantity) in applied {
        if let Err(err) = state.store.adjust_stock(*product_id, *quantity).await {
            tracing::error!(error = %err, product_id = %product_id, quantity, "restock failed");
        }
    }
}

/// Deducts every catalog-backed item of `order` from stock.
///
/// All-or-nothing: on the first item that cannot be covered, the deductions
/// made so far are put back. Items whose product no longer exists are skipped.
pub(crate) async fn commit_stock(state: &AppState, order: &Order) -> AppResult<()> {
    let mut applied: Vec<(Uuid, i32)> = Vec::new();
    for item in &order.items {
        let Some(product_id) = item.product_id else {
            continue;
        };
        match state.store.adjust_stock(product_id, -item.quantity).await {
            Ok(StockChange::Applied { remaining }) => {
                tracing::debug!(order_id = %order.id, product_id = %product_id, remaining, "stock committed");
                applied.push((product_id, item.quantity));
            }
            Ok(StockChange::Missing) => {
                tracing::warn!(order_id = %order.id, product_id = %product_id, "product gone, stock skipped");
            }
            Ok(StockChange::Insufficient { available }) => {
                restock(state, &applied).await;
                return Err(AppError::StockConflict {
                    product: item.name.clone(),
                    available,
                    requested: item.quantity,
                });
            }
            Err(err) => {
                restock(state, &applied).await;
                return Err(err);
            }
        }
    }
    Ok(())
}

/// Puts the items of a committed order back on the shelf.
///
/// Every item is attempted; a failing one is logged and does not stop the rest.
pub(crate) async fn release_stock(state: &AppState, order: &Order) {
    let mut failed = 0usize;
    for item in &order.items {
        let Some(product_id) = item.product_id else {
            continue;
        };
        match state.store.adjust_stock(product_id, item.quantity).await {
            Ok(StockChange::Missing) => {
                tracing::warn!(order_id = %order.id, product_id = %product_id, "product gone, restock skipped");
            }
            Ok(_) => {}
            Err(err) => {
                failed += 1;
                tracing::error!(
                    order_id = %order.id,
                    product_id = %product_id,
                    quantity = item.quantity,
                    error = %err,
                    "failed to release stock"
                );
            }
        }
    }
    if failed == 0 {
        tracing::info!(order_id = %order.id, "stock released");
    } else {
        tracing::warn!(order_id = %order.id, failed, "stock released partially");
    }
}

fn concurrent_change(id: Uuid) -> AppError {
    AppError::Conflict(format!("order {id} was changed concurrently"))
}

pub async fn update_status(
    state: &AppState,
    admin: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(admin)?;
    let order = state
        .store
        .get_order(id)
        .await?
        .ok_or(AppError::NotFound("order"))?;
    let from = order.status;
    let to = payload.status;
    if from == to {
        return Ok(ApiResponse::success("Status unchanged", order, Some(Meta::empty())));
    }

    let updated = if to.holds_stock() && !order.stock_committed {
        commit_stock(state, &order).await?;
        match state.store.transition_order(id, from, to, true).await {
            Ok(Some(updated)) => updated,
            Ok(None) => {
                release_stock(state, &order).await;
                return Err(concurrent_change(id));
            }
            Err(err) => {
                release_stock(state, &order).await;
                return Err(err);
            }
        }
    } else if !to.holds_stock() && order.stock_committed {
        let updated = state
            .store
            .transition_order(id, from, to, false)
            .await?
            .ok_or_else(|| concurrent_change(id))?;
        release_stock(state, &order).await;
        updated
    } else {
        state
            .store
            .transition_order(id, from, to, order.stock_committed)
            .await?
            .ok_or_else(|| concurrent_change(id))?
    };

    tracing::info!(order_id = %id, from = %from, to = %to, stock_committed = updated.stock_committed, "order status changed");
    audit::record(
        state,
        Some(admin.user_id),
        "order_status_update",
        "orders",
        serde_json::json!({ "order_id": id, "from": from, "to": to }),
    )
    .await;

    Ok(ApiResponse::success("Order status updated", updated, Some(Meta::empty())))
}

pub async fn delete_order(
    state: &AppState,
    admin: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(admin)?;
    let order = state
        .store
        .get_order(id)
        .await?
        .ok_or(AppError::NotFound("order"))?;
    if !state.store.delete_order(id).await? {
        return Err(AppError::NotFound("order"));
    }
    if order.stock_committed {
        release_stock(state, &order).await;
    }

    audit::record(
        state,
        Some(admin.user_id),
        "order_delete",
        "orders",
        serde_json::json!({ "order_id": id, "stock_released": order.stock_committed }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({ "id": id }),
        Some(Meta::empty()),
    ))
}

fn walk_in_items(total: Option<i64>, note: Option<&str>) -> Vec<OrderItem> {
    let name = match note {
        Some(note) => format!("Offline • {note}"),
        None => "Offline / Walk-in".to_string(),
    };
    vec![OrderItem {
        product_id: None,
        name,
        price: total.unwrap_or(0),
        quantity: 1,
    }]
}

/// Records an in-person sale as a finished order.
pub async fn add_manual_order(
    state: &AppState,
    admin: &AuthUser,
    payload: ManualOrderRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(admin)?;
    if payload.admin_key != state.config.manual_order_key {
        tracing::warn!(user_id = %admin.user_id, "manual order rejected: invalid admin key");
        return Err(AppError::InvalidAdminKey);
    }
    if payload.total.is_some_and(|t| t < 0) {
        return Err(AppError::BadRequest("total must not be negative".into()));
    }

    let note = payload
        .note
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());
    let items = match payload.items.filter(|items| !items.is_empty()) {
        Some(items) => items,
        None => walk_in_items(payload.total, note),
    };
    for item in &items {
        if item.name.trim().is_empty() || item.quantity <= 0 || item.price < 0 {
            return Err(AppError::BadRequest("invalid order item".into()));
        }
    }
    let total = payload
        .total
        .unwrap_or_else(|| items.iter().map(OrderItem::subtotal).sum());

    let now = Utc::now();
    let order = Order {
        id: Uuid::new_v4(),
        user_id: None,
        user_name: payload
            .customer_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| OFFLINE_CUSTOMER_NAME.to_string()),
        user_email: OFFLINE_CUSTOMER_EMAIL.to_string(),
        user_phone: Some("-".to_string()),
        user_address: Some("-".to_string()),
        items,
        attachments: Vec::new(),
        total,
        status: OrderStatus::Selesai,
        payment_method: PaymentMethod::Manual,
        stock_committed: true,
        created_at: now,
        updated_at: now,
    };

    commit_stock(state, &order).await?;
    let order = match state.store.insert_order(order.clone()).await {
        Ok(order) => order,
        Err(err) => {
            release_stock(state, &order).await;
            return Err(err);
        }
    };

    tracing::info!(order_id = %order.id, total = order.total, "manual order recorded");
    audit::record(
        state,
        Some(admin.user_id),
        "order_manual_create",
        "orders",
        serde_json::json!({ "order_id": order.id, "total": order.total }),
    )
    .await;

    Ok(ApiResponse::success("Manual order created", order, Some(Meta::empty())))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let filter = OrderFilter {
        user_id: Some(user.user_id),
        status: query.status,
        sort_order: query.sort_order,
        limit: limit as u64,
        offset: offset as u64,
    };
    let result = state.store.list_orders(&filter).await?;

    let meta = Meta::new(page, limit, result.total as i64);
    Ok(ApiResponse::success(
        "Ok",
        OrderList {
            items: result.items,
        },
        Some(meta),
    ))
}

/// Owners see their own orders, admins see all of them.
pub async fn get_order(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<ApiResponse<Order>> {
    let order = state
        .store
        .get_order(id)
        .await?
        .filter(|o| user.is_admin() || o.user_id == Some(user.user_id))
        .ok_or(AppError::NotFound("order"))?;
    Ok(ApiResponse::success("OK", order, Some(Meta::empty())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walk_in_line_carries_the_note() {
        let items = walk_in_items(Some(40_000), Some("cetak kartu nama"));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Offline • cetak kartu nama");
        assert_eq!(items[0].price, 40_000);
        assert_eq!(items[0].product_id, None);

        let items = walk_in_items(Some(10_000), None);
        assert_eq!(items[0].name, "Offline / Walk-in");
        assert_eq!(walk_in_items(None, None)[0].price, 0);
    }
}
