use std::collections::HashMap;

use uuid::Uuid;

use crate::{
    audit,
    cart::{Cart, catalog_index},
    dto::cart::{AddToCartRequest, AttachFileRequest, CartLineDto, CartList, UpdateCartRequest},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Attachment, Product},
    response::{ApiResponse, Meta},
    state::AppState,
};

pub(crate) async fn load_cart(state: &AppState, user_id: Uuid) -> AppResult<Cart> {
    let lines = state.store.cart_lines(user_id).await?;
    Ok(Cart::new(user_id, lines))
}

/// Current catalog entries for every product referenced by `cart`.
pub(crate) async fn cart_catalog(
    state: &AppState,
    cart: &Cart,
) -> AppResult<HashMap<Uuid, Product>> {
    let products = state.store.products_by_ids(&cart.product_ids()).await?;
    Ok(catalog_index(products))
}

async fn save(state: &AppState, cart: &Cart) -> AppResult<()> {
    state.store.save_cart(cart.user_id(), cart.lines()).await
}

fn view(cart: &Cart, catalog: &HashMap<Uuid, Product>) -> CartList {
    let items = cart
        .lines()
        .iter()
        .map(|line| {
            let product = catalog.get(&line.product_id).cloned();
            let subtotal = product
                .as_ref()
                .map(|p| p.price * i64::from(line.quantity))
                .unwrap_or(0);
            CartLineDto {
                id: line.id,
                product_id: line.product_id,
                product,
                quantity: line.quantity,
                selected_option: line.selected_option.clone(),
                note: line.note.clone(),
                attachments: line.attachments.clone(),
                subtotal,
            }
        })
        .collect();
    CartList {
        items,
        total: cart.total(catalog),
    }
}

async fn respond(state: &AppState, cart: &Cart, message: &str) -> AppResult<ApiResponse<CartList>> {
    let catalog = cart_catalog(state, cart).await?;
    Ok(ApiResponse::success(
        message,
        view(cart, &catalog),
        Some(Meta::empty()),
    ))
}

pub async fn list_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartList>> {
    let cart = load_cart(state, user.user_id).await?;
    respond(state, &cart, "OK").await
}

pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartList>> {
    let product = state
        .store
        .get_product(payload.product_id)
        .await?
        .ok_or(AppError::NotFound("product"))?;

    let mut cart = load_cart(state, user.user_id).await?;
    let line = cart.add(
        &product,
        payload.quantity,
        payload.selected_option,
        payload.note,
    )?;
    save(state, &cart).await?;

    tracing::debug!(user_id = %user.user_id, product_id = %product.id, quantity = line.quantity, "cart line added");
    audit::record(
        state,
        Some(user.user_id),
        "cart_add",
        "cart_items",
        serde_json::json!({ "product_id": product.id, "quantity": payload.quantity }),
    )
    .await;
    respond(state, &cart, "Added to cart").await
}

async fn update(
    state: &AppState,
    user: &AuthUser,
    mut cart: Cart,
    line_id: Uuid,
    payload: UpdateCartRequest,
) -> AppResult<ApiResponse<CartList>> {
    let product_id = cart
        .line(line_id)
        .map(|l| l.product_id)
        .ok_or(AppError::NotFound("cart line"))?;
    let product = if payload.quantity > 0 {
        Some(
            state
                .store
                .get_product(product_id)
                .await?
                .ok_or(AppError::NotFound("product"))?,
        )
    } else {
        None
    };

    cart.update_line(line_id, payload.quantity, payload.note, product.as_ref())?;
    save(state, &cart).await?;

    audit::record(
        state,
        Some(user.user_id),
        "cart_update",
        "cart_items",
        serde_json::json!({ "line_id": line_id, "quantity": payload.quantity }),
    )
    .await;
    respond(state, &cart, "Cart updated").await
}

pub async fn update_line(
    state: &AppState,
    user: &AuthUser,
    line_id: Uuid,
    payload: UpdateCartRequest,
) -> AppResult<ApiResponse<CartList>> {
    let cart = load_cart(state, user.user_id).await?;
    update(state, user, cart, line_id, payload).await
}

/// Product-keyed update; only valid while the product has a single line.
pub async fn update_by_product(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: UpdateCartRequest,
) -> AppResult<ApiResponse<CartList>> {
    let cart = load_cart(state, user.user_id).await?;
    let line_id = cart.sole_line_for(product_id)?;
    update(state, user, cart, line_id, payload).await
}

pub async fn remove_product(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<CartList>> {
    let mut cart = load_cart(state, user.user_id).await?;
    if cart.remove_product(product_id) == 0 {
        return Err(AppError::NotFound("cart line"));
    }
    save(state, &cart).await?;

    audit::record(
        state,
        Some(user.user_id),
        "cart_remove",
        "cart_items",
        serde_json::json!({ "product_id": product_id }),
    )
    .await;
    respond(state, &cart, "Removed").await
}

pub async fn remove_line(
    state: &AppState,
    user: &AuthUser,
    line_id: Uuid,
) -> AppResult<ApiResponse<CartList>> {
    let mut cart = load_cart(state, user.user_id).await?;
    if !cart.remove_line(line_id) {
        return Err(AppError::NotFound("cart line"));
    }
    save(state, &cart).await?;
    respond(state, &cart, "Removed").await
}

pub async fn attach_file(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: AttachFileRequest,
) -> AppResult<ApiResponse<CartList>> {
    if payload.name.trim().is_empty() || payload.url.trim().is_empty() {
        return Err(AppError::BadRequest("attachment name and url are required".into()));
    }
    let attachment = Attachment {
        id: payload
            .id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        name: payload.name,
        url: payload.url,
    };

    let mut cart = load_cart(state, user.user_id).await?;
    cart.attach(product_id, attachment)?;
    save(state, &cart).await?;
    respond(state, &cart, "Attachment added").await
}

pub async fn remove_attachment(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    attachment_id: &str,
) -> AppResult<ApiResponse<CartList>> {
    let mut cart = load_cart(state, user.user_id).await?;
    cart.detach(product_id, attachment_id)?;
    save(state, &cart).await?;
    respond(state, &cart, "Attachment removed").await
}

pub async fn clear_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartList>> {
    state.store.clear_cart(user.user_id).await?;
    let cart = Cart::new(user.user_id, Vec::new());
    respond(state, &cart, "Cart cleared").await
}
