use chrono::Utc;
use uuid::Uuid;

use crate::{
    audit,
    dto::products::{CreateProductRequest, ProductList, UpdateProductRequest},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Product,
    response::{ApiResponse, Meta},
    routes::params::ProductQuery,
    state::AppState,
    store::{ProductFilter, ProductPatch},
};

fn validate_price(price: i64) -> AppResult<()> {
    if price <= 0 {
        return Err(AppError::BadRequest("price must be greater than 0".into()));
    }
    Ok(())
}

fn validate_stock(stock: i32) -> AppResult<()> {
    if stock < 0 {
        return Err(AppError::BadRequest("stock must not be negative".into()));
    }
    Ok(())
}

fn clean_options(options: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for option in options.into_iter().map(|o| o.trim().to_string()) {
        if !option.is_empty() && !out.contains(&option) {
            out.push(option);
        }
    }
    out
}

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let filter = ProductFilter {
        search: query.q.filter(|s| !s.trim().is_empty()),
        category: query.category.filter(|c| !c.is_empty()),
        min_price: query.min_price,
        max_price: query.max_price,
        sort_by: query.sort_by,
        sort_order: query.sort_order,
        limit: limit as u64,
        offset: offset as u64,
    };
    let result = state.store.list_products(&filter).await?;

    let meta = Meta::new(page, limit, result.total as i64);
    let data = ProductList {
        items: result.items,
    };
    Ok(ApiResponse::success("Products", data, Some(meta)))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let product = state
        .store
        .get_product(id)
        .await?
        .ok_or(AppError::NotFound("product"))?;
    Ok(ApiResponse::success("Product", product, None))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("name is required".into()));
    }
    validate_price(payload.price)?;
    validate_stock(payload.stock)?;

    let product = state
        .store
        .insert_product(Product {
            id: Uuid::new_v4(),
            name,
            description: payload.description,
            price: payload.price,
            stock: payload.stock,
            category: payload.category,
            image: payload.image,
            featured: payload.featured,
            options: clean_options(payload.options),
            created_at: Utc::now(),
        })
        .await?;

    audit::record(
        state,
        Some(user.user_id),
        "product_create",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product created",
        product,
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    if let Some(price) = payload.price {
        validate_price(price)?;
    }
    if let Some(stock) = payload.stock {
        validate_stock(stock)?;
    }
    if payload.name.as_ref().is_some_and(|n| n.trim().is_empty()) {
        return Err(AppError::BadRequest("name must not be empty".into()));
    }

    let patch = ProductPatch {
        name: payload.name.map(|n| n.trim().to_string()),
        description: payload.description,
        price: payload.price,
        stock: payload.stock,
        category: payload.category,
        image: payload.image,
        featured: payload.featured,
        options: payload.options.map(clean_options),
    };
    let product = state
        .store
        .update_product(id, patch)
        .await?
        .ok_or(AppError::NotFound("product"))?;

    audit::record(
        state,
        Some(user.user_id),
        "product_update",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success("Updated", product, Some(Meta::empty())))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    if !state.store.delete_product(id).await? {
        return Err(AppError::NotFound("product"));
    }

    audit::record(
        state,
        Some(user.user_id),
        "product_delete",
        "products",
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_are_trimmed_and_unique() {
        let cleaned = clean_options(vec![
            " A3 ".into(),
            "A4".into(),
            "A3".into(),
            "  ".into(),
        ]);
        assert_eq!(cleaned, vec!["A3".to_string(), "A4".to_string()]);
    }
}
