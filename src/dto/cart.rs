use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Attachment, Product};

fn one() -> i32 {
    1
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    #[serde(default = "one")]
    pub quantity: i32,
    pub selected_option: Option<String>,
    pub note: Option<String>,
}

/// Body for both the line-keyed and the product-keyed update.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCartRequest {
    pub quantity: i32,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AttachFileRequest {
    /// Generated when absent.
    pub id: Option<String>,
    pub name: String,
    pub url: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartLineDto {
    pub id: Uuid,
    pub product_id: Uuid,
    /// `None` once the product has been removed from the catalog.
    pub product: Option<Product>,
    pub quantity: i32,
    pub selected_option: Option<String>,
    pub note: Option<String>,
    pub attachments: Vec<Attachment>,
    pub subtotal: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartList {
    pub items: Vec<CartLineDto>,
    pub total: i64,
}
