use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    handoff::{Branch, HandoffSnapshot},
    models::{Order, OrderItem, OrderStatus, PaymentMethod},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub payment_method: PaymentMethod,
    pub voucher_code: Option<String>,
    #[serde(default)]
    pub branch: Branch,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResponse {
    pub order: Order,
    pub subtotal: i64,
    pub discount: i64,
    pub handoff: HandoffSnapshot,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ManualOrderRequest {
    pub admin_key: String,
    pub customer_name: Option<String>,
    pub items: Option<Vec<OrderItem>>,
    pub total: Option<i64>,
    pub note: Option<String>,
}
