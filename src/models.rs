use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;

pub const WELCOME_VOUCHER_CODE: &str = "WELCOME25";
pub const WELCOME_VOUCHER_AMOUNT: i64 = 25_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(AppError::BadRequest(format!("unknown role {other}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub role: Role,
    pub welcome_voucher_shown: bool,
    pub welcome_voucher_used: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct VoucherCode {
    pub code: String,
    pub amount: i64,
    pub used: bool,
}

impl VoucherCode {
    pub fn matches(&self, code: &str) -> bool {
        self.code.eq_ignore_ascii_case(code.trim())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub stock: i32,
    pub category: String,
    pub image: String,
    pub featured: bool,
    pub options: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }
}

/// Metadata of a design file the buyer uploaded; the file itself lives elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Attachment {
    pub id: String,
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CartItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub selected_option: Option<String>,
    pub note: Option<String>,
    pub attachments: Vec<Attachment>,
    pub created_at: DateTime<Utc>,
}

impl CartItem {
    pub fn same_line(&self, product_id: Uuid, option: Option<&str>, note: Option<&str>) -> bool {
        self.product_id == product_id
            && self.selected_option.as_deref() == option
            && self.note.as_deref() == note
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Baru,
    Diproses,
    Produksi,
    Dikirim,
    Selesai,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Baru,
        OrderStatus::Diproses,
        OrderStatus::Produksi,
        OrderStatus::Dikirim,
        OrderStatus::Selesai,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Baru => "baru",
            OrderStatus::Diproses => "diproses",
            OrderStatus::Produksi => "produksi",
            OrderStatus::Dikirim => "dikirim",
            OrderStatus::Selesai => "selesai",
        }
    }

    /// Every stage after `baru` holds inventory for the order.
    pub fn holds_stock(&self) -> bool {
        !matches!(self, OrderStatus::Baru)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Selesai)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| AppError::BadRequest("Invalid order status".into()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Qris,
    Bca,
    Mandiri,
    Bri,
    Manual,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Qris => "qris",
            PaymentMethod::Bca => "bca",
            PaymentMethod::Mandiri => "mandiri",
            PaymentMethod::Bri => "bri",
            PaymentMethod::Manual => "manual",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "qris" => Ok(PaymentMethod::Qris),
            "bca" => Ok(PaymentMethod::Bca),
            "mandiri" => Ok(PaymentMethod::Mandiri),
            "bri" => Ok(PaymentMethod::Bri),
            "manual" => Ok(PaymentMethod::Manual),
            other => Err(AppError::BadRequest(format!("unknown payment method {other}"))),
        }
    }
}

/// Frozen copy of a product line at the time the order was placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    /// Absent for the placeholder line of a walk-in sale.
    pub product_id: Option<Uuid>,
    pub name: String,
    pub price: i64,
    pub quantity: i32,
}

impl OrderItem {
    pub fn subtotal(&self) -> i64 {
        self.price * i64::from(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub user_name: String,
    pub user_email: String,
    pub user_phone: Option<String>,
    pub user_address: Option<String>,
    pub items: Vec<OrderItem>,
    pub attachments: Vec<Attachment>,
    pub total: i64,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub stock_committed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn items_total(&self) -> i64 {
        self.items.iter().map(OrderItem::subtotal).sum()
    }

    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|i| i64::from(i.quantity)).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Review {
    pub id: Uuid,
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub rating: i16,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DiscoverySource {
    Instagram,
    Friend,
    Search,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ServiceSpeed {
    VeryFast,
    Fast,
    Normal,
    Slow,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct QuestionnaireAnswers {
    pub source: DiscoverySource,
    pub speed: ServiceSpeed,
    pub feedback: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Questionnaire {
    pub id: Uuid,
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub answers: QuestionnaireAnswers,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_lowercase_names() {
        assert_eq!("diproses".parse::<OrderStatus>().unwrap(), OrderStatus::Diproses);
        assert!("shipped".parse::<OrderStatus>().is_err());
        assert!(!OrderStatus::Baru.holds_stock());
        assert!(OrderStatus::Produksi.holds_stock());
    }

    #[test]
    fn voucher_code_matches_case_insensitively() {
        let voucher = VoucherCode {
            code: "WELCOME25".into(),
            amount: 25_000,
            used: false,
        };
        assert!(voucher.matches("welcome25"));
        assert!(voucher.matches(" Welcome25 "));
        assert!(!voucher.matches("WELCOME"));
    }
}
