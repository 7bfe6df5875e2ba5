use std::collections::HashMap;

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Order, OrderStatus};

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ProductPerformance {
    pub product_id: Option<Uuid>,
    pub name: String,
    pub total_sold: i64,
    pub revenue: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CustomerSpend {
    pub user_id: Option<Uuid>,
    pub name: String,
    pub email: String,
    pub total: i64,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Overview {
    pub total_revenue: i64,
    pub total_orders: i64,
    pub total_items: i64,
    pub average_order: i64,
    pub status_counts: Vec<StatusCount>,
    pub top_customers: Vec<CustomerSpend>,
    pub top_products: Vec<ProductPerformance>,
}

#[derive(Hash, PartialEq, Eq)]
enum ProductKey {
    Catalog(Uuid),
    Placeholder(String),
}

/// Units and revenue per product over every order, highest revenue first.
pub fn product_performance(orders: &[Order]) -> Vec<ProductPerformance> {
    let mut perf: HashMap<ProductKey, ProductPerformance> = HashMap::new();
    for item in orders.iter().flat_map(|o| o.items.iter()) {
        let key = match item.product_id {
            Some(id) => ProductKey::Catalog(id),
            None => ProductKey::Placeholder(item.name.clone()),
        };
        let entry = perf.entry(key).or_insert_with(|| ProductPerformance {
            product_id: item.product_id,
            name: item.name.clone(),
            total_sold: 0,
            revenue: 0,
        });
        entry.total_sold += i64::from(item.quantity);
        entry.revenue += item.subtotal();
    }
    let mut out: Vec<ProductPerformance> = perf.into_values().collect();
    out.sort_by(|a, b| b.revenue.cmp(&a.revenue).then_with(|| a.name.cmp(&b.name)));
    out
}

pub fn overview(orders: &[Order]) -> Overview {
    let total_revenue: i64 = orders.iter().map(|o| o.total).sum();
    let total_orders = orders.len() as i64;
    let total_items: i64 = orders.iter().map(Order::item_count).sum();
    let average_order = if total_orders > 0 {
        (total_revenue as f64 / total_orders as f64).round() as i64
    } else {
        0
    };

    let status_counts = OrderStatus::ALL
        .into_iter()
        .map(|status| StatusCount {
            status,
            count: orders.iter().filter(|o| o.status == status).count() as i64,
        })
        .collect();

    // walk-in orders have no account; group them by the recorded email
    let mut customers: HashMap<String, CustomerSpend> = HashMap::new();
    for order in orders {
        let key = order
            .user_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| order.user_email.clone());
        let entry = customers.entry(key).or_insert_with(|| CustomerSpend {
            user_id: order.user_id,
            name: order.user_name.clone(),
            email: order.user_email.clone(),
            total: 0,
            count: 0,
        });
        entry.total += order.total;
        entry.count += 1;
    }
    let mut top_customers: Vec<CustomerSpend> = customers.into_values().collect();
    top_customers.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(&b.name)));
    top_customers.truncate(5);

    let mut top_products = product_performance(orders);
    top_products.truncate(5);

    Overview {
        total_revenue,
        total_orders,
        total_items,
        average_order,
        status_counts,
        top_customers,
        top_products,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::{OrderItem, PaymentMethod};

    fn order(user: Option<Uuid>, email: &str, items: Vec<OrderItem>, status: OrderStatus) -> Order {
        let total = items.iter().map(OrderItem::subtotal).sum();
        Order {
            id: Uuid::new_v4(),
            user_id: user,
            user_name: email.split('@').next().unwrap_or_default().to_string(),
            user_email: email.to_string(),
            user_phone: None,
            user_address: None,
            items,
            attachments: Vec::new(),
            total,
            status,
            payment_method: PaymentMethod::Manual,
            stock_committed: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn item(product_id: Option<Uuid>, name: &str, price: i64, quantity: i32) -> OrderItem {
        OrderItem {
            product_id,
            name: name.into(),
            price,
            quantity,
        }
    }

    #[test]
    fn performance_groups_by_product_and_sorts_by_revenue() {
        let banner = Uuid::new_v4();
        let mug = Uuid::new_v4();
        let orders = vec![
            order(None, "a@x.id", vec![item(Some(banner), "Banner", 50_000, 2)], OrderStatus::Baru),
            order(
                None,
                "b@x.id",
                vec![
                    item(Some(banner), "Banner", 50_000, 1),
                    item(Some(mug), "Mug", 30_000, 1),
                ],
                OrderStatus::Selesai,
            ),
        ];
        let perf = product_performance(&orders);
        assert_eq!(perf.len(), 2);
        assert_eq!(perf[0].product_id, Some(banner));
        assert_eq!(perf[0].total_sold, 3);
        assert_eq!(perf[0].revenue, 150_000);
        assert_eq!(perf[1].revenue, 30_000);
    }

    #[test]
    fn overview_counts_every_status_and_ranks_customers() {
        let alice = Uuid::new_v4();
        let orders = vec![
            order(Some(alice), "alice@x.id", vec![item(None, "Offline", 10_000, 1)], OrderStatus::Baru),
            order(Some(alice), "alice@x.id", vec![item(None, "Offline", 20_000, 1)], OrderStatus::Dikirim),
            order(None, "offline@zonaprint.com", vec![item(None, "Offline", 5_000, 3)], OrderStatus::Selesai),
        ];
        let view = overview(&orders);
        assert_eq!(view.total_revenue, 45_000);
        assert_eq!(view.total_orders, 3);
        assert_eq!(view.total_items, 5);
        assert_eq!(view.average_order, 15_000);
        assert_eq!(view.status_counts.len(), 5);
        assert_eq!(view.status_counts[0].count, 1);
        assert_eq!(view.status_counts[1].count, 0);
        assert_eq!(view.top_customers[0].user_id, Some(alice));
        assert_eq!(view.top_customers[0].count, 2);
        assert_eq!(view.top_customers[1].email, "offline@zonaprint.com");
    }

    #[test]
    fn overview_of_nothing_is_zero() {
        let view = overview(&[]);
        assert_eq!(view.average_order, 0);
        assert!(view.top_customers.is_empty());
    }
}
