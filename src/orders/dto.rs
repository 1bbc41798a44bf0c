use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Order, OrderItem, OrderListRow};
use super::status::{Actor, OrderStatus, PaymentMethod};

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CheckoutItem {
    pub variant_id: Uuid,
    pub quantity: i32,
}

/// Checkout body. Without `items` the whole cart is ordered; missing
/// shipping fields fall back to the buyer's profile.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub items: Option<Vec<CheckoutItem>>,
    pub recipient_name: Option<String>,
    pub phone: Option<String>,
    pub shipping_address: Option<String>,
    pub note: Option<String>,
    pub payment_method: PaymentMethod,
    pub payment_reference: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MyOrdersQuery {
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Deserialize)]
pub struct AdminOrdersQuery {
    pub status: Option<OrderStatus>,
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OrderItemView {
    pub id: Uuid,
    pub variant_id: Uuid,
    pub product_name: String,
    pub variant_label: String,
    pub unit_price: i64,
    pub quantity: i32,
    pub line_total: i64,
}

impl From<&OrderItem> for OrderItemView {
    fn from(i: &OrderItem) -> Self {
        Self {
            id: i.id,
            variant_id: i.variant_id,
            product_name: i.product_name.clone(),
            variant_label: i.variant_label.clone(),
            unit_price: i.unit_price,
            quantity: i.quantity,
            line_total: i.line_total(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderView {
    pub id: Uuid,
    pub code: String,
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_method_label: &'static str,
    pub payment_reference: Option<String>,
    pub recipient_name: String,
    pub phone: String,
    pub shipping_address: String,
    pub note: Option<String>,
    pub total: i64,
    pub cancel_reason: Option<String>,
    pub items: Vec<OrderItemView>,
    /// Statuses the viewer may move this order to.
    pub next_statuses: &'static [OrderStatus],
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl OrderView {
    pub fn new(order: Order, items: &[OrderItem], viewer: Actor) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            status: order.status,
            payment_method: order.payment_method,
            payment_method_label: order.payment_method.label(),
            payment_reference: order.payment_reference,
            recipient_name: order.recipient_name,
            phone: order.phone,
            shipping_address: order.shipping_address,
            note: order.note,
            total: order.total,
            cancel_reason: order.cancel_reason,
            items: items.iter().map(OrderItemView::from).collect(),
            next_statuses: order.status.next(viewer),
            created_at: order.created_at,
            updated_at: order.updated_at,
            code: order.code,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderSummaryView {
    pub id: Uuid,
    pub code: String,
    pub username: String,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub total: i64,
    pub item_count: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<OrderListRow> for OrderSummaryView {
    fn from(row: OrderListRow) -> Self {
        Self {
            id: row.order.id,
            code: row.order.code,
            username: row.username,
            status: row.order.status,
            payment_method: row.order.payment_method,
            total: row.order.total,
            item_count: row.item_count,
            created_at: row.order.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn order(status: OrderStatus) -> Order {
        Order {
            id: Uuid::new_v4(),
            code: "INV-20240501-ABC123".into(),
            user_id: Uuid::new_v4(),
            status,
            payment_method: PaymentMethod::Wallet,
            payment_reference: None,
            recipient_name: "Budi".into(),
            phone: "081234567890".into(),
            shipping_address: "Jl. Merdeka 1".into(),
            note: None,
            total: 30_000_000,
            cancel_reason: None,
            created_at: datetime!(2024-05-01 10:00 UTC),
            updated_at: datetime!(2024-05-01 10:00 UTC),
        }
    }

    #[test]
    fn view_lists_next_statuses_for_viewer() {
        let o = order(OrderStatus::MenungguKonfirmasi);
        let admin = OrderView::new(o.clone(), &[], Actor::Admin);
        assert_eq!(
            admin.next_statuses,
            &[OrderStatus::Diproses, OrderStatus::Dibatalkan]
        );
        let customer = OrderView::new(o, &[], Actor::Customer);
        assert_eq!(customer.next_statuses, &[OrderStatus::Dibatalkan]);
    }

    #[test]
    fn view_computes_line_totals() {
        let o = order(OrderStatus::Diproses);
        let item = OrderItem {
            id: Uuid::new_v4(),
            order_id: o.id,
            variant_id: Uuid::new_v4(),
            product_name: "ThinkPad X1".into(),
            variant_label: "Intel Core i7 / 16GB".into(),
            unit_price: 15_000_000,
            quantity: 2,
        };
        let view = OrderView::new(o, &[item], Actor::Customer);
        assert_eq!(view.items[0].line_total, 30_000_000);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["status"], "Diproses");
        assert_eq!(json["payment_method"], "wallet");
        assert_eq!(json["payment_method_label"], "Saldo");
    }

    #[test]
    fn status_filter_parses_from_query_string() {
        let uri: axum::http::Uri = "/admin/orders?status=Dalam+Pengiriman&q=INV".parse().unwrap();
        let axum::extract::Query(q) = axum::extract::Query::<AdminOrdersQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(q.status, Some(OrderStatus::DalamPengiriman));
        assert_eq!(q.q.as_deref(), Some("INV"));
    }
}
