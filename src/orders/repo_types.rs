use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use super::status::{OrderStatus, PaymentMethod};

#[derive(Debug, Clone, FromRow)]
pub struct Order {
    pub id: Uuid,
    pub code: String, // INV-YYYYMMDD-XXXXXX
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_reference: Option<String>,
    pub recipient_name: String,
    pub phone: String,
    pub shipping_address: String,
    pub note: Option<String>,
    pub total: i64,
    pub cancel_reason: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Line snapshot taken at checkout; later catalog edits do not change it.
#[derive(Debug, Clone, FromRow)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub variant_id: Uuid,
    pub product_name: String,
    pub variant_label: String,
    pub unit_price: i64,
    pub quantity: i32,
}

impl OrderItem {
    pub fn line_total(&self) -> i64 {
        self.unit_price * i64::from(self.quantity)
    }
}

/// Order row for listings.
#[derive(Debug, Clone, FromRow)]
pub struct OrderListRow {
    #[sqlx(flatten)]
    pub order: Order,
    pub username: String,
    pub item_count: i64,
}

/// Variant state read under lock during checkout.
#[derive(Debug, Clone, FromRow)]
pub struct LockedVariant {
    #[sqlx(flatten)]
    pub variant: crate::catalog::repo_types::Variant,
    pub product_name: String,
    pub is_active: bool,
}

pub struct NewOrder<'a> {
    pub code: &'a str,
    pub user_id: Uuid,
    pub payment_method: PaymentMethod,
    pub payment_reference: Option<&'a str>,
    pub recipient_name: &'a str,
    pub phone: &'a str,
    pub shipping_address: &'a str,
    pub note: Option<&'a str>,
    pub total: i64,
}

#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub variant_id: Uuid,
    pub product_name: String,
    pub variant_label: String,
    pub unit_price: i64,
    pub quantity: i32,
}
