use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo::CartLineRow;
use crate::orders::services::MAX_LINE_QUANTITY;

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub variant_id: Uuid,
    #[serde(default = "one")]
    pub quantity: i32,
}

fn one() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: i32,
}

#[derive(Debug, Serialize)]
pub struct CartLineView {
    pub variant_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub brand: String,
    pub variant_label: String,
    pub image_url: Option<String>,
    pub unit_price: i64,
    pub quantity: i32,
    pub line_total: i64,
    pub stock: i32,
    /// False when the product is inactive, the quantity is over the per-order
    /// limit, or stock is below the quantity.
    pub available: bool,
}

impl CartLineView {
    pub fn new(row: &CartLineRow, image_url: Option<String>) -> Self {
        Self {
            variant_id: row.variant.id,
            product_id: row.variant.product_id,
            product_name: row.product_name.clone(),
            brand: row.brand.clone(),
            variant_label: row.variant.label(),
            image_url,
            unit_price: row.variant.price,
            quantity: row.quantity,
            line_total: row.variant.price.saturating_mul(i64::from(row.quantity)),
            stock: row.variant.stock,
            available: row.is_active
                && row.quantity <= MAX_LINE_QUANTITY
                && row.variant.stock >= row.quantity,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub total_quantity: i64,
    pub total: i64,
    /// True when every line can be checked out as-is.
    pub checkout_ready: bool,
}

impl CartView {
    pub fn from_lines(items: Vec<CartLineView>) -> Self {
        let total_quantity = items.iter().map(|l| i64::from(l.quantity)).sum();
        let total = items
            .iter()
            .fold(0i64, |acc, l| acc.saturating_add(l.line_total));
        let checkout_ready = !items.is_empty() && items.iter().all(|l| l.available);
        Self {
            items,
            total_quantity,
            total,
            checkout_ready,
        }
    }
}
