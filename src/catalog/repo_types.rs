use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub brand: String,
    pub description: Option<String>,
    pub image_key: Option<String>, // object key in storage
    pub is_active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub struct Variant {
    pub id: Uuid,
    pub product_id: Uuid,
    pub sku: String,
    pub processor: String,
    pub ram_gb: i32,
    pub storage_gb: i32,
    pub storage_type: String,
    pub screen_inches: f64,
    pub gpu: Option<String>,
    pub color: Option<String>,
    pub price: i64, // Rupiah
    pub stock: i32,
    pub created_at: OffsetDateTime,
}

impl Variant {
    /// Short human label, e.g. `Intel Core i5-1235U / 16GB / 512GB SSD / 14"`.
    pub fn label(&self) -> String {
        let mut label = format!(
            "{} / {}GB / {} {} / {}\"",
            self.processor,
            self.ram_gb,
            format_storage(self.storage_gb),
            self.storage_type,
            self.screen_inches
        );
        if let Some(color) = self.color.as_deref() {
            label.push_str(" / ");
            label.push_str(color);
        }
        label
    }
}

fn format_storage(gb: i32) -> String {
    if gb >= 1024 && gb % 1024 == 0 {
        format!("{}TB", gb / 1024)
    } else {
        format!("{gb}GB")
    }
}

/// A product together with all of its variants.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub product: Product,
    pub variants: Vec<Variant>,
}

impl CatalogEntry {
    pub fn min_price(&self) -> Option<i64> {
        self.variants.iter().map(|v| v.price).min()
    }

    pub fn max_price(&self) -> Option<i64> {
        self.variants.iter().map(|v| v.price).max()
    }

    pub fn total_stock(&self) -> i64 {
        self.variants.iter().map(|v| i64::from(v.stock)).sum()
    }

    pub fn cheapest_variant(&self) -> Option<&Variant> {
        self.variants.iter().min_by_key(|v| v.price)
    }
}

/// Columns accepted when creating or replacing a variant.
#[derive(Debug, Clone)]
pub struct VariantFields {
    pub sku: String,
    pub processor: String,
    pub ram_gb: i32,
    pub storage_gb: i32,
    pub storage_type: String,
    pub screen_inches: f64,
    pub gpu: Option<String>,
    pub color: Option<String>,
    pub price: i64,
    pub stock: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_label_formats_terabytes() {
        let v = Variant {
            id: Uuid::nil(),
            product_id: Uuid::nil(),
            sku: "X".into(),
            processor: "AMD Ryzen 7 7840HS".into(),
            ram_gb: 32,
            storage_gb: 1024,
            storage_type: "SSD".into(),
            screen_inches: 16.0,
            gpu: None,
            color: Some("Hitam".into()),
            price: 1,
            stock: 1,
            created_at: OffsetDateTime::UNIX_EPOCH,
        };
        assert_eq!(v.label(), "AMD Ryzen 7 7840HS / 32GB / 1TB SSD / 16\" / Hitam");
    }
}
