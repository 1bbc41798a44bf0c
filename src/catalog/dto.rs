use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::filter::{Bucket, Facets, GroupBy, ProcessorFamily, SortOrder};
use super::repo_types::{CatalogEntry, Variant, VariantFields};

/// Query string for the product listing. Facet values are comma-separated slugs.
#[derive(Debug, Deserialize, Default)]
pub struct ListQuery {
    pub q: Option<String>,
    pub brand: Option<String>,
    pub processor: Option<String>,
    pub ram: Option<String>,
    pub storage: Option<String>,
    pub price: Option<String>,
    pub screen: Option<String>,
    #[serde(default)]
    pub sort: SortOrder,
    pub group_by: Option<GroupBy>,
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_per_page")]
    pub per_page: usize,
}

fn default_page() -> usize {
    1
}
fn default_per_page() -> usize {
    12
}

pub const MAX_PER_PAGE: usize = 60;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct VariantView {
    pub id: Uuid,
    pub sku: String,
    pub label: String,
    pub processor: String,
    pub processor_family: &'static str,
    pub ram_gb: i32,
    pub storage_gb: i32,
    pub storage_type: String,
    pub screen_inches: f64,
    pub gpu: Option<String>,
    pub color: Option<String>,
    pub price: i64,
    pub stock: i32,
    pub in_stock: bool,
}

impl From<&Variant> for VariantView {
    fn from(v: &Variant) -> Self {
        Self {
            id: v.id,
            sku: v.sku.clone(),
            label: v.label(),
            processor: v.processor.clone(),
            processor_family: ProcessorFamily::classify(&v.processor).label(),
            ram_gb: v.ram_gb,
            storage_gb: v.storage_gb,
            storage_type: v.storage_type.clone(),
            screen_inches: v.screen_inches,
            gpu: v.gpu.clone(),
            color: v.color.clone(),
            price: v.price,
            stock: v.stock,
            in_stock: v.stock > 0,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    pub brand: String,
    pub image_url: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub total_stock: i64,
    pub variant_count: usize,
    pub is_active: bool,
}

impl ProductSummary {
    pub fn new(entry: &CatalogEntry, image_url: Option<String>) -> Self {
        Self {
            id: entry.product.id,
            name: entry.product.name.clone(),
            brand: entry.product.brand.clone(),
            image_url,
            min_price: entry.min_price(),
            max_price: entry.max_price(),
            total_stock: entry.total_stock(),
            variant_count: entry.variants.len(),
            is_active: entry.product.is_active,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub summary: ProductSummary,
    pub description: Option<String>,
    pub variants: Vec<VariantView>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl ProductDetail {
    pub fn new(entry: &CatalogEntry, image_url: Option<String>) -> Self {
        Self {
            summary: ProductSummary::new(entry, image_url),
            description: entry.product.description.clone(),
            variants: entry.variants.iter().map(VariantView::from).collect(),
            created_at: entry.product.created_at,
            updated_at: entry.product.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProductGroup {
    pub label: String,
    pub product_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ProductListResponse {
    pub items: Vec<ProductSummary>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub facets: Facets,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<ProductGroup>>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct SearchHit {
    pub id: Uuid,
    pub name: String,
    pub brand: String,
    pub min_price: Option<i64>,
}

// --- admin payloads ---

#[derive(Debug, Deserialize)]
pub struct VariantInput {
    pub sku: String,
    pub processor: String,
    pub ram_gb: i32,
    pub storage_gb: i32,
    #[serde(default = "default_storage_type")]
    pub storage_type: String,
    pub screen_inches: f64,
    pub gpu: Option<String>,
    pub color: Option<String>,
    pub price: i64,
    #[serde(default)]
    pub stock: i32,
}

fn default_storage_type() -> String {
    "SSD".into()
}

const STORAGE_TYPES: [&str; 3] = ["SSD", "HDD", "eMMC"];

impl VariantInput {
    /// Validates and normalizes into column values.
    pub fn into_fields(self) -> Result<VariantFields, String> {
        let sku = self.sku.trim().to_uppercase();
        if sku.is_empty() {
            return Err("SKU wajib diisi".into());
        }
        let processor = self.processor.trim().to_string();
        if processor.is_empty() {
            return Err("Prosesor wajib diisi".into());
        }
        if self.ram_gb <= 0 || self.storage_gb <= 0 {
            return Err("RAM dan penyimpanan harus lebih dari 0".into());
        }
        let Some(storage_type) = STORAGE_TYPES
            .iter()
            .find(|t| t.eq_ignore_ascii_case(self.storage_type.trim()))
        else {
            return Err("Jenis penyimpanan harus SSD, HDD, atau eMMC".into());
        };
        if !(7.0..=25.0).contains(&self.screen_inches) {
            return Err("Ukuran layar tidak valid".into());
        }
        if self.price <= 0 {
            return Err("Harga harus lebih dari 0".into());
        }
        if self.stock < 0 {
            return Err("Stok tidak boleh negatif".into());
        }
        let clean = |s: Option<String>| s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        Ok(VariantFields {
            sku,
            processor,
            ram_gb: self.ram_gb,
            storage_gb: self.storage_gb,
            storage_type: (*storage_type).to_string(),
            screen_inches: self.screen_inches,
            gpu: clean(self.gpu),
            color: clean(self.color),
            price: self.price,
            stock: self.stock,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub brand: String,
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub variants: Vec<VariantInput>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct SetStockRequest {
    pub stock: i32,
}

#[derive(Debug, Deserialize, Default)]
pub struct AdminListQuery {
    pub q: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> VariantInput {
        VariantInput {
            sku: " tp-x1-i7 ".into(),
            processor: "Intel Core i7-1365U".into(),
            ram_gb: 16,
            storage_gb: 512,
            storage_type: "ssd".into(),
            screen_inches: 14.0,
            gpu: Some("  ".into()),
            color: Some("Hitam".into()),
            price: 25_000_000,
            stock: 2,
        }
    }

    #[test]
    fn variant_input_normalizes() {
        let f = input().into_fields().unwrap();
        assert_eq!(f.sku, "TP-X1-I7");
        assert_eq!(f.storage_type, "SSD");
        assert_eq!(f.gpu, None);
        assert_eq!(f.color.as_deref(), Some("Hitam"));
    }

    #[test]
    fn variant_input_rejects_bad_values() {
        let mut bad = input();
        bad.price = 0;
        assert!(bad.into_fields().is_err());

        let mut bad = input();
        bad.stock = -1;
        assert!(bad.into_fields().is_err());

        let mut bad = input();
        bad.storage_type = "NVMe tape".into();
        assert!(bad.into_fields().is_err());

        let mut bad = input();
        bad.screen_inches = 40.0;
        assert!(bad.into_fields().is_err());
    }
}
