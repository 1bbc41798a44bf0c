//! Catalog facets: display buckets for laptop specs, facet selection,
//! matching, counting, sorting and grouping.
//!
//! A product matches a selection when at least one of its variants falls in
//! one of the selected buckets of every non-empty facet (OR within a facet,
//! AND across facets). Brand and free text are product-level.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::repo_types::{CatalogEntry, Variant};

/// A closed set of display categories addressed by URL slug.
pub trait Bucket: Copy + Eq + 'static {
    fn all() -> &'static [Self];
    fn slug(&self) -> &'static str;
    fn label(&self) -> &'static str;

    fn from_slug(slug: &str) -> Option<Self> {
        Self::all().iter().copied().find(|b| b.slug() == slug)
    }
}

macro_rules! buckets {
    ($name:ident { $($variant:ident => ($slug:literal, $label:literal)),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name { $($variant),+ }

        impl Bucket for $name {
            fn all() -> &'static [Self] {
                &[$(Self::$variant),+]
            }
            fn slug(&self) -> &'static str {
                match self { $(Self::$variant => $slug),+ }
            }
            fn label(&self) -> &'static str {
                match self { $(Self::$variant => $label),+ }
            }
        }
    };
}

buckets!(ProcessorFamily {
    IntelCoreI3 => ("intel-i3", "Intel Core i3"),
    IntelCoreI5 => ("intel-i5", "Intel Core i5"),
    IntelCoreI7 => ("intel-i7", "Intel Core i7"),
    IntelCoreI9 => ("intel-i9", "Intel Core i9"),
    IntelCoreUltra => ("intel-ultra", "Intel Core Ultra"),
    IntelCeleronPentium => ("intel-celeron", "Intel Celeron/Pentium"),
    Ryzen3 => ("amd-r3", "AMD Ryzen 3"),
    Ryzen5 => ("amd-r5", "AMD Ryzen 5"),
    Ryzen7 => ("amd-r7", "AMD Ryzen 7"),
    Ryzen9 => ("amd-r9", "AMD Ryzen 9"),
    AppleM => ("apple-m", "Apple M"),
    Other => ("other", "Lainnya"),
});

buckets!(RamBucket {
    UpTo4 => ("4gb", "≤ 4 GB"),
    Gb8 => ("8gb", "8 GB"),
    Gb16 => ("16gb", "16 GB"),
    Gb32Plus => ("32gb", "≥ 32 GB"),
});

buckets!(StorageBucket {
    UpTo256 => ("256gb", "≤ 256 GB"),
    Gb512 => ("512gb", "512 GB"),
    Tb1 => ("1tb", "1 TB"),
    Above1Tb => ("2tb", "> 1 TB"),
});

buckets!(PriceBucket {
    Under5 => ("lt5", "< 5 juta"),
    From5To10 => ("5-10", "5–10 juta"),
    From10To15 => ("10-15", "10–15 juta"),
    From15To20 => ("15-20", "15–20 juta"),
    Above20 => ("gt20", "> 20 juta"),
});

buckets!(ScreenBucket {
    Under13 => ("lt13", "< 13\""),
    From13 => ("13-14", "13–14.9\""),
    From15 => ("15-16", "15–16.9\""),
    From17 => ("17plus", "≥ 17\""),
});

lazy_static! {
    static ref APPLE_RE: Regex = Regex::new(r"\bapple\b").unwrap();
    // Bare chip names such as "M2 Pro"; Intel Core m3/m5/m7 share the pattern.
    static ref BARE_M_RE: Regex = Regex::new(r"^m[1-9]\b").unwrap();
    static ref CORE_I_RE: Regex = Regex::new(r"\bi([3579])\b").unwrap();
    static ref RYZEN_RE: Regex =
        Regex::new(r"ryzen\s*(?:ai\s*)?(?:pro\s*)?([3579])\b").unwrap();
}

impl ProcessorFamily {
    pub fn classify(processor: &str) -> Self {
        let p = processor.to_lowercase();
        let intel = p.contains("intel") || p.contains("core");
        if APPLE_RE.is_match(&p) || (!intel && BARE_M_RE.is_match(&p)) {
            return Self::AppleM;
        }
        if p.contains("celeron") || p.contains("pentium") {
            return Self::IntelCeleronPentium;
        }
        if p.contains("ultra") && intel {
            return Self::IntelCoreUltra;
        }
        if let Some(caps) = RYZEN_RE.captures(&p) {
            return match &caps[1] {
                "3" => Self::Ryzen3,
                "5" => Self::Ryzen5,
                "7" => Self::Ryzen7,
                _ => Self::Ryzen9,
            };
        }
        if let Some(caps) = CORE_I_RE.captures(&p) {
            return match &caps[1] {
                "3" => Self::IntelCoreI3,
                "5" => Self::IntelCoreI5,
                "7" => Self::IntelCoreI7,
                _ => Self::IntelCoreI9,
            };
        }
        Self::Other
    }
}

impl RamBucket {
    pub fn classify(gb: i32) -> Self {
        match gb {
            i32::MIN..=4 => Self::UpTo4,
            5..=8 => Self::Gb8,
            9..=16 => Self::Gb16,
            _ => Self::Gb32Plus,
        }
    }
}

impl StorageBucket {
    pub fn classify(gb: i32) -> Self {
        match gb {
            i32::MIN..=256 => Self::UpTo256,
            257..=512 => Self::Gb512,
            513..=1024 => Self::Tb1,
            _ => Self::Above1Tb,
        }
    }
}

const JUTA: i64 = 1_000_000;

impl PriceBucket {
    pub fn classify(price: i64) -> Self {
        match price {
            p if p < 5 * JUTA => Self::Under5,
            p if p < 10 * JUTA => Self::From5To10,
            p if p < 15 * JUTA => Self::From10To15,
            p if p < 20 * JUTA => Self::From15To20,
            _ => Self::Above20,
        }
    }
}

impl ScreenBucket {
    pub fn classify(inches: f64) -> Self {
        if inches < 13.0 {
            Self::Under13
        } else if inches < 15.0 {
            Self::From13
        } else if inches < 17.0 {
            Self::From15
        } else {
            Self::From17
        }
    }
}

/// Parses a comma-separated list of slugs; unknown slugs are reported back.
pub fn parse_slugs<B: Bucket>(raw: Option<&str>) -> Result<Vec<B>, String> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| B::from_slug(s).ok_or_else(|| s.to_string()))
        .collect()
}

/// Active facet selection.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub q: Option<String>,
    pub brand: Vec<String>,
    pub processor: Vec<ProcessorFamily>,
    pub ram: Vec<RamBucket>,
    pub storage: Vec<StorageBucket>,
    pub price: Vec<PriceBucket>,
    pub screen: Vec<ScreenBucket>,
}

fn admits<T: PartialEq>(selected: &[T], value: T) -> bool {
    selected.is_empty() || selected.contains(&value)
}

impl Selection {
    pub fn variant_matches(&self, v: &Variant) -> bool {
        admits(&self.processor, ProcessorFamily::classify(&v.processor))
            && admits(&self.ram, RamBucket::classify(v.ram_gb))
            && admits(&self.storage, StorageBucket::classify(v.storage_gb))
            && admits(&self.price, PriceBucket::classify(v.price))
            && admits(&self.screen, ScreenBucket::classify(v.screen_inches))
    }

    pub fn text_matches(&self, entry: &CatalogEntry) -> bool {
        let Some(q) = self.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) else {
            return true;
        };
        let q = q.to_lowercase();
        let p = &entry.product;
        p.name.to_lowercase().contains(&q)
            || p.brand.to_lowercase().contains(&q)
            || entry.variants.iter().any(|v| {
                v.processor.to_lowercase().contains(&q)
                    || v.gpu.as_deref().is_some_and(|g| g.to_lowercase().contains(&q))
            })
    }

    pub fn brand_matches(&self, entry: &CatalogEntry) -> bool {
        self.brand.is_empty()
            || self
                .brand
                .iter()
                .any(|b| b.eq_ignore_ascii_case(&entry.product.brand))
    }

    pub fn matches(&self, entry: &CatalogEntry) -> bool {
        self.text_matches(entry)
            && self.brand_matches(entry)
            && entry.variants.iter().any(|v| self.variant_matches(v))
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FacetCount {
    pub slug: String,
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct Facets {
    pub brand: Vec<FacetCount>,
    pub processor: Vec<FacetCount>,
    pub ram: Vec<FacetCount>,
    pub storage: Vec<FacetCount>,
    pub price: Vec<FacetCount>,
    pub screen: Vec<FacetCount>,
}

/// Number of entries having at least one variant in each bucket.
fn bucket_counts<B: Bucket>(
    entries: &[&CatalogEntry],
    classify: impl Fn(&Variant) -> B,
) -> Vec<FacetCount> {
    B::all()
        .iter()
        .map(|b| FacetCount {
            slug: b.slug().to_string(),
            label: b.label().to_string(),
            count: entries
                .iter()
                .filter(|e| e.variants.iter().any(|v| classify(v) == *b))
                .count(),
        })
        .collect()
}

/// Facet counts over entries matching the free-text query only.
pub fn facet_counts(entries: &[CatalogEntry], selection: &Selection) -> Facets {
    let base: Vec<&CatalogEntry> = entries
        .iter()
        .filter(|e| selection.text_matches(e))
        .collect();

    let mut brands: BTreeMap<String, usize> = BTreeMap::new();
    for e in &base {
        *brands.entry(e.product.brand.clone()).or_default() += 1;
    }

    Facets {
        brand: brands
            .into_iter()
            .map(|(brand, count)| FacetCount {
                slug: brand.to_lowercase(),
                label: brand,
                count,
            })
            .collect(),
        processor: bucket_counts(&base, |v| ProcessorFamily::classify(&v.processor)),
        ram: bucket_counts(&base, |v| RamBucket::classify(v.ram_gb)),
        storage: bucket_counts(&base, |v| StorageBucket::classify(v.storage_gb)),
        price: bucket_counts(&base, |v| PriceBucket::classify(v.price)),
        screen: bucket_counts(&base, |v| ScreenBucket::classify(v.screen_inches)),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Name,
}

pub fn sort_entries(entries: &mut [CatalogEntry], order: SortOrder) {
    match order {
        SortOrder::Newest => entries.sort_by(|a, b| b.product.created_at.cmp(&a.product.created_at)),
        SortOrder::PriceAsc => entries.sort_by_key(|e| e.min_price().unwrap_or(i64::MAX)),
        SortOrder::PriceDesc => {
            entries.sort_by_key(|e| std::cmp::Reverse(e.min_price().unwrap_or(i64::MIN)))
        }
        SortOrder::Name => entries.sort_by_key(|e| e.product.name.to_lowercase()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    Processor,
    Brand,
}

/// Groups entries (by index) under display labels, keeping input order inside
/// each group. Processor groups follow bucket order and use the cheapest
/// variant's family; brand groups are alphabetical.
pub fn group_indices(entries: &[CatalogEntry], by: GroupBy) -> Vec<(String, Vec<usize>)> {
    match by {
        GroupBy::Processor => ProcessorFamily::all()
            .iter()
            .filter_map(|family| {
                let idx: Vec<usize> = entries
                    .iter()
                    .enumerate()
                    .filter(|(_, e)| {
                        e.cheapest_variant()
                            .is_some_and(|v| ProcessorFamily::classify(&v.processor) == *family)
                    })
                    .map(|(i, _)| i)
                    .collect();
                (!idx.is_empty()).then(|| (family.label().to_string(), idx))
            })
            .collect(),
        GroupBy::Brand => {
            let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
            for (i, e) in entries.iter().enumerate() {
                groups.entry(e.product.brand.clone()).or_default().push(i);
            }
            groups.into_iter().collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::repo_types::Product;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn variant(processor: &str, ram: i32, storage: i32, screen: f64, price: i64) -> Variant {
        Variant {
            id: Uuid::new_v4(),
            product_id: Uuid::nil(),
            sku: format!("SKU-{processor}-{ram}"),
            processor: processor.into(),
            ram_gb: ram,
            storage_gb: storage,
            storage_type: "SSD".into(),
            screen_inches: screen,
            gpu: None,
            color: None,
            price,
            stock: 3,
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    fn entry(name: &str, brand: &str, created: i64, variants: Vec<Variant>) -> CatalogEntry {
        CatalogEntry {
            product: Product {
                id: Uuid::new_v4(),
                name: name.into(),
                brand: brand.into(),
                description: None,
                image_key: None,
                is_active: true,
                created_at: OffsetDateTime::from_unix_timestamp(created).unwrap(),
                updated_at: OffsetDateTime::UNIX_EPOCH,
            },
            variants,
        }
    }

    fn sample() -> Vec<CatalogEntry> {
        vec![
            entry(
                "IdeaPad Slim 3",
                "Lenovo",
                100,
                vec![
                    variant("Intel Core i5-1235U", 8, 512, 14.0, 8_499_000),
                    variant("Intel Core i7-1255U", 16, 512, 14.0, 11_999_000),
                ],
            ),
            entry(
                "ROG Strix G16",
                "ASUS",
                300,
                vec![variant("Intel Core i9-13980HX", 32, 1024, 16.0, 32_999_000)],
            ),
            entry(
                "MacBook Air 13",
                "Apple",
                200,
                vec![variant("Apple M2", 8, 256, 13.6, 15_999_000)],
            ),
            entry(
                "Vivobook Go 14",
                "ASUS",
                50,
                vec![variant("AMD Ryzen 3 7320U", 4, 256, 14.0, 4_999_000)],
            ),
        ]
    }

    #[test]
    fn classifies_processors() {
        use ProcessorFamily::*;
        assert_eq!(ProcessorFamily::classify("Intel Core i5-1235U"), IntelCoreI5);
        assert_eq!(ProcessorFamily::classify("Core i7 12700H"), IntelCoreI7);
        assert_eq!(ProcessorFamily::classify("Intel Core Ultra 7 155H"), IntelCoreUltra);
        assert_eq!(ProcessorFamily::classify("Intel Celeron N4500"), IntelCeleronPentium);
        assert_eq!(ProcessorFamily::classify("Intel Pentium Silver N6000"), IntelCeleronPentium);
        assert_eq!(ProcessorFamily::classify("AMD Ryzen 5 7530U"), Ryzen5);
        assert_eq!(ProcessorFamily::classify("Ryzen 9 7940HS"), Ryzen9);
        assert_eq!(ProcessorFamily::classify("Apple M3 Pro"), AppleM);
        assert_eq!(ProcessorFamily::classify("M1"), AppleM);
        assert_eq!(ProcessorFamily::classify("M2 Pro"), AppleM);
        assert_eq!(ProcessorFamily::classify("Intel Core m3-8100Y"), Other);
        assert_eq!(ProcessorFamily::classify("Intel Core m5-6Y54"), Other);
        assert_eq!(ProcessorFamily::classify("AMD Ryzen AI 9 HX 370"), Ryzen9);
        assert_eq!(ProcessorFamily::classify("AMD Ryzen AI 7 350"), Ryzen7);
        assert_eq!(ProcessorFamily::classify("AMD Ryzen 7 PRO 7840U"), Ryzen7);
        assert_eq!(ProcessorFamily::classify("MediaTek Kompanio 520"), Other);
    }

    #[test]
    fn ram_and_storage_boundaries() {
        assert_eq!(RamBucket::classify(4), RamBucket::UpTo4);
        assert_eq!(RamBucket::classify(6), RamBucket::Gb8);
        assert_eq!(RamBucket::classify(8), RamBucket::Gb8);
        assert_eq!(RamBucket::classify(12), RamBucket::Gb16);
        assert_eq!(RamBucket::classify(16), RamBucket::Gb16);
        assert_eq!(RamBucket::classify(24), RamBucket::Gb32Plus);

        assert_eq!(StorageBucket::classify(128), StorageBucket::UpTo256);
        assert_eq!(StorageBucket::classify(256), StorageBucket::UpTo256);
        assert_eq!(StorageBucket::classify(512), StorageBucket::Gb512);
        assert_eq!(StorageBucket::classify(1024), StorageBucket::Tb1);
        assert_eq!(StorageBucket::classify(2048), StorageBucket::Above1Tb);
    }

    #[test]
    fn price_lower_bound_inclusive() {
        assert_eq!(PriceBucket::classify(4_999_999), PriceBucket::Under5);
        assert_eq!(PriceBucket::classify(5_000_000), PriceBucket::From5To10);
        assert_eq!(PriceBucket::classify(10_000_000), PriceBucket::From10To15);
        assert_eq!(PriceBucket::classify(19_999_999), PriceBucket::From15To20);
        assert_eq!(PriceBucket::classify(20_000_000), PriceBucket::Above20);
    }

    #[test]
    fn screen_boundaries() {
        assert_eq!(ScreenBucket::classify(11.6), ScreenBucket::Under13);
        assert_eq!(ScreenBucket::classify(13.0), ScreenBucket::From13);
        assert_eq!(ScreenBucket::classify(14.9), ScreenBucket::From13);
        assert_eq!(ScreenBucket::classify(15.6), ScreenBucket::From15);
        assert_eq!(ScreenBucket::classify(17.3), ScreenBucket::From17);
    }

    #[test]
    fn parse_slugs_reports_unknown() {
        let ok: Vec<RamBucket> = parse_slugs(Some("8gb, 16gb,")).unwrap();
        assert_eq!(ok, vec![RamBucket::Gb8, RamBucket::Gb16]);
        let none: Vec<RamBucket> = parse_slugs(None).unwrap();
        assert!(none.is_empty());
        let err = parse_slugs::<RamBucket>(Some("8gb,64gb")).unwrap_err();
        assert_eq!(err, "64gb");
    }

    #[test]
    fn or_within_facet_and_across_facets() {
        let entries = sample();
        let sel = Selection {
            processor: vec![ProcessorFamily::IntelCoreI7, ProcessorFamily::AppleM],
            ..Default::default()
        };
        let names: Vec<&str> = entries
            .iter()
            .filter(|e| sel.matches(e))
            .map(|e| e.product.name.as_str())
            .collect();
        assert_eq!(names, vec!["IdeaPad Slim 3", "MacBook Air 13"]);

        // i7 variant is 16GB; the 8GB variant is i5, so no single variant satisfies both.
        let sel = Selection {
            processor: vec![ProcessorFamily::IntelCoreI7],
            ram: vec![RamBucket::Gb8],
            ..Default::default()
        };
        assert!(!entries.iter().any(|e| sel.matches(e)));
    }

    #[test]
    fn brand_and_text_filters() {
        let entries = sample();
        let sel = Selection {
            brand: vec!["asus".into()],
            q: Some("ryzen".into()),
            ..Default::default()
        };
        let names: Vec<&str> = entries
            .iter()
            .filter(|e| sel.matches(e))
            .map(|e| e.product.name.as_str())
            .collect();
        assert_eq!(names, vec!["Vivobook Go 14"]);
    }

    #[test]
    fn facet_counts_ignore_facet_selection_but_honor_text() {
        let entries = sample();
        let sel = Selection {
            ram: vec![RamBucket::Gb32Plus],
            ..Default::default()
        };
        let facets = facet_counts(&entries, &sel);
        let ram8 = facets.ram.iter().find(|f| f.slug == "8gb").unwrap();
        assert_eq!(ram8.count, 2);
        let asus = facets.brand.iter().find(|f| f.label == "ASUS").unwrap();
        assert_eq!(asus.count, 2);

        let sel = Selection {
            q: Some("macbook".into()),
            ..Default::default()
        };
        let facets = facet_counts(&entries, &sel);
        assert_eq!(facets.brand.len(), 1);
        let apple = facets.processor.iter().find(|f| f.slug == "apple-m").unwrap();
        assert_eq!(apple.count, 1);
    }

    #[test]
    fn sorts_by_min_price_and_recency() {
        let mut entries = sample();
        sort_entries(&mut entries, SortOrder::PriceAsc);
        assert_eq!(entries[0].product.name, "Vivobook Go 14");
        assert_eq!(entries[3].product.name, "ROG Strix G16");

        sort_entries(&mut entries, SortOrder::PriceDesc);
        assert_eq!(entries[0].product.name, "ROG Strix G16");

        sort_entries(&mut entries, SortOrder::Newest);
        assert_eq!(entries[0].product.name, "ROG Strix G16");
        assert_eq!(entries[1].product.name, "MacBook Air 13");

        sort_entries(&mut entries, SortOrder::Name);
        assert_eq!(entries[0].product.name, "IdeaPad Slim 3");
    }

    #[test]
    fn groups_by_processor_in_bucket_order() {
        let entries = sample();
        let groups = group_indices(&entries, GroupBy::Processor);
        let labels: Vec<&str> = groups.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(
            labels,
            vec!["Intel Core i5", "Intel Core i9", "AMD Ryzen 3", "Apple M"]
        );
    }

    #[test]
    fn groups_by_brand_alphabetically() {
        let entries = sample();
        let groups = group_indices(&entries, GroupBy::Brand);
        assert_eq!(groups[0].0, "ASUS");
        assert_eq!(groups[0].1, vec![1, 3]);
        assert_eq!(groups[2].0, "Lenovo");
    }
}
