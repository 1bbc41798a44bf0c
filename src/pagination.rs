use serde::{Deserialize, Serialize};

pub const MAX_PER_PAGE: u32 = 100;

/// `page` / `per_page` query parameters for database-backed listings.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageParams {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_page() -> u32 {
    1
}
fn default_per_page() -> u32 {
    20
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

impl PageParams {
    /// Clamped 1-based page and page size.
    pub fn clamped(self) -> (u32, u32) {
        (self.page.max(1), self.per_page.clamp(1, MAX_PER_PAGE))
    }

    /// SQL `LIMIT` and `OFFSET`.
    pub fn limit_offset(self) -> (i64, i64) {
        let (page, per_page) = self.clamped();
        (i64::from(per_page), i64::from(page - 1) * i64::from(per_page))
    }
}

#[derive(Debug, Serialize)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

impl<T> Paged<T> {
    pub fn new(items: Vec<T>, params: PageParams, total: i64) -> Self {
        let (page, per_page) = params.clamped();
        Self {
            items,
            page,
            per_page,
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_offset_clamps() {
        let p = |page, per_page| PageParams { page, per_page }.limit_offset();
        assert_eq!(p(1, 20), (20, 0));
        assert_eq!(p(3, 10), (10, 20));
        assert_eq!(p(0, 0), (1, 0));
        assert_eq!(p(2, 1000), (100, 100));
    }
}
