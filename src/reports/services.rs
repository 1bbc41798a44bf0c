use serde::{Deserialize, Serialize};
use time::{macros::format_description, Date, Duration};
use tracing::instrument;

use super::repo::{self, MonthlyRevenue, ReportRange, StatusCount, TopProduct};
use crate::config::{STORE_OFFSET, STORE_TIMEZONE};
use crate::error::{AppError, AppResult};
use crate::orders::status::OrderStatus;
use crate::state::AppState;

const TOP_PRODUCTS: i64 = 5;

/// `from` and `to` are inclusive store-local dates, `YYYY-MM-DD`.
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub from: Option<Date>,
    pub to: Option<Date>,
}

fn parse_date(field: &str, raw: Option<&str>) -> AppResult<Option<Date>> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .map(Some)
        .map_err(|_| AppError::BadRequest(format!("Tanggal {field} harus berformat YYYY-MM-DD")))
}

impl Period {
    pub fn from_query(q: &ReportQuery) -> AppResult<Self> {
        let from = parse_date("awal", q.from.as_deref())?;
        let to = parse_date("akhir", q.to.as_deref())?;
        if let (Some(f), Some(t)) = (from, to) {
            if f > t {
                return Err(AppError::BadRequest(
                    "Tanggal awal tidak boleh setelah tanggal akhir".into(),
                ));
            }
        }
        Ok(Self { from, to })
    }

    /// Timestamp window covering whole local days.
    pub fn range(self, status: Option<OrderStatus>) -> ReportRange {
        ReportRange {
            from: self.from.map(|d| d.midnight().assume_offset(STORE_OFFSET)),
            to: self
                .to
                .map(|d| (d.midnight() + Duration::days(1)).assume_offset(STORE_OFFSET)),
            status,
        }
    }

    pub fn label(self) -> String {
        let fmt = format_description!("[day]/[month]/[year]");
        let show = |d: Date| d.format(fmt).unwrap_or_default();
        match (self.from, self.to) {
            (Some(f), Some(t)) => format!("{} - {}", show(f), show(t)),
            (Some(f), None) => format!("Sejak {}", show(f)),
            (None, Some(t)) => format!("Sampai {}", show(t)),
            (None, None) => "Semua waktu".to_string(),
        }
    }

    /// Filename-safe suffix, e.g. `2024-05-01_2024-05-31`.
    pub fn slug(self) -> String {
        let fmt = format_description!("[year]-[month]-[day]");
        let show = |d: Option<Date>| {
            d.and_then(|d| d.format(fmt).ok())
                .unwrap_or_else(|| "semua".to_string())
        };
        format!("{}_{}", show(self.from), show(self.to))
    }
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub period: String,
    pub revenue: i64,
    pub completed_orders: i64,
    pub total_orders: i64,
    pub status_counts: Vec<StatusCount>,
    pub top_products: Vec<TopProduct>,
    pub monthly_revenue: Vec<MonthlyRevenue>,
}

/// One entry per status in lifecycle order, zero when absent.
pub fn fill_status_counts(found: &[StatusCount]) -> Vec<StatusCount> {
    OrderStatus::ALL
        .into_iter()
        .map(|status| StatusCount {
            status,
            orders: found
                .iter()
                .find(|c| c.status == status)
                .map_or(0, |c| c.orders),
        })
        .collect()
}

#[instrument(skip(state))]
pub async fn summary(state: &AppState, period: Period) -> AppResult<SummaryResponse> {
    let range = period.range(None);
    let (completed_orders, revenue) = repo::revenue(&state.db, &range).await?;
    let status_counts = fill_status_counts(&repo::status_counts(&state.db, &range).await?);
    let top_products = repo::top_products(&state.db, &range, TOP_PRODUCTS).await?;
    let monthly_revenue = repo::monthly_revenue(&state.db, &range, STORE_TIMEZONE).await?;

    Ok(SummaryResponse {
        period: period.label(),
        revenue,
        completed_orders,
        total_orders: status_counts.iter().map(|c| c.orders).sum(),
        status_counts,
        top_products,
        monthly_revenue,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    fn query(from: Option<&str>, to: Option<&str>) -> ReportQuery {
        ReportQuery {
            from: from.map(String::from),
            to: to.map(String::from),
            status: None,
        }
    }

    #[test]
    fn parses_inclusive_local_days() {
        let p = Period::from_query(&query(Some("2024-05-01"), Some("2024-05-31"))).unwrap();
        assert_eq!(p.from, Some(date!(2024 - 05 - 01)));
        let r = p.range(Some(OrderStatus::Selesai));
        assert_eq!(r.from, Some(datetime!(2024-04-30 17:00 UTC)));
        assert_eq!(r.to, Some(datetime!(2024-05-31 17:00 UTC)));
        assert_eq!(r.status, Some(OrderStatus::Selesai));
        assert_eq!(p.label(), "01/05/2024 - 31/05/2024");
        assert_eq!(p.slug(), "2024-05-01_2024-05-31");
    }

    #[test]
    fn open_ended_periods() {
        let p = Period::from_query(&query(None, Some(""))).unwrap();
        assert_eq!(p, Period { from: None, to: None });
        assert_eq!(p.label(), "Semua waktu");
        assert_eq!(p.slug(), "semua_semua");
        assert!(p.range(None).from.is_none());
    }

    #[test]
    fn rejects_bad_or_reversed_dates() {
        assert!(Period::from_query(&query(Some("01-05-2024"), None)).is_err());
        assert!(Period::from_query(&query(Some("2024-06-01"), Some("2024-05-01"))).is_err());
    }

    #[test]
    fn status_counts_are_complete_and_ordered() {
        let filled = fill_status_counts(&[
            StatusCount {
                status: OrderStatus::Selesai,
                orders: 4,
            },
            StatusCount {
                status: OrderStatus::MenungguKonfirmasi,
                orders: 2,
            },
        ]);
        let pairs: Vec<(OrderStatus, i64)> = filled.iter().map(|c| (c.status, c.orders)).collect();
        assert_eq!(
            pairs,
            vec![
                (OrderStatus::MenungguKonfirmasi, 2),
                (OrderStatus::Diproses, 0),
                (OrderStatus::DalamPengiriman, 0),
                (OrderStatus::Selesai, 4),
                (OrderStatus::Dibatalkan, 0),
            ]
        );
    }
}
