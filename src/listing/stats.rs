use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::model::Listing;

pub const RECENT_WINDOW_DAYS: i64 = 7;

/// Aggregate numbers shown on the admin dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_listings: usize,
    pub sold_listings: usize,
    pub available_listings: usize,
    pub recent_listings: usize,
    #[serde(with = "rust_decimal::serde::float")]
    pub value_available: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub value_sold: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub value_total: Decimal,
    pub by_category: BTreeMap<String, usize>,
    pub by_condition: BTreeMap<String, usize>,
}

impl DashboardStats {
    pub fn from_listings(listings: &[Listing], now: DateTime<Utc>) -> Self {
        let recent_cutoff = now - Duration::days(RECENT_WINDOW_DAYS);

        let mut stats = Self {
            total_listings: listings.len(),
            sold_listings: 0,
            available_listings: 0,
            recent_listings: 0,
            value_available: Decimal::ZERO,
            value_sold: Decimal::ZERO,
            value_total: Decimal::ZERO,
            by_category: BTreeMap::new(),
            by_condition: BTreeMap::new(),
        };

        for listing in listings {
            if listing.sold {
                stats.sold_listings += 1;
                stats.value_sold += listing.price;
            } else {
                stats.available_listings += 1;
                stats.value_available += listing.price;
            }
            if listing.created_at >= recent_cutoff {
                stats.recent_listings += 1;
            }
            *stats.by_category.entry(listing.category.clone()).or_default() += 1;
            *stats.by_condition.entry(listing.condition.clone()).or_default() += 1;
        }

        stats.value_total = stats.value_available + stats.value_sold;
        stats
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub statistics: DashboardStats,
    pub listings: Vec<Listing>,
}
