#![allow(dead_code)]

use canopy::domain::{DateRange, MetricFact, MetricSource, Product};
use chrono::NaiveDate;
use rust_decimal::Decimal;

pub fn january() -> DateRange {
    DateRange::new(
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
    )
}

pub fn gsc_fact(
    key: &str,
    impressions: u64,
    clicks: u64,
    conversions: u64,
    revenue: Decimal,
) -> MetricFact {
    fact(key, MetricSource::SearchConsole, impressions, clicks, conversions, revenue)
}

pub fn fact(
    key: &str,
    source: MetricSource,
    impressions: u64,
    clicks: u64,
    conversions: u64,
    revenue: Decimal,
) -> MetricFact {
    MetricFact {
        subject_key: key.into(),
        source,
        date_range: january(),
        impressions,
        clicks,
        conversions,
        revenue,
    }
}

pub fn product(id: &str, node_id: &str, title: &str) -> Product {
    Product::new(id, node_id, title)
}
