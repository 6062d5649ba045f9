//! Metric facts and per-node aggregates.
//!
//! A [`MetricFact`] is one raw performance record from an upstream source
//! (search console, analytics, merchant feed), keyed by a URL, product id,
//! or GTIN. After matching, facts roll up into one [`AggregatedMetrics`]
//! per taxonomy node.
//!
//! The core correctness rule lives here: additive fields (impressions,
//! clicks, conversions, revenue) are summed up the tree, and rate metrics
//! (CTR, conversion rate, AOV) are derived from a node's own summed totals.
//! Rates are never averaged across children - averaging per-child CTRs is
//! the canonical way to get this wrong.

use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Upstream system a metric fact came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricSource {
    SearchConsole,
    Analytics,
    Merchant,
}

impl fmt::Display for MetricSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SearchConsole => write!(f, "search_console"),
            Self::Analytics => write!(f, "analytics"),
            Self::Merchant => write!(f, "merchant"),
        }
    }
}

/// Inclusive UTC date range covered by a fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    #[must_use]
    pub const fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }
}

/// One raw performance record, pre-matching.
///
/// `subject_key` is the join key: a URL, a product id, or a GTIN,
/// depending on the source. Matching resolves it to a taxonomy node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricFact {
    pub subject_key: String,
    pub source: MetricSource,
    pub date_range: DateRange,
    pub impressions: u64,
    pub clicks: u64,
    pub conversions: u64,
    pub revenue: Decimal,
}

/// Per-node metric totals plus rates derived from those totals.
///
/// Additive totals include the node's direct facts and every descendant's
/// facts. Rates are computed from this struct's own totals via
/// [`AggregatedMetrics::derive_rates`], only once the totals are final.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AggregatedMetrics {
    pub impressions: u64,
    pub clicks: u64,
    pub conversions: u64,
    pub revenue: Decimal,
    pub direct_product_count: u64,
    pub total_product_count: u64,

    /// Click-through rate, clicks / impressions. Zero when no impressions.
    pub ctr: f64,
    /// Conversions / clicks. Zero when no clicks.
    pub conversion_rate: f64,
    /// Revenue / conversions. Zero when no conversions.
    pub average_order_value: Decimal,

    /// Distinct upstream sources that contributed facts to this subtree.
    /// Drives score confidence (3+ high, 2 medium, otherwise low).
    pub sources: BTreeSet<MetricSource>,
}

impl AggregatedMetrics {
    /// Add one fact's additive fields into the totals.
    pub fn add_fact(&mut self, fact: &MetricFact) {
        self.impressions += fact.impressions;
        self.clicks += fact.clicks;
        self.conversions += fact.conversions;
        self.revenue += fact.revenue;
        self.sources.insert(fact.source);
    }

    /// Add a child's already-final totals into this node's totals.
    ///
    /// The child's totals must include its own descendants, so each node is
    /// visited exactly once across the whole tree walk.
    pub fn add_child(&mut self, child: &AggregatedMetrics) {
        self.impressions += child.impressions;
        self.clicks += child.clicks;
        self.conversions += child.conversions;
        self.revenue += child.revenue;
        self.total_product_count += child.total_product_count;
        self.sources.extend(child.sources.iter().copied());
    }

    /// Derive CTR, conversion rate, and AOV from the summed totals.
    ///
    /// Must be called only after every contributing fact and child has been
    /// added. Zero denominators yield zero, never NaN or infinity.
    pub fn derive_rates(&mut self) {
        self.ctr = if self.impressions > 0 {
            self.clicks as f64 / self.impressions as f64
        } else {
            0.0
        };
        self.conversion_rate = if self.clicks > 0 {
            self.conversions as f64 / self.clicks as f64
        } else {
            0.0
        };
        self.average_order_value = if self.conversions > 0 {
            self.revenue / Decimal::from(self.conversions)
        } else {
            Decimal::ZERO
        };
    }

    /// Revenue per click, used by revenue-impact estimation. Zero-safe.
    #[must_use]
    pub fn revenue_per_click(&self) -> f64 {
        if self.clicks > 0 {
            (self.revenue / Decimal::from(self.clicks))
                .to_f64()
                .unwrap_or(0.0)
        } else {
            0.0
        }
    }

    /// Number of distinct sources feeding this node's subtree.
    #[must_use]
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }
}
