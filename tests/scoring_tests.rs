//! Integration tests for scoring, categorization, and pricing.

mod support;

use canopy::config::ScoringConfig;
use canopy::domain::{
    categorize, AggregatedMetrics, CategoryThresholds, Confidence, MarginInputs, NodeId,
    OpportunityCategory, PricingCalculator, PricingSnapshot,
};
use canopy::pipeline::{NodeSignals, Scorer};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn metrics(impressions: u64, clicks: u64, conversions: u64, revenue: Decimal) -> AggregatedMetrics {
    let mut m = AggregatedMetrics {
        impressions,
        clicks,
        conversions,
        revenue,
        ..AggregatedMetrics::default()
    };
    m.derive_rates();
    m
}

#[test]
fn test_categorization_table() {
    let t = CategoryThresholds::default();
    assert_eq!(categorize(70.0, 10, &t), OpportunityCategory::QuickWin);
    assert_eq!(categorize(70.0, 101, &t), OpportunityCategory::Strategic);
    assert_eq!(categorize(40.0, 5, &t), OpportunityCategory::Incremental);
    assert_eq!(categorize(40.0, 500, &t), OpportunityCategory::LongTerm);
    assert_eq!(categorize(20.0, 10, &t), OpportunityCategory::Maintain);
    assert_eq!(categorize(39.9, 1, &t), OpportunityCategory::Maintain);
}

#[test]
fn test_categorization_never_panics_on_garbage() {
    let t = CategoryThresholds::default();
    assert_eq!(categorize(-100.0, -100, &t), OpportunityCategory::Maintain);
    assert_eq!(categorize(f64::INFINITY, i64::MIN, &t), OpportunityCategory::QuickWin);
    assert_eq!(categorize(f64::NAN, i64::MAX, &t), OpportunityCategory::Maintain);
}

#[test]
fn test_factor_weights_flow_into_composite() {
    let config = ScoringConfig::default();
    let scorer = Scorer::new(&config);
    // A node with a big CTR gap at position 1 and no other signals: the
    // composite is the traffic factor times its 0.25 weight plus the
    // revenue factor times 0.30.
    let m = metrics(50_000, 100, 0, Decimal::ZERO);
    let signals = NodeSignals {
        avg_position: Some(1.0),
        ..NodeSignals::default()
    };
    let score = scorer.score_node(&NodeId::new("n"), &m, &signals);
    let expected = score.factors.traffic_potential * 0.25
        + score.factors.revenue_potential * 0.30
        + score.factors.pricing_opportunity * 0.25
        + score.factors.competitive_gap * 0.10
        + score.factors.content_quality * 0.10;
    assert!((score.score - expected).abs() < 1e-9);
    assert!(score.factors.traffic_potential > 0.0);
}

#[test]
fn test_confidence_tracks_distinct_sources() {
    use canopy::domain::MetricSource;

    let config = ScoringConfig::default();
    let scorer = Scorer::new(&config);
    let mut m = metrics(1_000, 50, 5, dec!(250));

    m.sources.insert(MetricSource::SearchConsole);
    let one = scorer.score_node(&NodeId::new("n"), &m, &NodeSignals::default());
    assert_eq!(one.confidence, Confidence::Low);

    m.sources.insert(MetricSource::Analytics);
    let two = scorer.score_node(&NodeId::new("n"), &m, &NodeSignals::default());
    assert_eq!(two.confidence, Confidence::Medium);

    m.sources.insert(MetricSource::Merchant);
    let three = scorer.score_node(&NodeId::new("n"), &m, &NodeSignals::default());
    assert_eq!(three.confidence, Confidence::High);
}

#[test]
fn test_pricing_above_market_bounded_below_fifty() {
    let calc = PricingCalculator::default();
    // Severely above market with dense competition; still bounded.
    let snap = PricingSnapshot {
        our_price: dec!(200),
        market_median: dec!(100),
        market_min: dec!(80),
        market_max: dec!(210),
        competitor_count: 30,
    };
    let result = calc.calculate(Some(&snap), 1_000, Some(&MarginInputs {
        current_revenue: dec!(100000),
        margin_rate: 0.6,
    }));
    assert!(result.score < 50.0);
    assert_eq!(result.potential_price_increase, Decimal::ZERO);
}

#[test]
fn test_pricing_below_market_scales_with_volume() {
    let calc = PricingCalculator::default();
    let snap = PricingSnapshot {
        our_price: dec!(70),
        market_median: dec!(100),
        market_min: dec!(60),
        market_max: dec!(130),
        competitor_count: 12,
    };
    let low_volume = calc.calculate(Some(&snap), 10, None);
    let high_volume = calc.calculate(Some(&snap), 1_000, None);
    assert_eq!(low_volume.potential_price_increase, high_volume.potential_price_increase);
    assert!(high_volume.estimated_revenue_impact > low_volume.estimated_revenue_impact);
    assert!(low_volume.estimated_revenue_impact >= Decimal::ZERO);
}

#[test]
fn test_scoring_report_is_stable_across_runs() {
    let config = ScoringConfig::default();
    let scorer = Scorer::new(&config);
    let m = metrics(42_000, 900, 31, dec!(12345.67));
    let signals = NodeSignals {
        avg_position: Some(6.3),
        pricing: Some(PricingSnapshot {
            our_price: dec!(95),
            market_median: dec!(100),
            market_min: dec!(85),
            market_max: dec!(115),
            competitor_count: 18,
        }),
        ..NodeSignals::default()
    };
    let first = serde_json::to_string(&scorer.score_node(&NodeId::new("n"), &m, &signals)).unwrap();
    let second = serde_json::to_string(&scorer.score_node(&NodeId::new("n"), &m, &signals)).unwrap();
    assert_eq!(first, second);
}
