//! Composite opportunity scoring.
//!
//! Turns a node's aggregated metrics plus optional collaborator-supplied
//! signals (search position, pricing snapshot, competitive and content
//! signals) into a 0-100 [`OpportunityScore`] with its five-factor
//! breakdown, category label, and confidence.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::ScoringConfig;
use crate::domain::{
    categorize, AggregatedMetrics, Confidence, MarginInputs, NodeId, OpportunityScore,
    PricingCalculator, PricingOpportunity, PricingSnapshot, ScoreFactors,
};

/// Competitive standing vs other sellers, each value 0-100.
///
/// Supplied by the competitive-intelligence collaborator; absent signals
/// score as no gap.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CompetitiveSignals {
    pub market_share_gap: f64,
    pub content_gap: f64,
}

/// Listing content quality, each value 0-100.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ContentSignals {
    pub completeness: f64,
    pub media_coverage: f64,
}

/// Optional per-node inputs beyond the aggregated metrics.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeSignals {
    /// Average organic search position, 1-based.
    pub avg_position: Option<f64>,
    pub pricing: Option<PricingSnapshot>,
    pub margin: Option<MarginInputs>,
    pub competitive: Option<CompetitiveSignals>,
    pub content: Option<ContentSignals>,
}

/// Scores nodes against a fixed configuration.
pub struct Scorer<'a> {
    config: &'a ScoringConfig,
    pricing: PricingCalculator,
}

impl<'a> Scorer<'a> {
    #[must_use]
    pub fn new(config: &'a ScoringConfig) -> Self {
        Self {
            config,
            pricing: PricingCalculator::new(config.pricing),
        }
    }

    /// Score one node from its final aggregated metrics.
    #[must_use]
    pub fn score_node(
        &self,
        node_id: &NodeId,
        metrics: &AggregatedMetrics,
        signals: &NodeSignals,
    ) -> OpportunityScore {
        let pricing = self.pricing.calculate(
            signals.pricing.as_ref(),
            metrics.conversions,
            signals.margin.as_ref(),
        );

        let factors = ScoreFactors {
            traffic_potential: self.traffic_potential(metrics, signals.avg_position),
            revenue_potential: self.revenue_potential(metrics),
            pricing_opportunity: pricing.score,
            competitive_gap: competitive_gap(signals.competitive.as_ref()),
            content_quality: content_quality(signals.content.as_ref()),
        };
        let score = factors.composite(&self.config.weights);
        let effort = i64::try_from(metrics.total_product_count).unwrap_or(i64::MAX);

        OpportunityScore {
            node_id: node_id.clone(),
            score,
            factors,
            category: categorize(score, effort, &self.config.thresholds),
            confidence: Confidence::from_source_count(metrics.source_count()),
            revenue_impact_estimate: self.revenue_impact(metrics, signals.avg_position, &pricing),
        }
    }

    /// Traffic potential: CTR gap vs the expected CTR for the node's
    /// position (50%), position headroom (30%), impression volume (20%).
    fn traffic_potential(&self, metrics: &AggregatedMetrics, position: Option<f64>) -> f64 {
        let ctr_gap = match position {
            Some(pos) => {
                let expected = self.config.expected_ctr(pos);
                if expected > 0.0 && metrics.impressions > 0 {
                    ((expected - metrics.ctr) / expected).clamp(0.0, 1.0) * 100.0
                } else {
                    0.0
                }
            }
            None => 0.0,
        };
        let position_gap = match position {
            Some(pos) if pos > 1.0 => {
                ((pos - 1.0) / (self.config.max_position - 1.0).max(1.0)).clamp(0.0, 1.0) * 100.0
            }
            _ => 0.0,
        };
        let impression_factor = if metrics.impressions > 0 {
            let ceiling = (1.0 + self.config.impression_ceiling as f64).ln();
            ((1.0 + metrics.impressions as f64).ln() / ceiling).clamp(0.0, 1.0) * 100.0
        } else {
            0.0
        };
        ctr_gap * 0.50 + position_gap * 0.30 + impression_factor * 0.20
    }

    /// Revenue potential: conversion gap (40%), AOV gap (30%),
    /// monetization gap (30%), all vs configured benchmarks.
    fn revenue_potential(&self, metrics: &AggregatedMetrics) -> f64 {
        let conversion_gap = if metrics.clicks > 0 {
            let bench = self.config.benchmark_conversion_rate;
            if bench > 0.0 {
                ((bench - metrics.conversion_rate) / bench).clamp(0.0, 1.0) * 100.0
            } else {
                0.0
            }
        } else {
            0.0
        };
        let aov_gap = if metrics.conversions > 0 && self.config.benchmark_aov > Decimal::ZERO {
            let ratio = (metrics.average_order_value / self.config.benchmark_aov)
                .to_f64()
                .unwrap_or(1.0);
            (1.0 - ratio).clamp(0.0, 1.0) * 100.0
        } else {
            0.0
        };
        let monetization_gap = if metrics.clicks > 0 {
            let target = self.config.target_revenue_per_click;
            if target > 0.0 {
                ((target - metrics.revenue_per_click()) / target).clamp(0.0, 1.0) * 100.0
            } else {
                0.0
            }
        } else {
            0.0
        };
        conversion_gap * 0.40 + aov_gap * 0.30 + monetization_gap * 0.30
    }

    /// Estimated revenue impact: clicks recoverable by closing the CTR gap
    /// valued at the node's current revenue per click, plus any pricing
    /// move impact.
    fn revenue_impact(
        &self,
        metrics: &AggregatedMetrics,
        position: Option<f64>,
        pricing: &PricingOpportunity,
    ) -> Decimal {
        let traffic_impact = match position {
            Some(pos) => {
                let expected = self.config.expected_ctr(pos);
                let gap = (expected - metrics.ctr).max(0.0);
                let extra_clicks = gap * metrics.impressions as f64;
                Decimal::from_f64(extra_clicks * metrics.revenue_per_click())
                    .unwrap_or(Decimal::ZERO)
            }
            None => Decimal::ZERO,
        };
        (traffic_impact + pricing.estimated_revenue_impact).max(Decimal::ZERO)
    }
}

/// Competitive gap: market share shortfall (60%) and content shortfall
/// (40%). No signals, no gap.
fn competitive_gap(signals: Option<&CompetitiveSignals>) -> f64 {
    match signals {
        Some(s) => {
            s.market_share_gap.clamp(0.0, 100.0) * 0.60 + s.content_gap.clamp(0.0, 100.0) * 0.40
        }
        None => 0.0,
    }
}

/// Content quality: completeness (70%) and media coverage (30%).
fn content_quality(signals: Option<&ContentSignals>) -> f64 {
    match signals {
        Some(s) => {
            s.completeness.clamp(0.0, 100.0) * 0.70 + s.media_coverage.clamp(0.0, 100.0) * 0.30
        }
        None => 0.0,
    }
}
