//! Opportunity scoring types.
//!
//! Nodes are scored on five factors, each normalized to 0-100:
//! - **Traffic potential**: CTR gap vs expected CTR for position, position
//!   headroom, impression volume
//! - **Revenue potential**: conversion, AOV, and monetization gaps
//! - **Pricing opportunity**: room to move price toward the market
//! - **Competitive gap**: market-share and content shortfall vs competitors
//! - **Content quality**: attribute completeness and media coverage
//!
//! Factors combine into a 0-100 composite via [`ScoreWeights`]; the default
//! weights sum to 1.0 and are validated when loaded from config.

use std::cmp::Ordering;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::NodeId;

/// Individual factor scores for a node, each in 0-100.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreFactors {
    pub traffic_potential: f64,
    pub revenue_potential: f64,
    pub pricing_opportunity: f64,
    pub competitive_gap: f64,
    pub content_quality: f64,
}

impl ScoreFactors {
    /// Creates new score factors with the given values.
    ///
    /// All values should be normalized to the 0-100 range.
    #[must_use]
    pub const fn new(
        traffic_potential: f64,
        revenue_potential: f64,
        pricing_opportunity: f64,
        competitive_gap: f64,
        content_quality: f64,
    ) -> Self {
        Self {
            traffic_potential,
            revenue_potential,
            pricing_opportunity,
            competitive_gap,
            content_quality,
        }
    }

    /// Computes the weighted composite score from these factors.
    #[must_use]
    pub fn composite(&self, weights: &ScoreWeights) -> f64 {
        let score = self.traffic_potential * weights.traffic_potential
            + self.revenue_potential * weights.revenue_potential
            + self.pricing_opportunity * weights.pricing_opportunity
            + self.competitive_gap * weights.competitive_gap
            + self.content_quality * weights.content_quality;
        score.clamp(0.0, 100.0)
    }
}

/// Weights combining factors into the composite score.
///
/// Must sum to 1.0; [`ScoreWeights::validate`] enforces this when weights
/// come from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub traffic_potential: f64,
    pub revenue_potential: f64,
    pub pricing_opportunity: f64,
    pub competitive_gap: f64,
    pub content_quality: f64,
}

impl ScoreWeights {
    /// Sum of all weights.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.traffic_potential
            + self.revenue_potential
            + self.pricing_opportunity
            + self.competitive_gap
            + self.content_quality
    }

    /// Check that weights are non-negative and sum to 1.0.
    pub fn validate(&self) -> Result<(), String> {
        let weights = [
            self.traffic_potential,
            self.revenue_potential,
            self.pricing_opportunity,
            self.competitive_gap,
            self.content_quality,
        ];
        if weights.iter().any(|w| *w < 0.0) {
            return Err("weights must be non-negative".to_string());
        }
        if (self.total() - 1.0).abs() > 1e-9 {
            return Err(format!("weights must sum to 1.0, got {}", self.total()));
        }
        Ok(())
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            traffic_potential: 0.25,
            revenue_potential: 0.30,
            pricing_opportunity: 0.25,
            competitive_gap: 0.10,
            content_quality: 0.10,
        }
    }
}

/// How trustworthy a score is, based on contributing data sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Confidence from the number of distinct sources feeding a node:
    /// 3+ high, 2 medium, 1 or 0 low.
    #[must_use]
    pub fn from_source_count(sources: usize) -> Self {
        match sources {
            0 | 1 => Self::Low,
            2 => Self::Medium,
            _ => Self::High,
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Actionable label from score and effort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OpportunityCategory {
    QuickWin,
    Strategic,
    Incremental,
    LongTerm,
    Maintain,
}

impl fmt::Display for OpportunityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QuickWin => write!(f, "quick-win"),
            Self::Strategic => write!(f, "strategic"),
            Self::Incremental => write!(f, "incremental"),
            Self::LongTerm => write!(f, "long-term"),
            Self::Maintain => write!(f, "maintain"),
        }
    }
}

/// Thresholds for opportunity categorization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryThresholds {
    /// Scores at or above this are high opportunity.
    pub high_score: f64,
    /// Scores at or above this (but below `high_score`) are moderate.
    pub mid_score: f64,
    /// Product counts at or below this count as low effort.
    pub low_effort: i64,
}

impl Default for CategoryThresholds {
    fn default() -> Self {
        Self {
            high_score: 70.0,
            mid_score: 40.0,
            low_effort: 10,
        }
    }
}

/// Map (score, effort) to a category.
///
/// Effort is the product count under the node. Boundary values land in the
/// higher-priority bucket: a score of exactly 70 with effort exactly 10 is
/// a quick win. Negative score or effort clamps to the maintain/low-effort
/// buckets rather than erroring.
#[must_use]
pub fn categorize(score: f64, effort: i64, thresholds: &CategoryThresholds) -> OpportunityCategory {
    let score = if score.is_nan() { 0.0 } else { score };
    let low_effort = effort <= thresholds.low_effort;
    if score >= thresholds.high_score {
        if low_effort {
            OpportunityCategory::QuickWin
        } else {
            OpportunityCategory::Strategic
        }
    } else if score >= thresholds.mid_score {
        if low_effort {
            OpportunityCategory::Incremental
        } else {
            OpportunityCategory::LongTerm
        }
    } else {
        OpportunityCategory::Maintain
    }
}

/// A node's computed opportunity score with its factor breakdown.
///
/// 1:1 with the scored node; recomputed whenever aggregated metrics
/// change, latest wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpportunityScore {
    pub node_id: NodeId,
    /// Weighted composite, 0-100.
    pub score: f64,
    pub factors: ScoreFactors,
    pub category: OpportunityCategory,
    pub confidence: Confidence,
    pub revenue_impact_estimate: Decimal,
}

impl OpportunityScore {
    /// Order scores descending by composite for ranking.
    #[must_use]
    pub fn ranking_cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .partial_cmp(&self.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.node_id.cmp(&other.node_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_sum_to_one() {
        assert!(ScoreWeights::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_weights_rejected() {
        let mut weights = ScoreWeights::default();
        weights.traffic_potential = 0.5;
        assert!(weights.validate().is_err());
        weights = ScoreWeights::default();
        weights.content_quality = -0.1;
        assert!(weights.validate().is_err());
    }

    #[test]
    fn test_composite_applies_weights() {
        let factors = ScoreFactors::new(100.0, 0.0, 0.0, 0.0, 0.0);
        let score = factors.composite(&ScoreWeights::default());
        assert!((score - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_categorize_boundaries() {
        let t = CategoryThresholds::default();
        assert_eq!(categorize(70.0, 10, &t), OpportunityCategory::QuickWin);
        assert_eq!(categorize(70.0, 101, &t), OpportunityCategory::Strategic);
        assert_eq!(categorize(40.0, 5, &t), OpportunityCategory::Incremental);
        assert_eq!(categorize(40.0, 50, &t), OpportunityCategory::LongTerm);
        assert_eq!(categorize(20.0, 10, &t), OpportunityCategory::Maintain);
    }

    #[test]
    fn test_categorize_clamps_bad_inputs() {
        let t = CategoryThresholds::default();
        assert_eq!(categorize(-5.0, -3, &t), OpportunityCategory::Maintain);
        assert_eq!(categorize(f64::NAN, 0, &t), OpportunityCategory::Maintain);
        // Negative effort counts as low effort, never an error.
        assert_eq!(categorize(80.0, -1, &t), OpportunityCategory::QuickWin);
    }

    #[test]
    fn test_confidence_from_sources() {
        assert_eq!(Confidence::from_source_count(0), Confidence::Low);
        assert_eq!(Confidence::from_source_count(1), Confidence::Low);
        assert_eq!(Confidence::from_source_count(2), Confidence::Medium);
        assert_eq!(Confidence::from_source_count(3), Confidence::High);
    }
}
