//! Pricing opportunity sub-calculator.
//!
//! Consumes an optional market snapshot from the pricing-intelligence
//! collaborator and produces the pricing factor feeding the composite
//! opportunity score, plus price-move recommendations.
//!
//! The calculator is asymmetric on purpose. Below market there is real
//! headroom: a positive recommended increase and a revenue impact sized by
//! current volume. Above market the "opportunity" is margin already being
//! captured against conversion-rate risk, so the score stays moderate and
//! no upward price move is ever recommended.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::score::Confidence;

/// Market pricing snapshot for one node or product.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricingSnapshot {
    pub our_price: Decimal,
    pub market_median: Decimal,
    pub market_min: Decimal,
    pub market_max: Decimal,
    pub competitor_count: u32,
}

/// Optional margin context for the margin-opportunity factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarginInputs {
    pub current_revenue: Decimal,
    /// Current margin as a fraction, e.g. 0.35 for 35%.
    pub margin_rate: f64,
}

/// Sub-factor breakdown of a pricing opportunity, each in 0-100.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PricingFactors {
    /// How far price sits from the market median.
    pub price_position: f64,
    /// How tightly price sits inside [min, max] relative to peer density.
    pub competitive_position: f64,
    /// Margin headroom at near-market pricing.
    pub margin_opportunity: f64,
}

/// Result of the pricing sub-calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingOpportunity {
    /// 0-100 pricing factor for the composite score.
    pub score: f64,
    pub confidence: Confidence,
    /// Signed percentage deviation from the market median; positive when
    /// priced above market.
    pub price_gap_pct: f64,
    /// Recommended price increase; zero when at or above market.
    pub potential_price_increase: Decimal,
    /// Revenue impact of the recommended move at current volume.
    pub estimated_revenue_impact: Decimal,
    pub factors: PricingFactors,
}

impl PricingOpportunity {
    /// The no-data result: zero score, low confidence, all factors zero.
    #[must_use]
    pub fn no_data() -> Self {
        Self {
            score: 0.0,
            confidence: Confidence::Low,
            price_gap_pct: 0.0,
            potential_price_increase: Decimal::ZERO,
            estimated_revenue_impact: Decimal::ZERO,
            factors: PricingFactors::default(),
        }
    }
}

/// Tuning knobs for the pricing calculation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Gap percentage at which the price-position factor saturates.
    pub gap_saturation_pct: f64,
    /// Cap applied to the overall score when priced above market.
    pub above_market_cap: f64,
    /// Fraction of the gap toward median recommended as an increase.
    pub increase_fraction: Decimal,
    /// Competitor count at which the density factor saturates.
    pub density_saturation: u32,
    /// Competitor count and dispersion bounds for confidence.
    pub high_confidence_competitors: u32,
    pub high_confidence_dispersion: f64,
    pub low_confidence_competitors: u32,
    pub low_confidence_dispersion: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            gap_saturation_pct: 30.0,
            above_market_cap: 45.0,
            increase_fraction: dec!(0.5),
            density_saturation: 20,
            high_confidence_competitors: 10,
            high_confidence_dispersion: 0.3,
            low_confidence_competitors: 3,
            low_confidence_dispersion: 0.8,
        }
    }
}

/// Stateless pricing calculator.
#[derive(Debug, Clone, Default)]
pub struct PricingCalculator {
    config: PricingConfig,
}

impl PricingCalculator {
    #[must_use]
    pub const fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    /// Compute the pricing opportunity for one node.
    ///
    /// `conversions` is the node's current conversion volume, used to size
    /// the revenue impact of a recommended price move.
    #[must_use]
    pub fn calculate(
        &self,
        snapshot: Option<&PricingSnapshot>,
        conversions: u64,
        margin: Option<&MarginInputs>,
    ) -> PricingOpportunity {
        let Some(snap) = snapshot else {
            return PricingOpportunity::no_data();
        };
        if snap.market_median <= Decimal::ZERO || snap.our_price <= Decimal::ZERO {
            return PricingOpportunity::no_data();
        }

        let cfg = &self.config;
        let median = snap.market_median.to_f64().unwrap_or(0.0);
        let our = snap.our_price.to_f64().unwrap_or(0.0);
        let gap_pct = (our - median) / median * 100.0;
        let above_market = gap_pct > 0.0;

        let price_position = if above_market {
            // Margin already captured; moderate opportunity at best.
            (gap_pct / cfg.gap_saturation_pct).min(1.0) * 40.0
        } else {
            (gap_pct.abs() / cfg.gap_saturation_pct).min(1.0) * 100.0
        };

        let range = snap.market_max - snap.market_min;
        let dispersion = (range / snap.market_median).to_f64().unwrap_or(f64::MAX).max(0.0);
        let competitive_position = if range > Decimal::ZERO {
            let offset = (snap.our_price - snap.market_median).abs();
            let centrality = 1.0 - (offset / range).to_f64().unwrap_or(1.0).clamp(0.0, 1.0);
            let density =
                (f64::from(snap.competitor_count) / f64::from(cfg.density_saturation)).min(1.0);
            centrality * density * 100.0
        } else {
            0.0
        };

        let margin_opportunity = match margin {
            Some(m) => {
                let headroom = (m.margin_rate * 100.0).clamp(0.0, 100.0);
                let near_market = 1.0 - (gap_pct.abs() / 50.0).clamp(0.0, 1.0);
                headroom * near_market
            }
            None => 0.0,
        };

        let (potential_price_increase, estimated_revenue_impact) = if above_market {
            (Decimal::ZERO, Decimal::ZERO)
        } else {
            let increase = (snap.market_median - snap.our_price) * cfg.increase_fraction;
            let impact = increase * Decimal::from(conversions);
            (increase, impact)
        };

        let mut score = price_position * 0.5 + competitive_position * 0.3 + margin_opportunity * 0.2;
        if above_market {
            score = score.min(cfg.above_market_cap);
        }

        let confidence = if snap.competitor_count < cfg.low_confidence_competitors
            || dispersion > cfg.low_confidence_dispersion
        {
            Confidence::Low
        } else if snap.competitor_count >= cfg.high_confidence_competitors
            && dispersion <= cfg.high_confidence_dispersion
        {
            Confidence::High
        } else {
            Confidence::Medium
        };

        PricingOpportunity {
            score: score.clamp(0.0, 100.0),
            confidence,
            price_gap_pct: gap_pct,
            potential_price_increase,
            estimated_revenue_impact,
            factors: PricingFactors {
                price_position,
                competitive_position,
                margin_opportunity,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(our: Decimal, median: Decimal, min: Decimal, max: Decimal, n: u32) -> PricingSnapshot {
        PricingSnapshot {
            our_price: our,
            market_median: median,
            market_min: min,
            market_max: max,
            competitor_count: n,
        }
    }

    #[test]
    fn test_no_data_yields_zero_low() {
        let result = PricingCalculator::default().calculate(None, 100, None);
        assert_eq!(result, PricingOpportunity::no_data());
    }

    #[test]
    fn test_below_market_recommends_increase() {
        let snap = snapshot(dec!(80), dec!(100), dec!(70), dec!(120), 15);
        let result = PricingCalculator::default().calculate(Some(&snap), 50, None);
        assert!(result.price_gap_pct < 0.0);
        assert!(result.potential_price_increase > Decimal::ZERO);
        assert_eq!(result.potential_price_increase, dec!(10));
        assert_eq!(result.estimated_revenue_impact, dec!(500));
        assert!(result.score > 0.0);
    }

    #[test]
    fn test_above_market_bounded_and_no_increase() {
        let snap = snapshot(dec!(130), dec!(100), dec!(70), dec!(140), 15);
        let result = PricingCalculator::default().calculate(Some(&snap), 50, None);
        assert!(result.price_gap_pct > 0.0);
        assert_eq!(result.potential_price_increase, Decimal::ZERO);
        assert!(result.score < 50.0);
    }

    #[test]
    fn test_confidence_tiers() {
        let calc = PricingCalculator::default();
        // Many competitors, tight market.
        let tight = snapshot(dec!(95), dec!(100), dec!(90), dec!(110), 20);
        assert_eq!(calc.calculate(Some(&tight), 0, None).confidence, Confidence::High);
        // Too few competitors.
        let thin = snapshot(dec!(95), dec!(100), dec!(90), dec!(110), 2);
        assert_eq!(calc.calculate(Some(&thin), 0, None).confidence, Confidence::Low);
        // Wide dispersion.
        let wide = snapshot(dec!(95), dec!(100), dec!(10), dec!(200), 20);
        assert_eq!(calc.calculate(Some(&wide), 0, None).confidence, Confidence::Low);
        // In between.
        let mid = snapshot(dec!(95), dec!(100), dec!(70), dec!(130), 5);
        assert_eq!(calc.calculate(Some(&mid), 0, None).confidence, Confidence::Medium);
    }

    #[test]
    fn test_margin_headroom_raises_score_near_market() {
        let calc = PricingCalculator::default();
        let snap = snapshot(dec!(99), dec!(100), dec!(90), dec!(110), 15);
        let without = calc.calculate(Some(&snap), 10, None);
        let with = calc.calculate(
            Some(&snap),
            10,
            Some(&MarginInputs {
                current_revenue: dec!(5000),
                margin_rate: 0.4,
            }),
        );
        assert!(with.score > without.score);
        assert!(with.factors.margin_opportunity > 0.0);
    }

    #[test]
    fn test_zero_or_negative_prices_degrade_to_no_data() {
        let calc = PricingCalculator::default();
        let snap = snapshot(dec!(0), dec!(100), dec!(90), dec!(110), 15);
        assert_eq!(calc.calculate(Some(&snap), 10, None), PricingOpportunity::no_data());
        let snap = snapshot(dec!(50), dec!(0), dec!(0), dec!(0), 15);
        assert_eq!(calc.calculate(Some(&snap), 10, None), PricingOpportunity::no_data());
    }
}
