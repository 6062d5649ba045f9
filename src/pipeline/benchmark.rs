//! Depth-peer benchmarking and insight triggers.
//!
//! Compares one node's rate metrics against its cohort - every node at
//! the same tree depth with non-zero impressions - and raises fixed
//! threshold insight triggers. Prose generation for the triggers belongs
//! to a reporting collaborator; this module only labels.

use serde::{Deserialize, Serialize};

use crate::domain::{AggregatedMetrics, NodeId};

/// Impressions floor for the critical-CTR trigger.
const CRITICAL_IMPRESSIONS: u64 = 10_000;
/// CTR below this with heavy impressions is critical.
const CRITICAL_CTR: f64 = 0.005;
/// Relative shortfall vs peer mean CTR that makes a node high priority.
const HIGH_PRIORITY_SHORTFALL: f64 = 0.30;
/// Clicks floor for the conversion-focus trigger.
const CONVERSION_FOCUS_CLICKS: u64 = 100;
/// Conversion rate below this with real click volume needs attention.
const CONVERSION_FOCUS_RATE: f64 = 0.01;

/// Fixed-threshold insight labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InsightTrigger {
    /// Heavy impressions, almost no clicks.
    Critical,
    /// CTR at least 30% below the peer-cohort mean.
    HighPriority,
    /// Real click volume that is not converting.
    ConversionFocus,
}

/// A node's standing against its depth-peer cohort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerBenchmark {
    pub node_id: NodeId,
    /// Percentage deviation of CTR from the cohort mean.
    pub ctr_delta_pct: f64,
    /// Percentage deviation of conversion rate from the cohort mean.
    pub conversion_delta_pct: f64,
    /// Rank percentile by CTR within the cohort, 0.0 (worst) to 1.0 (best).
    pub relative_rank: f64,
    pub insights: Vec<InsightTrigger>,
}

/// Benchmark a node against its depth peers.
///
/// `peers` are the metrics of every other node at the same depth. The
/// cohort is the subset with non-zero impressions, plus the node itself
/// when it has impressions; zero-traffic nodes would drag every mean to
/// zero and benchmark nobody.
#[must_use]
pub fn benchmark(
    node_id: &NodeId,
    metrics: &AggregatedMetrics,
    peers: &[&AggregatedMetrics],
) -> PeerBenchmark {
    let cohort: Vec<&AggregatedMetrics> = peers
        .iter()
        .copied()
        .chain(std::iter::once(metrics))
        .filter(|m| m.impressions > 0)
        .collect();

    let (ctr_delta_pct, conversion_delta_pct, relative_rank) = if cohort.is_empty() {
        (0.0, 0.0, 0.0)
    } else {
        let mean_ctr = cohort.iter().map(|m| m.ctr).sum::<f64>() / cohort.len() as f64;
        let mean_cr =
            cohort.iter().map(|m| m.conversion_rate).sum::<f64>() / cohort.len() as f64;
        let ctr_delta = delta_pct(metrics.ctr, mean_ctr);
        let cr_delta = delta_pct(metrics.conversion_rate, mean_cr);
        // The node's own entry never compares strictly below itself, so
        // counting over the whole cohort is safe. A zero-impression node
        // is outside the cohort entirely and ranks at the bottom.
        let rank = if metrics.impressions == 0 {
            0.0
        } else if cohort.len() > 1 {
            let below = cohort.iter().filter(|m| m.ctr < metrics.ctr).count();
            below as f64 / (cohort.len() - 1) as f64
        } else {
            1.0
        };
        (ctr_delta, cr_delta, rank)
    };

    let mut insights = Vec::new();
    if metrics.impressions >= CRITICAL_IMPRESSIONS && metrics.ctr < CRITICAL_CTR {
        insights.push(InsightTrigger::Critical);
    }
    if ctr_delta_pct <= -(HIGH_PRIORITY_SHORTFALL * 100.0) {
        insights.push(InsightTrigger::HighPriority);
    }
    if metrics.clicks >= CONVERSION_FOCUS_CLICKS && metrics.conversion_rate < CONVERSION_FOCUS_RATE
    {
        insights.push(InsightTrigger::ConversionFocus);
    }

    PeerBenchmark {
        node_id: node_id.clone(),
        ctr_delta_pct,
        conversion_delta_pct,
        relative_rank,
        insights,
    }
}

fn delta_pct(value: f64, mean: f64) -> f64 {
    if mean > 0.0 {
        (value - mean) / mean * 100.0
    } else {
        0.0
    }
}
