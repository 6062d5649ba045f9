//! Bottom-up metric aggregation over the taxonomy.
//!
//! The single source of truth for rolling metrics up the tree. Nodes are
//! visited deepest-first, so when a node is visited its accumulated totals
//! already include every descendant exactly once: each node adds its final
//! totals into its parent and is never revisited. Total work is O(N)
//! across the tree, not O(N * depth).
//!
//! Rates are derived from a node's own finished totals as the node is
//! visited - deriving a rate before the children have contributed is a
//! correctness bug, and averaging child rates is the failure mode this
//! module exists to prevent.

use std::collections::BTreeMap;

use tracing::debug;

use crate::domain::{AggregatedMetrics, MetricFact, NodeId, TaxonomyTree};
use crate::matcher::MatchResult;

/// Aggregate matched facts up the tree.
///
/// `facts` and `matches` are parallel slices: `matches[i]` is the match
/// outcome for `facts[i]`. Unmatched facts are skipped (they were already
/// counted in diagnostics). Returns one [`AggregatedMetrics`] per node,
/// keyed by node id in stable order.
#[must_use]
pub fn aggregate(
    tree: &TaxonomyTree,
    facts: &[MetricFact],
    matches: &[MatchResult],
) -> BTreeMap<NodeId, AggregatedMetrics> {
    let mut totals: Vec<AggregatedMetrics> = tree
        .nodes()
        .iter()
        .map(|node| {
            let direct = node.direct_product_ids.len() as u64;
            AggregatedMetrics {
                direct_product_count: direct,
                total_product_count: direct,
                ..AggregatedMetrics::default()
            }
        })
        .collect();

    // Phase 1: credit each matched fact to its node's direct sums.
    let mut credited = 0usize;
    for (fact, result) in facts.iter().zip(matches) {
        let Some(node_id) = &result.node_id else {
            continue;
        };
        let Some(idx) = tree.index_of(node_id) else {
            continue;
        };
        totals[idx].add_fact(fact);
        credited += 1;
    }

    // Phase 2: deepest first, finalize each node then push it into its
    // parent. Children sort before parents, so totals are complete when
    // rates are derived.
    for idx in tree.indices_deepest_first() {
        totals[idx].derive_rates();
        if let Some(parent) = tree.node_at(idx).and_then(|n| n.parent) {
            let child = totals[idx].clone();
            totals[parent].add_child(&child);
        }
    }

    debug!(
        nodes = tree.len(),
        facts_credited = credited,
        "aggregation complete"
    );

    tree.nodes()
        .iter()
        .zip(totals)
        .map(|(node, metrics)| (node.id.clone(), metrics))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DateRange, MetricSource, NodeId};
    use crate::matcher::{match_all, MatchIndex, MatchingConfig};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn fact(key: &str, impressions: u64, clicks: u64, conversions: u64, revenue: Decimal) -> MetricFact {
        MetricFact {
            subject_key: key.into(),
            source: MetricSource::SearchConsole,
            date_range: DateRange::new(
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            ),
            impressions,
            clicks,
            conversions,
            revenue,
        }
    }

    fn aggregate_urls(tree: &TaxonomyTree, facts: &[MetricFact]) -> BTreeMap<NodeId, AggregatedMetrics> {
        let index = MatchIndex::build(tree, &[], MatchingConfig { workers: 1, ..Default::default() });
        let outcome = match_all(facts, &index);
        aggregate(tree, facts, &outcome.results)
    }

    #[test]
    fn test_parent_ctr_from_totals_not_child_average() {
        let tree = TaxonomyTree::build(["Shop > A", "Shop > B"]);
        let facts = vec![
            fact("/shop/a", 10_000, 100, 0, Decimal::ZERO),
            fact("/shop/b", 100, 5, 0, Decimal::ZERO),
        ];
        let metrics = aggregate_urls(&tree, &facts);
        let parent = &metrics[&NodeId::new("shop")];
        assert_eq!(parent.impressions, 10_100);
        assert_eq!(parent.clicks, 105);
        // 105/10100, emphatically not the 3% child-average.
        assert!((parent.ctr - 105.0 / 10_100.0).abs() < 1e-12);
    }

    #[test]
    fn test_sum_invariant_holds_per_level() {
        let tree = TaxonomyTree::build(["R > A > X", "R > A > Y", "R > B"]);
        let facts = vec![
            fact("/r/a/x", 100, 10, 2, dec!(40)),
            fact("/r/a/y", 200, 20, 4, dec!(100)),
            fact("/r/a", 50, 5, 1, dec!(10)),
            fact("/r/b", 300, 30, 6, dec!(200)),
        ];
        let metrics = aggregate_urls(&tree, &facts);
        let a = &metrics[&NodeId::new("r-a")];
        assert_eq!(a.impressions, 350);
        assert_eq!(a.revenue, dec!(150));
        let root = &metrics[&NodeId::new("r")];
        assert_eq!(root.impressions, 650);
        assert_eq!(root.clicks, 65);
        assert_eq!(root.conversions, 13);
        assert_eq!(root.revenue, dec!(350));
    }

    #[test]
    fn test_unmatched_facts_excluded() {
        let tree = TaxonomyTree::build(["Shop > A"]);
        let facts = vec![
            fact("/shop/a", 100, 10, 0, Decimal::ZERO),
            fact("/nowhere/else", 999, 99, 0, Decimal::ZERO),
        ];
        let metrics = aggregate_urls(&tree, &facts);
        assert_eq!(metrics[&NodeId::new("shop")].impressions, 100);
    }

    #[test]
    fn test_empty_tree_aggregates_empty() {
        let tree = TaxonomyTree::build(Vec::<String>::new());
        let metrics = aggregate(&tree, &[], &[]);
        assert!(metrics.is_empty());
    }
}
