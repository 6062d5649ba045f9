//! The aggregation pipeline: match, aggregate, score.
//!
//! One [`AggregationRun`] owns everything for a single run - tree, fact
//! batch, products, per-node signals in; aggregated metrics, scores,
//! benchmarks, and diagnostics out. There is no process-wide state, so
//! concurrent runs for different tenants are isolated by construction.
//!
//! Phases run in a fixed order with hard barriers: aggregation consumes
//! the complete match outcome, scoring consumes complete totals. Partial
//! overlap would produce rates from incomplete sums, which is exactly the
//! bug class this crate exists to prevent. After each phase the run
//! exposes an immutable [`Progress`] snapshot the caller can poll; there
//! is no callback registration.
//!
//! Re-running a pipeline on identical inputs produces identical output:
//! no randomness, no wall-clock reads inside the math.

mod aggregator;
mod benchmark;
mod scorer;

pub use aggregator::aggregate;
pub use benchmark::{benchmark, InsightTrigger, PeerBenchmark};
pub use scorer::{CompetitiveSignals, ContentSignals, NodeSignals, Scorer};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::Config;
use crate::domain::{
    AggregatedMetrics, MetricFact, NodeId, OpportunityScore, Product, RunDiagnostics,
    TaxonomyTree,
};
use crate::error::{PhaseError, Result};
use crate::matcher::{match_all, MatchIndex, MatchOutcome};

/// Pipeline phases in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Pending,
    Matched,
    Aggregated,
    Scored,
}

/// Immutable progress snapshot, refreshed after each phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub phase: Phase,
    pub facts_total: usize,
    pub facts_matched: usize,
    pub nodes_total: usize,
    pub nodes_aggregated: usize,
    pub nodes_scored: usize,
}

/// Everything a run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationReport {
    pub metrics: BTreeMap<NodeId, AggregatedMetrics>,
    pub scores: BTreeMap<NodeId, OpportunityScore>,
    pub benchmarks: BTreeMap<NodeId, PeerBenchmark>,
    pub diagnostics: RunDiagnostics,
}

/// One tenant's aggregation run over one tree and fact batch.
pub struct AggregationRun {
    config: Config,
    tree: TaxonomyTree,
    facts: Vec<MetricFact>,
    products: Vec<Product>,
    signals: BTreeMap<NodeId, NodeSignals>,

    match_outcome: Option<MatchOutcome>,
    metrics: Option<BTreeMap<NodeId, AggregatedMetrics>>,
    scores: Option<BTreeMap<NodeId, OpportunityScore>>,
    benchmarks: Option<BTreeMap<NodeId, PeerBenchmark>>,
}

impl AggregationRun {
    /// Set up a run. Products are attached to their owning nodes; a
    /// product referencing an unknown node is skipped with a warning.
    #[must_use]
    pub fn new(
        config: Config,
        mut tree: TaxonomyTree,
        facts: Vec<MetricFact>,
        products: Vec<Product>,
    ) -> Self {
        for product in &products {
            if tree
                .attach_product(&product.node_id, product.id.clone())
                .is_err()
            {
                warn!(product = %product.id, node = %product.node_id, "product references unknown node, skipping");
            }
        }
        Self {
            config,
            tree,
            facts,
            products,
            signals: BTreeMap::new(),
            match_outcome: None,
            metrics: None,
            scores: None,
            benchmarks: None,
        }
    }

    /// Supply optional per-node signals (position, pricing, content).
    #[must_use]
    pub fn with_signals(mut self, signals: BTreeMap<NodeId, NodeSignals>) -> Self {
        self.signals = signals;
        self
    }

    /// Phase 1: resolve every fact to a node.
    pub fn run_matching(&mut self) {
        if self.match_outcome.is_some() {
            return;
        }
        let index = MatchIndex::build(&self.tree, &self.products, self.config.matching);
        let outcome = match_all(&self.facts, &index);
        info!(
            total = outcome.diagnostics.total,
            matched = outcome.diagnostics.matched,
            "matching phase complete"
        );
        self.match_outcome = Some(outcome);
    }

    /// Phase 2: roll totals up the tree. Requires a complete match phase.
    pub fn run_aggregation(&mut self) -> Result<()> {
        let outcome = self.match_outcome.as_ref().ok_or(PhaseError::OutOfOrder {
            required: "match",
            attempted: "aggregate",
        })?;
        let metrics = aggregate(&self.tree, &self.facts, &outcome.results);
        info!(nodes = metrics.len(), "aggregation phase complete");
        self.metrics = Some(metrics);
        Ok(())
    }

    /// Phase 3: score and benchmark every node. Requires complete totals.
    pub fn run_scoring(&mut self) -> Result<()> {
        let metrics = self.metrics.as_ref().ok_or(PhaseError::OutOfOrder {
            required: "aggregate",
            attempted: "score",
        })?;
        let scorer = Scorer::new(&self.config.scoring);
        let empty = NodeSignals::default();
        let mut scores = BTreeMap::new();
        let mut benchmarks = BTreeMap::new();
        for node in self.tree.nodes() {
            let Some(node_metrics) = metrics.get(&node.id) else {
                continue;
            };
            let signals = self.signals.get(&node.id).unwrap_or(&empty);
            scores.insert(
                node.id.clone(),
                scorer.score_node(&node.id, node_metrics, signals),
            );
            let peer_metrics: Vec<&AggregatedMetrics> = self
                .tree
                .peers_of(&node.id)
                .iter()
                .filter_map(|peer| metrics.get(&peer.id))
                .collect();
            benchmarks.insert(
                node.id.clone(),
                benchmark(&node.id, node_metrics, &peer_metrics),
            );
        }
        info!(nodes = scores.len(), "scoring phase complete");
        self.scores = Some(scores);
        self.benchmarks = Some(benchmarks);
        Ok(())
    }

    /// Run all phases in order and produce the report.
    pub fn execute(mut self) -> Result<AggregationReport> {
        self.run_matching();
        self.run_aggregation()?;
        self.run_scoring()?;
        Ok(self.into_report())
    }

    /// Current progress snapshot.
    #[must_use]
    pub fn progress(&self) -> Progress {
        let phase = if self.scores.is_some() {
            Phase::Scored
        } else if self.metrics.is_some() {
            Phase::Aggregated
        } else if self.match_outcome.is_some() {
            Phase::Matched
        } else {
            Phase::Pending
        };
        Progress {
            phase,
            facts_total: self.facts.len(),
            facts_matched: self
                .match_outcome
                .as_ref()
                .map_or(0, |o| o.diagnostics.matched),
            nodes_total: self.tree.len(),
            nodes_aggregated: self.metrics.as_ref().map_or(0, BTreeMap::len),
            nodes_scored: self.scores.as_ref().map_or(0, BTreeMap::len),
        }
    }

    /// The tree this run operates on.
    #[must_use]
    pub fn tree(&self) -> &TaxonomyTree {
        &self.tree
    }

    fn into_report(self) -> AggregationReport {
        let matching = self
            .match_outcome
            .map(|o| o.diagnostics)
            .unwrap_or_default();
        AggregationReport {
            metrics: self.metrics.unwrap_or_default(),
            scores: self.scores.unwrap_or_default(),
            benchmarks: self.benchmarks.unwrap_or_default(),
            diagnostics: RunDiagnostics {
                matching,
                tree_anomalies: self.tree.anomalies().to_vec(),
            },
        }
    }
}
