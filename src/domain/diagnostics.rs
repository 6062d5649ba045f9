//! Diagnostics surfaced alongside successful pipeline output.
//!
//! The pipeline favors producing a partial, clearly-flagged result over
//! failing a whole run for one bad record. Everything recoverable lands
//! here: match-rate statistics, unmatched subject keys, malformed inputs,
//! and tree anomalies. The serialized shape is a contract with the
//! operational monitoring layer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::id::NodeId;
use crate::matcher::MatchStrategy;

/// Structural anomalies found while building or ingesting a taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeAnomaly {
    /// A node referenced a parent that does not exist; it was treated as
    /// a root.
    DanglingParent {
        node_id: NodeId,
        missing_parent: NodeId,
    },
    /// The same normalized path resolved to two different parent chains.
    PathConflict {
        path: String,
        existing: String,
        conflicting: String,
    },
}

/// Which kind of entity a fact resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchedEntity {
    Node,
    Product,
}

/// Match-rate statistics for one batch of facts.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MatchDiagnostics {
    pub total: usize,
    pub matched: usize,
    /// matched / total; 0 for an empty batch.
    pub match_rate: f64,
    /// Matches per strategy, in cascade order.
    pub by_strategy: BTreeMap<MatchStrategy, usize>,
    /// Matches per resolved entity type.
    pub by_entity: BTreeMap<MatchedEntity, usize>,
    /// Subject keys that matched nothing, deduplicated, sorted.
    pub unmatched: Vec<String>,
    /// GTIN-length numeric keys that failed checksum validation.
    pub invalid_gtins: usize,
    /// Subject keys that looked like URLs but did not parse.
    pub malformed_urls: usize,
}

/// Full diagnostics for one aggregation run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunDiagnostics {
    pub matching: MatchDiagnostics,
    pub tree_anomalies: Vec<TreeAnomaly>,
}

impl RunDiagnostics {
    /// Whether the run saw any data-quality problem worth surfacing.
    #[must_use]
    pub fn has_anomalies(&self) -> bool {
        !self.tree_anomalies.is_empty()
            || !self.matching.unmatched.is_empty()
            || self.matching.invalid_gtins > 0
            || self.matching.malformed_urls > 0
    }
}
