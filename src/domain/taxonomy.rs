//! Taxonomy tree built from flat category-path strings.
//!
//! The tree is an arena: a flat `Vec` of nodes indexed by position, with
//! parent/child links stored as arena indices and a side map from
//! [`NodeId`] to index. No live object pointers, no cycles, and the whole
//! structure can be read from multiple matcher workers at once.
//!
//! # Building
//!
//! [`TaxonomyTree::build`] consumes raw path strings like
//! `"Electronics > Phones > Smartphones"` (also `/` and `|` delimited),
//! normalizes them, and creates one node per path prefix. Node ids derive
//! deterministically from the normalized path, so re-imports with the same
//! category strings yield the same ids.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::diagnostics::TreeAnomaly;
use crate::domain::id::{NodeId, ProductId};
use crate::error::TaxonomyError;

/// One taxonomy node stored in the arena.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxonomyNode {
    pub id: NodeId,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    /// Root depth is 0; `depth(child) == depth(parent) + 1`.
    pub depth: usize,
    /// Humanized segment titles from root to this node.
    pub path: Vec<String>,
    /// Display title, the last path segment.
    pub title: String,
    /// Canonical URL for exact matching, when the feed supplies one.
    pub url: Option<String>,
    /// Products owned directly by this node (empty for pure categories).
    pub direct_product_ids: Vec<ProductId>,
}

impl TaxonomyNode {
    /// The canonical `" > "`-joined display path.
    #[must_use]
    pub fn path_string(&self) -> String {
        self.path.join(" > ")
    }
}

/// A pre-built node row, for ingesting taxonomies persisted elsewhere.
///
/// Unlike [`TaxonomyTree::build`], this path can surface dangling parent
/// references, which are degraded to roots and flagged rather than
/// rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRow {
    pub id: NodeId,
    pub parent_id: Option<NodeId>,
    pub path: Vec<String>,
    pub url: Option<String>,
}

/// Arena-backed taxonomy forest.
#[derive(Debug, Clone, Default)]
pub struct TaxonomyTree {
    nodes: Vec<TaxonomyNode>,
    index: HashMap<NodeId, usize>,
    anomalies: Vec<TreeAnomaly>,
}

impl TaxonomyTree {
    /// Build a tree from raw category-path strings.
    ///
    /// Empty input yields an empty tree. A path whose id collides with an
    /// existing node from a different parent chain is recorded as a
    /// [`TreeAnomaly::PathConflict`] and that subtree is skipped; sibling
    /// paths still build.
    #[must_use]
    pub fn build<I, S>(category_paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tree = Self::default();
        for raw in category_paths {
            let segments = normalize_path(raw.as_ref());
            if segments.is_empty() {
                continue;
            }
            if let Err(TaxonomyError::Conflict {
                path,
                existing,
                conflicting,
            }) = tree.insert_path(&segments)
            {
                warn!(%path, %existing, %conflicting, "taxonomy path conflict, skipping subtree");
                tree.anomalies.push(TreeAnomaly::PathConflict {
                    path,
                    existing,
                    conflicting,
                });
            }
        }
        tree
    }

    /// Ingest pre-built node rows.
    ///
    /// A row whose `parent_id` is not present in the row set is treated as
    /// a root and flagged as [`TreeAnomaly::DanglingParent`]; ingestion
    /// never fails on a malformed forest.
    #[must_use]
    pub fn from_nodes(rows: Vec<NodeRow>) -> Self {
        let mut tree = Self::default();
        let known: HashMap<NodeId, usize> = rows
            .iter()
            .enumerate()
            .map(|(idx, row)| (row.id.clone(), idx))
            .collect();

        for row in &rows {
            let parent = match &row.parent_id {
                Some(pid) => match known.get(pid) {
                    Some(idx) => Some(*idx),
                    None => {
                        warn!(node = %row.id, parent = %pid, "dangling parent, treating node as root");
                        tree.anomalies.push(TreeAnomaly::DanglingParent {
                            node_id: row.id.clone(),
                            missing_parent: pid.clone(),
                        });
                        None
                    }
                },
                None => None,
            };
            let title = row.path.last().cloned().unwrap_or_else(|| row.id.to_string());
            tree.nodes.push(TaxonomyNode {
                id: row.id.clone(),
                parent,
                children: Vec::new(),
                depth: 0,
                path: row.path.clone(),
                title,
                url: row.url.clone(),
                direct_product_ids: Vec::new(),
            });
            tree.index.insert(row.id.clone(), tree.nodes.len() - 1);
        }

        // Wire children and recompute depths from the resolved parents.
        for idx in 0..tree.nodes.len() {
            if let Some(parent) = tree.nodes[idx].parent {
                tree.nodes[parent].children.push(idx);
            }
        }
        for idx in 0..tree.nodes.len() {
            let depth = tree.depth_of(idx);
            tree.nodes[idx].depth = depth;
        }
        tree
    }

    fn depth_of(&self, mut idx: usize) -> usize {
        let mut depth = 0;
        let mut seen = 0;
        while let Some(parent) = self.nodes[idx].parent {
            depth += 1;
            idx = parent;
            seen += 1;
            // Malformed input could cycle; bail at node count.
            if seen > self.nodes.len() {
                return depth;
            }
        }
        depth
    }

    fn insert_path(&mut self, segments: &[String]) -> Result<usize, TaxonomyError> {
        let mut parent: Option<usize> = None;
        let mut last = 0;
        for end in 1..=segments.len() {
            let prefix = &segments[..end];
            let id = NodeId::from_path(prefix);
            let found = self.index.get(&id).copied();
            last = match found {
                Some(idx) => {
                    let existing = &self.nodes[idx];
                    if existing.parent != parent {
                        let existing_chain = existing
                            .parent
                            .map(|p| self.nodes[p].path_string())
                            .unwrap_or_else(|| "<root>".to_string());
                        let conflicting_chain = parent
                            .map(|p| self.nodes[p].path_string())
                            .unwrap_or_else(|| "<root>".to_string());
                        return Err(TaxonomyError::Conflict {
                            path: prefix.join(" > "),
                            existing: existing_chain,
                            conflicting: conflicting_chain,
                        });
                    }
                    idx
                }
                None => {
                    let humanized: Vec<String> =
                        prefix.iter().map(|s| humanize_segment(s)).collect();
                    let title = humanized.last().cloned().unwrap_or_default();
                    let node = TaxonomyNode {
                        id: id.clone(),
                        parent,
                        children: Vec::new(),
                        depth: end - 1,
                        path: humanized,
                        title,
                        url: None,
                        direct_product_ids: Vec::new(),
                    };
                    self.nodes.push(node);
                    let idx = self.nodes.len() - 1;
                    self.index.insert(id, idx);
                    if let Some(p) = parent {
                        self.nodes[p].children.push(idx);
                    }
                    idx
                }
            };
            parent = Some(last);
        }
        Ok(last)
    }

    /// Attach a product to the node owning it directly.
    pub fn attach_product(&mut self, node_id: &NodeId, product_id: ProductId) -> Result<(), TaxonomyError> {
        let idx = self
            .index
            .get(node_id)
            .copied()
            .ok_or_else(|| TaxonomyError::UnknownNode(node_id.to_string()))?;
        self.nodes[idx].direct_product_ids.push(product_id);
        Ok(())
    }

    /// Set a node's canonical URL for exact matching.
    pub fn set_url(&mut self, node_id: &NodeId, url: impl Into<String>) -> Result<(), TaxonomyError> {
        let idx = self
            .index
            .get(node_id)
            .copied()
            .ok_or_else(|| TaxonomyError::UnknownNode(node_id.to_string()))?;
        self.nodes[idx].url = Some(url.into());
        Ok(())
    }

    /// Look up a node by id.
    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&TaxonomyNode> {
        self.index.get(id).map(|&idx| &self.nodes[idx])
    }

    /// Look up a node by arena index.
    #[must_use]
    pub fn node_at(&self, idx: usize) -> Option<&TaxonomyNode> {
        self.nodes.get(idx)
    }

    /// Arena index for a node id.
    #[must_use]
    pub fn index_of(&self, id: &NodeId) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// All nodes in arena order.
    #[must_use]
    pub fn nodes(&self) -> &[TaxonomyNode] {
        &self.nodes
    }

    /// Number of nodes in the forest.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the forest is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Root nodes (no parent, including dangling-parent degradations).
    #[must_use]
    pub fn roots(&self) -> Vec<&TaxonomyNode> {
        self.nodes.iter().filter(|n| n.parent.is_none()).collect()
    }

    /// Ordered ancestor chain from the node itself up to its root.
    #[must_use]
    pub fn ancestors_of(&self, id: &NodeId) -> Vec<&TaxonomyNode> {
        let mut chain = Vec::new();
        let Some(mut idx) = self.index_of(id) else {
            return chain;
        };
        loop {
            chain.push(&self.nodes[idx]);
            match self.nodes[idx].parent {
                Some(parent) => idx = parent,
                None => break,
            }
        }
        chain
    }

    /// All nodes at the same depth as `id`, excluding the node itself.
    #[must_use]
    pub fn peers_of(&self, id: &NodeId) -> Vec<&TaxonomyNode> {
        let Some(idx) = self.index_of(id) else {
            return Vec::new();
        };
        let depth = self.nodes[idx].depth;
        self.nodes
            .iter()
            .enumerate()
            .filter(|(i, n)| *i != idx && n.depth == depth)
            .map(|(_, n)| n)
            .collect()
    }

    /// Direct children of a node.
    #[must_use]
    pub fn children_of(&self, id: &NodeId) -> Vec<&TaxonomyNode> {
        match self.index_of(id) {
            Some(idx) => self.nodes[idx]
                .children
                .iter()
                .map(|&c| &self.nodes[c])
                .collect(),
            None => Vec::new(),
        }
    }

    /// Arena indices ordered by decreasing depth (deepest first).
    ///
    /// Visiting in this order guarantees every child is final before its
    /// parent is visited, which is what the aggregator needs.
    #[must_use]
    pub fn indices_deepest_first(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.nodes.len()).collect();
        order.sort_by(|&a, &b| {
            self.nodes[b]
                .depth
                .cmp(&self.nodes[a].depth)
                .then_with(|| self.nodes[a].id.cmp(&self.nodes[b].id))
        });
        order
    }

    /// Structural anomalies recorded during build/ingest.
    #[must_use]
    pub fn anomalies(&self) -> &[TreeAnomaly] {
        &self.anomalies
    }
}

/// Normalize one raw category path into trimmed segments.
///
/// Splits on `>`, `/`, and `|`; trims whitespace; drops empty segments so
/// runs of separators collapse.
#[must_use]
pub fn normalize_path(raw: &str) -> Vec<String> {
    raw.split(['>', '/', '|'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Humanize a path segment for display: title-case each word.
///
/// Only the first code point of each word is uppercased. The remainder is
/// lowercased only when it is pure ASCII - force-lowercasing non-ASCII
/// text can change meaning in some scripts, so it is left untouched.
#[must_use]
pub fn humanize_segment(segment: &str) -> String {
    segment
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    let rest: String = chars.collect();
                    let rest = if rest.is_ascii() {
                        rest.to_ascii_lowercase()
                    } else {
                        rest
                    };
                    first.to_uppercase().collect::<String>() + &rest
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
