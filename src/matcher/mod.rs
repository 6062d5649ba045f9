//! Fact-to-taxonomy matching.
//!
//! Each incoming [`MetricFact`] carries a `subject_key` - a URL, product
//! id, or GTIN - and must resolve to exactly one taxonomy node before
//! aggregation. Resolution is a strict ordered cascade: the first strategy
//! that produces a match wins, never a best-score blend across strategies.
//!
//! Cascade order:
//! 1. Exact URL / identifier match (confidence 1.0)
//! 2. GTIN exact match after checksum normalization (1.0)
//! 3. Path-prefix match against node paths (0.8 floor, scaled by consumed path)
//! 4. Category-keyword containment within the URL path (0.7)
//! 5. Product-title containment within the URL path (0.7)
//! 6. No match (0.0) - counted in diagnostics, never an error
//!
//! Matching a batch is embarrassingly parallel: each fact resolves
//! independently against an immutable [`MatchIndex`], so
//! [`match_all`] fans facts out over a fixed worker pool and fans results
//! into one map before the aggregation barrier.

mod gtin;

pub use gtin::{is_gtin_length, normalize_gtin, validate_gtin};

use crate::text::{canonical_url, slugify, url_path_segments};

use std::collections::BTreeMap;
use std::fmt;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{
    MatchDiagnostics, MatchedEntity, MetricFact, NodeId, Product, ProductId, TaxonomyTree,
};

/// Closed set of matching strategies, in cascade order.
///
/// Variant order is the cascade order; `Ord` follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    ExactUrl,
    Gtin,
    PathPrefix,
    CategoryKeyword,
    TitleKeyword,
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExactUrl => write!(f, "exact_url"),
            Self::Gtin => write!(f, "gtin"),
            Self::PathPrefix => write!(f, "path_prefix"),
            Self::CategoryKeyword => write!(f, "category_keyword"),
            Self::TitleKeyword => write!(f, "title_keyword"),
        }
    }
}

/// What a fact resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum MatchTarget {
    Node(NodeId),
    Product(ProductId),
}

/// Outcome of matching one subject key.
///
/// `node_id` is the taxonomy node the fact aggregates into: the matched
/// node itself, or the owning node of a matched product. A no-match result
/// has all fields empty and confidence 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub target: Option<MatchTarget>,
    pub node_id: Option<NodeId>,
    pub strategy: Option<MatchStrategy>,
    pub confidence: f64,
}

impl MatchResult {
    #[must_use]
    pub fn no_match() -> Self {
        Self {
            target: None,
            node_id: None,
            strategy: None,
            confidence: 0.0,
        }
    }

    #[must_use]
    pub fn is_match(&self) -> bool {
        self.node_id.is_some()
    }

    fn node(node_id: NodeId, strategy: MatchStrategy, confidence: f64) -> Self {
        Self {
            target: Some(MatchTarget::Node(node_id.clone())),
            node_id: Some(node_id),
            strategy: Some(strategy),
            confidence,
        }
    }

    fn product(
        product_id: ProductId,
        owner: NodeId,
        strategy: MatchStrategy,
        confidence: f64,
    ) -> Self {
        Self {
            target: Some(MatchTarget::Product(product_id)),
            node_id: Some(owner),
            strategy: Some(strategy),
            confidence,
        }
    }
}

/// Input-quality flags raised while matching one key. Non-fatal.
#[derive(Debug, Clone, Copy, Default)]
struct MatchFlags {
    invalid_gtin: bool,
    malformed_url: bool,
}

/// Matching configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Worker threads for batch matching; 0 means one per CPU.
    #[serde(default)]
    pub workers: usize,
    /// Confidence floor for a full-segment path-prefix match.
    #[serde(default = "default_prefix_floor")]
    pub prefix_confidence_floor: f64,
    /// Fixed confidence for keyword containment strategies.
    #[serde(default = "default_keyword_confidence")]
    pub keyword_confidence: f64,
}

/// Shortest title slug eligible for keyword containment.
const MIN_KEYWORD_SLUG_LEN: usize = 3;

fn default_prefix_floor() -> f64 {
    0.8
}

fn default_keyword_confidence() -> f64 {
    0.7
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            prefix_confidence_floor: default_prefix_floor(),
            keyword_confidence: default_keyword_confidence(),
        }
    }
}

impl MatchingConfig {
    /// Effective worker count.
    #[must_use]
    pub fn effective_workers(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get().max(1)
        } else {
            self.workers
        }
    }
}

/// Immutable lookup structure built once per batch from the node and
/// product sets. Safe to share across matcher workers.
pub struct MatchIndex {
    config: MatchingConfig,
    /// Canonical URL -> (target, owning node).
    urls: BTreeMap<String, (MatchTarget, NodeId)>,
    /// Exact product id -> owning node.
    product_ids: BTreeMap<ProductId, NodeId>,
    /// Normalized GTIN -> (product, owning node).
    gtins: BTreeMap<String, (ProductId, NodeId)>,
    /// (slug path, node id), deepest paths checked first.
    node_paths: Vec<(Vec<String>, NodeId)>,
    /// (slug title, node id, depth), deepest first.
    node_titles: Vec<(String, NodeId, usize)>,
    /// (slug title, product id, owning node), sorted by product id.
    product_titles: Vec<(String, ProductId, NodeId)>,
}

impl MatchIndex {
    /// Build the index from a tree and its products.
    ///
    /// Product GTINs that fail validation are skipped here (the products
    /// themselves remain matchable by id, URL, and title).
    #[must_use]
    pub fn build(tree: &TaxonomyTree, products: &[Product], config: MatchingConfig) -> Self {
        let mut urls = BTreeMap::new();
        let mut product_ids = BTreeMap::new();
        let mut gtins = BTreeMap::new();
        let mut node_paths = Vec::new();
        let mut node_titles = Vec::new();
        let mut product_titles = Vec::new();

        for node in tree.nodes() {
            if let Some(url) = &node.url {
                if let Some(canonical) = canonical_url(url) {
                    urls.insert(
                        canonical,
                        (MatchTarget::Node(node.id.clone()), node.id.clone()),
                    );
                }
            }
            let slug_path: Vec<String> = node.path.iter().map(|s| slugify(s)).collect();
            node_paths.push((slug_path, node.id.clone()));
            let title_slug = slugify(&node.title);
            // Very short slugs ("a", "tv") match almost any path; keyword
            // containment needs at least a few characters to mean anything.
            if title_slug.len() >= MIN_KEYWORD_SLUG_LEN {
                node_titles.push((title_slug, node.id.clone(), node.depth));
            }
        }
        // Deepest first so prefix and keyword matches prefer specific nodes.
        node_paths.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.1.cmp(&b.1)));
        node_titles.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| a.1.cmp(&b.1)));

        for product in products {
            product_ids.insert(product.id.clone(), product.node_id.clone());
            if let Some(link) = &product.link {
                if let Some(canonical) = canonical_url(link) {
                    urls.entry(canonical).or_insert((
                        MatchTarget::Product(product.id.clone()),
                        product.node_id.clone(),
                    ));
                }
            }
            if let Some(gtin) = &product.gtin {
                if let Some(normalized) = normalize_gtin(gtin) {
                    gtins.entry(normalized)
                        .or_insert((product.id.clone(), product.node_id.clone()));
                }
            }
            let title_slug = slugify(&product.title);
            if title_slug.len() >= MIN_KEYWORD_SLUG_LEN {
                product_titles.push((title_slug, product.id.clone(), product.node_id.clone()));
            }
        }
        product_titles.sort_by(|a, b| a.1.cmp(&b.1));

        Self {
            config,
            urls,
            product_ids,
            gtins,
            node_paths,
            node_titles,
            product_titles,
        }
    }

    /// Run the cascade for one subject key.
    #[must_use]
    pub fn match_subject(&self, subject_key: &str) -> MatchResult {
        self.match_subject_flagged(subject_key).0
    }

    fn match_subject_flagged(&self, subject_key: &str) -> (MatchResult, MatchFlags) {
        let key = subject_key.trim();
        let mut flags = MatchFlags::default();
        if key.is_empty() {
            return (MatchResult::no_match(), flags);
        }

        // 1. Exact URL or identifier.
        if let Some(canonical) = canonical_url(key) {
            if let Some((target, node_id)) = self.urls.get(&canonical) {
                let result = match target {
                    MatchTarget::Node(id) => {
                        MatchResult::node(id.clone(), MatchStrategy::ExactUrl, 1.0)
                    }
                    MatchTarget::Product(id) => MatchResult::product(
                        id.clone(),
                        node_id.clone(),
                        MatchStrategy::ExactUrl,
                        1.0,
                    ),
                };
                return (result, flags);
            }
        } else if key.contains("://") {
            flags.malformed_url = true;
        }
        if let Some(node_id) = self.product_ids.get(&ProductId::new(key)) {
            return (
                MatchResult::product(
                    ProductId::new(key),
                    node_id.clone(),
                    MatchStrategy::ExactUrl,
                    1.0,
                ),
                flags,
            );
        }

        // 2. GTIN exact match. Numeric keys of other lengths (plain SKUs)
        // were never GTIN candidates and are not flagged.
        if key.chars().all(|c| c.is_ascii_digit()) && is_gtin_length(key.len()) {
            match normalize_gtin(key) {
                Some(normalized) => {
                    if let Some((product_id, node_id)) = self.gtins.get(&normalized) {
                        return (
                            MatchResult::product(
                                product_id.clone(),
                                node_id.clone(),
                                MatchStrategy::Gtin,
                                1.0,
                            ),
                            flags,
                        );
                    }
                }
                None => flags.invalid_gtin = true,
            }
        }

        // 3. Path prefix: deepest node whose path prefixes the URL path.
        let segments = url_path_segments(key);
        if !segments.is_empty() {
            for (slug_path, node_id) in &self.node_paths {
                if slug_path.is_empty() || slug_path.len() > segments.len() {
                    continue;
                }
                if segments[..slug_path.len()] == slug_path[..] {
                    let consumed = slug_path.len() as f64 / segments.len() as f64;
                    let floor = self.config.prefix_confidence_floor;
                    let confidence = (floor + (1.0 - floor) * consumed).min(1.0);
                    return (
                        MatchResult::node(node_id.clone(), MatchStrategy::PathPrefix, confidence),
                        flags,
                    );
                }
            }
        }

        // 4. Category keyword containment, scoped to the URL path. The
        // scheme and hostname must never credit a node: a category word in
        // a domain name says nothing about what the page is for.
        let key_slug = segments.join("-");
        if !key_slug.is_empty() {
            for (title_slug, node_id, _) in &self.node_titles {
                if key_slug.contains(title_slug.as_str()) {
                    return (
                        MatchResult::node(
                            node_id.clone(),
                            MatchStrategy::CategoryKeyword,
                            self.config.keyword_confidence,
                        ),
                        flags,
                    );
                }
            }

            // 5. Product title containment.
            for (title_slug, product_id, node_id) in &self.product_titles {
                if key_slug.contains(title_slug.as_str()) {
                    return (
                        MatchResult::product(
                            product_id.clone(),
                            node_id.clone(),
                            MatchStrategy::TitleKeyword,
                            self.config.keyword_confidence,
                        ),
                        flags,
                    );
                }
            }
        }

        (MatchResult::no_match(), flags)
    }
}

/// Result of matching a whole batch.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    /// One result per fact, in input order.
    pub results: Vec<MatchResult>,
    pub diagnostics: MatchDiagnostics,
}

/// Match every fact in the batch against the index.
///
/// Pure function of its inputs: re-running on unchanged data yields the
/// same outcome regardless of worker count or scheduling. Facts fan out
/// over a fixed worker pool and fan back into one map; nothing here blocks
/// on I/O.
#[must_use]
pub fn match_all(facts: &[MetricFact], index: &MatchIndex) -> MatchOutcome {
    let workers = index.config.effective_workers().min(facts.len().max(1));
    let resolved: DashMap<usize, (MatchResult, MatchFlags)> = DashMap::with_capacity(facts.len());

    if workers <= 1 {
        for (i, fact) in facts.iter().enumerate() {
            resolved.insert(i, index.match_subject_flagged(&fact.subject_key));
        }
    } else {
        let chunk = facts.len().div_ceil(workers);
        std::thread::scope(|scope| {
            for (w, slice) in facts.chunks(chunk).enumerate() {
                let resolved = &resolved;
                let base = w * chunk;
                scope.spawn(move || {
                    for (i, fact) in slice.iter().enumerate() {
                        resolved.insert(base + i, index.match_subject_flagged(&fact.subject_key));
                    }
                });
            }
        });
    }

    let mut results = Vec::with_capacity(facts.len());
    let mut diagnostics = MatchDiagnostics {
        total: facts.len(),
        ..MatchDiagnostics::default()
    };
    let mut unmatched = Vec::new();

    for (i, fact) in facts.iter().enumerate() {
        let (result, flags) = resolved
            .remove(&i)
            .map(|(_, v)| v)
            .unwrap_or((MatchResult::no_match(), MatchFlags::default()));
        if flags.invalid_gtin {
            diagnostics.invalid_gtins += 1;
        }
        if flags.malformed_url {
            diagnostics.malformed_urls += 1;
        }
        match (&result.strategy, &result.target) {
            (Some(strategy), Some(target)) => {
                diagnostics.matched += 1;
                *diagnostics.by_strategy.entry(*strategy).or_insert(0) += 1;
                let entity = match target {
                    MatchTarget::Node(_) => MatchedEntity::Node,
                    MatchTarget::Product(_) => MatchedEntity::Product,
                };
                *diagnostics.by_entity.entry(entity).or_insert(0) += 1;
            }
            _ => unmatched.push(fact.subject_key.clone()),
        }
        results.push(result);
    }

    unmatched.sort();
    unmatched.dedup();
    diagnostics.unmatched = unmatched;
    diagnostics.match_rate = if diagnostics.total > 0 {
        diagnostics.matched as f64 / diagnostics.total as f64
    } else {
        0.0
    };

    debug!(
        total = diagnostics.total,
        matched = diagnostics.matched,
        match_rate = diagnostics.match_rate,
        "fact matching complete"
    );

    MatchOutcome {
        results,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaxonomyTree;

    fn fixture() -> (TaxonomyTree, Vec<Product>) {
        let mut tree = TaxonomyTree::build(["Electronics > Phones", "Electronics > Laptops"]);
        tree.set_url(
            &NodeId::new("electronics-phones"),
            "https://shop.example/electronics/phones",
        )
        .unwrap();
        let products = vec![
            Product::new("sku-1", "electronics-phones", "Alpha Phone X")
                .with_link("https://shop.example/p/alpha-phone-x")
                .with_gtin("4006381333931"),
        ];
        (tree, products)
    }

    #[test]
    fn test_exact_url_wins_over_keyword() {
        let (tree, products) = fixture();
        let index = MatchIndex::build(&tree, &products, MatchingConfig::default());
        // This URL exactly matches the phones node and would also
        // keyword-match "phones"; exact must win.
        let result = index.match_subject("https://shop.example/electronics/phones/");
        assert_eq!(result.strategy, Some(MatchStrategy::ExactUrl));
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.node_id, Some(NodeId::new("electronics-phones")));
    }

    #[test]
    fn test_gtin_resolves_product_to_owner_node() {
        let (tree, products) = fixture();
        let index = MatchIndex::build(&tree, &products, MatchingConfig::default());
        // 14-digit form of the same article must still match.
        let result = index.match_subject("04006381333931");
        assert_eq!(result.strategy, Some(MatchStrategy::Gtin));
        assert_eq!(result.node_id, Some(NodeId::new("electronics-phones")));
    }

    #[test]
    fn test_path_prefix_picks_deepest_node() {
        let (tree, products) = fixture();
        let index = MatchIndex::build(&tree, &products, MatchingConfig::default());
        let result =
            index.match_subject("https://shop.example/electronics/phones/alpha-phone-x-128gb");
        assert_eq!(result.strategy, Some(MatchStrategy::PathPrefix));
        assert_eq!(result.node_id, Some(NodeId::new("electronics-phones")));
        assert!(result.confidence >= 0.8 && result.confidence < 1.0);
    }

    #[test]
    fn test_category_word_in_hostname_does_not_match() {
        let (tree, products) = fixture();
        let index = MatchIndex::build(&tree, &products, MatchingConfig::default());
        // "phones" appears only in the hostname; the path is unrelated.
        let result = index.match_subject("https://phones.example/privacy-policy");
        assert!(!result.is_match());
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_malformed_url_is_no_match_not_error() {
        let (tree, products) = fixture();
        let index = MatchIndex::build(&tree, &products, MatchingConfig::default());
        let result = index.match_subject("http://[bad url");
        assert!(!result.is_match());
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_empty_key_is_no_match() {
        let (tree, products) = fixture();
        let index = MatchIndex::build(&tree, &products, MatchingConfig::default());
        assert!(!index.match_subject("   ").is_match());
    }
}
