//! Core domain types: taxonomy, metrics, products, scores, diagnostics.

mod diagnostics;
mod id;
mod metrics;
mod pricing;
mod product;
mod score;
mod taxonomy;

pub use diagnostics::{MatchDiagnostics, MatchedEntity, RunDiagnostics, TreeAnomaly};
pub use id::{NodeId, ProductId};
pub use metrics::{AggregatedMetrics, DateRange, MetricFact, MetricSource};
pub use pricing::{
    MarginInputs, PricingCalculator, PricingConfig, PricingFactors, PricingOpportunity,
    PricingSnapshot,
};
pub use product::Product;
pub use score::{
    categorize, CategoryThresholds, Confidence, OpportunityCategory, OpportunityScore,
    ScoreFactors, ScoreWeights,
};
pub use taxonomy::{humanize_segment, normalize_path, NodeRow, TaxonomyNode, TaxonomyTree};
