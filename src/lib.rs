//! Canopy - metric aggregation and opportunity scoring over product
//! taxonomies.
//!
//! Given a forest of category nodes with products at the leaves and raw
//! performance facts from heterogeneous sources (search console,
//! analytics, merchant feed), this crate resolves each fact to a node,
//! rolls additive metrics up every ancestor path, derives rate metrics
//! from the summed totals, and scores each node's improvement
//! opportunity.
//!
//! # The rule that matters
//!
//! Additive metrics (impressions, clicks, conversions, revenue) sum up
//! the tree. Rate metrics (CTR, conversion rate, AOV) are recomputed at
//! every node from that node's own totals - never averaged across
//! children. Two children at 3% and 1% CTR do not make a 2% parent.
//!
//! # Modules
//!
//! - [`domain`] - taxonomy arena, metric facts and aggregates, scores,
//!   pricing, diagnostics
//! - [`matcher`] - the ordered fact-to-node matching cascade and GTIN
//!   validation
//! - [`pipeline`] - the match/aggregate/score run context with phase
//!   barriers and pull-based progress
//! - [`config`] - TOML configuration with validated scoring constants
//! - [`text`] - slug and URL normalization shared by ids and matching
//! - [`error`] - error types for the crate
//!
//! # Example
//!
//! ```
//! use canopy::config::Config;
//! use canopy::domain::TaxonomyTree;
//! use canopy::pipeline::AggregationRun;
//!
//! let tree = TaxonomyTree::build(["Electronics > Phones"]);
//! let run = AggregationRun::new(Config::default(), tree, vec![], vec![]);
//! let report = run.execute().unwrap();
//! assert!(report.scores.len() == 2);
//! ```

pub mod config;
pub mod domain;
pub mod error;
pub mod matcher;
pub mod pipeline;
pub mod text;

pub use config::Config;
pub use error::{Error, Result};
pub use pipeline::{AggregationReport, AggregationRun};
