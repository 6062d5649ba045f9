//! Product records, the leaves of the taxonomy.

use serde::{Deserialize, Serialize};

use super::id::{NodeId, ProductId};

/// A product as supplied by the feed-import collaborator.
///
/// Products are matching targets: facts keyed by a product link, GTIN, or
/// title resolve here and then roll up to the owning node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    /// Node that owns this product directly.
    pub node_id: NodeId,
    pub title: String,
    pub link: Option<String>,
    pub gtin: Option<String>,
}

impl Product {
    #[must_use]
    pub fn new(id: impl Into<ProductId>, node_id: impl Into<NodeId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_id: node_id.into(),
            title: title.into(),
            link: None,
            gtin: None,
        }
    }

    #[must_use]
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    #[must_use]
    pub fn with_gtin(mut self, gtin: impl Into<String>) -> Self {
        self.gtin = Some(gtin.into());
        self
    }
}
