//! Serialized form of a domain tree
//!
//! A document nests nodes under their parent in tree order. The level list
//! is not stored; it comes from the schema template named by `schema`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::domain::arena::{NodeData, NodeId};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::network::Network;
use crate::domain::schema::SchemaTemplate;
use crate::domain::tree::DomainTree;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainDocument {
    pub name: String,
    pub schema: String,
    #[serde(default)]
    pub version: u64,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub network: Network,
    #[serde(default)]
    pub children: Vec<NodeDocument>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDocument {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub network: Network,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeDocument>,
}

impl DomainTree {
    pub fn to_document(&self) -> DomainDocument {
        DomainDocument {
            name: self.name().to_string(),
            schema: self.schema().name().to_string(),
            version: self.version(),
            timestamp: self.timestamp(),
            network: self.network(),
            children: self.child_documents(self.root()),
        }
    }

    fn child_documents(&self, id: NodeId) -> Vec<NodeDocument> {
        self.children(id)
            .unwrap_or_default()
            .iter()
            .filter_map(|&child| {
                let data = self.node(child).ok()?;
                Some(NodeDocument {
                    kind: data.kind.clone(),
                    name: data.name.clone(),
                    network: data.network,
                    children: self.child_documents(child),
                })
            })
            .collect()
    }

    /// Rebuild a tree from its document and the template it names.
    ///
    /// The whole tree is validated after construction; any rule violation
    /// fails with `InvalidTree` listing every offending node.
    #[instrument(level = "debug", skip_all, fields(domain = %doc.name))]
    pub fn from_document(doc: &DomainDocument, schema: SchemaTemplate) -> DomainResult<Self> {
        if doc.schema != schema.name() {
            return Err(DomainError::SchemaMismatch {
                expected: schema.name().to_string(),
                found: doc.schema.clone(),
            });
        }
        let mut tree = DomainTree::with_network(doc.name.clone(), schema, doc.network);
        let mut pending: Vec<(NodeId, &NodeDocument)> = doc
            .children
            .iter()
            .map(|child| (tree.root(), child))
            .collect();
        // Breadth-first keeps each sibling list in document order.
        let mut cursor = 0;
        while cursor < pending.len() {
            let (parent, node) = pending[cursor];
            cursor += 1;
            let id = tree.attach_unchecked(
                NodeData {
                    kind: node.kind.clone(),
                    name: node.name.clone(),
                    network: node.network,
                },
                parent,
            );
            pending.extend(node.children.iter().map(|child| (id, child)));
        }
        tree.validate_tree(None)?;
        tree.mark_saved(doc.version, doc.timestamp);
        Ok(tree)
    }
}
