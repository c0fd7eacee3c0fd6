//! Domain layer: CIDR arithmetic, schema templates and the allocation tree engine
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod document;
pub mod error;
pub mod network;
pub mod schema;
pub mod tree;
pub mod tree_traits;

pub use arena::{NodeData, NodeId};
pub use document::{DomainDocument, NodeDocument};
pub use error::{DomainError, DomainResult, SiblingRule, Violation};
pub use network::{Network, Subnets, MAX_PREFIX};
pub use schema::{check_levels, LevelsError, SchemaTemplate};
pub use tree::{
    DomainTree, NodePatch, Rejection, SetOutcome, DEFAULT_AVAILABLE_LIMIT, PATH_SEPARATOR,
    ROOT_KIND,
};
pub use tree_traits::TreeNodeConvert;
