//! Domain-level errors (no external dependencies)

use std::fmt;

use thiserror::Error;

use crate::domain::network::Network;

/// Which sibling uniqueness rule a candidate node broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiblingRule {
    /// Case-insensitive name equality
    Name,
    /// Equal, containing or contained network
    Network,
}

impl fmt::Display for SiblingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SiblingRule::Name => write!(f, "name"),
            SiblingRule::Network => write!(f, "network"),
        }
    }
}

/// A node that failed whole-tree validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Name path of the offending node, e.g. `Australia/Brisbane`
    pub path: String,
    pub error: DomainError,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.error)
    }
}

/// Domain errors represent violations of the tree's structural rules.
/// These are independent of storage and presentation concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid IP network: '{0}'")]
    InvalidIP(String),

    #[error("invalid node type '{kind}': {reason}")]
    InvalidNodeType { kind: String, reason: String },

    #[error("node type '{0}' is not a top level and needs a parent")]
    CantAddParentlessNode(String),

    #[error("network {network} is not within parent network {parent}")]
    AssignedIPNotInSubnet { network: Network, parent: Network },

    #[error("duplicate sibling {rule}: conflicts with existing sibling '{value}'")]
    DuplicateSibling { rule: SiblingRule, value: String },

    #[error("removing '{0}' deletes its whole subtree, confirm with force")]
    ConfirmDelete(String),

    #[error("invalid node name '{name}': {reason}")]
    InvalidNodeName { name: String, reason: String },

    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("the domain root cannot be removed")]
    RootNode,

    #[error("invalid prefix length /{0}")]
    InvalidPrefixLength(u8),

    #[error("document is bound to schema '{found}', expected '{expected}'")]
    SchemaMismatch { expected: String, found: String },

    #[error("invalid domain tree: {}", join_violations(.0))]
    InvalidTree(Vec<Violation>),
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
