//! Domain tree engine
//!
//! A [`DomainTree`] is one hierarchical allocation tree bound to a schema
//! template. All structural rules live here:
//!
//! - type order: a node sits exactly one schema level below its parent,
//!   level-0 nodes hang directly under the domain root
//! - containment: a node's network lies inside its parent's network
//!   (equal blocks are allowed)
//! - sibling names are unique, compared case-insensitively
//! - sibling networks never overlap
//!
//! Every mutation validates first and commits afterwards, so a rejected
//! call leaves the tree untouched.

use std::fmt;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use crate::domain::arena::{NodeData, NodeId, TreeArena, TreeNode};
use crate::domain::error::{DomainError, DomainResult, SiblingRule, Violation};
use crate::domain::network::{Network, MAX_PREFIX};
use crate::domain::schema::SchemaTemplate;

/// Type label carried by the root node of every domain tree.
pub const ROOT_KIND: &str = "domain";

/// Default number of blocks returned when enumerating free space at a
/// fixed prefix length.
pub const DEFAULT_AVAILABLE_LIMIT: usize = 10;

/// Separator of name paths, e.g. `Australia/Brisbane`.
pub const PATH_SEPARATOR: char = '/';

/// Partial update of a node. Only the fields present are validated and
/// applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodePatch {
    pub name: Option<String>,
    pub network: Option<String>,
}

impl NodePatch {
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            network: None,
        }
    }

    pub fn network(network: impl Into<String>) -> Self {
        Self {
            name: None,
            network: Some(network.into()),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = Some(network.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.network.is_none()
    }
}

/// Why a [`NodePatch`] was not applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The new network would no longer contain this child block
    ChildOutside(Network),
    /// The new network would leave the parent's block
    NotInParent(Network),
    /// The new value collides with a sibling
    Sibling { rule: SiblingRule, value: String },
    /// The root carries the domain name, which is also its store key
    RootRename,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::ChildOutside(child) => {
                write!(f, "child network {} would fall outside", child)
            }
            Rejection::NotInParent(parent) => {
                write!(f, "network would leave parent network {}", parent)
            }
            Rejection::Sibling { rule, value } => {
                write!(f, "{} conflicts with sibling '{}'", rule, value)
            }
            Rejection::RootRename => write!(f, "the domain root cannot be renamed"),
        }
    }
}

/// Result of [`DomainTree::set_node`]: either applied, or rejected with
/// nothing changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetOutcome {
    Applied,
    Rejected(Rejection),
}

impl SetOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, SetOutcome::Applied)
    }
}

/// Where a validated candidate node would be attached.
struct Placement {
    parent: NodeId,
    network: Network,
}

/// One allocation tree bound to a schema template.
#[derive(Debug, Clone)]
pub struct DomainTree {
    nodes: TreeArena,
    root: NodeId,
    schema: SchemaTemplate,
    /// Version this tree was loaded with, 0 if never persisted
    version: u64,
    timestamp: DateTime<Utc>,
}

impl DomainTree {
    /// Create an empty domain spanning the whole address space.
    pub fn new(name: impl Into<String>, schema: SchemaTemplate) -> Self {
        Self::with_network(name, schema, Network::FULL)
    }

    /// Create an empty domain whose root carries `network`.
    pub fn with_network(name: impl Into<String>, schema: SchemaTemplate, network: Network) -> Self {
        let mut nodes = TreeArena::new();
        let root = nodes.insert_node(
            NodeData {
                kind: ROOT_KIND.to_string(),
                name: name.into(),
                network,
            },
            None,
        );
        Self {
            nodes,
            root,
            schema,
            version: 0,
            timestamp: Utc::now(),
        }
    }

    pub fn name(&self) -> &str {
        self.data(self.root).map_or("", |data| data.name.as_str())
    }

    /// Network of the root node.
    pub fn network(&self) -> Network {
        self.data(self.root).map_or(Network::FULL, |data| data.network)
    }

    pub fn schema(&self) -> &SchemaTemplate {
        &self.schema
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if the tree holds nothing but its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Record a successful save.
    pub(crate) fn mark_saved(&mut self, version: u64, timestamp: DateTime<Utc>) {
        self.version = version;
        self.timestamp = timestamp;
    }

    /// Attach a node without validation. Only used while rebuilding a tree
    /// from a document, which is validated as a whole afterwards.
    pub(crate) fn attach_unchecked(&mut self, data: NodeData, parent: NodeId) -> NodeId {
        self.nodes.insert_node(data, Some(parent))
    }

    fn tree_node(&self, id: NodeId) -> DomainResult<&TreeNode> {
        self.nodes
            .get_node(id)
            .ok_or_else(|| DomainError::NodeNotFound(id.to_string()))
    }

    fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get_node(id).map(|node| &node.data)
    }

    pub fn node(&self, id: NodeId) -> DomainResult<&NodeData> {
        self.tree_node(id).map(|node| &node.data)
    }

    pub fn parent(&self, id: NodeId) -> DomainResult<Option<NodeId>> {
        self.tree_node(id).map(|node| node.parent)
    }

    pub fn children(&self, id: NodeId) -> DomainResult<&[NodeId]> {
        self.tree_node(id).map(|node| node.children.as_slice())
    }

    /// Pre-order traversal starting at the root.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &NodeData)> {
        self.nodes.iter().map(|(id, node)| (id, &node.data))
    }

    /// Schema level index of a node, `None` for the root.
    pub fn level_of(&self, id: NodeId) -> DomainResult<Option<usize>> {
        let node = self.tree_node(id)?;
        if id == self.root {
            return Ok(None);
        }
        self.schema
            .level_of(&node.data.kind)
            .map(Some)
            .ok_or_else(|| self.unknown_kind(&node.data.kind))
    }

    fn unknown_kind(&self, kind: &str) -> DomainError {
        DomainError::InvalidNodeType {
            kind: kind.to_string(),
            reason: format!("not a level of schema '{}'", self.schema.name()),
        }
    }

    // ------------------------------------------------------------
    // Validation building blocks, shared by add, set and validate
    // ------------------------------------------------------------

    /// Type-order check. Returns the node the candidate attaches to.
    fn check_kind(&self, kind: &str, parent: Option<NodeId>) -> DomainResult<NodeId> {
        let level = self
            .schema
            .level_of(kind)
            .ok_or_else(|| self.unknown_kind(kind))?;

        let Some(parent) = parent else {
            if level != 0 {
                return Err(DomainError::CantAddParentlessNode(kind.to_string()));
            }
            return Ok(self.root);
        };

        let expected = match self.level_of(parent)? {
            None => 0,
            Some(parent_level) => parent_level + 1,
        };
        if level != expected {
            let parent_kind = &self.tree_node(parent)?.data.kind;
            let reason = match self.schema.level_at(expected) {
                Some(expected_kind) => {
                    format!("'{}' children must be '{}'", parent_kind, expected_kind)
                }
                None => format!("'{}' is the last schema level", parent_kind),
            };
            return Err(DomainError::InvalidNodeType {
                kind: kind.to_string(),
                reason,
            });
        }
        Ok(parent)
    }

    /// Names must stay addressable through [`find_path`](Self::find_path).
    fn check_name(name: &str) -> DomainResult<()> {
        let reason = if name.trim().is_empty() {
            "name is blank".to_string()
        } else if name.contains(PATH_SEPARATOR) {
            format!("name contains the path separator '{}'", PATH_SEPARATOR)
        } else {
            return Ok(());
        };
        Err(DomainError::InvalidNodeName {
            name: name.to_string(),
            reason,
        })
    }

    fn check_containment(parent: Network, network: Network) -> DomainResult<()> {
        if !parent.contains(&network) {
            return Err(DomainError::AssignedIPNotInSubnet { network, parent });
        }
        Ok(())
    }

    /// First sibling colliding with the candidate name or network.
    fn sibling_conflict(
        &self,
        siblings: &[NodeId],
        skip: Option<NodeId>,
        name: Option<&str>,
        network: Option<Network>,
    ) -> Option<(SiblingRule, String)> {
        let name = name.map(str::to_lowercase);
        for &sibling in siblings.iter().filter(|&&s| Some(s) != skip) {
            let Some(data) = self.data(sibling) else {
                continue;
            };
            if let Some(name) = &name {
                if data.name.to_lowercase() == *name {
                    return Some((SiblingRule::Name, data.name.clone()));
                }
            }
            if let Some(network) = network {
                if data.network.overlaps(&network) {
                    return Some((SiblingRule::Network, data.network.to_string()));
                }
            }
        }
        None
    }

    fn check_candidate(
        &self,
        kind: &str,
        parent: Option<NodeId>,
        name: &str,
        network: Network,
        siblings: Option<&[NodeId]>,
    ) -> DomainResult<Placement> {
        Self::check_name(name)?;
        let parent = self.check_kind(kind, parent)?;
        let parent_node = self.tree_node(parent)?;
        Self::check_containment(parent_node.data.network, network)?;
        let siblings = siblings.unwrap_or(&parent_node.children);
        if let Some((rule, value)) = self.sibling_conflict(siblings, None, Some(name), Some(network)) {
            return Err(DomainError::DuplicateSibling { rule, value });
        }
        Ok(Placement { parent, network })
    }

    // ------------------------------------------------------------
    // Engine operations
    // ------------------------------------------------------------

    /// Validate a node insertion without attaching anything.
    ///
    /// `parent = None` places the node directly under the domain root, which
    /// only level-0 types may do. An empty `network` means the whole address
    /// space.
    pub fn check_add(
        &self,
        kind: &str,
        parent: Option<NodeId>,
        name: &str,
        network: &str,
    ) -> DomainResult<()> {
        let network = Network::parse(network)?;
        self.check_candidate(kind, parent, name, network, None)
            .map(|_| ())
    }

    /// Validate and attach a new node, returning its handle.
    #[instrument(level = "debug", skip(self))]
    pub fn add_node(
        &mut self,
        kind: &str,
        parent: Option<NodeId>,
        name: &str,
        network: &str,
    ) -> DomainResult<NodeId> {
        let network = Network::parse(network)?;
        let placement = self.check_candidate(kind, parent, name, network, None)?;
        let id = self.nodes.insert_node(
            NodeData {
                kind: kind.to_string(),
                name: name.to_string(),
                network: placement.network,
            },
            Some(placement.parent),
        );
        debug!("add_node: attached {} {} {} as {}", kind, name, network, id);
        Ok(id)
    }

    /// All nodes of `kind`, optionally filtered by a case-insensitive name,
    /// in pre-order.
    pub fn get_node(&self, kind: &str, name: Option<&str>) -> Vec<NodeId> {
        let name = name.map(str::to_lowercase);
        self.iter()
            .filter(|(id, _)| *id != self.root)
            .filter(|(_, data)| data.kind == kind)
            .filter(|(_, data)| {
                name.as_ref()
                    .map_or(true, |name| data.name.to_lowercase() == *name)
            })
            .map(|(id, _)| id)
            .collect()
    }

    /// Deepest node at or below `start` whose network contains `network`.
    ///
    /// Sibling networks never overlap, so at most one child can contain the
    /// query at each level. Returns `start` (the root by default) if no child
    /// does.
    #[instrument(level = "debug", skip(self))]
    pub fn search_by_network(&self, network: Network, start: Option<NodeId>) -> DomainResult<NodeId> {
        let mut current = start.unwrap_or(self.root);
        loop {
            let node = self.tree_node(current)?;
            let next = node.children.iter().copied().find(|&child| {
                self.data(child)
                    .is_some_and(|data| data.network.contains(&network))
            });
            match next {
                Some(child) => current = child,
                None => return Ok(current),
            }
        }
    }

    /// Validate a patch without applying it.
    ///
    /// Errors are reserved for invalid input (unknown node, unparsable
    /// network, unaddressable name); a patch that would break a structural
    /// rule yields [`SetOutcome::Rejected`]. The root keeps its name.
    pub fn check_set(&self, id: NodeId, patch: &NodePatch) -> DomainResult<SetOutcome> {
        let node = self.tree_node(id)?;
        let network = patch.network.as_deref().map(Network::parse).transpose()?;
        if let Some(name) = patch.name.as_deref() {
            Self::check_name(name)?;
        }
        let parent = node.parent.map(|p| self.tree_node(p)).transpose()?;
        let siblings: &[NodeId] = parent.map(|p| p.children.as_slice()).unwrap_or_default();

        if let Some(network) = network {
            for child in node.children.iter().filter_map(|&c| self.data(c)) {
                if !network.contains(&child.network) {
                    return Ok(SetOutcome::Rejected(Rejection::ChildOutside(child.network)));
                }
            }
            if let Some(parent) = parent {
                if !parent.data.network.contains(&network) {
                    return Ok(SetOutcome::Rejected(Rejection::NotInParent(
                        parent.data.network,
                    )));
                }
            }
            if let Some((rule, value)) = self.sibling_conflict(siblings, Some(id), None, Some(network)) {
                return Ok(SetOutcome::Rejected(Rejection::Sibling { rule, value }));
            }
        }

        if let Some(name) = patch.name.as_deref() {
            if id == self.root {
                return Ok(SetOutcome::Rejected(Rejection::RootRename));
            }
            if let Some((rule, value)) = self.sibling_conflict(siblings, Some(id), Some(name), None) {
                return Ok(SetOutcome::Rejected(Rejection::Sibling { rule, value }));
            }
        }

        Ok(SetOutcome::Applied)
    }

    /// Validate and apply a patch. A rejected patch changes nothing.
    #[instrument(level = "debug", skip(self))]
    pub fn set_node(&mut self, id: NodeId, patch: &NodePatch) -> DomainResult<SetOutcome> {
        let outcome = self.check_set(id, patch)?;
        if let SetOutcome::Rejected(reason) = &outcome {
            debug!("set_node: {} rejected: {}", id, reason);
            return Ok(outcome);
        }
        let network = patch.network.as_deref().map(Network::parse).transpose()?;
        let node = self
            .nodes
            .get_node_mut(id)
            .ok_or_else(|| DomainError::NodeNotFound(id.to_string()))?;
        if let Some(name) = &patch.name {
            node.data.name = name.clone();
        }
        if let Some(network) = network {
            node.data.network = network;
        }
        Ok(outcome)
    }

    /// Detach a node and its whole subtree.
    ///
    /// Without `force` this always fails with `ConfirmDelete`.
    #[instrument(level = "debug", skip(self))]
    pub fn remove_node(&mut self, id: NodeId, force: bool) -> DomainResult<usize> {
        let node = self.tree_node(id)?;
        if id == self.root {
            return Err(DomainError::RootNode);
        }
        if !force {
            return Err(DomainError::ConfirmDelete(node.data.name.clone()));
        }
        let removed = self.nodes.remove_subtree(id);
        debug!("remove_node: removed {} node(s) below {}", removed, id);
        Ok(removed)
    }

    /// Re-derive every node below `start` (the root by default) through the
    /// same checks [`add_node`](Self::add_node) applies, in original sibling
    /// order: each node is checked against its parent and the siblings that
    /// precede it.
    ///
    /// Never mutates. The subtree of a node that fails is not descended
    /// into, since it cannot be re-derived.
    #[instrument(level = "debug", skip(self))]
    pub fn validate_tree(&self, start: Option<NodeId>) -> DomainResult<()> {
        let start = start.unwrap_or(self.root);
        self.tree_node(start)?;

        let mut violations = Vec::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if let Err(error) = self.check_existing(id) {
                violations.push(Violation {
                    path: self.path_of(id).unwrap_or_else(|_| id.to_string()),
                    error,
                });
                continue;
            }
            let children = self.children(id)?;
            stack.extend(children.iter().rev().copied());
        }

        if violations.is_empty() {
            Ok(())
        } else {
            debug!("validate_tree: {} violation(s)", violations.len());
            Err(DomainError::InvalidTree(violations))
        }
    }

    fn check_existing(&self, id: NodeId) -> DomainResult<()> {
        let node = self.tree_node(id)?;
        let Some(parent) = node.parent else {
            return Ok(());
        };
        let siblings = self.children(parent)?;
        let position = siblings.iter().position(|&s| s == id).unwrap_or(siblings.len());
        let parent = (parent != self.root).then_some(parent);
        self.check_candidate(
            &node.data.kind,
            parent,
            &node.data.name,
            node.data.network,
            Some(&siblings[..position]),
        )
        .map(|_| ())
    }

    /// Free blocks inside a node's network, treating direct children as used.
    ///
    /// Without `prefix`, returns the maximal free blocks in address order.
    /// With `prefix`, enumerates free sub-blocks of exactly that length in
    /// address order, stopping after `limit` results.
    #[instrument(level = "debug", skip(self))]
    pub fn available_networks(
        &self,
        id: NodeId,
        prefix: Option<u8>,
        limit: usize,
    ) -> DomainResult<Vec<Network>> {
        if let Some(prefix) = prefix {
            if prefix > MAX_PREFIX {
                return Err(DomainError::InvalidPrefixLength(prefix));
            }
        }
        let node = self.tree_node(id)?;

        let mut used: Vec<Network> = node
            .children
            .iter()
            .filter_map(|&c| self.data(c))
            .map(|data| data.network)
            .collect();
        used.sort();

        let mut free = vec![node.data.network];
        for block in &used {
            if let Some(pos) = free.iter().position(|f| f.contains(block)) {
                let host = free.swap_remove(pos);
                free.extend(host.exclude(block));
            }
        }
        free.sort();

        let Some(prefix) = prefix else {
            return Ok(free);
        };
        Ok(free
            .iter()
            .filter(|block| block.prefix() <= prefix)
            .filter_map(|block| block.subnets(prefix).ok())
            .flatten()
            .take(limit)
            .collect())
    }

    /// Resolve a `/`-separated name path from the root, case-insensitively.
    /// The empty path is the root.
    pub fn find_path(&self, path: &str) -> Option<NodeId> {
        let mut current = self.root;
        for segment in path.split(PATH_SEPARATOR).map(str::trim).filter(|s| !s.is_empty()) {
            let segment = segment.to_lowercase();
            current = self
                .nodes
                .get_node(current)?
                .children
                .iter()
                .copied()
                .find(|&c| self.data(c).is_some_and(|d| d.name.to_lowercase() == segment))?;
        }
        Some(current)
    }

    /// Name path of a node, inverse of [`find_path`](Self::find_path).
    pub fn path_of(&self, id: NodeId) -> DomainResult<String> {
        let mut names = Vec::new();
        let mut current = id;
        while current != self.root {
            let node = self.tree_node(current)?;
            names.push(node.data.name.as_str());
            current = node
                .parent
                .ok_or_else(|| DomainError::NodeNotFound(current.to_string()))?;
        }
        names.reverse();
        Ok(names.join(PATH_SEPARATOR.to_string().as_str()))
    }
}
