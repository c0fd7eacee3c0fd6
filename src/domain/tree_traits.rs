use termtree::Tree;
use tracing::instrument;

use crate::domain::arena::NodeId;
use crate::domain::tree::DomainTree;

/// Render a hierarchy as a `termtree` for terminal display.
pub trait TreeNodeConvert {
    fn to_tree_string(&self) -> Tree<String>;
}

impl TreeNodeConvert for DomainTree {
    #[instrument(level = "trace", skip(self))]
    fn to_tree_string(&self) -> Tree<String> {
        fn build_tree(tree: &DomainTree, node_idx: NodeId, parent_tree: &mut Tree<String>) {
            for &child_idx in tree.children(node_idx).unwrap_or_default() {
                if let Ok(child) = tree.node(child_idx) {
                    let mut child_tree =
                        Tree::new(format!("{} ({}) {}", child.name, child.kind, child.network));
                    build_tree(tree, child_idx, &mut child_tree);
                    parent_tree.push(child_tree);
                }
            }
        }

        let mut root = Tree::new(format!("{} [{}] {}", self.name(), self.schema().name(), self.network()));
        build_tree(self, self.root(), &mut root);
        root
    }
}
