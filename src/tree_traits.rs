//! Tree rendering for terminal output.

use termtree::Tree;
use tracing::instrument;

use crate::domain::{variance, AllocationTree, TreeNode};

/// Default number of decimals in rendered values.
pub const DEFAULT_PRECISION: usize = 2;

pub trait TreeNodeConvert {
    fn to_tree_string_with(&self, precision: usize) -> Tree<String>;

    fn to_tree_string(&self) -> Tree<String> {
        self.to_tree_string_with(DEFAULT_PRECISION)
    }
}

/// One rendered line: `Label [id] value (baseline, variance%)`.
pub fn format_node(node: &TreeNode, precision: usize) -> String {
    format!(
        "{} [{}] {:.p$} (baseline {:.p$}, variance {:.p$}%)",
        node.label(),
        node.id(),
        node.value(),
        node.original_value(),
        variance(node),
        p = precision
    )
}

impl TreeNodeConvert for TreeNode {
    fn to_tree_string_with(&self, precision: usize) -> Tree<String> {
        let leaves: Vec<_> = self
            .children()
            .iter()
            .map(|c| c.to_tree_string_with(precision))
            .collect();

        Tree::new(format_node(self, precision)).with_leaves(leaves)
    }
}

impl TreeNodeConvert for AllocationTree {
    #[instrument(level = "trace", skip(self))]
    fn to_tree_string_with(&self, precision: usize) -> Tree<String> {
        let root = format!("Total {:.p$}", self.total(), p = precision);
        if self.is_empty() {
            return Tree::new("Empty tree".to_string());
        }
        Tree::new(root).with_leaves(
            self.roots()
                .iter()
                .map(|node| node.to_tree_string_with(precision)),
        )
    }
}
