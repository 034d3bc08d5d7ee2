//! Tree node: the recursive owned container holding values and baselines.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque node identifier, unique across a forest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl PartialEq<str> for NodeId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

/// A budget node.
///
/// A node without children is a leaf and holds its value directly. A node with
/// children is internal; its value is derived from the children by aggregation.
/// The baseline (`original_value`) is assigned by the constructors only and is
/// carried unchanged through every update.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    id: NodeId,
    label: String,
    value: f64,
    original_value: f64,
    children: Vec<TreeNode>,
}

impl TreeNode {
    /// Create a leaf whose value and baseline are both `value`.
    pub fn leaf(id: impl Into<NodeId>, label: impl Into<String>, value: f64) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            value,
            original_value: value,
            children: Vec::new(),
        }
    }

    /// Create an internal node with an explicit baseline.
    ///
    /// The current value starts at `value` and is replaced by the children's sum
    /// once the node goes through aggregation.
    pub fn branch(
        id: impl Into<NodeId>,
        label: impl Into<String>,
        value: f64,
        children: Vec<TreeNode>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            value,
            original_value: value,
            children,
        }
    }

    /// Create a node whose baseline differs from its starting value.
    pub fn with_baseline(mut self, original_value: f64) -> Self {
        self.original_value = original_value;
        self
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn original_value(&self) -> f64 {
        self.original_value
    }

    pub fn children(&self) -> &[TreeNode] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Sum of the direct children's current values.
    pub fn children_total(&self) -> f64 {
        self.children.iter().map(TreeNode::value).sum()
    }

    /// Copy of this node carrying a different current value; baseline and
    /// children are kept.
    pub(crate) fn with_value(&self, value: f64) -> Self {
        Self {
            value,
            ..self.clone()
        }
    }

    /// Copy of this node with replaced children; value and baseline are kept.
    pub(crate) fn with_children(&self, children: Vec<TreeNode>) -> Self {
        Self {
            id: self.id.clone(),
            label: self.label.clone(),
            value: self.value,
            original_value: self.original_value,
            children,
        }
    }

    /// Depth of the subtree rooted here (a leaf has depth 1).
    pub fn depth(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(TreeNode::depth)
            .max()
            .unwrap_or(0)
    }

    /// Number of nodes in the subtree rooted here.
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(TreeNode::len).sum::<usize>()
    }

    /// Leaves of the subtree, left to right.
    pub fn leaves(&self) -> Vec<&TreeNode> {
        let mut leaves = Vec::new();
        self.collect_leaves(&mut leaves);
        leaves
    }

    fn collect_leaves<'a>(&'a self, leaves: &mut Vec<&'a TreeNode>) {
        if self.is_leaf() {
            leaves.push(self);
        } else {
            for child in &self.children {
                child.collect_leaves(leaves);
            }
        }
    }

    /// Pre-order iterator over the subtree, yielding `(depth, node)` with the
    /// subtree root at depth 0.
    pub fn iter(&self) -> PreOrderIter<'_> {
        PreOrderIter {
            stack: vec![(0, self)],
        }
    }

    /// Find a node by id anywhere in this subtree.
    pub fn find(&self, id: &str) -> Option<&TreeNode> {
        self.iter().map(|(_, node)| node).find(|node| node.id == *id)
    }
}

/// Depth-first, left-to-right traversal.
pub struct PreOrderIter<'a> {
    stack: Vec<(usize, &'a TreeNode)>,
}

impl<'a> Iterator for PreOrderIter<'a> {
    type Item = (usize, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, node) = self.stack.pop()?;
        // Push children in reverse order for left-to-right traversal
        for child in node.children.iter().rev() {
            self.stack.push((depth + 1, child));
        }
        Some((depth, node))
    }
}
