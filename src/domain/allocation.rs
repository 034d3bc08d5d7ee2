//! Allocation algorithms: aggregation, variance, percentage propagation and
//! value redistribution.
//!
//! Every function takes a snapshot by reference and returns a new one. Nothing is
//! mutated in place.

use serde::{Deserialize, Serialize};
use tracing::{instrument, trace};

use crate::domain::node::TreeNode;

/// How far a value redistribution reaches into the subtree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RedistributionPolicy {
    /// Rescale the direct children only. An internal child gets its value
    /// overwritten and aggregation then resets it to its own children's sum.
    #[default]
    DirectChildren,
    /// Rescale every descendant leaf by the same ratio.
    Cascade,
}

/// Recompute every internal node as the sum of its children, post-order.
pub fn aggregate(forest: &[TreeNode]) -> Vec<TreeNode> {
    forest.iter().map(TreeNode::aggregated).collect()
}

impl TreeNode {
    /// Copy of this subtree with every internal value re-derived from its leaves.
    pub fn aggregated(&self) -> TreeNode {
        if self.is_leaf() {
            return self.clone();
        }
        let children = aggregate(self.children());
        let total = children.iter().map(TreeNode::value).sum();
        self.with_children(children).with_value(total)
    }
}

/// Percentage deviation of the current value from the baseline.
///
/// A zero baseline yields 0.
pub fn variance(node: &TreeNode) -> f64 {
    calculate_variance(node.value(), node.original_value())
}

pub fn calculate_variance(value: f64, original_value: f64) -> f64 {
    if original_value == 0.0 {
        0.0
    } else {
        (value - original_value) / original_value * 100.0
    }
}

/// Scale every leaf of the subtree by `1 + percent / 100`.
///
/// Internal values are re-summed on the way up. The percentage is not clamped:
/// `-100` drives the subtree to zero and anything lower makes it negative.
#[instrument(level = "trace", skip(node), fields(id = %node.id()))]
pub fn apply_percentage_change(node: &TreeNode, percent: f64) -> TreeNode {
    let factor = 1.0 + percent / 100.0;
    scale_leaves(node, factor)
}

fn scale_leaves(node: &TreeNode, factor: f64) -> TreeNode {
    if node.is_leaf() {
        return node.with_value(node.value() * factor);
    }
    let children: Vec<TreeNode> = node
        .children()
        .iter()
        .map(|child| scale_leaves(child, factor))
        .collect();
    let total = children.iter().map(TreeNode::value).sum();
    node.with_children(children).with_value(total)
}

/// Assign `new_value` to the node, rescaling its direct children proportionally.
pub fn redistribute_values(node: &TreeNode, new_value: f64) -> TreeNode {
    redistribute_values_with(node, new_value, RedistributionPolicy::DirectChildren)
}

/// Assign `new_value` to the node and spread it over the subtree per `policy`.
///
/// When the direct children sum to zero the value is split evenly between them.
/// The result is aggregated before it is returned.
#[instrument(level = "trace", skip(node), fields(id = %node.id()))]
pub fn redistribute_values_with(
    node: &TreeNode,
    new_value: f64,
    policy: RedistributionPolicy,
) -> TreeNode {
    redistribute(node, new_value, policy).aggregated()
}

fn redistribute(node: &TreeNode, new_value: f64, policy: RedistributionPolicy) -> TreeNode {
    if node.is_leaf() {
        return node.with_value(new_value);
    }

    let total_current = node.children_total();
    let count = node.children().len() as f64;
    if total_current == 0.0 {
        trace!(id = %node.id(), "zero child total, splitting evenly");
    }
    let children: Vec<TreeNode> = node
        .children()
        .iter()
        .map(|child| {
            let target = if total_current == 0.0 {
                new_value / count
            } else {
                child.value() / total_current * new_value
            };
            match policy {
                RedistributionPolicy::DirectChildren => child.with_value(target),
                RedistributionPolicy::Cascade => redistribute(child, target, policy),
            }
        })
        .collect();
    node.with_children(children).with_value(new_value)
}
