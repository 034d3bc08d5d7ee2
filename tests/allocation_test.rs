//! Tests for the allocation algorithms: aggregation, variance, percentage
//! propagation and value redistribution.

use alloctree::domain::{
    aggregate, apply_percentage_change, redistribute_values, redistribute_values_with, variance,
    RedistributionPolicy, TreeNode,
};
use alloctree::util::testing::init_test_setup;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9 * (1.0 + b.abs())
}

fn leaf(id: &str, value: f64) -> TreeNode {
    TreeNode::leaf(id, id.to_uppercase(), value)
}

/// r
/// ├── a
/// │   ├── a1 (10)
/// │   └── a2 (30)
/// └── b (60)
fn nested() -> TreeNode {
    TreeNode::branch(
        "r",
        "R",
        100.0,
        vec![
            TreeNode::branch("a", "A", 40.0, vec![leaf("a1", 10.0), leaf("a2", 30.0)]),
            leaf("b", 60.0),
        ],
    )
    .aggregated()
}

fn assert_sums_hold(node: &TreeNode) {
    if !node.is_leaf() {
        assert_eq!(
            node.value(),
            node.children_total(),
            "node {} must equal its children's sum",
            node.id()
        );
        node.children().iter().for_each(assert_sums_hold);
    }
}

// ============================================================
// Aggregation
// ============================================================

#[test]
fn given_forest_consistent_at_leaves_only_when_aggregating_then_internal_values_are_sums() {
    init_test_setup();
    // Arrange
    let forest = vec![TreeNode::branch(
        "top",
        "Top",
        0.0,
        vec![
            TreeNode::branch("mid", "Mid", 0.0, vec![leaf("x", 1.5), leaf("y", 2.5)]),
            leaf("z", 6.0),
        ],
    )];

    // Act
    let aggregated = aggregate(&forest);

    // Assert
    assert_eq!(aggregated[0].value(), 10.0);
    assert_eq!(aggregated[0].children()[0].value(), 4.0);
    assert_eq!(aggregated[0].original_value(), 0.0, "baseline untouched");
    assert_sums_hold(&aggregated[0]);
}

#[test]
fn given_aggregated_forest_when_aggregating_again_then_unchanged() {
    let once = aggregate(&[nested()]);
    let twice = aggregate(&once);
    assert_eq!(once, twice);
}

#[test]
fn given_children_when_aggregating_then_order_is_preserved() {
    let aggregated = nested().aggregated();
    let ids: Vec<&str> = aggregated
        .children()
        .iter()
        .map(|c| c.id().as_str())
        .collect();
    assert_eq!(ids, vec!["a", "b"]);
}

// ============================================================
// Variance
// ============================================================

#[test]
fn given_value_above_baseline_when_computing_variance_then_positive_percentage() {
    let node = leaf("x", 100.0);
    let node = redistribute_values(&node, 120.0);
    assert_eq!(variance(&node), 20.0);
}

#[test]
fn given_zero_baseline_when_computing_variance_then_zero() {
    assert_eq!(variance(&leaf("x", 0.0)), 0.0);
    let grown = redistribute_values(&leaf("x", 0.0), 50.0);
    assert_eq!(variance(&grown), 0.0);
}

#[test]
fn given_internal_node_when_computing_variance_then_compares_aggregate_with_own_baseline() {
    // Baseline 1000 assigned at construction, children sum to 1200
    let node = TreeNode::branch("n", "N", 1000.0, vec![leaf("a", 700.0), leaf("b", 500.0)])
        .aggregated();
    assert_eq!(node.value(), 1200.0);
    assert!(approx_eq(variance(&node), 20.0));
}

// ============================================================
// Percentage propagation
// ============================================================

#[test]
fn given_nested_subtree_when_applying_percentage_then_every_leaf_scales() {
    // Act
    let updated = apply_percentage_change(&nested(), 50.0);

    // Assert
    let leaves: Vec<f64> = updated.leaves().iter().map(|n| n.value()).collect();
    assert_eq!(leaves, vec![15.0, 45.0, 90.0]);
    assert_eq!(updated.value(), 150.0);
    assert_sums_hold(&updated);
}

#[test]
fn given_percentage_when_applied_to_root_or_children_then_leaves_match() {
    let tree = nested();
    let at_root = apply_percentage_change(&tree, 12.5);
    let per_child: Vec<TreeNode> = tree
        .children()
        .iter()
        .map(|child| apply_percentage_change(child, 12.5))
        .collect();

    let root_leaves: Vec<f64> = at_root.leaves().iter().map(|n| n.value()).collect();
    let child_leaves: Vec<f64> = per_child
        .iter()
        .flat_map(|c| c.leaves().into_iter().map(TreeNode::value).collect::<Vec<_>>())
        .collect();
    assert_eq!(root_leaves, child_leaves);
}

#[test]
fn given_percentage_below_minus_hundred_when_applying_then_goes_negative() {
    let updated = apply_percentage_change(&leaf("x", 40.0), -150.0);
    assert_eq!(updated.value(), -20.0);
    assert_eq!(updated.original_value(), 40.0);
}

#[test]
fn given_mutation_when_applied_then_baselines_are_bit_identical() {
    let tree = nested();
    let before: Vec<u64> = tree
        .iter()
        .map(|(_, n)| n.original_value().to_bits())
        .collect();

    let scaled = apply_percentage_change(&tree, 33.0);
    let redistributed = redistribute_values(&tree, 7.0);

    for snapshot in [scaled, redistributed] {
        let after: Vec<u64> = snapshot
            .iter()
            .map(|(_, n)| n.original_value().to_bits())
            .collect();
        assert_eq!(before, after);
    }
}

// ============================================================
// Value redistribution
// ============================================================

#[test]
fn given_leaf_when_redistributing_then_value_is_set() {
    let updated = redistribute_values(&leaf("x", 50.0), 80.0);
    assert_eq!(updated.value(), 80.0);
    assert_eq!(updated.original_value(), 50.0);
}

#[test]
fn given_two_leaf_children_when_redistributing_then_split_proportionally() {
    // Arrange
    let node = TreeNode::branch("n", "N", 1000.0, vec![leaf("a", 300.0), leaf("b", 700.0)]);

    // Act
    let updated = redistribute_values(&node, 500.0);

    // Assert
    assert!(approx_eq(updated.children()[0].value(), 150.0));
    assert!(approx_eq(updated.children()[1].value(), 350.0));
    assert!(approx_eq(updated.value(), 500.0));
    assert_sums_hold(&updated);
}

#[test]
fn given_internal_child_when_redistributing_direct_children_then_aggregation_undoes_its_share() {
    // Arrange: a (40) has its own children; b (60) is a leaf
    let tree = nested();

    // Act: double the total
    let updated = redistribute_values(&tree, 200.0);

    // Assert: b doubled, a reset to its unchanged grandchildren
    let a = &updated.children()[0];
    let b = &updated.children()[1];
    assert_eq!(a.value(), 40.0);
    assert_eq!(a.children()[0].value(), 10.0);
    assert!(approx_eq(b.value(), 120.0));
    assert!(approx_eq(updated.value(), 160.0));
    assert_sums_hold(&updated);
}

#[test]
fn given_internal_child_when_redistributing_with_cascade_then_every_leaf_scales() {
    let updated = redistribute_values_with(&nested(), 200.0, RedistributionPolicy::Cascade);

    let leaves: Vec<f64> = updated.leaves().iter().map(|n| n.value()).collect();
    assert!(approx_eq(leaves[0], 20.0));
    assert!(approx_eq(leaves[1], 60.0));
    assert!(approx_eq(leaves[2], 120.0));
    assert!(approx_eq(updated.value(), 200.0));
    assert_sums_hold(&updated);
}

#[test]
fn given_zero_total_subtree_when_cascading_then_splits_evenly_at_each_level() {
    let node = TreeNode::branch(
        "n",
        "N",
        0.0,
        vec![
            TreeNode::branch("a", "A", 0.0, vec![leaf("a1", 0.0), leaf("a2", 0.0)]),
            leaf("b", 0.0),
        ],
    );

    let updated = redistribute_values_with(&node, 100.0, RedistributionPolicy::Cascade);

    let leaves: Vec<f64> = updated.leaves().iter().map(|n| n.value()).collect();
    assert_eq!(leaves, vec![25.0, 25.0, 50.0]);
    assert_eq!(updated.value(), 100.0);
}

#[test]
fn given_zero_total_when_redistributing_then_no_nan() {
    let node = TreeNode::branch("n", "N", 0.0, vec![leaf("a", 0.0), leaf("b", 0.0)]);
    let updated = redistribute_values(&node, 9.0);
    assert!(updated.iter().all(|(_, n)| n.value().is_finite()));
    assert_eq!(updated.children()[0].value(), 4.5);
}
