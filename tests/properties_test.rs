//! Property-based tests for the allocation engine using proptest.

use proptest::prelude::*;

use alloctree::domain::{
    aggregate, apply_percentage_change, handle_allocation_with, redistribute_values_with,
    AllocationMode, AllocationPolicy, DispatchScope, RedistributionPolicy, TreeNode,
};

// ============================================================================
// Strategies for generating random forests
// ============================================================================

#[derive(Debug, Clone)]
enum Shape {
    Leaf(f64),
    Branch(f64, Vec<Shape>),
}

fn arb_shape() -> impl Strategy<Value = Shape> {
    let leaf = (0.0f64..1000.0).prop_map(Shape::Leaf);
    leaf.prop_recursive(4, 32, 4, |inner| {
        ((0.0f64..5000.0), prop::collection::vec(inner, 1..4))
            .prop_map(|(baseline, children)| Shape::Branch(baseline, children))
    })
}

fn build(shape: &Shape, next_id: &mut usize) -> TreeNode {
    let id = format!("n{next_id}");
    *next_id += 1;
    match shape {
        Shape::Leaf(value) => TreeNode::leaf(id.as_str(), id.clone(), *value),
        Shape::Branch(baseline, children) => {
            let children = children.iter().map(|c| build(c, next_id)).collect();
            TreeNode::branch(id.as_str(), id.clone(), *baseline, children)
        }
    }
}

fn arb_forest() -> impl Strategy<Value = Vec<TreeNode>> {
    prop::collection::vec(arb_shape(), 1..4).prop_map(|shapes| {
        let mut next_id = 0;
        let forest: Vec<TreeNode> = shapes.iter().map(|s| build(s, &mut next_id)).collect();
        aggregate(&forest)
    })
}

fn arb_policy() -> impl Strategy<Value = AllocationPolicy> {
    (
        prop_oneof![Just(DispatchScope::TopTwoLevels), Just(DispatchScope::FullTree)],
        prop_oneof![
            Just(RedistributionPolicy::DirectChildren),
            Just(RedistributionPolicy::Cascade)
        ],
    )
        .prop_map(|(dispatch, redistribution)| AllocationPolicy {
            dispatch,
            redistribution,
        })
}

fn arb_mode() -> impl Strategy<Value = AllocationMode> {
    prop_oneof![Just(AllocationMode::Percent), Just(AllocationMode::Value)]
}

fn ids(forest: &[TreeNode]) -> Vec<String> {
    forest
        .iter()
        .flat_map(TreeNode::iter)
        .map(|(_, n)| n.id().to_string())
        .collect()
}

fn baselines(forest: &[TreeNode]) -> Vec<(String, u64)> {
    forest
        .iter()
        .flat_map(TreeNode::iter)
        .map(|(_, n)| (n.id().to_string(), n.original_value().to_bits()))
        .collect()
}

fn sums_hold(forest: &[TreeNode]) -> bool {
    forest
        .iter()
        .flat_map(TreeNode::iter)
        .all(|(_, n)| n.is_leaf() || n.value() == n.children_total())
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-7 * (1.0 + b.abs())
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Aggregation is idempotent
    #[test]
    fn prop_aggregate_idempotent(forest in arb_forest()) {
        let once = aggregate(&forest);
        prop_assert_eq!(aggregate(&once), once);
    }

    /// Every internal node equals its children's sum after any dispatch
    #[test]
    fn prop_sums_hold_after_dispatch(
        forest in arb_forest(),
        pick in any::<prop::sample::Index>(),
        amount in -200.0f64..5000.0,
        mode in arb_mode(),
        policy in arb_policy(),
    ) {
        let all = ids(&forest);
        let target = pick.get(&all);
        let result = handle_allocation_with(&forest, target, amount, mode, policy);
        prop_assert!(sums_hold(&result));
    }

    /// Baselines and ordering survive every mutation
    #[test]
    fn prop_baselines_and_order_preserved(
        forest in arb_forest(),
        pick in any::<prop::sample::Index>(),
        amount in -200.0f64..5000.0,
        mode in arb_mode(),
        policy in arb_policy(),
    ) {
        let all = ids(&forest);
        let target = pick.get(&all);
        let result = handle_allocation_with(&forest, target, amount, mode, policy);
        prop_assert_eq!(baselines(&result), baselines(&forest));
    }

    /// Scaling every leaf scales the subtree total by the same factor
    #[test]
    fn prop_percentage_linear(forest in arb_forest(), percent in -300.0f64..300.0) {
        for root in &forest {
            let expected = root.value() * (1.0 + percent / 100.0);
            let scaled = apply_percentage_change(root, percent);
            prop_assert!(close(scaled.value(), expected), "{} vs {}", scaled.value(), expected);
        }
    }

    /// Cascading redistribution lands exactly on the requested total
    #[test]
    fn prop_cascade_hits_target(forest in arb_forest(), new_value in 0.0f64..10000.0) {
        for root in &forest {
            let updated = redistribute_values_with(root, new_value, RedistributionPolicy::Cascade);
            prop_assert!(close(updated.value(), new_value), "{} vs {}", updated.value(), new_value);
        }
    }

    /// Unparseable input never changes the forest
    #[test]
    fn prop_invalid_input_is_noop(
        forest in arb_forest(),
        pick in any::<prop::sample::Index>(),
        raw in "[a-zA-Z ]{0,8}",
        mode in arb_mode(),
        policy in arb_policy(),
    ) {
        prop_assume!(raw.trim().parse::<f64>().map_or(true, |n| !n.is_finite()));
        let all = ids(&forest);
        let target = pick.get(&all);
        let result = handle_allocation_with(&forest, target, raw.as_str(), mode, policy);
        prop_assert_eq!(result, forest);
    }
}
