//! Mutation dispatch: locating the subtree a caller's input applies to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::allocation::{
    aggregate, apply_percentage_change, redistribute_values_with, RedistributionPolicy,
};
use crate::domain::node::TreeNode;

/// Which mutation a caller requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocationMode {
    /// Scale the subtree by a percentage.
    Percent,
    /// Redistribute a new absolute value over the subtree.
    Value,
}

impl FromStr for AllocationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "percent" | "%" => Ok(Self::Percent),
            "value" | "=" => Ok(Self::Value),
            other => Err(format!("unknown allocation mode: {other} (expected percent or value)")),
        }
    }
}

impl fmt::Display for AllocationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Percent => f.write_str("percent"),
            Self::Value => f.write_str("value"),
        }
    }
}

/// Which nodes a target id may address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DispatchScope {
    /// Roots and their direct children. A matching child hands its whole root
    /// subtree to the mutation; deeper ids are not reachable.
    #[default]
    TopTwoLevels,
    /// Any node by id; the matched node itself is mutated.
    FullTree,
}

impl FromStr for DispatchScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "top-two-levels" => Ok(Self::TopTwoLevels),
            "full-tree" => Ok(Self::FullTree),
            other => Err(format!(
                "unknown dispatch scope: {other} (expected top-two-levels or full-tree)"
            )),
        }
    }
}

impl FromStr for RedistributionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "direct-children" => Ok(Self::DirectChildren),
            "cascade" => Ok(Self::Cascade),
            other => Err(format!(
                "unknown redistribution policy: {other} (expected direct-children or cascade)"
            )),
        }
    }
}

/// Dispatch and redistribution behaviour applied by `handle_allocation_with`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationPolicy {
    pub dispatch: DispatchScope,
    pub redistribution: RedistributionPolicy,
}

/// Raw caller input: text as typed, or an already numeric value.
#[derive(Debug, Clone, PartialEq)]
pub enum AllocationInput {
    Text(String),
    Number(f64),
}

impl AllocationInput {
    /// The input as a finite number, or `None` when it cannot be used.
    ///
    /// Surrounding whitespace is ignored. Empty text, non-numeric text, NaN and
    /// infinities are all rejected.
    pub fn amount(&self) -> Option<f64> {
        let amount = match self {
            Self::Text(raw) => {
                let raw = raw.trim();
                if raw.is_empty() {
                    return None;
                }
                raw.parse::<f64>().ok()?
            }
            Self::Number(n) => *n,
        };
        amount.is_finite().then_some(amount)
    }
}

impl From<&str> for AllocationInput {
    fn from(raw: &str) -> Self {
        Self::Text(raw.to_string())
    }
}

impl From<String> for AllocationInput {
    fn from(raw: String) -> Self {
        Self::Text(raw)
    }
}

impl From<f64> for AllocationInput {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for AllocationInput {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

/// Why an allocation left the forest unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// The input is not a finite number.
    InvalidInput(AllocationInput),
    /// No node reachable under the dispatch scope carries the target id.
    UnknownTarget(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(AllocationInput::Text(raw)) => {
                write!(f, "not a number: {raw:?}")
            }
            Self::InvalidInput(AllocationInput::Number(n)) => write!(f, "not a finite number: {n}"),
            Self::UnknownTarget(id) => write!(f, "no reachable node with id: {id}"),
        }
    }
}

/// Apply one mutation to the forest with the default policy.
///
/// Invalid input and unknown ids return the forest unchanged.
pub fn handle_allocation(
    forest: &[TreeNode],
    target_id: &str,
    input: impl Into<AllocationInput>,
    mode: AllocationMode,
) -> Vec<TreeNode> {
    handle_allocation_with(forest, target_id, input, mode, AllocationPolicy::default())
}

/// Apply one mutation to the forest under `policy`.
pub fn handle_allocation_with(
    forest: &[TreeNode],
    target_id: &str,
    input: impl Into<AllocationInput>,
    mode: AllocationMode,
    policy: AllocationPolicy,
) -> Vec<TreeNode> {
    match try_allocation(forest, target_id, &input.into(), mode, policy) {
        Ok(updated) => updated,
        Err(reason) => {
            debug!(target_id, %reason, "allocation skipped");
            forest.to_vec()
        }
    }
}

/// Apply one mutation, reporting a no-op as `Err(SkipReason)`.
///
/// On success the returned forest is fully aggregated.
#[instrument(level = "trace", skip(forest, input))]
pub(crate) fn try_allocation(
    forest: &[TreeNode],
    target_id: &str,
    input: &AllocationInput,
    mode: AllocationMode,
    policy: AllocationPolicy,
) -> Result<Vec<TreeNode>, SkipReason> {
    let amount = input
        .amount()
        .ok_or_else(|| SkipReason::InvalidInput(input.clone()))?;

    let mutate = |node: &TreeNode| match mode {
        AllocationMode::Percent => apply_percentage_change(node, amount),
        AllocationMode::Value => redistribute_values_with(node, amount, policy.redistribution),
    };

    let mut matched = false;
    let updated: Vec<TreeNode> = match policy.dispatch {
        DispatchScope::TopTwoLevels => forest
            .iter()
            .map(|root| {
                let hit = root.id() == target_id
                    || root.children().iter().any(|child| child.id() == target_id);
                if hit {
                    debug!(root = %root.id(), target_id, %mode, amount, "mutating root subtree");
                    matched = true;
                    mutate(root)
                } else {
                    root.clone()
                }
            })
            .collect(),
        DispatchScope::FullTree => forest
            .iter()
            .map(|root| update_by_id(root, target_id, &mutate, &mut matched))
            .collect(),
    };

    if !matched {
        return Err(SkipReason::UnknownTarget(target_id.to_string()));
    }
    Ok(aggregate(&updated))
}

fn update_by_id(
    node: &TreeNode,
    target_id: &str,
    mutate: &dyn Fn(&TreeNode) -> TreeNode,
    matched: &mut bool,
) -> TreeNode {
    if node.id() == target_id {
        debug!(id = %node.id(), "mutating matched node");
        *matched = true;
        return mutate(node);
    }
    if node.is_leaf() || node.find(target_id).is_none() {
        return node.clone();
    }
    let children = node
        .children()
        .iter()
        .map(|child| update_by_id(child, target_id, mutate, matched))
        .collect();
    node.with_children(children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("10", Some(10.0))]
    #[case("  -12.5 ", Some(-12.5))]
    #[case("1e3", Some(1000.0))]
    #[case("", None)]
    #[case("   ", None)]
    #[case("abc", None)]
    #[case("NaN", None)]
    #[case("inf", None)]
    fn given_text_input_when_reading_amount_then_accepts_finite_numbers_only(
        #[case] raw: &str,
        #[case] expected: Option<f64>,
    ) {
        assert_eq!(AllocationInput::from(raw).amount(), expected);
    }

    #[test]
    fn given_numeric_input_when_reading_amount_then_rejects_non_finite() {
        assert_eq!(AllocationInput::from(7.0).amount(), Some(7.0));
        assert_eq!(AllocationInput::from(f64::NAN).amount(), None);
        assert_eq!(AllocationInput::from(f64::INFINITY).amount(), None);
    }

    #[rstest]
    #[case("percent", AllocationMode::Percent)]
    #[case("Value", AllocationMode::Value)]
    #[case("%", AllocationMode::Percent)]
    fn given_mode_text_when_parsing_then_returns_mode(
        #[case] raw: &str,
        #[case] expected: AllocationMode,
    ) {
        assert_eq!(raw.parse::<AllocationMode>(), Ok(expected));
    }

    #[test]
    fn given_unknown_scope_when_parsing_then_errors() {
        assert!("everything".parse::<DispatchScope>().is_err());
        assert_eq!("full-tree".parse::<DispatchScope>(), Ok(DispatchScope::FullTree));
    }

    #[test]
    fn given_invalid_input_when_trying_then_reports_reason() {
        let forest = vec![TreeNode::leaf("a", "A", 1.0)];
        let result = try_allocation(
            &forest,
            "a",
            &AllocationInput::from("x"),
            AllocationMode::Percent,
            AllocationPolicy::default(),
        );
        assert_eq!(
            result,
            Err(SkipReason::InvalidInput(AllocationInput::Text("x".into())))
        );
    }
}
