//! The allocation tree: a validated, aggregated forest snapshot.

use itertools::Itertools;
use tracing::{debug, instrument};

use crate::domain::allocation::{aggregate, variance};
use crate::domain::dispatch::{
    try_allocation, AllocationInput, AllocationMode, AllocationPolicy, SkipReason,
};
use crate::domain::error::DomainError;
use crate::domain::node::{NodeId, TreeNode};

/// An immutable forest snapshot.
///
/// Construction checks id uniqueness and finite numbers, then aggregates so every
/// internal node equals the sum of its children. Each allocation yields a new
/// snapshot; the previous one stays valid.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationTree {
    roots: Vec<TreeNode>,
    policy: AllocationPolicy,
}

/// Result of `AllocationTree::allocate`.
#[derive(Debug, Clone, PartialEq)]
pub enum Allocation {
    Applied(AllocationTree),
    Skipped { reason: SkipReason },
}

/// One row of the per-node variance report.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeReport {
    pub id: NodeId,
    pub label: String,
    pub depth: usize,
    pub value: f64,
    pub original_value: f64,
    pub variance: f64,
}

impl AllocationTree {
    pub fn new(roots: Vec<TreeNode>) -> Result<Self, DomainError> {
        Self::with_policy(roots, AllocationPolicy::default())
    }

    #[instrument(level = "debug", skip(roots), fields(roots = roots.len()))]
    pub fn with_policy(roots: Vec<TreeNode>, policy: AllocationPolicy) -> Result<Self, DomainError> {
        validate(&roots)?;
        let roots = aggregate(&roots);
        debug!(
            nodes = roots.iter().map(TreeNode::len).sum::<usize>(),
            "allocation tree built"
        );
        Ok(Self { roots, policy })
    }

    pub fn roots(&self) -> &[TreeNode] {
        &self.roots
    }

    pub fn policy(&self) -> AllocationPolicy {
        self.policy
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Sum of all root values.
    pub fn total(&self) -> f64 {
        self.roots.iter().map(TreeNode::value).sum()
    }

    /// Look up a node at any depth.
    pub fn find(&self, id: &str) -> Option<&TreeNode> {
        self.roots.iter().find_map(|root| root.find(id))
    }

    pub fn variance_of(&self, id: &str) -> Option<f64> {
        self.find(id).map(variance)
    }

    /// Every node in pre-order with its depth.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &TreeNode)> {
        self.roots.iter().flat_map(TreeNode::iter)
    }

    /// Per-node variance report, pre-order.
    pub fn report(&self) -> Vec<NodeReport> {
        self.iter()
            .map(|(depth, node)| NodeReport {
                id: node.id().clone(),
                label: node.label().to_string(),
                depth,
                value: node.value(),
                original_value: node.original_value(),
                variance: variance(node),
            })
            .collect()
    }

    /// Apply one mutation and return the resulting snapshot.
    ///
    /// Invalid input or an unreachable target leaves the tree untouched and is
    /// reported as `Allocation::Skipped`.
    pub fn allocate(
        &self,
        target_id: &str,
        input: impl Into<AllocationInput>,
        mode: AllocationMode,
    ) -> Allocation {
        match try_allocation(&self.roots, target_id, &input.into(), mode, self.policy) {
            Ok(roots) => Allocation::Applied(Self {
                roots,
                policy: self.policy,
            }),
            Err(reason) => {
                debug!(target_id, %reason, "allocation skipped");
                Allocation::Skipped { reason }
            }
        }
    }

    /// Like `allocate`, but yields the unchanged snapshot on a no-op.
    pub fn allocated(
        &self,
        target_id: &str,
        input: impl Into<AllocationInput>,
        mode: AllocationMode,
    ) -> Self {
        match self.allocate(target_id, input, mode) {
            Allocation::Applied(tree) => tree,
            Allocation::Skipped { .. } => self.clone(),
        }
    }

    pub fn into_roots(self) -> Vec<TreeNode> {
        self.roots
    }
}

fn validate(roots: &[TreeNode]) -> Result<(), DomainError> {
    let nodes = || roots.iter().flat_map(TreeNode::iter).map(|(_, node)| node);

    for node in nodes() {
        if node.id().as_str().trim().is_empty() {
            return Err(DomainError::EmptyId {
                label: node.label().to_string(),
            });
        }
        for (field, value) in [("value", node.value()), ("baseline", node.original_value())] {
            if !value.is_finite() {
                return Err(DomainError::NonFiniteValue {
                    id: node.id().clone(),
                    field,
                    value,
                });
            }
        }
    }

    if let Some(duplicate) = nodes().map(TreeNode::id).duplicates().next() {
        return Err(DomainError::DuplicateId(duplicate.clone()));
    }
    Ok(())
}

/// Two-category demo forest: Electronics (Phones, Laptops) and Furniture
/// (Tables, Chairs).
pub fn sample_forest() -> Vec<TreeNode> {
    vec![
        TreeNode::branch(
            "electronics",
            "Electronics",
            1500.0,
            vec![
                TreeNode::leaf("phones", "Phones", 800.0),
                TreeNode::leaf("laptops", "Laptops", 700.0),
            ],
        ),
        TreeNode::branch(
            "furniture",
            "Furniture",
            1000.0,
            vec![
                TreeNode::leaf("tables", "Tables", 300.0),
                TreeNode::leaf("chairs", "Chairs", 700.0),
            ],
        ),
    ]
}
