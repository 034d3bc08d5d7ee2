//! Forest file format (TOML).
//!
//! ```toml
//! [[nodes]]
//! id = "electronics"
//! label = "Electronics"
//! value = 1500
//!
//! [[nodes.children]]
//! id = "phones"
//! label = "Phones"
//! value = 800
//! ```
//!
//! `label` defaults to the id. `baseline` overrides the baseline, which otherwise
//! equals `value`. Internal nodes may omit `value`; it then defaults to the sum of
//! their children's values, and their baseline to the sum of the children's
//! baselines.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::TreeNode;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForestFile {
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeRecord>,
}

impl ForestFile {
    /// Parse forest file content; `path` is used for error messages only.
    pub fn parse(content: &str, path: &Path) -> ApplicationResult<Self> {
        toml::from_str(content).map_err(|e| ApplicationError::ForestFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Convert the records into tree nodes.
    pub fn to_nodes(&self, path: &Path) -> ApplicationResult<Vec<TreeNode>> {
        self.nodes
            .iter()
            .map(|record| record.to_node(path))
            .collect()
    }

    /// Snapshot of a forest in file form, baselines included.
    pub fn from_nodes(nodes: &[TreeNode]) -> Self {
        Self {
            nodes: nodes.iter().map(NodeRecord::from_node).collect(),
        }
    }

    pub fn to_toml(&self) -> ApplicationResult<String> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::OperationFailed {
            context: "serialize forest".to_string(),
            source: Box::new(e),
        })
    }
}

impl NodeRecord {
    fn to_node(&self, path: &Path) -> ApplicationResult<TreeNode> {
        let label = self.label.clone().unwrap_or_else(|| self.id.clone());
        let value = self.resolved_value(path)?;
        let baseline = self.resolved_baseline();

        let node = if self.children.is_empty() {
            TreeNode::leaf(self.id.as_str(), label, value)
        } else {
            let children = self
                .children
                .iter()
                .map(|child| child.to_node(path))
                .collect::<ApplicationResult<Vec<_>>>()?;
            TreeNode::branch(self.id.as_str(), label, value, children)
        };

        Ok(node.with_baseline(baseline))
    }

    fn resolved_value(&self, path: &Path) -> ApplicationResult<f64> {
        if let Some(value) = self.value {
            return Ok(value);
        }
        if self.children.is_empty() {
            return Err(ApplicationError::ForestFile {
                path: path.to_path_buf(),
                message: format!("leaf node {} has no value", self.id),
            });
        }
        self.children
            .iter()
            .map(|child| child.resolved_value(path))
            .sum()
    }

    /// Explicit baseline, else the node's own value, else the children's baselines.
    fn resolved_baseline(&self) -> f64 {
        match (self.baseline, self.value) {
            (Some(baseline), _) => baseline,
            (None, Some(value)) => value,
            (None, None) => self.children.iter().map(NodeRecord::resolved_baseline).sum(),
        }
    }

    fn from_node(node: &TreeNode) -> Self {
        Self {
            id: node.id().to_string(),
            label: Some(node.label().to_string()),
            value: Some(node.value()),
            baseline: (node.original_value() != node.value()).then_some(node.original_value()),
            children: node.children().iter().map(NodeRecord::from_node).collect(),
        }
    }
}
