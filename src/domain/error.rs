//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::NodeId;

/// Domain errors represent violations of the forest's structural rules.
///
/// Allocation operations themselves are total and never produce these; they
/// only surface when a forest is constructed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("duplicate node id: {0}")]
    DuplicateId(NodeId),

    #[error("empty node id (label: {label})")]
    EmptyId { label: String },

    #[error("non-finite {field} on node {id}: {value}")]
    NonFiniteValue {
        id: NodeId,
        field: &'static str,
        value: f64,
    },
}
