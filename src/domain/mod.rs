//! Domain layer: the allocation tree and its algorithms
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod allocation;
pub mod dispatch;
pub mod error;
pub mod forest;
pub mod node;

pub use allocation::{
    aggregate, apply_percentage_change, calculate_variance, redistribute_values,
    redistribute_values_with, variance, RedistributionPolicy,
};
pub use dispatch::{
    handle_allocation, handle_allocation_with, AllocationInput, AllocationMode,
    AllocationPolicy, DispatchScope, SkipReason,
};
pub use error::DomainError;
pub use forest::{sample_forest, Allocation, AllocationTree, NodeReport};
pub use node::{NodeId, TreeNode};
