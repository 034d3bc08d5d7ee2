//! Hierarchical budget allocation tree.
//!
//! A forest of labelled nodes, each with a current value and a fixed baseline.
//! Internal values are always the sum of their children. Two top-down mutations
//! are supported (percentage scaling and value redistribution), followed by
//! bottom-up re-aggregation, plus per-node variance against the baseline.
//!
//! Layers:
//! - [`domain`]: the tree and its algorithms, free of I/O
//! - [`application`]: forest files and the allocation service
//! - [`infrastructure`]: filesystem boundary and service wiring
//! - [`cli`]: the `alloctree` command line

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod tree_traits;
pub mod util;

pub use domain::{
    aggregate, apply_percentage_change, handle_allocation, redistribute_values, variance,
    AllocationMode, AllocationTree, TreeNode,
};
