//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

use crate::domain::{AllocationMode, DispatchScope, RedistributionPolicy};

/// Hierarchical budget allocation: percentage scaling, value redistribution and variance
#[derive(Parser, Debug)]
#[command(name = "alloctree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Forest file (default: configured forest, else the built-in sample)
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub forest: Option<PathBuf>,

    /// Override dispatch scope (top-two-levels, full-tree)
    #[arg(long, global = true)]
    pub dispatch: Option<DispatchScope>,

    /// Override redistribution policy (direct-children, cascade)
    #[arg(long, global = true)]
    pub redistribution: Option<RedistributionPolicy>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the forest as a tree (default)
    Show,

    /// Per-node variance report
    Report,

    /// Apply inputs to a node and show the result
    Allocate {
        /// Target node id
        target: String,
        /// Allocation mode: percent or value
        mode: AllocationMode,
        /// Inputs, applied in sequence
        #[arg(required = true, allow_negative_numbers = true)]
        inputs: Vec<String>,
        /// Print the result in forest file form instead of a tree
        #[arg(long)]
        toml: bool,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Show config paths
    Path,

    /// Print a config template
    Template,
}
