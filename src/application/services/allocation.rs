//! Allocation service
//!
//! Loads forest files and applies sequences of allocation requests.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::application::{ApplicationError, ApplicationResult, ForestFile, IoResultExt};
use crate::domain::{
    sample_forest, Allocation, AllocationInput, AllocationMode, AllocationPolicy, AllocationTree,
    SkipReason,
};
use crate::infrastructure::traits::FileSystem;

/// One caller request: mutate `target` by `input` in `mode`.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationRequest {
    pub target: String,
    pub mode: AllocationMode,
    pub input: AllocationInput,
}

impl AllocationRequest {
    pub fn new(
        target: impl Into<String>,
        mode: AllocationMode,
        input: impl Into<AllocationInput>,
    ) -> Self {
        Self {
            target: target.into(),
            mode,
            input: input.into(),
        }
    }
}

/// What happened to a single request.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub request: AllocationRequest,
    /// `None` when the request was applied.
    pub skipped: Option<SkipReason>,
}

/// Final snapshot plus per-request outcomes.
#[derive(Debug, Clone)]
pub struct AllocationRun {
    pub tree: AllocationTree,
    pub steps: Vec<StepOutcome>,
}

impl AllocationRun {
    pub fn skipped(&self) -> impl Iterator<Item = &StepOutcome> {
        self.steps.iter().filter(|step| step.skipped.is_some())
    }
}

/// Service for loading allocation trees and applying requests to them.
pub struct AllocationService {
    fs: Arc<dyn FileSystem>,
    policy: AllocationPolicy,
}

impl AllocationService {
    /// Create a new allocation service.
    pub fn new(fs: Arc<dyn FileSystem>, policy: AllocationPolicy) -> Self {
        Self { fs, policy }
    }

    pub fn policy(&self) -> AllocationPolicy {
        self.policy
    }

    /// Load a forest file and build an aggregated tree from it.
    pub fn load(&self, path: &Path) -> ApplicationResult<AllocationTree> {
        debug!("load: path={}", path.display());
        if !self.fs.exists(path) || !self.fs.is_file(path) {
            return Err(ApplicationError::ForestNotFound(path.to_path_buf()));
        }

        let content = self
            .fs
            .read_to_string(path)
            .with_path_context("read forest file", path)?;
        let nodes = ForestFile::parse(&content, path)?.to_nodes(path)?;
        let tree = AllocationTree::with_policy(nodes, self.policy)?;
        info!(
            "loaded {} root(s) from {}, total {}",
            tree.roots().len(),
            path.display(),
            tree.total()
        );
        Ok(tree)
    }

    /// Build the built-in demo tree.
    pub fn sample(&self) -> ApplicationResult<AllocationTree> {
        Ok(AllocationTree::with_policy(sample_forest(), self.policy)?)
    }

    /// Load `path` if given, otherwise fall back to the demo tree.
    pub fn load_or_sample(&self, path: Option<&Path>) -> ApplicationResult<AllocationTree> {
        match path {
            Some(path) => self.load(path),
            None => self.sample(),
        }
    }

    /// Apply requests in order, each to the snapshot produced by the previous one.
    ///
    /// Requests that cannot be applied are recorded and skipped; they never abort
    /// the run.
    pub fn apply(&self, tree: &AllocationTree, requests: &[AllocationRequest]) -> AllocationRun {
        let mut current = tree.clone();
        let mut steps = Vec::with_capacity(requests.len());

        for request in requests {
            let skipped = match current.allocate(&request.target, request.input.clone(), request.mode)
            {
                Allocation::Applied(next) => {
                    debug!(
                        "applied {} {:?} to {}: total {} -> {}",
                        request.mode,
                        request.input,
                        request.target,
                        current.total(),
                        next.total()
                    );
                    current = next;
                    None
                }
                Allocation::Skipped { reason } => {
                    warn!("skipped {} on {}: {}", request.mode, request.target, reason);
                    Some(reason)
                }
            };
            steps.push(StepOutcome {
                request: request.clone(),
                skipped,
            });
        }

        AllocationRun {
            tree: current,
            steps,
        }
    }

    /// Render a snapshot in forest file form.
    pub fn export(&self, tree: &AllocationTree) -> ApplicationResult<String> {
        ForestFile::from_nodes(tree.roots()).to_toml()
    }
}
