//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/alloctree/alloctree.toml`
//! 3. Local config: `<forest_dir>/.alloctree.toml` (next to the forest file)
//! 4. Environment variables: `ALLOCTREE_*` prefix

use std::path::{Path, PathBuf};
use std::str::FromStr;

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::{AllocationPolicy, DispatchScope, RedistributionPolicy};
use crate::tree_traits::DEFAULT_PRECISION;

/// Unified configuration for alloctree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Which nodes a target id may address
    pub dispatch: DispatchScope,
    /// How far value redistribution reaches
    pub redistribution: RedistributionPolicy,
    /// Decimals shown in rendered values
    pub precision: usize,
    /// Forest file used when none is given on the command line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forest: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dispatch: DispatchScope::default(),
            redistribution: RedistributionPolicy::default(),
            precision: DEFAULT_PRECISION,
            forest: None,
        }
    }
}

/// Raw settings for intermediate parsing (all fields optional to detect "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct RawSettings {
    pub dispatch: Option<DispatchScope>,
    pub redistribution: Option<RedistributionPolicy>,
    pub precision: Option<usize>,
    pub forest: Option<PathBuf>,
}

/// Get the XDG config directory for alloctree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "alloctree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("alloctree.toml"))
}

/// Get the path to the local config file in a forest directory.
pub fn local_config_path(forest_dir: &Path) -> PathBuf {
    forest_dir.join(".alloctree.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

/// Expand shell variables and tilde in a path string.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

impl Settings {
    /// Core policy derived from these settings.
    pub fn allocation_policy(&self) -> AllocationPolicy {
        AllocationPolicy {
            dispatch: self.dispatch,
            redistribution: self.redistribution,
        }
    }

    /// Expand `~`, `$VAR` and `${VAR}` in path-like fields.
    fn expand_paths(&mut self) {
        if let Some(forest) = &self.forest {
            let expanded = expand_env_vars(forest.to_string_lossy().as_ref());
            self.forest = Some(PathBuf::from(expanded));
        }
    }

    /// Overlay config onto self (base): fields the overlay specifies win.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            dispatch: overlay.dispatch.unwrap_or(self.dispatch),
            redistribution: overlay.redistribution.unwrap_or(self.redistribution),
            precision: overlay.precision.unwrap_or(self.precision),
            forest: overlay.forest.clone().or_else(|| self.forest.clone()),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `forest_dir` - Optional directory holding the forest file, for local config
    ///
    /// # Precedence (lowest to highest)
    /// 1. Compiled defaults
    /// 2. Global config: `$XDG_CONFIG_HOME/alloctree/alloctree.toml`
    /// 3. Local config: `<forest_dir>/.alloctree.toml`
    /// 4. Environment variables: `ALLOCTREE_*` prefix
    pub fn load(forest_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw);
            }
        }

        if let Some(dir) = forest_dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                let raw = load_raw_settings(&local_path)?;
                current = current.merge_with(&raw);
            }
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();

        Ok(current)
    }

    /// Apply ALLOCTREE_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        // Use config crate just for env var parsing
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("ALLOCTREE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("dispatch") {
            settings.dispatch = parse_env("ALLOCTREE_DISPATCH", &val)?;
        }
        if let Ok(val) = config.get_string("redistribution") {
            settings.redistribution = parse_env("ALLOCTREE_REDISTRIBUTION", &val)?;
        }
        if let Ok(val) = config.get_string("precision") {
            settings.precision = parse_env("ALLOCTREE_PRECISION", &val)?;
        }
        if let Ok(val) = config.get_string("forest") {
            settings.forest = Some(PathBuf::from(val));
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# alloctree configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/alloctree/alloctree.toml
#   Local:  <forest_dir>/.alloctree.toml
#   Env:    ALLOCTREE_* environment variables

# Which nodes a target id may address:
#   "top-two-levels": roots and their direct children (a child hands over its root)
#   "full-tree":      any node, mutated on its own
# dispatch = "top-two-levels"

# How far a value redistribution reaches:
#   "direct-children": rescale direct children only
#   "cascade":         rescale every descendant leaf
# redistribution = "direct-children"

# Decimals shown in rendered values
# precision = 2

# Forest file used when -f is not given
# forest = "~/budgets/2026.toml"
"#
        .to_string()
    }
}

fn parse_env<T>(name: &str, value: &str) -> Result<T, ApplicationError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e| ApplicationError::Config {
        message: format!("{name}={value}: {e}"),
    })
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
