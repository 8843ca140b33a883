use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::DagError;

/// Relative location of the project directory holding config and store.
pub const PROJECT_DIR: &str = ".lineage";

/// Per-collection engine settings, handed to [`crate::Dag::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DagConfig {
    /// Scope value written to every link and closure row. Several collections
    /// can share one store without seeing each other's rows.
    #[serde(default = "default_collection")]
    pub collection: String,
    /// When `false`, a node keeps its root sentinel only while it has no real
    /// parent.
    #[serde(default)]
    pub allow_root_and_parent: bool,
}

impl Default for DagConfig {
    fn default() -> Self {
        Self {
            collection: default_collection(),
            allow_root_and_parent: false,
        }
    }
}

impl DagConfig {
    /// Config for a named collection with default flags.
    pub fn for_collection(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            ..Self::default()
        }
    }

    /// Reject values the store's `CHECK` constraints would refuse anyway.
    ///
    /// # Errors
    ///
    /// Returns [`DagError::Config`] for a blank collection name.
    pub fn validate(&self) -> Result<(), DagError> {
        if self.collection.trim().is_empty() {
            return Err(DagError::Config("collection must not be blank".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store path, relative to the project root unless absolute.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub dag: DagConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

impl ProjectConfig {
    /// Absolute store path for a project rooted at `project_root`.
    pub fn store_path(&self, project_root: &Path) -> PathBuf {
        if self.store.path.is_absolute() {
            self.store.path.clone()
        } else {
            project_root.join(&self.store.path)
        }
    }
}

fn default_collection() -> String {
    "default".to_string()
}

fn default_store_path() -> PathBuf {
    PathBuf::from(PROJECT_DIR).join("lineage.db")
}

const fn default_lock_timeout_ms() -> u64 {
    5_000
}

/// Config file path for a project rooted at `project_root`.
pub fn config_path(project_root: &Path) -> PathBuf {
    project_root.join(PROJECT_DIR).join("config.toml")
}

/// Load `.lineage/config.toml`, falling back to defaults when absent.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed, or if
/// the parsed `[dag]` section is invalid.
pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = config_path(project_root);
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let config = toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    config
        .dag
        .validate()
        .with_context(|| format!("Invalid [dag] section in {}", path.display()))?;
    Ok(config)
}

/// Render a config as TOML, e.g. for `lin init`.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render_project_config(config: &ProjectConfig) -> Result<String> {
    toml::to_string_pretty(config).context("serialize project config")
}
