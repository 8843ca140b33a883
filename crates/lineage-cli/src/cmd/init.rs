use anyhow::{Context as _, Result};
use clap::Args;
use lineage_core::config::{
    ProjectConfig, config_path, load_project_config, render_project_config,
};
use lineage_core::db::open_store;
use serde::Serialize;
use std::path::Path;

use super::StoreOptions;
use crate::output::{OutputMode, render};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing `.lineage/config.toml`.
    #[arg(long)]
    pub force: bool,

    /// Collection name written to every link and closure row.
    #[arg(long)]
    pub collection: Option<String>,

    /// Let nodes keep their root sentinel after gaining a parent.
    #[arg(long)]
    pub allow_root_and_parent: bool,
}

#[derive(Debug, Serialize)]
struct InitOutput {
    config: String,
    store: String,
    collection: String,
    allow_root_and_parent: bool,
}

/// Execute `lin init`. Writes the project config and creates the store:
///
/// ```text
/// .lineage/
///   config.toml   ([dag] and [store] sections)
///   lineage.db    (migrated SQLite store, unless --db points elsewhere)
/// ```
///
/// # Errors
///
/// Returns an error if the config already exists and `--force` is not set,
/// or if writing the config or creating the store fails.
pub fn run_init(
    args: &InitArgs,
    store: &StoreOptions,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let path = config_path(project_root);
    if path.exists() && !args.force {
        anyhow::bail!(".lineage/config.toml already exists. Use `lin init --force` to overwrite it.");
    }

    // --force keeps the store settings of a readable config.
    let mut config = if path.exists() {
        load_project_config(project_root).unwrap_or_default()
    } else {
        ProjectConfig::default()
    };
    if let Some(collection) = &args.collection {
        config.dag.collection.clone_from(collection);
    }
    config.dag.allow_root_and_parent = args.allow_root_and_parent;
    config.dag.validate()?;

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    std::fs::write(&path, render_project_config(&config)?)
        .with_context(|| format!("Failed to write config: {}", path.display()))?;

    let store_path = store.store_path(&config, project_root);
    open_store(&store_path)?;
    tracing::info!(store = %store_path.display(), collection = %config.dag.collection, "initialized project");

    let result = InitOutput {
        config: path.display().to_string(),
        store: store_path.display().to_string(),
        collection: config.dag.collection,
        allow_root_and_parent: config.dag.allow_root_and_parent,
    };
    render(output, &result, |r, w| {
        writeln!(w, "✓ Initialized {}", r.store)?;
        writeln!(w, "  Config:     {}", r.config)?;
        writeln!(w, "  Collection: {}", r.collection)
    })
}
