//! Command handlers and the store session they share.
//!
//! Every handler opens a [`Session`]: project config, advisory lock, store
//! connection and the collection's DAG, in that order. Read commands hold a
//! shared lock, mutating ones an exclusive lock, for the whole command.

pub mod classify;
pub mod init;
pub mod link;
pub mod list;
pub mod nodes;
pub mod show;
pub mod tree;
pub mod verify;

use anyhow::{Context as _, Result};
use lineage_core::config::{ProjectConfig, load_project_config};
use lineage_core::db::open_store;
use lineage_core::lock::{StoreLock, lock_path_for};
use lineage_core::{DagError, ErrorCode, NodeDag, SqliteNodes};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::output::{CliError, OutputMode, render_error};

/// Parent argument that stands for the root sentinel instead of a node.
pub const ROOT_KEYWORD: &str = "root";

/// Where the store lives, as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct StoreOptions {
    /// `--db` override; relative paths resolve against the project root.
    pub db: Option<PathBuf>,
}

impl StoreOptions {
    pub fn store_path(&self, config: &ProjectConfig, project_root: &Path) -> PathBuf {
        self.db.as_ref().map_or_else(
            || config.store_path(project_root),
            |db| project_root.join(db),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

/// An open store plus the lock that guards it for one command.
pub struct Session {
    pub conn: Connection,
    pub dag: NodeDag,
    _lock: StoreLock,
}

impl Session {
    /// Open the store of the project at `project_root`.
    ///
    /// # Errors
    ///
    /// Fails with [`ErrorCode::NotInitialized`] when the store file does not
    /// exist yet, with [`ErrorCode::LockContention`] when another `lin`
    /// process holds a conflicting lock, or when config or store cannot be
    /// loaded.
    pub fn open(
        project_root: &Path,
        store: &StoreOptions,
        access: Access,
        output: OutputMode,
    ) -> Result<Self> {
        let config = load_project_config(project_root)?;
        let path = store.store_path(&config, project_root);
        if !path.exists() {
            let code = ErrorCode::NotInitialized;
            let msg = format!("no store at {}", path.display());
            render_error(
                output,
                &CliError::with_details(&msg, code.hint().unwrap_or_default(), code.code()),
            )?;
            anyhow::bail!("{msg}");
        }

        let lock_path = lock_path_for(&path);
        let timeout = Duration::from_millis(config.store.lock_timeout_ms);
        let acquired = match access {
            Access::Read => StoreLock::acquire_shared(&lock_path, timeout),
            Access::Write => StoreLock::acquire_exclusive(&lock_path, timeout),
        };
        let lock = match acquired {
            Ok(lock) => lock,
            Err(e) => {
                render_error(output, &CliError::from(&e))?;
                return Err(e.into());
            }
        };

        let conn = open_store(&path)?;
        let dag = NodeDag::new(config.dag, SqliteNodes).context("invalid [dag] config")?;
        tracing::debug!(store = %path.display(), ?access, collection = dag.collection(), "session opened");
        Ok(Self {
            conn,
            dag,
            _lock: lock,
        })
    }

    /// Resolve a node reference: a numeric id, or a name unique within the
    /// collection.
    pub fn resolve(&self, output: OutputMode, reference: &str) -> Result<i64> {
        if let Ok(id) = reference.parse::<i64>() {
            if self.dag.get_node(&self.conn, id)?.is_some() {
                return Ok(id);
            }
            return Err(surface(
                output,
                DagError::Identity {
                    id: reference.to_string(),
                },
            ));
        }

        let matches = self.dag.find_by_name(&self.conn, reference)?;
        match matches.as_slice() {
            [only] => Ok(only.id),
            [] => Err(surface(
                output,
                DagError::Identity {
                    id: reference.to_string(),
                },
            )),
            many => {
                let msg = format!("name '{reference}' matches {} nodes", many.len());
                render_error(
                    output,
                    &CliError::with_details(
                        &msg,
                        "Refer to the node by its numeric id (see `lin tree`).",
                        "ambiguous_node",
                    ),
                )?;
                anyhow::bail!("{msg}");
            }
        }
    }

    /// Like [`Session::resolve`], but [`ROOT_KEYWORD`] resolves to `None`.
    pub fn resolve_parent(&self, output: OutputMode, reference: &str) -> Result<Option<i64>> {
        if reference == ROOT_KEYWORD {
            return Ok(None);
        }
        self.resolve(output, reference).map(Some)
    }

    pub fn resolve_all(&self, output: OutputMode, references: &[String]) -> Result<Vec<i64>> {
        references
            .iter()
            .map(|reference| self.resolve(output, reference))
            .collect()
    }

    /// Display name of `id`, falling back to the id itself.
    pub fn label(&self, id: i64) -> Result<String> {
        Ok(self
            .dag
            .get_node(&self.conn, id)?
            .map_or_else(|| format!("#{id}"), |node| node.name))
    }
}

/// Render `err` on stderr in the requested mode and hand it back for `?`.
pub fn surface(output: OutputMode, err: DagError) -> anyhow::Error {
    if let Err(render_err) = render_error(output, &CliError::from(&err)) {
        tracing::warn!("failed to render error: {render_err}");
    }
    anyhow::Error::new(err)
}
