//! `lin add`, `lin rm`, `lin rename`: node registry edits.

use anyhow::Result;
use clap::Args;
use lineage_core::NodeRecord;
use serde::Serialize;
use std::path::Path;

use super::{Access, Session, StoreOptions, surface};
use crate::output::{OutputMode, render, render_mode};

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Names of the nodes to create.
    #[arg(required = true)]
    pub names: Vec<String>,

    /// Link every new node under this parent (id or unique name).
    #[arg(long)]
    pub parent: Option<String>,

    /// Place every new node under this root by name instead of linking it
    /// directly (see `lin plinko`).
    #[arg(long, conflicts_with = "parent")]
    pub plinko: Option<String>,
}

#[derive(Args, Debug)]
pub struct RmArgs {
    /// Node to delete (id or unique name). Its children are re-rooted if it
    /// was their only parent.
    pub node: String,
}

#[derive(Args, Debug)]
pub struct RenameArgs {
    /// Node to rename (id or unique name).
    pub node: String,
    /// New name.
    pub name: String,
}

#[derive(Debug, Serialize)]
struct AddOutput {
    created: Vec<NodeRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent: Option<i64>,
}

/// Execute `lin add`.
///
/// All nodes are created first, then linked or plinkoed one by one, so a
/// failure part-way leaves the earlier nodes in place as roots.
///
/// # Errors
///
/// Returns an error if the parent does not resolve or a store write fails.
pub fn run_add(
    args: &AddArgs,
    store: &StoreOptions,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let mut session = Session::open(project_root, store, Access::Write, output)?;
    let parent = args
        .parent
        .as_deref()
        .map(|reference| session.resolve(output, reference))
        .transpose()?;
    let plinko_root = args
        .plinko
        .as_deref()
        .map(|reference| session.resolve(output, reference))
        .transpose()?;

    let mut created = Vec::with_capacity(args.names.len());
    for name in &args.names {
        let id = session
            .dag
            .create_node(&mut session.conn, name)
            .map_err(|e| surface(output, e))?;
        created.push(NodeRecord {
            id,
            collection: session.dag.collection().to_string(),
            name: name.clone(),
        });
    }

    if let Some(parent) = parent {
        let ids: Vec<i64> = created.iter().map(|node| node.id).collect();
        session
            .dag
            .add_child(&mut session.conn, &parent, &ids)
            .map_err(|e| surface(output, e))?;
    }
    if let Some(root) = plinko_root {
        let ids: Vec<i64> = created.iter().map(|node| node.id).collect();
        let unplaced = session
            .dag
            .plinko_multiple(&mut session.conn, &root, &ids)
            .map_err(|e| surface(output, e))?;
        if !unplaced.is_empty() {
            tracing::info!(?unplaced, "nodes left as roots; no name fit under the plinko root");
        }
    }

    let result = AddOutput {
        created,
        parent: parent.or(plinko_root),
    };
    render_mode(
        output,
        &result,
        |r, w| {
            for node in &r.created {
                writeln!(w, "{}\t{}", node.id, node.name)?;
            }
            Ok(())
        },
        |r, w| {
            for node in &r.created {
                writeln!(w, "✓ Created #{} {}", node.id, node.name)?;
            }
            Ok(())
        },
    )
}

/// Execute `lin rm`.
///
/// # Errors
///
/// Returns an error if the node does not resolve or the delete fails.
pub fn run_rm(
    args: &RmArgs,
    store: &StoreOptions,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let mut session = Session::open(project_root, store, Access::Write, output)?;
    let id = session.resolve(output, &args.node)?;
    let name = session.label(id)?;
    let mut orphaned = Vec::new();
    for child in session.dag.children(&session.conn, &id)? {
        if session.dag.parents(&session.conn, &child)?.len() == 1 {
            orphaned.push(child);
        }
    }

    session
        .dag
        .delete_node(&mut session.conn, id)
        .map_err(|e| surface(output, e))?;

    let result = serde_json::json!({
        "deleted": { "id": id, "name": name },
        "rerooted": orphaned,
    });
    render(output, &result, |_, w| {
        writeln!(w, "✓ Deleted #{id} {name}")?;
        if !orphaned.is_empty() {
            let ids: Vec<String> = orphaned.iter().map(|child| format!("#{child}")).collect();
            writeln!(w, "  Re-rooted: {}", ids.join(", "))?;
        }
        Ok(())
    })
}

/// Execute `lin rename`.
///
/// # Errors
///
/// Returns an error if the node does not resolve or the update fails.
pub fn run_rename(
    args: &RenameArgs,
    store: &StoreOptions,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let mut session = Session::open(project_root, store, Access::Write, output)?;
    let id = session.resolve(output, &args.node)?;
    session
        .dag
        .rename_node(&mut session.conn, id, &args.name)
        .map_err(|e| surface(output, e))?;

    let node = session.dag.get_node(&session.conn, id)?;
    render(output, &node, |_, w| writeln!(w, "✓ Renamed #{id} to {}", args.name))
}
