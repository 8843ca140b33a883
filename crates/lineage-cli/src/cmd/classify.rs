//! `lin plinko` / `lin reorganize`: name-based placement.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::Path;

use super::{Access, Session, StoreOptions, surface};
use crate::output::{OutputMode, render};

#[derive(Args, Debug)]
pub struct PlinkoArgs {
    /// Root of the subtree to search (id or unique name).
    pub root: String,

    /// Node to place (id or unique name).
    pub candidate: String,
}

#[derive(Args, Debug)]
pub struct ReorganizeArgs {
    /// Strip existing links before placing, so stale placement cannot hide a
    /// better parent.
    #[arg(long)]
    pub reset: bool,

    /// Nodes to arrange (ids or unique names). Defaults to the whole
    /// collection.
    pub nodes: Vec<String>,
}

#[derive(Debug, Serialize)]
struct PlinkoOutput {
    root: i64,
    candidate: i64,
    placed: bool,
    parents: Vec<i64>,
}

#[derive(Debug, Serialize)]
struct ReorganizeOutput {
    reset: bool,
    nodes: usize,
    roots: Vec<i64>,
}

/// Execute `lin plinko`.
///
/// # Errors
///
/// Returns an error if a node does not resolve or the placement fails.
pub fn run_plinko(
    args: &PlinkoArgs,
    store: &StoreOptions,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let mut session = Session::open(project_root, store, Access::Write, output)?;
    let root = session.resolve(output, &args.root)?;
    let candidate = session.resolve(output, &args.candidate)?;

    let placed = session
        .dag
        .plinko(&mut session.conn, &root, &candidate)
        .map_err(|e| surface(output, e))?;

    let parents = session.dag.parents(&session.conn, &candidate)?;
    let mut labels = Vec::with_capacity(parents.len());
    for parent in &parents {
        labels.push(session.label(*parent)?);
    }
    let candidate_label = session.label(candidate)?;
    let result = PlinkoOutput {
        root,
        candidate,
        placed,
        parents,
    };
    render(output, &result, |r, w| {
        if r.placed {
            writeln!(w, "✓ Placed {candidate_label} under {}", labels.join(", "))
        } else {
            writeln!(w, "{candidate_label} does not fit under #{}", r.root)
        }
    })
}

/// Execute `lin reorganize`.
///
/// With `--reset`, the reset and the placement run in one transaction.
///
/// # Errors
///
/// Returns an error if a node does not resolve or a write fails.
pub fn run_reorganize(
    args: &ReorganizeArgs,
    store: &StoreOptions,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let mut session = Session::open(project_root, store, Access::Write, output)?;
    let ids = if args.nodes.is_empty() {
        session.dag.nodes(&session.conn)?
    } else {
        session.resolve_all(output, &args.nodes)?
    };

    let arranged = if args.reset {
        session.dag.reorganize_all(&mut session.conn, &ids)
    } else {
        session.dag.reorganize(&mut session.conn, &ids)
    };
    arranged.map_err(|e| surface(output, e))?;

    let result = ReorganizeOutput {
        reset: args.reset,
        nodes: ids.len(),
        roots: session.dag.roots(&session.conn)?,
    };
    render(output, &result, |r, w| {
        writeln!(
            w,
            "✓ Reorganized {} node(s); {} root(s)",
            r.nodes,
            r.roots.len()
        )
    })
}
