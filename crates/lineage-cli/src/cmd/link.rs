//! `lin link` / `lin unlink`: edit one edge and report the child's new
//! parents.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::Path;

use super::{Access, ROOT_KEYWORD, Session, StoreOptions, surface};
use crate::output::{OutputMode, render};

#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Parent node (id or unique name), or `root` for the root sentinel.
    pub parent: String,

    /// Child node (id or unique name).
    pub child: String,
}

#[derive(Debug, Serialize)]
struct LinkOutput {
    action: &'static str,
    parent: Option<i64>,
    child: i64,
    parents: Vec<i64>,
    is_root: bool,
}

#[derive(Clone, Copy)]
enum Action {
    Link,
    Unlink,
}

/// Execute `lin link`.
///
/// # Errors
///
/// Returns an error if either node does not resolve or the link is refused
/// (self-loop, collection mismatch).
pub fn run_link(
    args: &LinkArgs,
    store: &StoreOptions,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    run(Action::Link, args, store, output, project_root)
}

/// Execute `lin unlink`.
///
/// # Errors
///
/// Returns an error if either node does not resolve or the closure repair
/// hits a cycle.
pub fn run_unlink(
    args: &LinkArgs,
    store: &StoreOptions,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    run(Action::Unlink, args, store, output, project_root)
}

fn run(
    action: Action,
    args: &LinkArgs,
    store: &StoreOptions,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let mut session = Session::open(project_root, store, Access::Write, output)?;
    let parent = session.resolve_parent(output, &args.parent)?;
    let child = session.resolve(output, &args.child)?;

    let outcome = match action {
        Action::Link => session.dag.link(&mut session.conn, parent.as_ref(), &child),
        Action::Unlink => session.dag.unlink(&mut session.conn, parent.as_ref(), &child),
    };
    outcome.map_err(|e| surface(output, e))?;

    let result = LinkOutput {
        action: match action {
            Action::Link => "link",
            Action::Unlink => "unlink",
        },
        parent,
        child,
        parents: session.dag.parents(&session.conn, &child)?,
        is_root: session.dag.is_root(&session.conn, &child)?,
    };
    let parent_label = match parent {
        Some(id) => session.label(id)?,
        None => ROOT_KEYWORD.to_string(),
    };
    let child_label = session.label(child)?;

    render(output, &result, |r, w| {
        let verb = match action {
            Action::Link => "Linked",
            Action::Unlink => "Unlinked",
        };
        writeln!(w, "✓ {verb} {parent_label} → {child_label}")?;
        if r.is_root {
            writeln!(w, "  {child_label} is a root")?;
        }
        Ok(())
    })
}
