//! `lin tree`: the hierarchy as an indented forest.
//!
//! A node with several parents is printed under each of them, so the output
//! can be longer than the node count.

use anyhow::Result;
use lineage_core::{DagError, NodeDag};
use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::Path;

use super::{Access, Session, StoreOptions};
use crate::output::{OutputMode, render_mode};

#[derive(Debug, Serialize)]
pub struct TreeNode {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

fn build(
    dag: &NodeDag,
    conn: &Connection,
    names: &HashMap<i64, String>,
    id: i64,
) -> Result<TreeNode, DagError> {
    let children = dag
        .children(conn, &id)?
        .into_iter()
        .map(|child| build(dag, conn, names, child))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(TreeNode {
        id,
        name: names.get(&id).cloned().unwrap_or_default(),
        children,
    })
}

fn write_text(w: &mut dyn Write, node: &TreeNode, depth: usize) -> io::Result<()> {
    writeln!(w, "{}{}\t{}", "  ".repeat(depth), node.id, node.name)?;
    for child in &node.children {
        write_text(w, child, depth + 1)?;
    }
    Ok(())
}

fn write_pretty(w: &mut dyn Write, node: &TreeNode, prefix: &str, last: bool) -> io::Result<()> {
    let (branch, carry) = if last { ("└── ", "    ") } else { ("├── ", "│   ") };
    writeln!(w, "{prefix}{branch}{} (#{})", node.name, node.id)?;
    let prefix = format!("{prefix}{carry}");
    for (i, child) in node.children.iter().enumerate() {
        write_pretty(w, child, &prefix, i + 1 == node.children.len())?;
    }
    Ok(())
}

/// Execute `lin tree`. Top-level entries are the nodes without a real
/// parent.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or queried.
pub fn run_tree(store: &StoreOptions, output: OutputMode, project_root: &Path) -> Result<()> {
    let session = Session::open(project_root, store, Access::Read, output)?;
    let (dag, conn) = (&session.dag, &session.conn);
    let records = dag.list_nodes(conn)?;
    let names: HashMap<i64, String> = records
        .iter()
        .map(|node| (node.id, node.name.clone()))
        .collect();

    let mut forest = Vec::new();
    for node in &records {
        if dag.parents(conn, &node.id)?.is_empty() {
            forest.push(build(dag, conn, &names, node.id)?);
        }
    }

    render_mode(
        output,
        &forest,
        |forest, w| {
            for tree in forest {
                write_text(w, tree, 0)?;
            }
            Ok(())
        },
        |forest, w| {
            for tree in forest {
                writeln!(w, "{} (#{})", tree.name, tree.id)?;
                for (i, child) in tree.children.iter().enumerate() {
                    write_pretty(w, child, "", i + 1 == tree.children.len())?;
                }
            }
            Ok(())
        },
    )
}
