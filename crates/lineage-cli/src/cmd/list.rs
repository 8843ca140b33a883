//! `lin roots` / `lin leaves`.

use anyhow::Result;
use lineage_core::NodeRecord;
use std::path::Path;

use super::{Access, Session, StoreOptions};
use crate::output::{OutputMode, pretty_section, render_mode};

#[derive(Clone, Copy)]
enum Scope {
    Roots,
    Leaves,
}

/// Execute `lin roots`: nodes carrying the root sentinel.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or queried.
pub fn run_roots(store: &StoreOptions, output: OutputMode, project_root: &Path) -> Result<()> {
    run(Scope::Roots, store, output, project_root)
}

/// Execute `lin leaves`: nodes without children.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or queried.
pub fn run_leaves(store: &StoreOptions, output: OutputMode, project_root: &Path) -> Result<()> {
    run(Scope::Leaves, store, output, project_root)
}

fn run(scope: Scope, store: &StoreOptions, output: OutputMode, project_root: &Path) -> Result<()> {
    let session = Session::open(project_root, store, Access::Read, output)?;
    let ids = match scope {
        Scope::Roots => session.dag.roots(&session.conn)?,
        Scope::Leaves => session.dag.leaves(&session.conn)?,
    };
    let mut records: Vec<NodeRecord> = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(record) = session.dag.get_node(&session.conn, id)? {
            records.push(record);
        }
    }

    let heading = match scope {
        Scope::Roots => "Roots",
        Scope::Leaves => "Leaves",
    };
    render_mode(
        output,
        &records,
        |records, w| {
            for node in records {
                writeln!(w, "{}\t{}", node.id, node.name)?;
            }
            Ok(())
        },
        |records, w| {
            pretty_section(w, &format!("{heading} ({})", records.len()))?;
            for node in records {
                writeln!(w, "{:>6}  {}", format!("#{}", node.id), node.name)?;
            }
            Ok(())
        },
    )
}
