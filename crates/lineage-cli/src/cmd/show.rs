//! `lin show`: one node with its place in the hierarchy.

use anyhow::Result;
use clap::Args;
use lineage_core::unique;
use serde::Serialize;
use std::path::Path;

use super::{Access, Session, StoreOptions};
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Node to display (id or unique name).
    pub node: String,
}

/// A related node as listed by `show`.
#[derive(Debug, Serialize)]
pub struct Related {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct ShowNode {
    pub id: i64,
    pub name: String,
    pub collection: String,
    pub is_root: bool,
    pub is_leaf: bool,
    /// Words of the name that no parent's name contains.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_name: Option<String>,
    pub parents: Vec<Related>,
    pub children: Vec<Related>,
    /// Distinct ancestors, nearest first.
    pub ancestors: Vec<Related>,
    /// Distinct descendants, nearest first.
    pub descendants: Vec<Related>,
}

fn related(session: &Session, ids: Vec<i64>) -> Result<Vec<Related>> {
    ids.into_iter()
        .map(|id| {
            Ok(Related {
                id,
                name: session.label(id)?,
            })
        })
        .collect()
}

fn names(list: &[Related]) -> String {
    if list.is_empty() {
        return "(none)".to_string();
    }
    list.iter()
        .map(|node| format!("{} (#{})", node.name, node.id))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Execute `lin show`.
///
/// # Errors
///
/// Returns an error if the node does not resolve or a query fails.
pub fn run_show(
    args: &ShowArgs,
    store: &StoreOptions,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let session = Session::open(project_root, store, Access::Read, output)?;
    let id = session.resolve(output, &args.node)?;
    let (dag, conn) = (&session.dag, &session.conn);

    let Some(record) = dag.get_node(conn, id)? else {
        anyhow::bail!("node #{id} vanished while reading");
    };
    let item = ShowNode {
        id,
        name: record.name,
        collection: record.collection,
        is_root: dag.is_root(conn, &id)?,
        is_leaf: dag.is_leaf(conn, &id)?,
        unique_name: dag.unique_name_portion(conn, &id)?,
        parents: related(&session, dag.parents(conn, &id)?)?,
        children: related(&session, dag.children(conn, &id)?)?,
        ancestors: related(&session, unique(dag.ancestors(conn, &id)?))?,
        descendants: related(&session, unique(dag.descendants(conn, &id)?))?,
    };

    render_mode(
        output,
        &item,
        |item, w| {
            writeln!(w, "id\t{}", item.id)?;
            writeln!(w, "name\t{}", item.name)?;
            writeln!(w, "root\t{}", item.is_root)?;
            writeln!(w, "leaf\t{}", item.is_leaf)?;
            for (label, list) in [
                ("parent", &item.parents),
                ("child", &item.children),
                ("ancestor", &item.ancestors),
                ("descendant", &item.descendants),
            ] {
                for node in list {
                    writeln!(w, "{label}\t{}\t{}", node.id, node.name)?;
                }
            }
            Ok(())
        },
        |item, w| {
            pretty_section(w, &format!("#{} {}", item.id, item.name))?;
            pretty_kv(w, "Collection", &item.collection)?;
            pretty_kv(w, "Root", if item.is_root { "yes" } else { "no" })?;
            pretty_kv(w, "Leaf", if item.is_leaf { "yes" } else { "no" })?;
            if let Some(portion) = &item.unique_name {
                pretty_kv(w, "Own words", portion)?;
            }
            pretty_kv(w, "Parents", names(&item.parents))?;
            pretty_kv(w, "Children", names(&item.children))?;
            pretty_kv(w, "Ancestors", names(&item.ancestors))?;
            pretty_kv(w, "Descendants", names(&item.descendants))
        },
    )
}
