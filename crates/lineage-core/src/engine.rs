//! Closure engine: the only writer of the edge and closure stores.
//!
//! Every mutation goes through [`Dag::link`] or [`Dag::unlink`] (or a
//! convenience built on them), and each call runs as one `BEGIN IMMEDIATE`
//! transaction so an edge never becomes visible without its closure rows.
//!
//! # Link
//!
//! A new edge `P → C` creates a path of length `da + 1 + dd` from every
//! ancestor `A` of `P` (at distance `da`) to every descendant `D` of `C` (at
//! distance `dd`). Both sides include the node itself at distance 0, so the
//! cross product covers `(P, C, 1)` too.
//!
//! # Unlink
//!
//! ```text
//!       A   F          unlink(C, D)
//!      / \ /
//!     B   C            P = path(C)    = {A, F, C}
//!     |   :            S = subtree(D) = {D, E}
//!     |   D
//!      \ /             delete P × S, then re-walk from every node of
//!       E              P ∪ S with no real parent: A, F, D
//! ```
//!
//! Deleting the whole `P × S` block also removes rows that a surviving path
//! still justifies (here `(A, E)` via `B`). The walk from each parentless
//! node re-derives every surviving path, so those rows come back while rows
//! that only the removed edge justified stay gone.
//!
//! # Cycles
//!
//! `link` only rejects direct self-loops. A longer cycle is a precondition
//! violation; the rebuild walk refuses to revisit a node already on its own
//! path and fails with [`DagError::CycleDetected`], rolling the unit of work
//! back.

#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

use rusqlite::{Connection, Transaction};
use std::collections::HashSet;
use std::marker::PhantomData;
use tracing::{debug, info, warn};

use crate::config::DagConfig;
use crate::db::write_tx;
use crate::error::DagError;
use crate::node::{NodeKey, NodeSource};
use crate::store::{closure, edges};

/// A DAG-typed collection of nodes backed by the link and closure tables.
///
/// `K` is the node id type, `S` the node-storage collaborator that resolves
/// ids and names.
#[derive(Debug, Clone)]
pub struct Dag<K, S> {
    config: DagConfig,
    source: S,
    _key: PhantomData<fn() -> K>,
}

impl<K: NodeKey, S: NodeSource<K>> Dag<K, S> {
    /// Build an engine for one collection.
    ///
    /// # Errors
    ///
    /// Returns [`DagError::Config`] if the config is invalid.
    pub fn new(config: DagConfig, source: S) -> Result<Self, DagError> {
        config.validate()?;
        Ok(Self {
            config,
            source,
            _key: PhantomData,
        })
    }

    pub const fn config(&self) -> &DagConfig {
        &self.config
    }

    pub fn collection(&self) -> &str {
        &self.config.collection
    }

    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Fail unless `id` is a live node of this collection.
    pub(crate) fn resolve(&self, conn: &Connection, id: &K) -> Result<(), DagError> {
        if !self.source.exists(conn, id)? {
            return Err(DagError::identity(id));
        }
        if let Some(actual) = self.source.collection_of(conn, id)? {
            if actual != self.config.collection {
                return Err(DagError::TypeMismatch {
                    id: format!("{id:?}"),
                    expected: self.config.collection.clone(),
                    actual,
                });
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Node lifecycle
    // -----------------------------------------------------------------------

    /// Give a freshly allocated node its self row and root sentinel.
    ///
    /// Must run before the id is handed to other code. Idempotent.
    pub fn initialize_node(&self, conn: &mut Connection, id: &K) -> Result<(), DagError> {
        write_tx(conn, |tx| self.initialize_node_tx(tx, id))
    }

    pub fn initialize_node_tx(&self, tx: &Transaction<'_>, id: &K) -> Result<(), DagError> {
        self.resolve(tx, id)?;
        let collection = self.collection();
        closure::upsert(tx, collection, id, id, 0)?;
        if edges::edges_by_child(tx, collection, id)?.is_empty() {
            edges::create_edge(tx, collection, None, id)?;
        }
        Ok(())
    }

    /// Deletion-cascade hook: detach `id` and drop every row naming it.
    ///
    /// Children are unlinked first so their closure is repaired and they are
    /// re-rooted if `id` was their last parent.
    pub fn remove_node(&self, conn: &mut Connection, id: &K) -> Result<(), DagError> {
        write_tx(conn, |tx| self.remove_node_tx(tx, id))
    }

    pub fn remove_node_tx(&self, tx: &Transaction<'_>, id: &K) -> Result<(), DagError> {
        for child in self.children(tx, id)? {
            self.unlink_tx(tx, Some(id), &child)?;
        }
        for parent in self.parents(tx, id)? {
            self.unlink_tx(tx, Some(&parent), id)?;
        }
        let collection = self.collection();
        let links = edges::delete_all_for_node(tx, collection, id)?;
        let entries = closure::delete_all_for_node(tx, collection, id)?;
        debug!(collection, node = ?id, links, entries, "removed node from hierarchy");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Link
    // -----------------------------------------------------------------------

    /// Make `child` a direct child of `parent`, or a root when `parent` is
    /// `None`. Calling it again with the same arguments changes nothing.
    ///
    /// # Errors
    ///
    /// [`DagError::Identity`] for an unresolved id, [`DagError::SelfLoop`]
    /// when `parent == child`, [`DagError::TypeMismatch`] across collections.
    pub fn link(&self, conn: &mut Connection, parent: Option<&K>, child: &K) -> Result<(), DagError> {
        write_tx(conn, |tx| self.link_tx(tx, parent, child))
    }

    pub fn link_tx(
        &self,
        tx: &Transaction<'_>,
        parent: Option<&K>,
        child: &K,
    ) -> Result<(), DagError> {
        if let Some(parent) = parent {
            self.resolve(tx, parent)?;
        }
        self.resolve(tx, child)?;
        let collection = self.collection();

        // An existing edge already has its closure rows.
        if edges::edge_exists(tx, collection, parent, child)? {
            debug!(collection, ?parent, ?child, "link already present");
            return Ok(());
        }

        let Some(parent) = parent else {
            if self.config.allow_root_and_parent {
                edges::create_edge(tx, collection, None, child)?;
                return Ok(());
            }
            return self.make_root_tx(tx, child);
        };

        edges::create_edge(tx, collection, Some(parent), child)?;
        if !self.config.allow_root_and_parent {
            edges::delete_edges(tx, collection, None, child)?;
        }

        let ancestors = closure::entries_where_descendant(tx, collection, parent)?;
        let descendants = closure::entries_where_ancestor(tx, collection, child)?;
        let mut written = 0_usize;
        for (ancestor, ancestor_distance) in &ancestors {
            for (descendant, descendant_distance) in &descendants {
                let distance = ancestor_distance + descendant_distance + 1;
                if closure::upsert(tx, collection, ancestor, descendant, distance)? {
                    written += 1;
                }
            }
        }

        debug!(
            collection,
            ?parent,
            ?child,
            ancestors = ancestors.len(),
            descendants = descendants.len(),
            written,
            "linked"
        );
        Ok(())
    }

    /// Link `child` under each of `parents` in one unit of work.
    pub fn add_parent(&self, conn: &mut Connection, child: &K, parents: &[K]) -> Result<(), DagError> {
        write_tx(conn, |tx| {
            for parent in parents {
                self.link_tx(tx, Some(parent), child)?;
            }
            Ok(())
        })
    }

    /// Link each of `children` under `parent` in one unit of work.
    pub fn add_child(&self, conn: &mut Connection, parent: &K, children: &[K]) -> Result<(), DagError> {
        write_tx(conn, |tx| {
            for child in children {
                self.link_tx(tx, Some(parent), child)?;
            }
            Ok(())
        })
    }

    // -----------------------------------------------------------------------
    // Unlink
    // -----------------------------------------------------------------------

    /// Remove exactly the direct edge `parent → child` and repair the closure
    /// rows it may have justified.
    ///
    /// A child left without any edge gets its root sentinel back.
    ///
    /// # Errors
    ///
    /// [`DagError::Identity`] if `child` does not resolve,
    /// [`DagError::CycleDetected`] if the rebuild walk meets a cycle.
    pub fn unlink(&self, conn: &mut Connection, parent: Option<&K>, child: &K) -> Result<(), DagError> {
        write_tx(conn, |tx| self.unlink_tx(tx, parent, child))
    }

    pub fn unlink_tx(
        &self,
        tx: &Transaction<'_>,
        parent: Option<&K>,
        child: &K,
    ) -> Result<(), DagError> {
        self.resolve(tx, child)?;
        let collection = self.collection();

        let removed = edges::delete_edges(tx, collection, parent, child)?;
        if edges::edges_by_child(tx, collection, child)?.is_empty() {
            edges::create_edge(tx, collection, None, child)?;
        }

        // The sentinel carries no closure rows.
        let Some(parent) = parent else {
            return Ok(());
        };
        if removed == 0 {
            debug!(collection, ?parent, ?child, "unlink of absent edge");
            return Ok(());
        }

        let path = node_set(closure::entries_where_descendant(tx, collection, parent)?);
        let subtree = node_set(closure::entries_where_ancestor(tx, collection, child)?);
        let deleted = closure::delete_where(tx, collection, &path, &subtree)?;

        let mut seen = HashSet::new();
        let mut starting_points = Vec::new();
        for node in path.iter().chain(subtree.iter()) {
            if seen.insert(node) && !self.has_real_parent(tx, node)? {
                starting_points.push(node.clone());
            }
        }
        info!(
            collection,
            ?parent,
            ?child,
            deleted,
            starting_points = ?starting_points,
            "rebuilding closure after unlink"
        );

        for start in &starting_points {
            self.rebuild_subtree_tx(tx, start)?;
        }
        Ok(())
    }

    /// Unlink `child` from `parent`.
    pub fn remove_parent(&self, conn: &mut Connection, child: &K, parent: &K) -> Result<(), DagError> {
        self.unlink(conn, Some(parent), child)
    }

    /// Unlink `child` from `parent`.
    pub fn remove_child(&self, conn: &mut Connection, parent: &K, child: &K) -> Result<(), DagError> {
        self.unlink(conn, Some(parent), child)
    }

    // -----------------------------------------------------------------------
    // Rebuild
    // -----------------------------------------------------------------------

    /// Re-derive closure rows for every path that starts at `start`.
    ///
    /// Depth-first over child edges with an explicit stack. Each branch owns
    /// its copy of the path, so a node reached along two branches of
    /// different length gets one row per distance. Returns the number of
    /// rows written.
    pub fn rebuild_subtree(&self, conn: &mut Connection, start: &K) -> Result<usize, DagError> {
        write_tx(conn, |tx| self.rebuild_subtree_tx(tx, start))
    }

    pub fn rebuild_subtree_tx(&self, tx: &Transaction<'_>, start: &K) -> Result<usize, DagError> {
        let collection = self.collection();
        let mut written = 0_usize;
        let mut stack: Vec<(K, Vec<K>)> = vec![(start.clone(), Vec::new())];

        while let Some((node, mut path)) = stack.pop() {
            if path.contains(&node) {
                warn!(collection, node = ?node, path = ?path, "cycle reached during rebuild");
                return Err(DagError::cycle(&node));
            }
            path.push(node.clone());

            for (distance, ancestor) in path.iter().rev().enumerate() {
                if closure::upsert(tx, collection, ancestor, &node, depth(distance))? {
                    written += 1;
                }
            }

            let children = edges::edges_by_parent(tx, collection, Some(&node))?;
            for edge in children.into_iter().rev() {
                stack.push((edge.child_id, path.clone()));
            }
        }

        debug!(collection, start = ?start, written, "rebuilt subtree");
        Ok(written)
    }

    // -----------------------------------------------------------------------
    // Roots and bulk edits
    // -----------------------------------------------------------------------

    /// Make `n` a root. Under the default config every real parent is
    /// unlinked first; descendants are untouched.
    pub fn make_root(&self, conn: &mut Connection, n: &K) -> Result<(), DagError> {
        write_tx(conn, |tx| self.make_root_tx(tx, n))
    }

    pub fn make_root_tx(&self, tx: &Transaction<'_>, n: &K) -> Result<(), DagError> {
        self.resolve(tx, n)?;
        if !self.config.allow_root_and_parent {
            for parent in self.parents(tx, n)? {
                self.unlink_tx(tx, Some(&parent), n)?;
            }
        }
        let collection = self.collection();
        if !edges::edge_exists(tx, collection, None, n)? {
            edges::create_edge(tx, collection, None, n)?;
        }
        Ok(())
    }

    /// Drop the root sentinel of `n`. A node with no other edge keeps it.
    pub fn unroot(&self, conn: &mut Connection, n: &K) -> Result<(), DagError> {
        write_tx(conn, |tx| self.unlink_tx(tx, None, n))
    }

    /// Replace the parents of `child` with `parents`.
    ///
    /// A `None` entry asks for `child` to also stay a root. Under the default
    /// config a root cannot keep real parents, so a list containing `None`
    /// ends with `child` as a bare root.
    pub fn set_parents(
        &self,
        conn: &mut Connection,
        child: &K,
        parents: &[Option<K>],
    ) -> Result<(), DagError> {
        write_tx(conn, |tx| self.set_parents_tx(tx, child, parents))
    }

    pub fn set_parents_tx(
        &self,
        tx: &Transaction<'_>,
        child: &K,
        parents: &[Option<K>],
    ) -> Result<(), DagError> {
        let wanted: Vec<&K> = parents.iter().flatten().collect();
        let wants_root = wanted.len() != parents.len();

        for current in self.parents(tx, child)? {
            if !wanted.contains(&&current) {
                self.unlink_tx(tx, Some(&current), child)?;
            }
        }
        for parent in wanted.iter().copied() {
            self.link_tx(tx, Some(parent), child)?;
        }

        let orphaned = !self.has_real_parent(tx, child)?;
        if (orphaned && !self.config.allow_root_and_parent) || wants_root {
            self.make_root_tx(tx, child)
        } else {
            self.unlink_tx(tx, None, child)
        }
    }

    /// Replace the children of `parent` with `children`.
    pub fn set_children(
        &self,
        conn: &mut Connection,
        parent: &K,
        children: &[K],
    ) -> Result<(), DagError> {
        write_tx(conn, |tx| {
            for current in self.children(tx, parent)? {
                if !children.contains(&current) {
                    self.unlink_tx(tx, Some(parent), &current)?;
                }
            }
            for child in children {
                self.link_tx(tx, Some(parent), child)?;
            }
            Ok(())
        })
    }

    /// Wipe and re-initialize the hierarchy of `nodes`.
    ///
    /// Edges crossing from the set to nodes outside it are unlinked first so
    /// outside nodes keep a consistent closure; then every link and closure
    /// row touching the set is deleted and each node starts over as a root.
    pub fn reset_hierarchy(&self, conn: &mut Connection, nodes: &[K]) -> Result<(), DagError> {
        write_tx(conn, |tx| self.reset_hierarchy_tx(tx, nodes))
    }

    pub fn reset_hierarchy_tx(&self, tx: &Transaction<'_>, nodes: &[K]) -> Result<(), DagError> {
        let members: HashSet<&K> = nodes.iter().collect();
        for node in nodes {
            for parent in self.parents(tx, node)? {
                if !members.contains(&parent) {
                    self.unlink_tx(tx, Some(&parent), node)?;
                }
            }
            for child in self.children(tx, node)? {
                if !members.contains(&child) {
                    self.unlink_tx(tx, Some(node), &child)?;
                }
            }
        }

        let collection = self.collection();
        let links = edges::delete_touching(tx, collection, nodes)?;
        let entries = closure::delete_touching(tx, collection, nodes)?;
        for node in nodes {
            self.initialize_node_tx(tx, node)?;
        }
        info!(collection, nodes = nodes.len(), links, entries, "reset hierarchy");
        Ok(())
    }
}

/// Distinct ids of a closure projection, first occurrence kept.
fn node_set<K: NodeKey>(entries: Vec<(K, u32)>) -> Vec<K> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter_map(|(id, _)| seen.insert(id.clone()).then_some(id))
        .collect()
}

fn depth(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use crate::store::closure::ClosureEntry;
    use std::collections::HashMap;

    type TestDag = Dag<String, HashMap<String, String>>;

    fn setup(names: &[&str]) -> (Connection, TestDag) {
        setup_with(names, DagConfig::for_collection("tags"))
    }

    fn setup_with(names: &[&str], config: DagConfig) -> (Connection, TestDag) {
        let mut conn = open_in_memory().unwrap();
        let source: HashMap<String, String> = names
            .iter()
            .map(|n| ((*n).to_string(), (*n).to_string()))
            .collect();
        let dag = Dag::new(config, source).unwrap();
        for name in names {
            dag.initialize_node(&mut conn, &id(name)).unwrap();
        }
        (conn, dag)
    }

    fn id(name: &str) -> String {
        name.to_string()
    }

    fn entries(conn: &Connection) -> Vec<(String, String, u32)> {
        closure::all_entries::<String>(conn, "tags")
            .unwrap()
            .into_iter()
            .map(|ClosureEntry { ancestor_id, descendant_id, distance }| {
                (ancestor_id, descendant_id, distance)
            })
            .collect()
    }

    fn has_entry(conn: &Connection, a: &str, d: &str, distance: u32) -> bool {
        entries(conn).contains(&(id(a), id(d), distance))
    }

    fn sentinel(conn: &Connection, n: &str) -> bool {
        edges::edge_exists::<String>(conn, "tags", None, &id(n)).unwrap()
    }

    #[test]
    fn initialize_creates_self_row_and_sentinel_once() {
        let (mut conn, dag) = setup(&["a"]);
        dag.initialize_node(&mut conn, &id("a")).unwrap();

        assert_eq!(entries(&conn), vec![(id("a"), id("a"), 0)]);
        assert_eq!(edges::edges_by_child(&conn, "tags", &id("a")).unwrap().len(), 1);
        assert!(sentinel(&conn, "a"));
    }

    #[test]
    fn initialize_unknown_node_is_identity_error() {
        let (mut conn, dag) = setup(&[]);
        let err = dag.initialize_node(&mut conn, &id("ghost")).unwrap_err();
        assert!(matches!(err, DagError::Identity { .. }));
    }

    #[test]
    fn link_writes_cross_product_and_drops_sentinel() {
        let (mut conn, dag) = setup(&["a", "b", "c"]);
        dag.link(&mut conn, Some(&id("b")), &id("c")).unwrap();
        dag.link(&mut conn, Some(&id("a")), &id("b")).unwrap();

        assert!(has_entry(&conn, "a", "b", 1));
        assert!(has_entry(&conn, "b", "c", 1));
        assert!(has_entry(&conn, "a", "c", 2));
        assert!(sentinel(&conn, "a"));
        assert!(!sentinel(&conn, "b"));
        assert!(!sentinel(&conn, "c"));
    }

    #[test]
    fn link_is_idempotent() {
        let (mut conn, dag) = setup(&["a", "b"]);
        dag.link(&mut conn, Some(&id("a")), &id("b")).unwrap();
        let before = entries(&conn);
        dag.link(&mut conn, Some(&id("a")), &id("b")).unwrap();

        assert_eq!(entries(&conn), before);
        let rows = edges::edges_by_child(&conn, "tags", &id("b")).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn link_rejects_self_loop_and_leaves_store_untouched() {
        let (mut conn, dag) = setup(&["a"]);
        let before = entries(&conn);
        let err = dag.link(&mut conn, Some(&id("a")), &id("a")).unwrap_err();

        assert!(matches!(err, DagError::SelfLoop { .. }));
        assert_eq!(entries(&conn), before);
        assert!(sentinel(&conn, "a"));
    }

    #[test]
    fn link_rejects_unresolved_ids() {
        let (mut conn, dag) = setup(&["a"]);
        let err = dag.link(&mut conn, Some(&id("nope")), &id("a")).unwrap_err();
        assert!(matches!(err, DagError::Identity { .. }));
        let err = dag.link(&mut conn, Some(&id("a")), &id("nope")).unwrap_err();
        assert!(matches!(err, DagError::Identity { .. }));
    }

    #[test]
    fn link_none_makes_root_under_default_config() {
        let (mut conn, dag) = setup(&["a", "b"]);
        dag.link(&mut conn, Some(&id("a")), &id("b")).unwrap();
        dag.link(&mut conn, None, &id("b")).unwrap();

        assert!(sentinel(&conn, "b"));
        assert!(!has_entry(&conn, "a", "b", 1));
        assert_eq!(edges::edges_by_child(&conn, "tags", &id("b")).unwrap().len(), 1);
    }

    #[test]
    fn allow_root_and_parent_keeps_sentinel() {
        let mut config = DagConfig::for_collection("tags");
        config.allow_root_and_parent = true;
        let (mut conn, dag) = setup_with(&["a", "b"], config);

        dag.link(&mut conn, Some(&id("a")), &id("b")).unwrap();
        assert!(sentinel(&conn, "b"));
        assert!(has_entry(&conn, "a", "b", 1));
    }

    #[test]
    fn unlink_last_parent_restores_sentinel() {
        let (mut conn, dag) = setup(&["a", "b"]);
        dag.link(&mut conn, Some(&id("a")), &id("b")).unwrap();
        dag.unlink(&mut conn, Some(&id("a")), &id("b")).unwrap();

        assert!(sentinel(&conn, "b"));
        assert!(!has_entry(&conn, "a", "b", 1));
        assert!(has_entry(&conn, "b", "b", 0));
    }

    #[test]
    fn unlink_sentinel_of_bare_root_keeps_it() {
        let (mut conn, dag) = setup(&["a"]);
        dag.unroot(&mut conn, &id("a")).unwrap();
        assert!(sentinel(&conn, "a"));
    }

    #[test]
    fn unlink_absent_edge_changes_nothing() {
        let (mut conn, dag) = setup(&["a", "b", "c"]);
        dag.link(&mut conn, Some(&id("a")), &id("b")).unwrap();
        let before = entries(&conn);
        dag.unlink(&mut conn, Some(&id("c")), &id("b")).unwrap();
        assert_eq!(entries(&conn), before);
    }

    #[test]
    fn unlink_keeps_rows_justified_by_other_paths() {
        // a -> b -> d, a -> c -> d
        let (mut conn, dag) = setup(&["a", "b", "c", "d"]);
        dag.link(&mut conn, Some(&id("a")), &id("b")).unwrap();
        dag.link(&mut conn, Some(&id("a")), &id("c")).unwrap();
        dag.link(&mut conn, Some(&id("b")), &id("d")).unwrap();
        dag.link(&mut conn, Some(&id("c")), &id("d")).unwrap();

        dag.unlink(&mut conn, Some(&id("b")), &id("d")).unwrap();

        assert!(has_entry(&conn, "a", "d", 2));
        assert!(has_entry(&conn, "c", "d", 1));
        assert!(!has_entry(&conn, "b", "d", 1));
        assert!(has_entry(&conn, "a", "b", 1));
    }

    #[test]
    fn unlink_drops_longer_distance_only_when_its_path_goes() {
        // a -> b -> c and a shortcut a -> c
        let (mut conn, dag) = setup(&["a", "b", "c"]);
        dag.link(&mut conn, Some(&id("a")), &id("b")).unwrap();
        dag.link(&mut conn, Some(&id("b")), &id("c")).unwrap();
        dag.link(&mut conn, Some(&id("a")), &id("c")).unwrap();
        assert!(has_entry(&conn, "a", "c", 1));
        assert!(has_entry(&conn, "a", "c", 2));

        dag.unlink(&mut conn, Some(&id("b")), &id("c")).unwrap();
        assert!(has_entry(&conn, "a", "c", 1));
        assert!(!has_entry(&conn, "a", "c", 2));
    }

    #[test]
    fn rebuild_walk_reports_cycles() {
        let (mut conn, dag) = setup(&["a", "b", "c"]);
        dag.link(&mut conn, Some(&id("a")), &id("b")).unwrap();
        dag.link(&mut conn, Some(&id("b")), &id("c")).unwrap();
        // c -> b closes a loop; link does not look for it.
        dag.link(&mut conn, Some(&id("c")), &id("b")).unwrap();

        let err = dag.rebuild_subtree(&mut conn, &id("a")).unwrap_err();
        assert!(matches!(err, DagError::CycleDetected { .. }));
    }

    #[test]
    fn failed_unit_of_work_rolls_back_edges() {
        let (mut conn, dag) = setup(&["a", "b"]);
        let err = dag
            .add_child(&mut conn, &id("a"), &[id("b"), id("missing")])
            .unwrap_err();
        assert!(matches!(err, DagError::Identity { .. }));

        // The first link of the batch was rolled back with the failure.
        assert!(!edges::edge_exists(&conn, "tags", Some(&id("a")), &id("b")).unwrap());
        assert!(sentinel(&conn, "b"));
        assert!(!has_entry(&conn, "a", "b", 1));
    }

    #[test]
    fn make_root_detaches_parents_but_not_children() {
        let (mut conn, dag) = setup(&["a", "b", "c"]);
        dag.link(&mut conn, Some(&id("a")), &id("b")).unwrap();
        dag.link(&mut conn, Some(&id("b")), &id("c")).unwrap();

        dag.make_root(&mut conn, &id("b")).unwrap();
        assert!(sentinel(&conn, "b"));
        assert!(!has_entry(&conn, "a", "c", 2));
        assert!(has_entry(&conn, "b", "c", 1));
    }

    #[test]
    fn set_parents_replaces_the_parent_set() {
        let (mut conn, dag) = setup(&["a", "b", "c", "d"]);
        dag.add_parent(&mut conn, &id("d"), &[id("a"), id("b")]).unwrap();

        dag.set_parents(&mut conn, &id("d"), &[Some(id("b")), Some(id("c"))])
            .unwrap();
        assert!(!has_entry(&conn, "a", "d", 1));
        assert!(has_entry(&conn, "b", "d", 1));
        assert!(has_entry(&conn, "c", "d", 1));
        assert!(!sentinel(&conn, "d"));

        dag.set_parents(&mut conn, &id("d"), &[]).unwrap();
        assert!(sentinel(&conn, "d"));
        assert!(!has_entry(&conn, "b", "d", 1));
    }

    #[test]
    fn set_parents_with_root_entry_makes_root() {
        let (mut conn, dag) = setup(&["a", "b"]);
        dag.set_parents(&mut conn, &id("b"), &[Some(id("a")), None]).unwrap();
        assert!(sentinel(&conn, "b"));
        assert!(!has_entry(&conn, "a", "b", 1));
    }

    #[test]
    fn set_children_replaces_the_child_set() {
        let (mut conn, dag) = setup(&["a", "b", "c"]);
        dag.add_child(&mut conn, &id("a"), &[id("b")]).unwrap();
        dag.set_children(&mut conn, &id("a"), &[id("c")]).unwrap();

        assert!(!has_entry(&conn, "a", "b", 1));
        assert!(has_entry(&conn, "a", "c", 1));
        assert!(sentinel(&conn, "b"));
    }

    #[test]
    fn remove_node_reroots_orphaned_children() {
        let (mut conn, dag) = setup(&["a", "b", "c"]);
        dag.link(&mut conn, Some(&id("a")), &id("b")).unwrap();
        dag.link(&mut conn, Some(&id("b")), &id("c")).unwrap();

        dag.remove_node(&mut conn, &id("b")).unwrap();

        assert!(sentinel(&conn, "c"));
        assert!(!has_entry(&conn, "a", "c", 2));
        assert!(entries(&conn).iter().all(|(a, d, _)| a != "b" && d != "b"));
        assert!(edges::edges_by_child(&conn, "tags", &id("b")).unwrap().is_empty());
    }

    #[test]
    fn reset_hierarchy_repairs_outside_neighbours() {
        // outer -> a -> b -> tail
        let (mut conn, dag) = setup(&["outer", "a", "b", "tail"]);
        dag.link(&mut conn, Some(&id("outer")), &id("a")).unwrap();
        dag.link(&mut conn, Some(&id("a")), &id("b")).unwrap();
        dag.link(&mut conn, Some(&id("b")), &id("tail")).unwrap();

        dag.reset_hierarchy(&mut conn, &[id("a"), id("b")]).unwrap();

        assert!(sentinel(&conn, "a"));
        assert!(sentinel(&conn, "b"));
        assert!(sentinel(&conn, "tail"));
        assert!(!has_entry(&conn, "outer", "tail", 3));
        assert!(!has_entry(&conn, "a", "b", 1));
        assert!(has_entry(&conn, "a", "a", 0));
        assert!(has_entry(&conn, "tail", "tail", 0));
    }

    #[test]
    fn node_set_keeps_first_occurrence() {
        let ids = node_set(vec![(3_i64, 2), (1, 1), (3, 1), (2, 0)]);
        assert_eq!(ids, vec![3, 1, 2]);
    }
}
