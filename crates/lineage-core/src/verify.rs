//! Consistency check of the closure store against the edge store.
//!
//! The expected closure is recomputed from the links alone, walking from
//! every node without a real parent, and compared row for row with what is
//! stored. Edge invariants (every node has a link row, sentinel exclusivity)
//! are checked alongside.

use rusqlite::Connection;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::warn;

use crate::engine::Dag;
use crate::error::DagError;
use crate::node::{NodeKey, NodeSource};
use crate::store::closure::{self, ClosureEntry};
use crate::store::edges;

/// One mismatch between the stores and the rules they must follow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Discrepancy<K> {
    /// A path exists in the links but its closure row is absent.
    MissingEntry {
        ancestor: K,
        descendant: K,
        distance: u32,
    },
    /// A closure row no path in the links justifies.
    StaleEntry {
        ancestor: K,
        descendant: K,
        distance: u32,
    },
    /// A node lacks its `(n, n, 0)` row.
    MissingSelfEntry { node: K },
    /// A node with no link row naming it as child.
    NoEdges { node: K },
    /// A root sentinel next to a real parent while roots may not have one.
    SentinelWithParent { node: K },
    /// The links contain a cycle through this node.
    Cycle { node: K },
}

/// Outcome of [`verify_store`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyReport<K> {
    pub nodes: usize,
    pub links: usize,
    pub entries: usize,
    pub discrepancies: Vec<Discrepancy<K>>,
}

impl<K> VerifyReport<K> {
    /// Return `true` when no discrepancy was found.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.discrepancies.is_empty()
    }
}

/// Recompute the closure of `dag`'s collection and diff it with the store.
///
/// # Errors
///
/// Returns [`DagError::Db`] if reading either store fails.
pub fn verify_store<K: NodeKey, S: NodeSource<K>>(
    conn: &Connection,
    dag: &Dag<K, S>,
) -> Result<VerifyReport<K>, DagError> {
    let collection = dag.collection();
    let links = edges::all_edges::<K>(conn, collection)?;
    let stored: BTreeSet<ClosureEntry<K>> =
        closure::all_entries(conn, collection)?.into_iter().collect();

    let mut nodes: BTreeSet<K> = BTreeSet::new();
    let mut children: HashMap<K, Vec<K>> = HashMap::new();
    let mut has_parent: HashSet<K> = HashSet::new();
    let mut has_sentinel: HashSet<K> = HashSet::new();
    let mut has_link: HashSet<K> = HashSet::new();
    for link in &links {
        nodes.insert(link.child_id.clone());
        has_link.insert(link.child_id.clone());
        match &link.parent_id {
            Some(parent) => {
                nodes.insert(parent.clone());
                has_parent.insert(link.child_id.clone());
                children
                    .entry(parent.clone())
                    .or_default()
                    .push(link.child_id.clone());
            }
            None => {
                has_sentinel.insert(link.child_id.clone());
            }
        }
    }
    for entry in &stored {
        nodes.insert(entry.ancestor_id.clone());
        nodes.insert(entry.descendant_id.clone());
    }

    let mut discrepancies = Vec::new();
    for node in &nodes {
        if !has_link.contains(node) {
            discrepancies.push(Discrepancy::NoEdges { node: node.clone() });
        }
        if !dag.config().allow_root_and_parent
            && has_sentinel.contains(node)
            && has_parent.contains(node)
        {
            discrepancies.push(Discrepancy::SentinelWithParent { node: node.clone() });
        }
    }

    let mut expected: BTreeSet<ClosureEntry<K>> = nodes
        .iter()
        .map(|node| ClosureEntry {
            ancestor_id: node.clone(),
            descendant_id: node.clone(),
            distance: 0,
        })
        .collect();
    let mut cycles = BTreeSet::new();
    for start in nodes.iter().filter(|node| !has_parent.contains(*node)) {
        walk(start, &children, &mut expected, &mut cycles);
    }
    discrepancies.extend(cycles.into_iter().map(|node| Discrepancy::Cycle { node }));

    for entry in expected.difference(&stored) {
        if entry.distance == 0 && entry.ancestor_id == entry.descendant_id {
            discrepancies.push(Discrepancy::MissingSelfEntry {
                node: entry.ancestor_id.clone(),
            });
        } else {
            discrepancies.push(Discrepancy::MissingEntry {
                ancestor: entry.ancestor_id.clone(),
                descendant: entry.descendant_id.clone(),
                distance: entry.distance,
            });
        }
    }
    for entry in stored.difference(&expected) {
        discrepancies.push(Discrepancy::StaleEntry {
            ancestor: entry.ancestor_id.clone(),
            descendant: entry.descendant_id.clone(),
            distance: entry.distance,
        });
    }

    if !discrepancies.is_empty() {
        warn!(
            collection,
            count = discrepancies.len(),
            "closure store out of sync with links"
        );
    }

    Ok(VerifyReport {
        nodes: nodes.len(),
        links: links.len(),
        entries: stored.len(),
        discrepancies,
    })
}

/// Collect every (ancestor, node, distance) triple reachable from `start`.
/// A branch that meets a node already on its path stops there.
fn walk<K: NodeKey>(
    start: &K,
    children: &HashMap<K, Vec<K>>,
    expected: &mut BTreeSet<ClosureEntry<K>>,
    cycles: &mut BTreeSet<K>,
) {
    let mut stack: Vec<(K, Vec<K>)> = vec![(start.clone(), Vec::new())];
    while let Some((node, mut path)) = stack.pop() {
        if path.contains(&node) {
            cycles.insert(node);
            continue;
        }
        path.push(node.clone());
        for (distance, ancestor) in path.iter().rev().enumerate() {
            expected.insert(ClosureEntry {
                ancestor_id: ancestor.clone(),
                descendant_id: node.clone(),
                distance: u32::try_from(distance).unwrap_or(u32::MAX),
            });
        }
        for child in children.get(&node).into_iter().flatten() {
            stack.push((child.clone(), path.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DagConfig;
    use crate::db::open_in_memory;

    type TestDag = Dag<i64, HashMap<i64, String>>;

    fn test_db(count: i64) -> (Connection, TestDag) {
        let mut conn = open_in_memory().unwrap();
        let names: HashMap<i64, String> = (1..=count).map(|id| (id, id.to_string())).collect();
        let dag = Dag::new(DagConfig::for_collection("v"), names).unwrap();
        for id in 1..=count {
            dag.initialize_node(&mut conn, &id).unwrap();
        }
        (conn, dag)
    }

    #[test]
    fn engine_maintained_store_is_clean() {
        let (mut conn, dag) = test_db(5);
        for (p, c) in [(1, 2), (1, 3), (2, 4), (3, 4), (4, 5), (1, 5)] {
            dag.link(&mut conn, Some(&p), &c).unwrap();
        }
        dag.unlink(&mut conn, Some(&2), &4).unwrap();

        let report = verify_store(&conn, &dag).unwrap();
        assert!(report.is_ok(), "discrepancies: {:?}", report.discrepancies);
        assert_eq!(report.nodes, 5);
    }

    #[test]
    fn reports_stale_and_missing_rows() {
        let (mut conn, dag) = test_db(3);
        dag.link(&mut conn, Some(&1), &2).unwrap();
        conn.execute(
            "DELETE FROM dag_descendants WHERE ancestor_id = 1 AND descendant_id = 2",
            [],
        )
        .unwrap();
        closure::upsert(&conn, "v", &3_i64, &1_i64, 1).unwrap();

        let report = verify_store(&conn, &dag).unwrap();
        assert!(report.discrepancies.contains(&Discrepancy::MissingEntry {
            ancestor: 1,
            descendant: 2,
            distance: 1,
        }));
        assert!(report.discrepancies.contains(&Discrepancy::StaleEntry {
            ancestor: 3,
            descendant: 1,
            distance: 1,
        }));
    }

    #[test]
    fn reports_sentinel_next_to_real_parent() {
        let (mut conn, dag) = test_db(2);
        dag.link(&mut conn, Some(&1), &2).unwrap();
        edges::create_edge(&conn, "v", None, &2_i64).unwrap();

        let report = verify_store(&conn, &dag).unwrap();
        assert_eq!(
            report.discrepancies,
            vec![Discrepancy::SentinelWithParent { node: 2 }]
        );
    }

    #[test]
    fn reports_node_without_links_and_self_row() {
        let (mut conn, dag) = test_db(2);
        dag.link(&mut conn, Some(&1), &2).unwrap();
        conn.execute("DELETE FROM dag_links WHERE child_id = 2", []).unwrap();
        conn.execute(
            "DELETE FROM dag_descendants WHERE ancestor_id = 2 AND descendant_id = 2",
            [],
        )
        .unwrap();
        closure::upsert(&conn, "v", &2_i64, &1_i64, 4).unwrap();

        let report = verify_store(&conn, &dag).unwrap();
        assert!(report.discrepancies.contains(&Discrepancy::NoEdges { node: 2 }));
        assert!(report.discrepancies.contains(&Discrepancy::MissingSelfEntry { node: 2 }));
    }

    #[test]
    fn reports_cycles_without_hanging() {
        let (mut conn, dag) = test_db(3);
        dag.link(&mut conn, Some(&1), &2).unwrap();
        dag.link(&mut conn, Some(&2), &3).unwrap();
        edges::create_edge(&conn, "v", Some(&3_i64), &2_i64).unwrap();

        let report = verify_store(&conn, &dag).unwrap();
        assert!(report.discrepancies.contains(&Discrepancy::Cycle { node: 2 }));
    }

    #[test]
    fn report_serializes_with_kind_tags() {
        let report = VerifyReport {
            nodes: 1,
            links: 0,
            entries: 0,
            discrepancies: vec![Discrepancy::NoEdges { node: 7_i64 }],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["discrepancies"][0]["kind"], "no_edges");
        assert_eq!(json["discrepancies"][0]["node"], 7);
    }
}
