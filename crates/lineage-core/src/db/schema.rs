//! SQLite schema for the hierarchy store.
//!
//! - `dag_links` holds direct parent→child edges; a `NULL` parent is the root
//!   sentinel marking a node with no real parent
//! - `dag_descendants` is the transitive closure, one row per distinct
//!   (ancestor, descendant, distance) triple including a distance-0 self row
//! - `dag_nodes` is the built-in node registry used when no external node
//!   storage is plugged in
//! - `store_meta` tracks the schema version
//!
//! Node id columns are declared without a type so integer and text keys are
//! stored as given.

/// Migration v1: link and closure tables plus store metadata.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS dag_links (
    collection TEXT NOT NULL CHECK (length(trim(collection)) > 0),
    parent_id,
    child_id NOT NULL,
    CHECK (parent_id IS NULL OR parent_id <> child_id)
);

CREATE TABLE IF NOT EXISTS dag_descendants (
    collection TEXT NOT NULL CHECK (length(trim(collection)) > 0),
    ancestor_id NOT NULL,
    descendant_id NOT NULL,
    distance INTEGER NOT NULL CHECK (distance >= 0),
    PRIMARY KEY (collection, ancestor_id, descendant_id, distance)
);

CREATE TABLE IF NOT EXISTS store_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL
);

INSERT OR IGNORE INTO store_meta (id, schema_version)
VALUES (1, 1);
";

/// Migration v2: lookup indexes and the built-in node registry.
pub const MIGRATION_V2_SQL: &str = r"
CREATE INDEX IF NOT EXISTS idx_dag_links_child
    ON dag_links(collection, child_id, parent_id);

CREATE INDEX IF NOT EXISTS idx_dag_links_parent
    ON dag_links(collection, parent_id, child_id);

CREATE INDEX IF NOT EXISTS idx_dag_descendants_descendant
    ON dag_descendants(collection, descendant_id, distance);

CREATE TABLE IF NOT EXISTS dag_nodes (
    node_id INTEGER PRIMARY KEY AUTOINCREMENT,
    collection TEXT NOT NULL CHECK (length(trim(collection)) > 0),
    name TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_dag_nodes_collection_name
    ON dag_nodes(collection, name);

UPDATE store_meta
SET schema_version = 2
WHERE id = 1;
";

/// Indexes expected by the hierarchy query paths.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_dag_links_child",
    "idx_dag_links_parent",
    "idx_dag_descendants_descendant",
    "idx_dag_nodes_collection_name",
];
