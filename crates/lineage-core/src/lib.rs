//! lineage-core library.
//!
//! Multi-parent hierarchies stored as a direct-link table plus a closure
//! table that is kept in step with every link change.
//!
//! # Conventions
//!
//! - **Errors**: store and engine operations return [`DagError`]; setup code
//!   (opening stores, loading config) uses `anyhow::Result`.
//! - **Logging**: `tracing` macros only; the binary decides where they go.
//! - **Atomicity**: every public mutator runs in one `BEGIN IMMEDIATE`
//!   transaction. The `*_tx` variants compose several operations into one.

pub mod classify;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod lock;
pub mod node;
pub mod query;
pub mod registry;
pub mod store;
pub mod verify;

pub use config::{DagConfig, ProjectConfig};
pub use engine::Dag;
pub use error::{DagError, ErrorCode};
pub use node::{NodeKey, NodeSource};
pub use query::unique;
pub use registry::{NodeDag, NodeRecord, SqliteNodes};
pub use verify::{Discrepancy, VerifyReport, verify_store};
