use anyhow::Result;
use lineage_core::{Discrepancy, ErrorCode, verify_store};
use std::path::Path;

use super::{Access, Session, StoreOptions, surface};
use crate::output::{CliError, OutputMode, render_error, render_mode};

fn describe(discrepancy: &Discrepancy<i64>) -> String {
    match discrepancy {
        Discrepancy::MissingEntry {
            ancestor,
            descendant,
            distance,
        } => format!("missing  {ancestor} -> {descendant} at distance {distance}"),
        Discrepancy::StaleEntry {
            ancestor,
            descendant,
            distance,
        } => format!("stale    {ancestor} -> {descendant} at distance {distance}"),
        Discrepancy::MissingSelfEntry { node } => format!("no-self  {node}"),
        Discrepancy::NoEdges { node } => format!("no-edges {node}"),
        Discrepancy::SentinelWithParent { node } => format!("sentinel {node} (has a parent)"),
        Discrepancy::Cycle { node } => format!("cycle    {node}"),
    }
}

/// Execute `lin verify`: diff the closure table against a closure rebuilt
/// from the links.
///
/// # Errors
///
/// Fails with [`ErrorCode::CorruptStore`] when any discrepancy is found, so
/// the exit status is non-zero.
pub fn run_verify(store: &StoreOptions, output: OutputMode, project_root: &Path) -> Result<()> {
    let session = Session::open(project_root, store, Access::Read, output)?;
    let report = verify_store(&session.conn, &session.dag).map_err(|e| surface(output, e))?;

    render_mode(
        output,
        &report,
        |report, w| {
            for discrepancy in &report.discrepancies {
                writeln!(w, "{}", describe(discrepancy))?;
            }
            Ok(())
        },
        |report, w| {
            writeln!(
                w,
                "checked {} node(s), {} link(s), {} closure row(s)",
                report.nodes, report.links, report.entries
            )?;
            for discrepancy in &report.discrepancies {
                writeln!(w, "FAIL {}", describe(discrepancy))?;
            }
            if report.is_ok() {
                writeln!(w, "verify: success")?;
            }
            Ok(())
        },
    )?;

    if report.is_ok() {
        return Ok(());
    }
    let code = ErrorCode::CorruptStore;
    let msg = format!(
        "verify: {} discrepancy(ies) found",
        report.discrepancies.len()
    );
    render_error(
        output,
        &CliError::with_details(&msg, code.hint().unwrap_or_default(), code.code()),
    )?;
    anyhow::bail!("{msg}");
}
