//! External search tool invocation.
//!
//! Fixed argument templates, report to a scoped temporary file. A nonzero
//! exit fails the whole invocation (partial reports are never trusted) and
//! the error carries the rendered command line for diagnosis.

use std::path::Path;
use std::process::Command;

use tempfile::NamedTempFile;

use crate::config::ToolPaths;
use crate::error::{Result, SearchError};

/// Render a command for error messages.
pub(crate) fn command_line(cmd: &Command) -> String {
    let mut rendered = cmd.get_program().to_string_lossy().into_owned();
    for arg in cmd.get_args() {
        rendered.push(' ');
        rendered.push_str(&arg.to_string_lossy());
    }
    rendered
}

fn run(mut cmd: Command) -> Result<()> {
    let rendered = command_line(&cmd);
    let status = cmd.status()?;
    if !status.success() {
        return Err(SearchError::ExternalTool {
            command: rendered,
            status,
        });
    }
    Ok(())
}

/// Scan a query file against a profile database; returns the per-domain
/// table report. The human-readable stream is discarded.
pub fn run_hmmscan(
    query: &Path,
    database: &Path,
    cpus: usize,
    paths: &ToolPaths,
) -> Result<NamedTempFile> {
    let report = NamedTempFile::new()?;
    let mut cmd = Command::new(&paths.hmmscan);
    cmd.arg("--cpu")
        .arg(cpus.to_string())
        .arg("-o")
        .arg("/dev/null")
        .arg("--domtblout")
        .arg(report.path())
        .arg(database)
        .arg(query);
    run(cmd)?;
    Ok(report)
}

/// Search profile queries against a sequence database; returns the
/// per-sequence table report. The effective database size is pinned so
/// e-values stay comparable across target databases.
pub fn run_hmmsearch(
    query_hmm: &Path,
    target_db: &Path,
    cpus: usize,
    paths: &ToolPaths,
) -> Result<NamedTempFile> {
    let report = NamedTempFile::new()?;
    let mut cmd = Command::new(&paths.hmmsearch);
    cmd.arg("--cpu")
        .arg(cpus.to_string())
        .arg("-o")
        .arg("/dev/null")
        .arg("-Z")
        .arg("1000000")
        .arg("--tblout")
        .arg(report.path())
        .arg(query_hmm)
        .arg(target_db);
    run(cmd)?;
    Ok(report)
}

/// Score one sequence against one candidate-group database with a
/// significance cutoff on both reporting and inclusion; returns the
/// per-sequence table report.
pub fn run_phmmer(
    seq_file: &Path,
    group_db: &Path,
    cutoff: f64,
    paths: &ToolPaths,
) -> Result<NamedTempFile> {
    let report = NamedTempFile::new()?;
    let mut cmd = Command::new(&paths.phmmer);
    cmd.arg("--incE")
        .arg(cutoff.to_string())
        .arg("-E")
        .arg(cutoff.to_string())
        .arg("-o")
        .arg("/dev/null")
        .arg("--noali")
        .arg("--tblout")
        .arg(report.path())
        .arg(seq_file)
        .arg(group_db);
    run(cmd)?;
    Ok(report)
}
