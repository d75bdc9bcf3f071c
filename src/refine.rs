//! Orthology refinement: per-sequence secondary search against a
//! candidate-group database to pick the best representative member.
//!
//! Each unit of work is independent (one sequence, one group database,
//! one scoped temporary query file), so units fan out safely across a
//! worker pool with no shared state. Result order across workers is not
//! guaranteed; every result carries its originating query name for
//! re-association.

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tempfile::NamedTempFile;

use crate::config::ToolPaths;
use crate::disk::runner;
use crate::error::Result;

/// Settings for one refinement run, shared by all units.
#[derive(Debug, Clone)]
pub struct RefineConfig {
    /// Significance cutoff applied to both reporting and inclusion.
    pub cutoff: f64,
    pub tools: ToolPaths,
    /// Directory for the per-unit temporary query files; the system
    /// temp dir when unset.
    pub workdir: Option<PathBuf>,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            cutoff: 1e-3,
            tools: ToolPaths::default(),
            workdir: None,
        }
    }
}

/// One unit of work: one sequence scored against one group database.
#[derive(Debug, Clone)]
pub struct RefineJob {
    pub name: String,
    pub seq: String,
    pub group_db: PathBuf,
}

/// Best-ranked target of a refinement search, taken from the first data
/// row of the report. `evalue` and `score` stay textual, exactly as
/// reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BestHit {
    pub name: String,
    pub evalue: String,
    pub score: String,
}

impl BestHit {
    /// The no-hit marker: nothing passed the cutoff.
    pub fn none() -> Self {
        Self {
            name: "-".to_string(),
            evalue: "-".to_string(),
            score: "-".to_string(),
        }
    }

    pub fn is_none(&self) -> bool {
        self.name == "-"
    }
}

/// Take the first non-comment row of a per-sequence report: target name,
/// full-sequence e-value and score. No data rows means no hit passed the
/// cutoff.
pub fn parse_best_hit<R: BufRead>(reader: R) -> Result<BestHit> {
    for line in reader.lines() {
        let line = line?;
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 6 {
            return Err(crate::error::ProtocolError::MalformedRow {
                line: 1,
                reason: format!("best-hit row has {} fields, need at least 6", fields.len()),
            }
            .into());
        }
        return Ok(BestHit {
            name: fields[0].to_string(),
            evalue: fields[4].to_string(),
            score: fields[5].to_string(),
        });
    }
    Ok(BestHit::none())
}

/// Run the secondary search for an on-disk query file and return its best
/// hit. The report is removed whether or not parsing succeeds.
pub fn best_hit(seq_file: &Path, group_db: &Path, cfg: &RefineConfig) -> Result<BestHit> {
    let report = runner::run_phmmer(seq_file, group_db, cfg.cutoff, &cfg.tools)?;
    let reader = BufReader::new(report.reopen()?);
    parse_best_hit(reader)
}

/// One refinement unit: write the sequence to a scoped temporary file, run
/// the secondary search, take the best hit. A nonzero tool exit is fatal
/// for this unit only.
pub fn refine_hit(name: &str, seq: &str, group_db: &Path, cfg: &RefineConfig) -> Result<BestHit> {
    let mut query = match &cfg.workdir {
        Some(dir) => NamedTempFile::new_in(dir)?,
        None => NamedTempFile::new()?,
    };
    writeln!(query, ">{}\n{}", name, seq)?;
    query.flush()?;
    best_hit(query.path(), group_db, cfg)
}

/// Fan a batch of units across the current rayon pool. Results come back
/// paired with their query names; positional order matches the input, but
/// callers joining against other data should match on the name.
pub fn refine_batch(jobs: &[RefineJob], cfg: &RefineConfig) -> Vec<(String, Result<BestHit>)> {
    jobs.par_iter()
        .map(|job| {
            (
                job.name.clone(),
                refine_hit(&job.name, &job.seq, &job.group_db, cfg),
            )
        })
        .collect()
}
