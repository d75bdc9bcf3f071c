//! Parser for the per-sequence ("tbl") report of the profile-vs-sequence
//! batch tool.
//!
//! Only the ten leading columns are structured; the trailing description is
//! free text. Columns: target name, target accession, query name, query
//! accession, full-sequence E-value/score/bias, best-domain
//! E-value/score/bias.

use std::io::BufRead;
use std::path::Path;

use rustc_hash::FxHashMap;

use crate::config::ToolPaths;
use crate::disk::runner;
use crate::error::{ProtocolError, Result};

/// Leading structured columns per row.
pub const TBL_FIELDS: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct TblRow {
    pub target: String,
    pub query: String,
    pub evalue: f64,
    pub score: f64,
    pub bias: f64,
    pub best_dom_evalue: f64,
    pub best_dom_score: f64,
    pub best_dom_bias: f64,
}

/// Parse a per-sequence table, grouping rows by query name. Emission order
/// within a group is preserved.
pub fn parse_tbl<R: BufRead>(reader: R) -> Result<FxHashMap<String, Vec<TblRow>>> {
    let mut by_query: FxHashMap<String, Vec<TblRow>> = FxHashMap::default();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = idx + 1;
        let trimmed = line.trim_end();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        if fields.len() < TBL_FIELDS {
            return Err(ProtocolError::MalformedRow {
                line: line_no,
                reason: format!("expected {} fields, found {}", TBL_FIELDS, fields.len()),
            }
            .into());
        }
        let num = |tok: &str, field: &'static str| -> std::result::Result<f64, ProtocolError> {
            tok.parse::<f64>().map_err(|_| ProtocolError::MalformedRow {
                line: line_no,
                reason: format!("{} field {:?} is not numeric", field, tok),
            })
        };
        let row = TblRow {
            target: fields[0].to_string(),
            query: fields[2].to_string(),
            evalue: num(fields[4], "E-value")?,
            score: num(fields[5], "score")?,
            bias: num(fields[6], "bias")?,
            best_dom_evalue: num(fields[7], "best-domain E-value")?,
            best_dom_score: num(fields[8], "best-domain score")?,
            best_dom_bias: num(fields[9], "best-domain bias")?,
        };
        by_query.entry(row.query.clone()).or_default().push(row);
    }
    Ok(by_query)
}

/// Search profile queries against a sequence database and return the rows
/// grouped by query. One external invocation for the whole query file; the
/// report is deleted once parsed.
pub fn hmmsearch(
    query_hmm: &Path,
    target_db: &Path,
    cpus: usize,
    paths: &ToolPaths,
) -> Result<FxHashMap<String, Vec<TblRow>>> {
    let report = runner::run_hmmsearch(query_hmm, target_db, cpus, paths)?;
    let reader = std::io::BufReader::new(report.reopen()?);
    parse_tbl(reader)
}
