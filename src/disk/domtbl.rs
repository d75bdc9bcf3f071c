//! Parser for the batch scanner's per-domain table.
//!
//! One row per (target, domain) pair, whitespace separated (the report is
//! column-aligned, not tab delimited), `#` lines are comments. The 22
//! structured columns:
//!
//! | col | field        | col | field        | col | field      |
//! |-----|--------------|-----|--------------|-----|------------|
//! | 0   | target name  | 8   | bias         | 16  | hmm to     |
//! | 1   | target acc   | 9   | domain index | 17  | ali from   |
//! | 2   | tlen         | 10  | domain count | 18  | ali to     |
//! | 3   | query name   | 11  | c-Evalue     | 19  | env from   |
//! | 4   | query acc    | 12  | i-Evalue     | 20  | env to     |
//! | 5   | qlen         | 13  | domain score | 21  | acc        |
//! | 6   | E-value      | 14  | domain bias  |     |            |
//! | 7   | score        | 15  | hmm from     |     |            |
//!
//! Everything after column 21 is free-text description and is ignored.
//!
//! Rows for one query are assumed contiguous, which is how the tool emits
//! them. The parser flushes a result whenever the query-name column
//! changes, so a report violating the precondition yields one result per
//! contiguous run instead of crashing; it cannot re-merge the runs.

use std::io::BufRead;

use rustc_hash::FxHashSet;

use crate::common::{Domain, Hit, HitFilter, QueryResult, TabField};
use crate::error::{ProtocolError, Result, SearchError};

/// Structured columns per row; anything shorter is malformed.
pub const DOMTBL_FIELDS: usize = 22;

/// Streaming iterator of per-query results over a per-domain table.
///
/// Each accepted row becomes a `Hit` carrying a single `Domain` (the table
/// flattens hit and domain into one row; reported/included flags are not
/// recoverable and are set true). The batch path has no timing source, so
/// every result reports `elapsed = 0`.
pub struct DomtblParser<R: BufRead> {
    reader: R,
    filter: HitFilter,
    max_hits: Option<usize>,
    line_no: usize,
    current: Option<Accum>,
    finished: bool,
}

struct Accum {
    name: String,
    qlen: u64,
    hits: Vec<Hit>,
    targets: FxHashSet<String>,
    last_target: Option<String>,
}

impl Accum {
    fn new(name: String, qlen: u64) -> Self {
        Self {
            name,
            qlen,
            hits: Vec::new(),
            targets: FxHashSet::default(),
            last_target: None,
        }
    }

    fn flush(self) -> QueryResult {
        QueryResult {
            name: self.name,
            elapsed: 0.0,
            query_length: self.qlen,
            hits: self.hits,
        }
    }
}

struct Row {
    target: String,
    qname: String,
    qlen: u64,
    evalue: TabField,
    score: TabField,
    bias: TabField,
    dom_score: f64,
    hmm_from: u32,
    hmm_to: u32,
    seq_from: u64,
    seq_to: u64,
    env_from: i32,
    env_to: i32,
}

fn numeric<T: std::str::FromStr>(
    tok: &str,
    field: &str,
    line: usize,
) -> std::result::Result<T, ProtocolError> {
    tok.parse::<T>().map_err(|_| ProtocolError::MalformedRow {
        line,
        reason: format!("{} field {:?} is not numeric", field, tok),
    })
}

fn parse_row(line: &str, line_no: usize) -> std::result::Result<Row, ProtocolError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < DOMTBL_FIELDS {
        return Err(ProtocolError::MalformedRow {
            line: line_no,
            reason: format!("expected {} fields, found {}", DOMTBL_FIELDS, fields.len()),
        });
    }
    Ok(Row {
        target: fields[0].to_string(),
        qname: fields[3].to_string(),
        qlen: numeric(fields[5], "qlen", line_no)?,
        evalue: TabField::parse(fields[6]),
        score: TabField::parse(fields[7]),
        bias: TabField::parse(fields[8]),
        dom_score: numeric(fields[13], "domain score", line_no)?,
        hmm_from: numeric(fields[15], "hmm from", line_no)?,
        hmm_to: numeric(fields[16], "hmm to", line_no)?,
        seq_from: numeric(fields[17], "ali from", line_no)?,
        seq_to: numeric(fields[18], "ali to", line_no)?,
        env_from: numeric(fields[19], "env from", line_no)?,
        env_to: numeric(fields[20], "env to", line_no)?,
    })
}

impl<R: BufRead> DomtblParser<R> {
    pub fn new(reader: R, filter: HitFilter, max_hits: Option<usize>) -> Self {
        Self {
            reader,
            filter,
            // 0 means unlimited, as everywhere else in the CLI surface.
            max_hits: max_hits.filter(|&k| k > 0),
            line_no: 0,
            current: None,
            finished: false,
        }
    }

    /// Fold one row into the running accumulator. Only called when the row
    /// belongs to the current query.
    fn absorb(&mut self, row: Row) -> Result<()> {
        if self.current.is_none() {
            self.current = Some(Accum::new(row.qname.clone(), row.qlen));
        }
        let accum = self.current.as_mut().unwrap();
        if accum.qlen != row.qlen {
            return Err(SearchError::InconsistentQueryLength {
                query: accum.name.clone(),
                seen: accum.qlen,
                got: row.qlen,
            });
        }

        let passes = self
            .filter
            .accepts_fields(row.evalue.as_f64(), row.score.as_f64());
        // At the cap, further domains of the target just accepted are still
        // admitted; only new target names are shut out.
        let cap_ok = match self.max_hits {
            None => true,
            Some(k) => {
                accum.last_target.as_deref() == Some(row.target.as_str())
                    || accum.targets.len() < k
            }
        };

        if passes && cap_ok {
            accum.targets.insert(row.target.clone());
            accum.last_target = Some(row.target.clone());
            accum.hits.push(Hit {
                target_name: row.target,
                evalue: row.evalue.as_f64().unwrap_or(f64::NAN),
                score: row.score.as_f64().unwrap_or(f64::NAN),
                bias: row.bias.as_f64().unwrap_or(f64::NAN),
                domains: vec![Domain {
                    hmm_from: row.hmm_from,
                    hmm_to: row.hmm_to,
                    seq_from: row.seq_from,
                    seq_to: row.seq_to,
                    env_from: row.env_from,
                    env_to: row.env_to,
                    bitscore: row.dom_score as f32,
                    is_reported: true,
                    is_included: true,
                }],
            });
        }
        Ok(())
    }
}

impl<R: BufRead> Iterator for DomtblParser<R> {
    type Item = Result<QueryResult>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let mut line = String::new();
        loop {
            line.clear();
            match self.reader.read_line(&mut line) {
                Ok(0) => {
                    self.finished = true;
                    return self.current.take().map(|a| Ok(a.flush()));
                }
                Ok(_) => {}
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e.into()));
                }
            }
            self.line_no += 1;
            let trimmed = line.trim_end();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let row = match parse_row(trimmed, self.line_no) {
                Ok(row) => row,
                Err(e) => {
                    // Report-level corruption; there is no safe place to
                    // resume from.
                    self.finished = true;
                    return Some(Err(e.into()));
                }
            };

            let query_changed = self
                .current
                .as_ref()
                .map_or(false, |a| a.name != row.qname);
            let flushed = if query_changed {
                self.current.take().map(Accum::flush)
            } else {
                None
            };

            if let Err(e) = self.absorb(row) {
                self.finished = true;
                return Some(Err(e));
            }

            if let Some(result) = flushed {
                return Some(Ok(result));
            }
        }
    }
}
