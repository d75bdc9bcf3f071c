//! Backend dispatch and the unified per-query result stream.
//!
//! One entry point selects a backend from the `(query kind, database kind,
//! scan mode)` triple, resolved exactly once and rejected before any file,
//! socket, or process is touched. Both backends come out as the same lazy
//! stream of per-query results: pull-driven, so a caller that stops
//! pulling stops all further socket activity on the daemon path.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use bio::io::fasta;
use rustc_hash::FxHashSet;
use tempfile::NamedTempFile;

use crate::common::{DbKind, HitFilter, QueryKind, QueryResult, ScanMode};
use crate::config::{DaemonEndpoint, ToolPaths};
use crate::daemon::{request, scan_hits, ScanOptions};
use crate::disk::{runner, DomtblParser};
use crate::error::{Result, SearchError};

/// Everything needed to run one search over one query file.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub query_file: PathBuf,
    pub query_kind: QueryKind,
    pub db_kind: DbKind,
    pub mode: ScanMode,
    pub filter: HitFilter,
    /// Cap on distinct target names per query. 0 or `None` = unlimited.
    pub max_hits: Option<usize>,
    /// Queries longer than this are not submitted; they yield an empty
    /// result with `elapsed = -1` so callers can see what was skipped.
    pub max_seq_len: Option<usize>,
    /// Query names to pass over entirely (e.g. already-processed queries
    /// when resuming a run).
    pub skip: Option<FxHashSet<String>>,
    /// Override for the effective database size in e-value conversion.
    pub fixed_z: Option<f64>,
    /// Daemon worker-count hint, or batch tool cpu count (0 = all cores).
    pub threads: usize,
    pub endpoint: DaemonEndpoint,
    /// Target database path; required by the disk backend.
    pub database: Option<PathBuf>,
    pub tools: ToolPaths,
}

impl SearchConfig {
    pub fn new(
        query_file: impl Into<PathBuf>,
        query_kind: QueryKind,
        db_kind: DbKind,
        mode: ScanMode,
    ) -> Self {
        Self {
            query_file: query_file.into(),
            query_kind,
            db_kind,
            mode,
            filter: HitFilter::default(),
            max_hits: None,
            max_seq_len: None,
            skip: None,
            fixed_z: None,
            threads: 1,
            endpoint: DaemonEndpoint::default(),
            database: None,
            tools: ToolPaths::default(),
        }
    }
}

/// Unified lazy stream of per-query results.
///
/// A failed query yields `Err` and iteration continues with the next
/// query on the daemon path (each query runs on its own connection). On
/// the disk path an error means the report itself is unusable and the
/// stream ends.
pub enum HitStream {
    Daemon(DaemonStream),
    Disk(DiskStream),
}

impl HitStream {
    pub fn open(config: SearchConfig) -> Result<HitStream> {
        match (config.query_kind, config.db_kind, config.mode) {
            (QueryKind::Sequence, _, ScanMode::Daemon) => {
                let file = File::open(&config.query_file)?;
                let records = fasta::Reader::new(file).records();
                Ok(HitStream::Daemon(DaemonStream { records, config }))
            }
            (QueryKind::Sequence, DbKind::HmmDb, ScanMode::Disk) => {
                let database = config.database.clone().ok_or_else(|| {
                    SearchError::Config("disk mode requires a target database path".to_string())
                })?;
                let cpus = if config.threads == 0 {
                    num_cpus::get()
                } else {
                    config.threads
                };
                // One invocation for the entire query file; results are
                // demultiplexed from the report afterwards.
                let report =
                    runner::run_hmmscan(&config.query_file, &database, cpus, &config.tools)?;
                let reader = BufReader::new(report.reopen()?);
                let parser = DomtblParser::new(reader, config.filter, config.max_hits);
                Ok(HitStream::Disk(DiskStream {
                    _report: report,
                    parser,
                }))
            }
            (query_kind, db_kind, scan_mode) => Err(SearchError::UnsupportedMode {
                query_kind,
                db_kind,
                scan_mode,
            }),
        }
    }
}

impl Iterator for HitStream {
    type Item = Result<QueryResult>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            HitStream::Daemon(stream) => stream.next(),
            HitStream::Disk(stream) => stream.next(),
        }
    }
}

/// Open a result stream; shorthand for [`HitStream::open`].
pub fn iter_hits(config: SearchConfig) -> Result<HitStream> {
    HitStream::open(config)
}

/// Daemon backend: one socket round trip per query, FASTA records pulled
/// lazily from the query file.
pub struct DaemonStream {
    records: fasta::Records<BufReader<File>>,
    config: SearchConfig,
}

impl Iterator for DaemonStream {
    type Item = Result<QueryResult>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = match self.records.next()? {
                Ok(r) => r,
                Err(e) => return Some(Err(e.into())),
            };
            let name = record.id().to_string();
            if let Some(skip) = &self.config.skip {
                if skip.contains(&name) {
                    continue;
                }
            }
            let raw = String::from_utf8_lossy(record.seq()).into_owned();
            if raw.is_empty() {
                continue;
            }
            if let Some(limit) = self.config.max_seq_len {
                if raw.len() > limit {
                    return Some(Ok(QueryResult {
                        name,
                        elapsed: -1.0,
                        query_length: raw.len() as u64,
                        hits: Vec::new(),
                    }));
                }
            }

            let seq = request::ungap(&raw);
            let payload = request::sequence_request(
                self.config.db_kind,
                self.config.threads.max(1) as u32,
                &name,
                &seq,
            );
            let opts = ScanOptions {
                filter: self.config.filter,
                max_hits: self.config.max_hits,
                fixed_z: self.config.fixed_z,
            };
            return Some(
                scan_hits(&self.config.endpoint, &payload, &opts).map(|(elapsed, hits)| {
                    QueryResult {
                        name,
                        elapsed,
                        query_length: seq.len() as u64,
                        hits,
                    }
                }),
            );
        }
    }
}

/// Disk backend: the report file stays alive (and on disk) exactly as long
/// as the stream; dropping the stream removes it, parsed or not.
pub struct DiskStream {
    _report: NamedTempFile,
    parser: DomtblParser<BufReader<File>>,
}

impl Iterator for DiskStream {
    type Item = Result<QueryResult>;

    fn next(&mut self) -> Option<Self::Item> {
        self.parser.next()
    }
}
