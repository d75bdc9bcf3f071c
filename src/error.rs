//! Error types for search-result acquisition.
//!
//! Everything surfaces to the immediate caller of the failing operation;
//! nothing is swallowed or retried at this layer. Retry policy for daemon
//! connections belongs to whoever drives the iteration.

use std::io;
use std::process::ExitStatus;

use thiserror::Error;

use crate::common::{DbKind, QueryKind, ScanMode};

/// Result type alias for hmmlink operations.
pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Debug, Error)]
pub enum SearchError {
    /// Transport-level failure: daemon unreachable or connection dropped
    /// mid-session.
    #[error("cannot reach search daemon at {host}:{port}: {source}")]
    Connection {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// Malformed or short response/report. Fatal for the current query.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Invalid backend/query-kind combination, rejected before any I/O.
    #[error("unsupported search mode: {query_kind} query against {db_kind} in {scan_mode} mode")]
    UnsupportedMode {
        query_kind: QueryKind,
        db_kind: DbKind,
        scan_mode: ScanMode,
    },

    /// Nonzero exit from a batch or secondary search binary.
    #[error("external search tool failed ({status}): {command}")]
    ExternalTool { command: String, status: ExitStatus },

    /// The same query reported two different lengths in one report group.
    #[error("inconsistent query length for {query}: saw {seen}, then {got}")]
    InconsistentQueryLength { query: String, seen: u64, got: u64 },

    /// Required configuration is missing for the selected backend.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error outside the daemon transport (files, temp files, pipes).
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The daemon answered with a nonzero status word. It sends no message
    /// body on error, so the first bytes of the request are echoed back for
    /// diagnosis.
    #[error("search daemon returned status {status} for request starting with {request_prefix:?}")]
    DaemonStatus { status: u32, request_prefix: String },

    /// The peer closed the connection before the declared body length was
    /// delivered.
    #[error("response body truncated: expected {expected} bytes, received {got}")]
    TruncatedBody { expected: u64, got: u64 },

    /// A fixed-layout record ran past the end of the buffer. After this the
    /// cursor position is unreliable and the response cannot be resumed.
    #[error("{record} record at offset {offset} needs {needed} bytes, only {available} remain")]
    ShortRecord {
        record: &'static str,
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A decoded field holds a value that cannot be used (e.g. a negative
    /// record count).
    #[error("invalid {field} field in response: {value}")]
    InvalidField { field: &'static str, value: i64 },

    /// A report row does not match the expected column layout.
    #[error("malformed report row at line {line}: {reason}")]
    MalformedRow { line: usize, reason: String },
}
