//! Batch-tool backend: external invocation plus report scraping.
//!
//! The batch tools run once over a whole query file and leave a tabular
//! report behind; everything here parses reports after the fact. Reports
//! live in scoped temporary files that are removed when dropped, success
//! or failure.

pub mod domtbl;
pub mod runner;
pub mod tbl;

pub use domtbl::DomtblParser;
pub use tbl::{hmmsearch, parse_tbl, TblRow};
