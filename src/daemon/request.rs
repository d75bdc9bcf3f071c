//! Request payload assembly.
//!
//! A request is one ASCII header line naming the target database type and
//! worker count, followed by the query: a FASTA block for sequence queries
//! or the full profile text for model queries, ending with a `//` line.
//! Profile text already ends with its own `//` terminator, so only the
//! sequence form appends one.

use crate::common::DbKind;

/// Remove alignment gap characters (`-` and `.`) before submission; the
/// daemon scores plain residue strings.
pub fn ungap(seq: &str) -> String {
    seq.chars().filter(|c| *c != '-' && *c != '.').collect()
}

/// Sequence query payload. `seq` must already be ungapped (see [`ungap`]).
pub fn sequence_request(db: DbKind, threads: u32, name: &str, seq: &str) -> String {
    format!("@--{} {}\n>{}\n{}\n//", db.wire_name(), threads, name, seq)
}

/// Profile query payload from the full model text (terminated by its own
/// `//` line).
pub fn model_request(db: DbKind, threads: u32, model_text: &str) -> String {
    format!("@--{} {}\n{}", db.wire_name(), threads, model_text)
}
