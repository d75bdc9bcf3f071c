//! Fixed-layout binary record decoding for daemon responses.
//!
//! The response payload is a raw serialization of the daemon's in-memory
//! structs: a statistics block, then the hit summaries back to back, then a
//! trailing region of per-domain records and variable-length alignment
//! blocks. There is no framing between records and no resynchronization
//! marker: the size of each alignment block is embedded in its own header,
//! so decoding threads a single forward-only cursor and every decode
//! reports exactly how many bytes it consumed.

pub mod cursor;
pub mod records;

pub use cursor::Cursor;
pub use records::{
    evalue_from_lnp, AlignmentRecord, DomainRecord, HitSummaryRecord, StatsRecord, StatusRecord,
    ALI_HEADER_LEN, DOMAIN_LEN, HIT_LEN, STATS_LEN, STATUS_LEN,
};
