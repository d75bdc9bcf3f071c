//! The four response record layouts, plus the status header.
//!
//! These are the daemon's own structs written raw onto the socket, so the
//! layouts below (field order, widths, padding) are the contract. Pointer
//! fields are serialized as 8-byte slots; their values are only meaningful
//! to the daemon, with one exception: the numeric target identifier rides
//! in the name slot of the hit record.
//!
//! Every `decode` takes the buffer and a starting offset and returns the
//! record together with the exact number of bytes consumed, so callers can
//! chain cursors without recomputing sizes.

use crate::codec::cursor::Cursor;
use crate::error::ProtocolError;

/// Full-sequence e-value from a log-space p-value and an effective
/// database size: `exp(lnP) * Z`.
///
/// At `lnP = 0` this is exactly `Z`; more negative log p-values shrink it
/// toward zero.
pub fn evalue_from_lnp(lnp: f64, z: f64) -> f64 {
    lnp.exp() * z
}

pub const STATUS_LEN: usize = 16;
pub const STATS_LEN: usize = 120;
pub const HIT_LEN: usize = 152;
pub const DOMAIN_LEN: usize = 72;
pub const ALI_HEADER_LEN: usize = 168;

/// Response status header, sent before any payload.
///
/// Reference: hmmer/src/hmmpgmd.h
/// ```c
/// typedef struct {
///   uint32_t   status;            /* error status                    */
///   uint64_t   msg_size;          /* size of the next packet         */
/// } HMMD_SEARCH_STATUS;
/// ```
/// | offset | width | field    |
/// |--------|-------|----------|
/// | 0      | 4     | status   |
/// | 4      | 4     | (pad)    |
/// | 8      | 8     | msg_size |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusRecord {
    pub status: u32,
    pub msg_len: u64,
}

impl StatusRecord {
    pub fn decode(buf: &[u8], at: usize) -> Result<(Self, usize), ProtocolError> {
        let mut cur = Cursor::new(buf, at, "status");
        let status = cur.u32()?;
        cur.skip(4)?;
        let msg_len = cur.u64()?;
        debug_assert_eq!(cur.pos() - at, STATUS_LEN);
        Ok((Self { status, msg_len }, cur.pos() - at))
    }
}

/// Search statistics block leading every successful response body.
///
/// Reference: hmmer/src/hmmpgmd.h
/// ```c
/// typedef struct {
///   double     elapsed, user, sys;
///   double     Z, domZ;
///   enum p7_zsetby_e Z_setby, domZ_setby;
///   uint64_t   nmodels, nseqs;
///   uint64_t   n_past_msv, n_past_bias, n_past_vit, n_past_fwd;
///   uint64_t   nhits, nreported, nincluded;
/// } HMMD_SEARCH_STATS;
/// ```
/// | offset | width | field                                    |
/// |--------|-------|------------------------------------------|
/// | 0      | 40    | elapsed, user, sys, Z, domZ (5 x f64)    |
/// | 40     | 8     | Z_setby, domZ_setby (2 x u32)            |
/// | 48     | 72    | nmodels .. nincluded (9 x i64)           |
///
/// `Z` normalizes full-sequence e-values, `domZ` domain e-values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsRecord {
    pub elapsed: f64,
    pub user: f64,
    pub sys: f64,
    pub z: f64,
    pub dom_z: f64,
    pub z_setby: u32,
    pub dom_z_setby: u32,
    pub nmodels: i64,
    pub nseqs: i64,
    pub n_past_msv: i64,
    pub n_past_bias: i64,
    pub n_past_vit: i64,
    pub n_past_fwd: i64,
    pub nhits: i64,
    pub nreported: i64,
    pub nincluded: i64,
}

impl StatsRecord {
    pub fn decode(buf: &[u8], at: usize) -> Result<(Self, usize), ProtocolError> {
        let mut cur = Cursor::new(buf, at, "stats");
        let rec = Self {
            elapsed: cur.f64()?,
            user: cur.f64()?,
            sys: cur.f64()?,
            z: cur.f64()?,
            dom_z: cur.f64()?,
            z_setby: cur.u32()?,
            dom_z_setby: cur.u32()?,
            nmodels: cur.i64()?,
            nseqs: cur.i64()?,
            n_past_msv: cur.i64()?,
            n_past_bias: cur.i64()?,
            n_past_vit: cur.i64()?,
            n_past_fwd: cur.i64()?,
            nhits: cur.i64()?,
            nreported: cur.i64()?,
            nincluded: cur.i64()?,
        };
        debug_assert_eq!(cur.pos() - at, STATS_LEN);
        Ok((rec, cur.pos() - at))
    }
}

/// Per-target hit summary, `nreported` of them after the statistics block.
///
/// Reference: hmmer/src/hmmer.h
/// ```c
/// typedef struct p7_hit_s {
///   char   *name, *acc, *desc;
///   int    window_length;
///   double sortkey;
///   float  score,  pre_score,  sum_score;
///   double lnP,    pre_lnP,    sum_lnP;
///   float  nexpected;
///   int    nregions, nclustered, noverlaps, nenvelopes, ndom;
///   uint32_t flags;
///   int    nreported, nincluded, best_domain;
///   int64_t seqidx;
///   int64_t subseq_start;
///   P7_DOMAIN *dcl;
///   int    offset;
/// } P7_HIT;
/// ```
/// | offset | width | field                                      |
/// |--------|-------|--------------------------------------------|
/// | 0      | 24    | name, acc, desc slots (3 x u64)            |
/// | 24     | 4     | window_length                              |
/// | 28     | 4     | (pad)                                      |
/// | 32     | 8     | sort_key                                   |
/// | 40     | 12    | score, pre_score, sum_score (3 x f32)      |
/// | 52     | 4     | (pad)                                      |
/// | 56     | 24    | lnp, pre_lnp, sum_lnp (3 x f64)            |
/// | 80     | 4     | nexpected                                  |
/// | 84     | 36    | nregions .. best_domain (9 x u32)          |
/// | 120    | 32    | seqidx, subseq_start, dcl, offset (4 x u64)|
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitSummaryRecord {
    /// Name slot; carries the numeric target identifier, not a pointer the
    /// client can follow.
    pub name: u64,
    pub acc: u64,
    pub desc: u64,
    pub window_length: u32,
    pub sort_key: f64,
    pub score: f32,
    pub pre_score: f32,
    pub sum_score: f32,
    pub lnp: f64,
    pub pre_lnp: f64,
    pub sum_lnp: f64,
    pub nexpected: f32,
    pub nregions: u32,
    pub nclustered: u32,
    pub noverlaps: u32,
    pub nenvelopes: u32,
    /// Number of domain records (and alignment blocks) this hit owns in the
    /// trailing region.
    pub ndom: u32,
    pub flags: u32,
    pub nreported: u32,
    pub nincluded: u32,
    pub best_domain: u32,
    pub seqidx: u64,
    pub subseq_start: u64,
    pub dcl: u64,
    pub offset: u64,
}

impl HitSummaryRecord {
    pub fn decode(buf: &[u8], at: usize) -> Result<(Self, usize), ProtocolError> {
        let mut cur = Cursor::new(buf, at, "hit summary");
        let name = cur.u64()?;
        let acc = cur.u64()?;
        let desc = cur.u64()?;
        let window_length = cur.u32()?;
        cur.skip(4)?;
        let sort_key = cur.f64()?;
        let score = cur.f32()?;
        let pre_score = cur.f32()?;
        let sum_score = cur.f32()?;
        cur.skip(4)?;
        let lnp = cur.f64()?;
        let pre_lnp = cur.f64()?;
        let sum_lnp = cur.f64()?;
        let nexpected = cur.f32()?;
        let rec = Self {
            name,
            acc,
            desc,
            window_length,
            sort_key,
            score,
            pre_score,
            sum_score,
            lnp,
            pre_lnp,
            sum_lnp,
            nexpected,
            nregions: cur.u32()?,
            nclustered: cur.u32()?,
            noverlaps: cur.u32()?,
            nenvelopes: cur.u32()?,
            ndom: cur.u32()?,
            flags: cur.u32()?,
            nreported: cur.u32()?,
            nincluded: cur.u32()?,
            best_domain: cur.u32()?,
            seqidx: cur.u64()?,
            subseq_start: cur.u64()?,
            dcl: cur.u64()?,
            offset: cur.u64()?,
        };
        debug_assert_eq!(cur.pos() - at, HIT_LEN);
        Ok((rec, cur.pos() - at))
    }

    /// Full-sequence e-value under effective database size `z`.
    pub fn evalue(&self, z: f64) -> f64 {
        evalue_from_lnp(self.lnp, z)
    }
}

/// One domain record; each hit's `ndom` of these precede its alignment
/// blocks in the trailing region.
///
/// Reference: hmmer/src/hmmer.h
/// ```c
/// typedef struct p7_dom_s {
///   int            ienv, jenv;
///   int            iali, jali;
///   float          envsc;
///   float          domcorrection;
///   float          dombias;
///   float          oasc;
///   float          bitscore;
///   double         lnP;
///   int            is_reported;
///   int            is_included;
///   float         *scores_per_pos;
///   P7_ALIDISPLAY *ad;
/// } P7_DOMAIN;
/// ```
/// | offset | width | field                                   |
/// |--------|-------|-----------------------------------------|
/// | 0      | 16    | ienv, jenv, iali, jali (4 x i32)        |
/// | 16     | 20    | envsc .. bitscore (5 x f32)             |
/// | 36     | 4     | (pad)                                   |
/// | 40     | 8     | lnp                                     |
/// | 48     | 8     | is_reported, is_included (2 x i32)      |
/// | 56     | 8     | scores_per_pos slot                     |
/// | 64     | 8     | (reserved: alignment display slot)      |
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DomainRecord {
    pub ienv: i32,
    pub jenv: i32,
    pub iali: i32,
    pub jali: i32,
    pub envsc: f32,
    pub domcorrection: f32,
    pub dombias: f32,
    pub oasc: f32,
    pub bitscore: f32,
    pub lnp: f64,
    pub is_reported: i32,
    pub is_included: i32,
    pub scores_per_pos: u64,
}

impl DomainRecord {
    pub fn decode(buf: &[u8], at: usize) -> Result<(Self, usize), ProtocolError> {
        let mut cur = Cursor::new(buf, at, "domain");
        let ienv = cur.i32()?;
        let jenv = cur.i32()?;
        let iali = cur.i32()?;
        let jali = cur.i32()?;
        let envsc = cur.f32()?;
        let domcorrection = cur.f32()?;
        let dombias = cur.f32()?;
        let oasc = cur.f32()?;
        let bitscore = cur.f32()?;
        cur.skip(4)?;
        let lnp = cur.f64()?;
        let is_reported = cur.i32()?;
        let is_included = cur.i32()?;
        let scores_per_pos = cur.u64()?;
        cur.skip(8)?;
        debug_assert_eq!(cur.pos() - at, DOMAIN_LEN);
        let rec = Self {
            ienv,
            jenv,
            iali,
            jali,
            envsc,
            domcorrection,
            dombias,
            oasc,
            bitscore,
            lnp,
            is_reported,
            is_included,
            scores_per_pos,
        };
        Ok((rec, DOMAIN_LEN))
    }

    /// Independent e-value: the domain scored against the whole database.
    pub fn ievalue(&self, z: f64) -> f64 {
        evalue_from_lnp(self.lnp, z)
    }

    /// Conditional e-value: the domain scored against the reported set.
    pub fn cevalue(&self, dom_z: f64) -> f64 {
        evalue_from_lnp(self.lnp, dom_z)
    }
}

/// Alignment display block: a 168-byte fixed header followed by `memsize`
/// bytes of packed alignment strings. One per domain, after the hit's
/// domain records.
///
/// The cursor for the next record can only be computed from `memsize`, so
/// `decode` consumes header and blob together.
///
/// Reference: hmmer/src/hmmer.h
/// ```c
/// typedef struct p7_alidisplay_s {
///   char *rfline, *mmline, *csline, *model, *mline, *aseq, *ppline;
///   int   N;
///   char *hmmname, *hmmacc, *hmmdesc;
///   int   hmmfrom, hmmto, M;
///   char *sqname, *sqacc, *sqdesc;
///   int64_t sqfrom, sqto, L;
///   int   memsize;
///   char *mem;
/// } P7_ALIDISPLAY;
/// ```
/// | offset | width | field                                   |
/// |--------|-------|-----------------------------------------|
/// | 0      | 56    | display line slots (7 x u64)            |
/// | 56     | 4     | n (aligned length)                      |
/// | 60     | 4     | (pad)                                   |
/// | 64     | 24    | hmmname, hmmacc, hmmdesc slots (3 x u64)|
/// | 88     | 12    | hmm_from, hmm_to, m (3 x u32)           |
/// | 100    | 4     | (pad)                                   |
/// | 104    | 24    | sqname, sqacc, sqdesc slots (3 x u64)   |
/// | 128    | 24    | seq_from, seq_to, l (3 x u64)           |
/// | 152    | 4     | memsize                                 |
/// | 156    | 4     | (pad)                                   |
/// | 160    | 8     | mem slot                                |
/// | 168    | var   | blob (memsize bytes)                    |
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentRecord {
    pub rfline: u64,
    pub mmline: u64,
    pub csline: u64,
    pub model: u64,
    pub mline: u64,
    pub aseq: u64,
    pub ppline: u64,
    pub n: u32,
    pub hmmname: u64,
    pub hmmacc: u64,
    pub hmmdesc: u64,
    pub hmm_from: u32,
    pub hmm_to: u32,
    pub m: u32,
    pub sqname: u64,
    pub sqacc: u64,
    pub sqdesc: u64,
    pub seq_from: u64,
    pub seq_to: u64,
    pub l: u64,
    pub memsize: u32,
    pub mem: u64,
    /// Packed alignment strings. Opaque here; kept for callers that render
    /// alignment text.
    pub blob: Vec<u8>,
}

impl AlignmentRecord {
    pub fn decode(buf: &[u8], at: usize) -> Result<(Self, usize), ProtocolError> {
        let mut cur = Cursor::new(buf, at, "alignment");
        let rfline = cur.u64()?;
        let mmline = cur.u64()?;
        let csline = cur.u64()?;
        let model = cur.u64()?;
        let mline = cur.u64()?;
        let aseq = cur.u64()?;
        let ppline = cur.u64()?;
        let n = cur.u32()?;
        cur.skip(4)?;
        let hmmname = cur.u64()?;
        let hmmacc = cur.u64()?;
        let hmmdesc = cur.u64()?;
        let hmm_from = cur.u32()?;
        let hmm_to = cur.u32()?;
        let m = cur.u32()?;
        cur.skip(4)?;
        let sqname = cur.u64()?;
        let sqacc = cur.u64()?;
        let sqdesc = cur.u64()?;
        let seq_from = cur.u64()?;
        let seq_to = cur.u64()?;
        let l = cur.u64()?;
        let memsize = cur.u32()?;
        cur.skip(4)?;
        let mem = cur.u64()?;
        debug_assert_eq!(cur.pos() - at, ALI_HEADER_LEN);
        let blob = cur.bytes(memsize as usize)?.to_vec();
        let rec = Self {
            rfline,
            mmline,
            csline,
            model,
            mline,
            aseq,
            ppline,
            n,
            hmmname,
            hmmacc,
            hmmdesc,
            hmm_from,
            hmm_to,
            m,
            sqname,
            sqacc,
            sqdesc,
            seq_from,
            seq_to,
            l,
            memsize,
            mem,
            blob,
        };
        Ok((rec, cur.pos() - at))
    }
}
