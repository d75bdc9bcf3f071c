//! One blocking request/response cycle against a running search daemon.

use std::io::{self, Read, Write};
use std::net::TcpStream;

use rustc_hash::FxHashSet;

use crate::codec::{
    AlignmentRecord, DomainRecord, HitSummaryRecord, StatsRecord, StatusRecord, HIT_LEN,
    STATUS_LEN,
};
use crate::common::{Domain, Hit, HitFilter};
use crate::config::DaemonEndpoint;
use crate::error::{ProtocolError, Result, SearchError};

/// How many request bytes are echoed back in protocol errors.
const REQUEST_PREFIX_LEN: usize = 50;

/// Per-query decode settings.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    pub filter: HitFilter,
    /// Cap on distinct target names. Counts targets, not hit or domain
    /// records; once reached, the rest of the response is left unread.
    pub max_hits: Option<usize>,
    /// Override for the effective database size used in e-value
    /// conversion, when the corpus differs from what the daemon assumes.
    pub fixed_z: Option<f64>,
}

/// Submit one fully formed request and decode the streamed response.
///
/// Returns the daemon-reported wall time and the accepted hits in emission
/// order. Transport failures are `Connection` errors and are not retried
/// here; a malformed response is a `Protocol` error and poisons only this
/// session (each query opens its own connection). Reads block without a
/// deadline; a caller that needs timeouts must bound them at the socket
/// level.
pub fn scan_hits(
    endpoint: &DaemonEndpoint,
    request: &str,
    opts: &ScanOptions,
) -> Result<(f64, Vec<Hit>)> {
    let conn_err = |source: io::Error| SearchError::Connection {
        host: endpoint.host.clone(),
        port: endpoint.port,
        source,
    };

    let mut stream =
        TcpStream::connect((endpoint.host.as_str(), endpoint.port)).map_err(conn_err)?;
    stream.write_all(request.as_bytes()).map_err(conn_err)?;

    let mut status_buf = [0u8; STATUS_LEN];
    stream.read_exact(&mut status_buf).map_err(conn_err)?;
    let (status, _) = StatusRecord::decode(&status_buf, 0)?;

    if status.status != 0 {
        // The daemon sends no structured message on error; echo the start
        // of the request so the failing query can be identified.
        return Err(ProtocolError::DaemonStatus {
            status: status.status,
            request_prefix: request.chars().take(REQUEST_PREFIX_LEN).collect(),
        }
        .into());
    }

    let body = read_body(&mut stream, status.msg_len, conn_err)?;
    decode_response(&body, opts)
}

/// Read exactly `len` bytes of response body. Partial reads are normal on a
/// raw socket; an early close is a truncated response, not a transport
/// error.
fn read_body(
    stream: &mut TcpStream,
    len: u64,
    conn_err: impl Fn(io::Error) -> SearchError,
) -> Result<Vec<u8>> {
    let mut body = vec![0u8; len as usize];
    let mut filled = 0usize;
    while filled < body.len() {
        match stream.read(&mut body[filled..]) {
            Ok(0) => {
                return Err(ProtocolError::TruncatedBody {
                    expected: len,
                    got: filled as u64,
                }
                .into())
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(conn_err(e)),
        }
    }
    Ok(body)
}

/// Decode a complete response body: statistics block, hit summaries, then
/// the domain/alignment trailer.
///
/// Decoding is strictly sequential. Hit summaries sit back to back after
/// the statistics block; the trailer holds, for each hit with domains, its
/// domain records followed by one alignment block per domain. The trailer
/// cursor advances only by decoded record sizes, so it stays consistent
/// even when the distinct-target cap stops hit production early (remaining
/// bytes are simply dropped with the buffer).
pub fn decode_response(body: &[u8], opts: &ScanOptions) -> Result<(f64, Vec<Hit>)> {
    let (stats, stats_len) = StatsRecord::decode(body, 0)?;
    let z = opts.fixed_z.unwrap_or(stats.z);
    let nreported = usize::try_from(stats.nreported).map_err(|_| ProtocolError::InvalidField {
        field: "nreported",
        value: stats.nreported,
    })?;
    let cap = opts.max_hits.filter(|&k| k > 0);

    let mut hits = Vec::new();
    let mut seen_targets: FxHashSet<u64> = FxHashSet::default();
    let mut hit_at = stats_len;
    let mut trailer_at = stats_len + HIT_LEN * nreported;

    for _ in 0..nreported {
        let (summary, used) = HitSummaryRecord::decode(body, hit_at)?;
        hit_at += used;

        if summary.ndom > 0 {
            let ndom = summary.ndom as usize;
            let mut dom_records = Vec::with_capacity(ndom);
            for _ in 0..ndom {
                let (dom, used) = DomainRecord::decode(body, trailer_at)?;
                trailer_at += used;
                dom_records.push(dom);
            }

            let mut domains = Vec::with_capacity(ndom);
            for dom in &dom_records {
                let (ali, used) = AlignmentRecord::decode(body, trailer_at)?;
                trailer_at += used;
                domains.push(Domain {
                    hmm_from: ali.hmm_from,
                    hmm_to: ali.hmm_to,
                    seq_from: ali.seq_from,
                    seq_to: ali.seq_to,
                    env_from: dom.ienv,
                    env_to: dom.jenv,
                    bitscore: dom.bitscore,
                    is_reported: dom.is_reported != 0,
                    is_included: dom.is_included != 0,
                });
            }

            let evalue = summary.evalue(z);
            let score = f64::from(summary.sum_score);
            if opts.filter.accepts(evalue, score) {
                seen_targets.insert(summary.name);
                hits.push(Hit {
                    target_name: summary.name.to_string(),
                    evalue,
                    score,
                    bias: 0.0,
                    domains,
                });
            }
        }

        if let Some(k) = cap {
            if seen_targets.len() == k {
                break;
            }
        }
    }

    Ok((stats.elapsed, hits))
}
