//! Facade dispatch and end-to-end stream tests. Backend binaries and the
//! daemon are both stubbed, so nothing external is required.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;

use rustc_hash::FxHashSet;

use hmmlink::common::{DbKind, HitFilter, QueryKind, ScanMode};
use hmmlink::config::{DaemonEndpoint, ToolPaths};
use hmmlink::error::SearchError;
use hmmlink::search::{iter_hits, HitStream, SearchConfig};

use crate::helpers::{build_response_body, stub_hmmscan, stub_tool, wrap_status, DomSpec, HitSpec};

fn open_filter() -> HitFilter {
    HitFilter {
        evalue_thr: None,
        score_thr: Some(0.0),
    }
}

#[test]
fn test_invalid_combinations_rejected_before_io() {
    // The query path does not exist; an attempt to touch it would surface
    // as an I/O error, not UnsupportedMode.
    let combos = [
        (QueryKind::Profile, DbKind::HmmDb, ScanMode::Daemon),
        (QueryKind::Profile, DbKind::SeqDb, ScanMode::Daemon),
        (QueryKind::Profile, DbKind::HmmDb, ScanMode::Disk),
        (QueryKind::Sequence, DbKind::SeqDb, ScanMode::Disk),
    ];
    for (query_kind, db_kind, mode) in combos {
        let config = SearchConfig::new("/nonexistent/queries.faa", query_kind, db_kind, mode);
        match HitStream::open(config) {
            Err(SearchError::UnsupportedMode {
                query_kind: q,
                db_kind: d,
                scan_mode: m,
            }) => {
                assert_eq!((q, d, m), (query_kind, db_kind, mode));
            }
            Err(other) => panic!("expected UnsupportedMode, got {}", other),
            Ok(_) => panic!("combination should have been rejected"),
        }
    }
}

#[test]
fn test_disk_mode_requires_database() {
    let config = SearchConfig::new(
        "/nonexistent/queries.faa",
        QueryKind::Sequence,
        DbKind::HmmDb,
        ScanMode::Disk,
    );
    match HitStream::open(config) {
        Err(SearchError::Config(_)) => {}
        other => panic!(
            "expected Config error, got {:?}",
            other.err().map(|e| e.to_string())
        ),
    }
}

#[cfg(unix)]
#[test]
fn test_disk_backend_end_to_end_with_stub_tool() {
    let dir = tempfile::tempdir().unwrap();
    let report = "\
# stub per-domain table
Pkinase PF00069.22 264 q1 - 858 4.5e-53 180.2 0.0 1 1 2.4e-56 6.6e-53 179.6 0.0 1 253 580 830 580 838 0.89 Protein kinase domain
Kdo - 310 q1 - 858 2.0e-10 40.0 0.1 1 1 1.0e-12 3.0e-10 39.1 0.1 4 200 100 290 98 300 0.80 -
Pkinase PF00069.22 264 q2 - 300 1.0e-05 25.0 0.0 1 1 5.0e-08 2.0e-05 24.2 0.0 10 120 30 160 28 170 0.75 Protein kinase domain
";
    let hmmscan = stub_hmmscan(dir.path(), report);
    let query = dir.path().join("queries.faa");
    std::fs::write(&query, ">q1\nMKVL\n>q2\nACDE\n").unwrap();

    let mut config = SearchConfig::new(&query, QueryKind::Sequence, DbKind::HmmDb, ScanMode::Disk);
    config.filter = open_filter();
    config.database = Some(dir.path().join("profiles.hmm"));
    config.tools = ToolPaths {
        hmmscan,
        ..ToolPaths::default()
    };

    let results: Vec<_> = iter_hits(config).unwrap().collect();
    assert_eq!(results.len(), 2);
    let q1 = results[0].as_ref().unwrap();
    assert_eq!(q1.name, "q1");
    assert_eq!(q1.hits.len(), 2);
    assert_eq!(q1.elapsed, 0.0);
    let q2 = results[1].as_ref().unwrap();
    assert_eq!(q2.name, "q2");
    assert_eq!(q2.hits[0].target_name, "Pkinase");
}

#[cfg(unix)]
#[test]
fn test_disk_backend_propagates_tool_failure() {
    let dir = tempfile::tempdir().unwrap();
    let hmmscan = stub_tool(dir.path(), "hmmscan", "exit 3");
    let query = dir.path().join("queries.faa");
    std::fs::write(&query, ">q1\nMKVL\n").unwrap();

    let mut config = SearchConfig::new(&query, QueryKind::Sequence, DbKind::HmmDb, ScanMode::Disk);
    config.database = Some(dir.path().join("profiles.hmm"));
    config.tools = ToolPaths {
        hmmscan: hmmscan.clone(),
        ..ToolPaths::default()
    };

    match HitStream::open(config) {
        Err(SearchError::ExternalTool { command, status }) => {
            assert!(command.starts_with(hmmscan.to_str().unwrap()));
            assert!(command.contains("--domtblout"));
            assert_eq!(status.code(), Some(3));
        }
        other => panic!(
            "expected ExternalTool, got {:?}",
            other.err().map(|e| e.to_string())
        ),
    }
}

/// Daemon that serves the same canned response to every connection.
fn serve_forever(reply: Vec<u8>) -> DaemonEndpoint {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    thread::spawn(move || {
        for conn in listener.incoming() {
            let mut conn = match conn {
                Ok(c) => c,
                Err(_) => break,
            };
            let reply = reply.clone();
            thread::spawn(move || {
                let mut request = Vec::new();
                let mut chunk = [0u8; 1024];
                loop {
                    let n = match conn.read(&mut chunk) {
                        Ok(n) => n,
                        Err(_) => return,
                    };
                    if n == 0 {
                        break;
                    }
                    request.extend_from_slice(&chunk[..n]);
                    if request.windows(2).any(|w| w == b"//") {
                        break;
                    }
                }
                let _ = conn.write_all(&reply);
            });
        }
    });
    DaemonEndpoint::new("127.0.0.1", port)
}

#[test]
fn test_daemon_backend_stream_with_skip_and_length_limit() {
    let body = build_response_body(
        0.05,
        1000.0,
        &[HitSpec {
            name: 77,
            score: 120.0,
            lnp: -15.0,
            domains: vec![DomSpec::simple((1, 60), (1, 58), (2, 61), 119.0)],
        }],
    );
    let endpoint = serve_forever(wrap_status(0, body.len() as u64, &body));

    let dir = tempfile::tempdir().unwrap();
    let query = dir.path().join("queries.faa");
    // q_skip is passed over, q_long exceeds the length limit, q_ok is
    // actually submitted.
    std::fs::write(
        &query,
        ">q_skip\nMKVL\n>q_long\nMKVLIDACDEFGHIKLMNPQRSTVWY\n>q_ok\nMKV-LID.AG\n",
    )
    .unwrap();

    let mut config = SearchConfig::new(&query, QueryKind::Sequence, DbKind::HmmDb, ScanMode::Daemon);
    config.filter = open_filter();
    config.endpoint = endpoint;
    config.max_seq_len = Some(20);
    config.skip = Some(FxHashSet::from_iter(["q_skip".to_string()]));

    let results: Vec<_> = iter_hits(config).unwrap().collect();
    assert_eq!(results.len(), 2);

    let long = results[0].as_ref().unwrap();
    assert_eq!(long.name, "q_long");
    assert_eq!(long.elapsed, -1.0);
    assert_eq!(long.query_length, 26);
    assert!(long.hits.is_empty());

    let ok = results[1].as_ref().unwrap();
    assert_eq!(ok.name, "q_ok");
    assert_eq!(ok.elapsed, 0.05);
    // Gap characters are stripped before submission and length accounting.
    assert_eq!(ok.query_length, 8);
    assert_eq!(ok.hits.len(), 1);
    assert_eq!(ok.hits[0].target_name, "77");
}

#[test]
fn test_daemon_failure_does_not_end_iteration() {
    // Nothing is listening: every submitted query fails, but the stream
    // keeps going and reports one error per query.
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let dir = tempfile::tempdir().unwrap();
    let query = dir.path().join("queries.faa");
    std::fs::write(&query, ">q1\nMKVL\n>q2\nACDE\n").unwrap();

    let mut config = SearchConfig::new(&query, QueryKind::Sequence, DbKind::HmmDb, ScanMode::Daemon);
    config.endpoint = DaemonEndpoint::new("127.0.0.1", port);

    let results: Vec<_> = iter_hits(config).unwrap().collect();
    assert_eq!(results.len(), 2);
    for result in results {
        assert!(matches!(result, Err(SearchError::Connection { .. })));
    }
}
