//! Refinement unit tests against a stubbed secondary search binary.

use hmmlink::config::ToolPaths;
use hmmlink::error::SearchError;
use hmmlink::refine::{refine_batch, refine_hit, BestHit, RefineConfig, RefineJob};

use crate::helpers::{stub_phmmer, stub_tool};

#[cfg(unix)]
fn stub_config(dir: &std::path::Path, report: &str) -> RefineConfig {
    RefineConfig {
        tools: ToolPaths {
            phmmer: stub_phmmer(dir, report),
            ..ToolPaths::default()
        },
        ..RefineConfig::default()
    }
}

#[cfg(unix)]
#[test]
fn test_refine_hit_takes_best_ranked_row() {
    let dir = tempfile::tempdir().unwrap();
    let report = "\
# best hits for query
1000565.METUNv1_02451 - q1 - 1.2e-30 105.3 0.1 1.5e-30 105.0 0.1 1.0 1 0 0 1 1 1 1 -
1000565.METUNv1_09999 - q1 - 3.0e-05 20.1 0.0 4.0e-05 19.8 0.0 1.0 1 0 0 1 1 1 1 -
";
    let cfg = stub_config(dir.path(), report);
    let best = refine_hit("q1", "MKVLIDAG", &dir.path().join("group.faa"), &cfg).unwrap();
    assert_eq!(best.name, "1000565.METUNv1_02451");
    assert_eq!(best.evalue, "1.2e-30");
    assert_eq!(best.score, "105.3");
}

#[cfg(unix)]
#[test]
fn test_refine_hit_no_passing_hit_is_dashes() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = stub_config(dir.path(), "# nothing passed the cutoff\n#\n");
    let best = refine_hit("q1", "MKVLIDAG", &dir.path().join("group.faa"), &cfg).unwrap();
    assert_eq!(best, BestHit::none());
    assert_eq!(
        (best.name.as_str(), best.evalue.as_str(), best.score.as_str()),
        ("-", "-", "-")
    );
}

#[cfg(unix)]
#[test]
fn test_refine_hit_tool_failure_is_fatal_for_unit() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = RefineConfig {
        tools: ToolPaths {
            phmmer: stub_tool(dir.path(), "phmmer", "exit 1"),
            ..ToolPaths::default()
        },
        ..RefineConfig::default()
    };
    let err = refine_hit("q1", "MKVL", &dir.path().join("group.faa"), &cfg).unwrap_err();
    match err {
        SearchError::ExternalTool { command, status } => {
            assert!(command.contains("--incE 0.001"));
            assert_eq!(status.code(), Some(1));
        }
        other => panic!("expected ExternalTool, got {}", other),
    }
}

#[cfg(unix)]
#[test]
fn test_refine_hit_respects_workdir() {
    let dir = tempfile::tempdir().unwrap();
    let workdir = tempfile::tempdir().unwrap();
    let report = "\
groupmember_1 - q - 2.0e-10 44.5 0.0 3.0e-10 44.0 0.0 1.0 1 0 0 1 1 1 1 -
";
    let cfg = RefineConfig {
        workdir: Some(workdir.path().to_path_buf()),
        ..stub_config(dir.path(), report)
    };
    let best = refine_hit("q1", "MKVL", &dir.path().join("group.faa"), &cfg).unwrap();
    assert_eq!(best.name, "groupmember_1");
    // The scoped query file is gone once the unit finishes.
    assert_eq!(std::fs::read_dir(workdir.path()).unwrap().count(), 0);
}

#[cfg(unix)]
#[test]
fn test_refine_batch_tags_results_with_query_names() {
    let dir = tempfile::tempdir().unwrap();
    let report = "\
groupmember_7 - q - 2.0e-10 44.5 0.0 3.0e-10 44.0 0.0 1.0 1 0 0 1 1 1 1 -
";
    let cfg = stub_config(dir.path(), report);
    let jobs: Vec<RefineJob> = (0..8)
        .map(|i| RefineJob {
            name: format!("seq{}", i),
            seq: "MKVLIDAG".to_string(),
            group_db: dir.path().join("group.faa"),
        })
        .collect();

    let results = refine_batch(&jobs, &cfg);
    assert_eq!(results.len(), jobs.len());
    for (i, (name, best)) in results.iter().enumerate() {
        assert_eq!(name, &format!("seq{}", i));
        assert_eq!(best.as_ref().unwrap().name, "groupmember_7");
    }
}
