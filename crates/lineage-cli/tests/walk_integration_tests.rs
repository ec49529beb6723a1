//! End-to-end tests: fixture file -> walk -> rendered tree.

mod common;

use common::{config_for, hash, write_fixture};
use lineage_cli::{run_walk, WalkRequest};
use lineage_domain::walker::Traversal;
use tokio_util::sync::CancellationToken;

fn request(root: u32) -> WalkRequest {
    WalkRequest {
        root_hash: hash(root),
        version: 1,
        expand_depth: None,
    }
}

#[tokio::test]
async fn test_renders_whole_family() {
    let fixture = write_fixture(&[
        (1, Some("Ada"), &[2, 3]),
        (2, Some("Byron"), &[4]),
        (3, None, &[]),
    ]);
    let config = config_for(&fixture);

    let output = run_walk(&config, &request(1), CancellationToken::new())
        .await
        .unwrap();
    let lines: Vec<&str> = output.lines().collect();

    assert_eq!(lines.len(), 5);
    assert!(lines[0].ends_with("v1 Ada"));
    assert!(lines[1].starts_with("├─ ") && lines[1].ends_with("Byron"));
    assert!(lines[2].starts_with("│  └─ "));
    assert!(lines[3].starts_with("└─ "));
    assert!(lines[4].starts_with("4 nodes, 4 visited, depth 3"));
}

#[tokio::test]
async fn test_expand_depth_collapses_deeper_rows() {
    let fixture = write_fixture(&[(1, None, &[2]), (2, None, &[3]), (3, None, &[4])]);
    let config = config_for(&fixture);
    let mut request = request(1);
    request.expand_depth = Some(1);

    let output = run_walk(&config, &request, CancellationToken::new())
        .await
        .unwrap();

    // Root, one collapsed child, summary.
    assert_eq!(output.lines().count(), 3);
    assert!(output.lines().nth(1).unwrap().ends_with("[+1]"));
}

#[tokio::test]
async fn test_configured_limits_apply() {
    let fixture = write_fixture(&[(1, None, &[2, 3, 4, 5, 6, 7, 8, 9])]);
    let mut config = config_for(&fixture);
    config.walk.hard_node_limit = 4;
    config.walk.traversal = Traversal::Bfs;

    let output = run_walk(&config, &request(1), CancellationToken::new())
        .await
        .unwrap();

    assert!(output.contains("4 nodes"));
    assert!(output.contains("(node limit reached)"));
}

#[tokio::test]
async fn test_cancelled_walk_is_an_error() {
    let fixture = write_fixture(&[(1, None, &[2])]);
    let config = config_for(&fixture);
    let token = CancellationToken::new();
    token.cancel();

    let err = run_walk(&config, &request(1), token).await.unwrap_err();

    assert!(err.to_string().contains("cancelled"));
}

#[tokio::test]
async fn test_missing_fixture_is_reported() {
    let config = lineage_cli::CliConfig::default();

    let err = run_walk(&config, &request(1), CancellationToken::new())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("no fixture configured"));
}

#[tokio::test]
async fn test_invalid_root_fails() {
    let fixture = write_fixture(&[(1, None, &[])]);
    let config = config_for(&fixture);
    let request = WalkRequest {
        root_hash: "0x1234".to_string(),
        version: 1,
        expand_depth: None,
    };

    let err = run_walk(&config, &request, CancellationToken::new())
        .await
        .unwrap_err();

    assert!(format!("{:#}", err).contains("invalid person hash"));
}
