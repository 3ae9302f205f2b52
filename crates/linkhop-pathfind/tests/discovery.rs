//! End-to-end discovery behaviour against the in-memory graph source.

use std::collections::HashSet;
use std::time::Duration;

use linkhop_core::{DiscoveryMethod, Subgraph, VertexId};
use linkhop_graph::{GraphError, GraphSource, MemoryFixture, MemoryGraph};
use linkhop_pathfind::algorithms::find_paths;
use linkhop_pathfind::{DiscoveryRequest, PathfindEngine, PathfindError};

fn vid(s: &str) -> VertexId {
    VertexId::from(s)
}

fn names(path: &[VertexId]) -> Vec<&str> {
    path.iter().map(VertexId::as_str).collect()
}

/// Five players and three teams: player0 <-> team2, player0 -> player1,
/// player1 <-> team0.
fn basketball() -> MemoryGraph {
    let mut graph = MemoryGraph::new();
    for i in 0..5 {
        graph = graph.vertex(&format!("player{i}"), "player");
    }
    for i in 0..3 {
        graph = graph.vertex(&format!("team{i}"), "team");
    }
    graph
        .link("player0", "team2", "serve")
        .edge("player0", "player1", "follow")
        .link("player1", "team0", "serve")
}

fn assert_bijection(sg: &Subgraph) {
    assert_eq!(sg.vid_to_idx.len(), sg.idx_to_vid.len());
    for (idx, v) in sg.idx_to_vid.iter().enumerate() {
        assert_eq!(sg.vid_to_idx[v], idx);
    }
    for &(u, v) in &sg.edge_index {
        assert!(u < sg.num_nodes() && v < sg.num_nodes());
    }
}

// ── Sampling ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_node_budget_always_holds() {
    let engine = PathfindEngine::new(MemoryGraph::layered(8, 4));
    for hops in 1..=4 {
        for budget in [1, 2, 7, 20, 500] {
            let sg = engine.sample_subgraph(&vid("root"), hops, budget).await.unwrap();
            assert!(
                sg.num_nodes() <= budget,
                "hops={hops} budget={budget} nodes={}",
                sg.num_nodes()
            );
            assert_bijection(&sg);
        }
    }
}

#[tokio::test]
async fn test_bidirectional_pairs_present() {
    let engine = PathfindEngine::new(basketball());
    for hops in [1, 2, 3] {
        let sg = engine.sample_subgraph(&vid("player0"), hops, 500).await.unwrap();
        let pairs: HashSet<(usize, usize)> = sg.edge_index.iter().copied().collect();
        for &(u, v) in &sg.edge_index {
            assert!(pairs.contains(&(v, u)), "missing reverse of ({u}, {v})");
        }
    }
}

#[tokio::test]
async fn test_directed_sampling_keeps_discovery_direction() {
    let graph = MemoryGraph::new()
        .vertex("player0", "player")
        .vertex("team0", "team")
        .edge("player0", "team0", "serve");
    let engine = PathfindEngine::new(graph);
    let sg = engine
        .sampler()
        .sample_subgraph(&vid("player0"), 1, 500, false)
        .await
        .unwrap();
    assert_eq!(sg.edge_index, vec![(0, 1)]);
}

// ── Path finding ─────────────────────────────────────────────────

#[tokio::test]
async fn test_direct_edge_yields_two_vertex_path() {
    let graph = MemoryGraph::new()
        .vertex("player0", "player")
        .vertex("team0", "team")
        .edge("player0", "team0", "serve");
    let engine = PathfindEngine::new(graph);
    let sg = engine.sample_subgraph(&vid("player0"), 1, 500).await.unwrap();

    for max_hops in 1..=4 {
        let paths = find_paths(&sg, "player0", "team0", max_hops);
        assert!(paths.iter().any(|p| names(p) == vec!["player0", "team0"]));
    }
}

#[tokio::test]
async fn test_player_reaches_team_through_teammate() {
    let engine = PathfindEngine::new(basketball());
    let result = engine
        .find_multihop_relationships(&vid("player0"), &vid("team0"), 3)
        .await
        .unwrap();

    assert!(result.found);
    assert_eq!(result.method, DiscoveryMethod::Direct);
    assert!(result
        .paths
        .iter()
        .any(|p| names(p) == vec!["player0", "player1", "team0"]));
    for path in &result.paths {
        assert!(path.len() <= 4);
    }
    assert_eq!(result.subgraph.center().map(VertexId::as_str), Some("player0"));
}

#[tokio::test]
async fn test_disjoint_neighborhoods_not_found() {
    let graph = basketball().link("player3", "player4", "follow");
    let engine = PathfindEngine::new(graph);
    let result = engine
        .find_multihop_relationships(&vid("player0"), &vid("player4"), 3)
        .await
        .unwrap();

    assert!(!result.found);
    assert_eq!(result.method, DiscoveryMethod::None);
    assert!(result.paths.is_empty());
    assert!(result.bridge_nodes.is_empty());
}

#[tokio::test]
async fn test_fan_out_capped_at_five_paths() {
    let engine = PathfindEngine::new(MemoryGraph::layered(100, 2));
    let result = engine
        .find_multihop_relationships(&vid("root"), &vid("l2_0"), 2)
        .await
        .unwrap();

    assert_eq!(result.method, DiscoveryMethod::Direct);
    assert_eq!(result.paths.len(), 5);
    for path in &result.paths {
        assert_eq!(path.len(), 3);
        assert_eq!(path[0].as_str(), "root");
        assert_eq!(path[2].as_str(), "l2_0");
    }
}

#[tokio::test]
async fn test_bridge_stitches_both_neighborhoods() {
    // The forward walk from a never reaches b; b's own walk reaches x.
    let graph = MemoryGraph::new()
        .vertex("a", "player")
        .vertex("x", "team")
        .vertex("b", "player")
        .edge("a", "x", "serve")
        .edge("b", "x", "serve");
    let engine = PathfindEngine::new(graph);
    let result = engine
        .find_multihop_relationships(&vid("a"), &vid("b"), 2)
        .await
        .unwrap();

    assert!(result.found);
    assert_eq!(result.method, DiscoveryMethod::Bridge);
    assert_eq!(names(&result.bridge_nodes), vec!["x"]);
    assert_eq!(result.paths.len(), 1);
    assert_eq!(names(&result.paths[0]), vec!["a", "x", "b"]);
}

#[tokio::test]
async fn test_bridge_found_even_when_legs_exceed_budget() {
    // x is two hops from a, but each leg only gets one hop.
    let graph = MemoryGraph::new()
        .vertex("a", "player")
        .vertex("m", "player")
        .vertex("x", "team")
        .vertex("b", "player")
        .edge("a", "m", "follow")
        .edge("m", "x", "serve")
        .edge("b", "x", "serve");
    let engine = PathfindEngine::new(graph);
    let result = engine
        .find_multihop_relationships(&vid("a"), &vid("b"), 2)
        .await
        .unwrap();

    assert!(result.found);
    assert_eq!(result.method, DiscoveryMethod::Bridge);
    assert!(result.paths.is_empty());
}

// ── Failures and resources ───────────────────────────────────────

#[tokio::test]
async fn test_failed_queries_return_partial_result() {
    let graph = basketball().fail_hop(2).fail_properties();
    let engine = PathfindEngine::new(graph);
    let result = engine
        .find_multihop_relationships(&vid("player0"), &vid("player1"), 2)
        .await
        .unwrap();

    assert!(result.found);
    assert!(result.subgraph.stats.failed_queries >= 2);
    assert!(!result.subgraph.stats.is_complete());
    assert_eq!(result.subgraph.feature("player0"), 0.0);
}

#[tokio::test]
async fn test_unavailable_remote_is_fatal() {
    let engine = PathfindEngine::new(basketball().unavailable());
    let err = engine
        .find_multihop_relationships(&vid("player0"), &vid("team0"), 2)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PathfindError::RemoteUnavailable(GraphError::Connection(_))
    ));
}

#[tokio::test]
async fn test_sessions_released_after_success() {
    let graph = basketball();
    let capacity = graph.available_sessions();
    let engine = PathfindEngine::new(graph.clone());
    engine
        .discover(DiscoveryRequest::new("player0", "team0", 3))
        .await
        .unwrap();
    assert_eq!(graph.available_sessions(), capacity);
}

#[tokio::test]
async fn test_pool_exhaustion_is_bounded_and_releases() {
    let graph = basketball().with_pool(1, Duration::from_millis(20));
    let engine = PathfindEngine::new(graph.clone());

    let held = graph.session().await.unwrap();
    let err = engine
        .find_multihop_relationships(&vid("player0"), &vid("team0"), 2)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PathfindError::RemoteUnavailable(GraphError::PoolExhausted { .. })
    ));

    drop(held);
    assert_eq!(graph.available_sessions(), 1);
    assert!(engine
        .find_multihop_relationships(&vid("player0"), &vid("team0"), 2)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_deadline_cancels_and_releases() {
    let graph = basketball().with_latency(Duration::from_millis(50));
    let capacity = graph.available_sessions();
    let engine = PathfindEngine::new(graph.clone());

    let mut request = DiscoveryRequest::new("player0", "team0", 2);
    request.timeout_ms = Some(10);
    let err = engine.discover(request).await.unwrap_err();

    assert!(matches!(
        err,
        PathfindError::RemoteUnavailable(GraphError::DeadlineExceeded { timeout_ms: 10 })
    ));
    assert_eq!(graph.available_sessions(), capacity);
}

#[tokio::test]
async fn test_concurrent_discoveries_share_one_slot() {
    let graph = basketball().with_pool(1, Duration::from_secs(5));
    let engine = PathfindEngine::new(graph.clone());

    let (first, second) = tokio::join!(
        engine.discover(DiscoveryRequest::new("player0", "team0", 2)),
        engine.discover(DiscoveryRequest::new("player1", "team0", 1)),
    );
    assert!(first.unwrap().result.found);
    assert!(second.unwrap().result.found);
    assert_eq!(graph.available_sessions(), 1);
}

#[tokio::test]
async fn test_repeated_requests_query_remote_again() {
    let graph = basketball();
    let engine = PathfindEngine::new(graph.clone());
    engine.sample_subgraph(&vid("player0"), 2, 500).await.unwrap();
    let after_first = graph.query_count();
    engine.sample_subgraph(&vid("player0"), 2, 500).await.unwrap();
    assert_eq!(graph.query_count(), after_first * 2);
}

// ── Fixture and report ───────────────────────────────────────────

#[tokio::test]
async fn test_fixture_report_serializes() {
    let json = r#"{
        "vertices": [
            {"id": "player100", "type": "player", "properties": {"embedding1": 0.25}},
            {"id": "player101", "type": "player", "properties": {"embedding1": 3}},
            {"id": "team204", "type": "team"}
        ],
        "edges": [
            {"src": "player100", "dst": "player101", "edge_type": "follow"},
            {"src": "player101", "dst": "team204", "edge_type": "serve"}
        ]
    }"#;
    let graph = MemoryGraph::from_fixture(MemoryFixture::from_json(json).unwrap());
    let engine = PathfindEngine::new(graph);

    let mut request = DiscoveryRequest::new("player100", "team204", 2);
    request.include_tensors = Some(true);
    let report = engine.discover(request).await.unwrap();

    let tensors = report.tensors.as_ref().unwrap();
    assert_eq!(tensors.node_type, vec![0, 0, 1]);
    assert_eq!(tensors.x, vec![0.25, 3.0, 0.0]);

    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["result"]["method"], "direct");
    assert_eq!(value["result"]["found"], true);
    assert_eq!(
        value["result"]["paths"][0],
        serde_json::json!(["player100", "player101", "team204"])
    );
    assert!(value["request_id"].is_string());
}
