//! In-memory graph source for tests and fixture runs.
//!
//! Mirrors the Neo4j source's capability semantics over a small directed,
//! typed graph, with switchable faults so callers can exercise failed
//! queries and unavailable remotes without a database.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use linkhop_core::{EdgeTriple, VertexId};

use crate::client::GraphError;
use crate::pool::{SessionPermit, SessionPool};
use crate::source::{GraphSession, GraphSource, Neighborhood, QueryOutcome};

// ── Fixture Format ───────────────────────────────────────────────

/// JSON fixture: typed vertices with numeric properties, and directed edges.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryFixture {
    #[serde(default)]
    pub vertices: Vec<FixtureVertex>,
    #[serde(default)]
    pub edges: Vec<EdgeTriple>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureVertex {
    pub id: VertexId,
    #[serde(rename = "type", default)]
    pub vertex_type: Option<String>,
    #[serde(default)]
    pub properties: HashMap<String, f64>,
}

impl MemoryFixture {
    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        serde_json::from_str(json).map_err(|e| GraphError::Fixture(e.to_string()))
    }

    pub fn from_path(path: &std::path::Path) -> Result<Self, GraphError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| GraphError::Fixture(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }
}

// ── Graph ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
struct Faults {
    failing_hops: HashSet<usize>,
    fail_bulk: bool,
    fail_types: bool,
    fail_properties: bool,
    unavailable: bool,
    latency: Option<Duration>,
}

#[derive(Debug, Clone, Default)]
struct GraphData {
    types: HashMap<VertexId, String>,
    properties: HashMap<VertexId, HashMap<String, f64>>,
    outgoing: HashMap<VertexId, Vec<(VertexId, String)>>,
    incoming: HashMap<VertexId, Vec<(VertexId, String)>>,
    faults: Faults,
}

/// In-memory graph source.
///
/// Builder methods are meant to be called before the graph is shared;
/// clones taken earlier keep the old contents.
#[derive(Debug, Clone)]
pub struct MemoryGraph {
    data: Arc<GraphData>,
    pool: SessionPool,
    queries: Arc<AtomicUsize>,
}

impl Default for MemoryGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self {
            data: Arc::new(GraphData::default()),
            pool: SessionPool::new(4, Duration::from_secs(1)),
            queries: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn from_fixture(fixture: MemoryFixture) -> Self {
        let mut graph = Self::new();
        for v in fixture.vertices {
            let data = graph.data_mut();
            if let Some(t) = v.vertex_type {
                data.types.insert(v.id.clone(), t);
            }
            if !v.properties.is_empty() {
                data.properties.insert(v.id, v.properties);
            }
        }
        for e in fixture.edges {
            graph = graph.edge(e.src.as_str(), e.dst.as_str(), &e.edge_type);
        }
        graph
    }

    /// Layered test graph: `root` links to every vertex of layer 1, and every
    /// vertex of layer `d` links to every vertex of layer `d + 1`.
    ///
    /// Vertices are named `l{d}_{i}`; every vertex has `width` out-neighbors.
    pub fn layered(width: usize, depth: usize) -> Self {
        let mut graph = Self::new().vertex("root", "node");
        let mut previous = vec!["root".to_string()];
        for d in 1..=depth {
            let layer: Vec<String> = (0..width).map(|i| format!("l{d}_{i}")).collect();
            for v in &layer {
                graph = graph.vertex(v, "node");
            }
            for src in &previous {
                for dst in &layer {
                    graph = graph.edge(src, dst, "link");
                }
            }
            previous = layer;
        }
        graph
    }

    fn data_mut(&mut self) -> &mut GraphData {
        Arc::make_mut(&mut self.data)
    }

    /// Replace the session pool.
    pub fn with_pool(mut self, capacity: usize, acquire_timeout: Duration) -> Self {
        self.pool = SessionPool::new(capacity, acquire_timeout);
        self
    }

    /// Add a typed vertex.
    pub fn vertex(mut self, id: &str, vertex_type: &str) -> Self {
        self.data_mut()
            .types
            .insert(VertexId::from(id), vertex_type.to_string());
        self
    }

    /// Set a numeric property on a vertex.
    pub fn property(mut self, id: &str, field: &str, value: f64) -> Self {
        self.data_mut()
            .properties
            .entry(VertexId::from(id))
            .or_default()
            .insert(field.to_string(), value);
        self
    }

    /// Add a directed edge.
    pub fn edge(mut self, src: &str, dst: &str, edge_type: &str) -> Self {
        let data = self.data_mut();
        data.outgoing
            .entry(VertexId::from(src))
            .or_default()
            .push((VertexId::from(dst), edge_type.to_string()));
        data.incoming
            .entry(VertexId::from(dst))
            .or_default()
            .push((VertexId::from(src), edge_type.to_string()));
        self
    }

    /// Add an edge in both directions.
    pub fn link(self, a: &str, b: &str, edge_type: &str) -> Self {
        self.edge(a, b, edge_type).edge(b, a, edge_type)
    }

    pub fn fail_hop(mut self, hop: usize) -> Self {
        self.data_mut().faults.failing_hops.insert(hop);
        self
    }

    pub fn fail_bulk(mut self) -> Self {
        self.data_mut().faults.fail_bulk = true;
        self
    }

    /// Type lookups fail and expansion rows carry no types.
    pub fn fail_types(mut self) -> Self {
        self.data_mut().faults.fail_types = true;
        self
    }

    pub fn fail_properties(mut self) -> Self {
        self.data_mut().faults.fail_properties = true;
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.data_mut().faults.unavailable = true;
        self
    }

    /// Delay every capability call by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.data_mut().faults.latency = Some(latency);
        self
    }

    /// Free session slots; equals the pool capacity when nothing is checked out.
    pub fn available_sessions(&self) -> usize {
        self.pool.available()
    }

    /// Number of capability calls served so far, across all sessions.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::Relaxed)
    }

    pub fn vertex_count(&self) -> usize {
        let mut all: HashSet<&VertexId> = self.data.types.keys().collect();
        all.extend(self.data.outgoing.keys());
        all.extend(self.data.incoming.keys());
        all.len()
    }
}

#[async_trait]
impl GraphSource for MemoryGraph {
    type Session = MemorySession;

    async fn session(&self) -> Result<MemorySession, GraphError> {
        if self.data.faults.unavailable {
            return Err(GraphError::Connection(
                "memory graph marked unavailable".to_string(),
            ));
        }
        let permit = self.pool.checkout().await?;
        Ok(MemorySession {
            data: self.data.clone(),
            queries: self.queries.clone(),
            _permit: permit,
        })
    }
}

/// Session over a [`MemoryGraph`]. Dropping it frees the pool slot.
pub struct MemorySession {
    data: Arc<GraphData>,
    queries: Arc<AtomicUsize>,
    _permit: SessionPermit,
}

impl MemorySession {
    async fn count(&self) {
        self.queries.fetch_add(1, Ordering::Relaxed);
        if let Some(latency) = self.data.faults.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn out_edges(&self, v: &VertexId) -> &[(VertexId, String)] {
        self.data.outgoing.get(v).map(Vec::as_slice).unwrap_or(&[])
    }

    fn in_edges(&self, v: &VertexId) -> &[(VertexId, String)] {
        self.data.incoming.get(v).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Type as an expansion row would carry it; withheld under `fail_types`.
    fn row_type(&self, v: &VertexId) -> Option<String> {
        if self.data.faults.fail_types {
            return None;
        }
        self.data.types.get(v).cloned()
    }
}

#[async_trait]
impl GraphSession for MemorySession {
    async fn expand_hop(&self, vid: &VertexId, hop: usize) -> QueryOutcome<Neighborhood> {
        self.count().await;
        if self.data.faults.failing_hops.contains(&hop) {
            return QueryOutcome::failed(format!("injected failure at hop {hop}"));
        }
        if hop == 0 {
            return QueryOutcome::succeeded(Neighborhood::default(), 0);
        }

        // Vertices reachable by an outgoing walk of exactly hop - 1 steps.
        let mut frontier = vec![vid.clone()];
        for _ in 1..hop {
            let mut seen = HashSet::new();
            let mut next = Vec::new();
            for v in &frontier {
                for (dst, _) in self.out_edges(v) {
                    if seen.insert(dst) {
                        next.push(dst.clone());
                    }
                }
            }
            frontier = next;
        }

        let mut seen = HashSet::new();
        let mut endpoints = HashSet::new();
        let mut hood = Neighborhood::default();
        for src in &frontier {
            for (dst, edge_type) in self.out_edges(src) {
                let edge = EdgeTriple {
                    src: src.clone(),
                    dst: dst.clone(),
                    edge_type: edge_type.clone(),
                };
                if !seen.insert(edge.clone()) {
                    continue;
                }
                for v in [src, dst] {
                    if endpoints.insert(v.clone()) {
                        hood.vertices.push((v.clone(), self.row_type(v)));
                    }
                }
                hood.edges.push(edge);
            }
        }

        let rows = hood.edges.len();
        QueryOutcome::succeeded(hood, rows)
    }

    async fn bulk_subgraph(&self, vid: &VertexId, hops: usize) -> QueryOutcome<Neighborhood> {
        self.count().await;
        if self.data.faults.fail_bulk {
            return QueryOutcome::failed("injected bulk failure");
        }

        let mut depth: HashMap<VertexId, usize> = HashMap::new();
        let mut order = vec![vid.clone()];
        let mut queue = VecDeque::new();
        depth.insert(vid.clone(), 0);
        queue.push_back(vid.clone());

        let mut seen_edges = HashSet::new();
        let mut edges = Vec::new();

        while let Some(v) = queue.pop_front() {
            let d = depth[&v];
            if d >= hops {
                continue;
            }
            let outgoing = self
                .out_edges(&v)
                .iter()
                .map(|(dst, t)| (EdgeTriple::new(v.clone(), dst.clone(), t), dst));
            let incoming = self
                .in_edges(&v)
                .iter()
                .map(|(src, t)| (EdgeTriple::new(src.clone(), v.clone(), t), src));

            for (edge, neighbor) in outgoing.chain(incoming) {
                if !depth.contains_key(neighbor) {
                    depth.insert(neighbor.clone(), d + 1);
                    order.push(neighbor.clone());
                    queue.push_back(neighbor.clone());
                }
                if seen_edges.insert(edge.clone()) {
                    edges.push(edge);
                }
            }
        }

        let rows = edges.len();
        let vertices = order
            .into_iter()
            .map(|v| {
                let t = self.row_type(&v);
                (v, t)
            })
            .collect();
        QueryOutcome::succeeded(Neighborhood { vertices, edges }, rows)
    }

    async fn vertex_type(&self, vid: &VertexId) -> QueryOutcome<Option<String>> {
        self.count().await;
        if self.data.faults.fail_types {
            return QueryOutcome::failed("injected type lookup failure");
        }
        let label = self.data.types.get(vid).cloned();
        let rows = usize::from(label.is_some());
        QueryOutcome::succeeded(label, rows)
    }

    async fn fetch_properties(
        &self,
        label: &str,
        vids: &[VertexId],
        field: &str,
    ) -> QueryOutcome<HashMap<VertexId, f64>> {
        self.count().await;
        if self.data.faults.fail_properties {
            return QueryOutcome::failed("injected property failure");
        }

        let mut values = HashMap::new();
        let mut rows = 0;
        for vid in vids {
            if self.data.types.get(vid).map(String::as_str) != Some(label) {
                continue;
            }
            rows += 1;
            if let Some(value) = self.data.properties.get(vid).and_then(|p| p.get(field)) {
                values.insert(vid.clone(), *value);
            }
        }
        QueryOutcome::succeeded(values, rows)
    }
}
