//! Core domain types for linkhop.
//!
//! These types describe vertices, edges, and sampled neighborhoods of the
//! remote property graph, shared by the adapter, sampler, path finder, and
//! store facade.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

// ── Vertices and Edges ────────────────────────────────────────────

/// Label assigned to vertices whose type could not be resolved.
pub const UNKNOWN_TYPE: &str = "unknown";

/// Opaque vertex identifier, conventionally type-prefixed (`player100`, `team204`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct VertexId(pub String);

impl VertexId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VertexId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for VertexId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::borrow::Borrow<str> for VertexId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A directed, typed edge in discovery direction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct EdgeTriple {
    pub src: VertexId,
    pub dst: VertexId,
    pub edge_type: String,
}

impl EdgeTriple {
    pub fn new(src: impl Into<VertexId>, dst: impl Into<VertexId>, edge_type: &str) -> Self {
        Self {
            src: src.into(),
            dst: dst.into(),
            edge_type: edge_type.to_string(),
        }
    }
}

/// An ordered vertex sequence; a path of `h` hops holds `h + 1` vertices.
pub type Path = Vec<VertexId>;

// ── Subgraph ──────────────────────────────────────────────────────

/// How the sampler gathered a neighborhood.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SampleStrategy {
    /// One remote query per hop, stopping once the node budget is reached.
    #[default]
    HopExpansion,
    /// A single remote query covering every hop.
    Bulk,
}

/// Bookkeeping for one sampling call.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SampleStats {
    pub strategy: SampleStrategy,
    /// Remote queries issued (hop, bulk, type, and property batches).
    pub queries: usize,
    /// Remote queries that reported failure and were treated as empty.
    pub failed_queries: usize,
    /// Whether the node budget cut the neighborhood short.
    pub truncated: bool,
}

impl SampleStats {
    /// True when no query failed and the budget was not hit.
    pub fn is_complete(&self) -> bool {
        self.failed_queries == 0 && !self.truncated
    }
}

/// A bounded local neighborhood extracted around a center vertex.
///
/// Node indices are dense (`0..num_nodes()`), assigned in first-seen order,
/// and only meaningful within this subgraph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Subgraph {
    pub center_index: usize,
    /// Flattened `(src, dst)` index pairs across all edge types.
    pub edge_index: Vec<(usize, usize)>,
    pub edges_by_type: BTreeMap<String, Vec<(usize, usize)>>,
    pub vid_to_idx: HashMap<VertexId, usize>,
    pub idx_to_vid: Vec<VertexId>,
    pub node_types: HashMap<VertexId, String>,
    /// One scalar per vertex; vertices without a fetched value hold `0.0`.
    pub node_features: HashMap<VertexId, f32>,
    /// Vertices whose feature was defaulted rather than fetched.
    pub missing_features: BTreeSet<VertexId>,
    pub stats: SampleStats,
}

impl Subgraph {
    pub fn num_nodes(&self) -> usize {
        self.idx_to_vid.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edge_index.len()
    }

    pub fn index_of(&self, vid: &str) -> Option<usize> {
        self.vid_to_idx.get(vid).copied()
    }

    pub fn vertex_at(&self, idx: usize) -> Option<&VertexId> {
        self.idx_to_vid.get(idx)
    }

    pub fn contains(&self, vid: &str) -> bool {
        self.vid_to_idx.contains_key(vid)
    }

    pub fn center(&self) -> Option<&VertexId> {
        self.idx_to_vid.get(self.center_index)
    }

    /// Type label of a vertex, `unknown` if unresolved.
    pub fn node_type(&self, vid: &str) -> &str {
        self.node_types
            .get(vid)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_TYPE)
    }

    /// Scalar feature of a vertex, `0.0` if absent.
    pub fn feature(&self, vid: &str) -> f32 {
        self.node_features.get(vid).copied().unwrap_or(0.0)
    }

    pub fn has_feature(&self, vid: &str) -> bool {
        self.contains(vid) && !self.missing_features.contains(vid)
    }
}

// ── Path Discovery ────────────────────────────────────────────────

/// How a discovery result was obtained.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryMethod {
    /// Both entities were found inside the first sampled neighborhood.
    Direct,
    /// Paths were stitched through vertices shared by two neighborhoods.
    Bridge,
    /// Neither strategy connected the entities.
    None,
}

impl DiscoveryMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Bridge => "bridge",
            Self::None => "none",
        }
    }
}

impl fmt::Display for DiscoveryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a multi-hop relationship search between two entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathDiscoveryResult {
    pub found: bool,
    pub paths: Vec<Path>,
    pub method: DiscoveryMethod,
    /// Shared vertices of both neighborhoods; empty unless `method` is `bridge`.
    pub bridge_nodes: Vec<VertexId>,
    /// The neighborhood sampled around the first entity.
    pub subgraph: Subgraph,
}

impl PathDiscoveryResult {
    pub fn not_found(subgraph: Subgraph) -> Self {
        Self {
            found: false,
            paths: Vec::new(),
            method: DiscoveryMethod::None,
            bridge_nodes: Vec::new(),
            subgraph,
        }
    }

    /// The shortest path found, if any.
    pub fn shortest_path(&self) -> Option<&Path> {
        self.paths.iter().min_by_key(|p| p.len())
    }
}
