//! Bounded neighborhood sampling around a center vertex.
//!
//! Small hop counts issue one expansion query per hop and stop as soon as
//! the node budget is reached. Larger hop counts fetch every hop with one
//! bulk query. Both strategies share edge materialization, type tracking,
//! and feature attachment, and both produce the same [`Subgraph`] shape.
//!
//! Vertex types come from the expansion rows themselves; a separate type
//! lookup is only issued for vertices no row typed.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use linkhop_core::{EdgeTriple, SampleStats, SampleStrategy, Subgraph, VertexId, UNKNOWN_TYPE};
use linkhop_graph::{GraphSession, GraphSource, Neighborhood, QueryOutcome};

use crate::config::SamplerConfig;
use crate::error::{PathfindError, Result};
use crate::registry::IdRegistry;

/// Samples subgraphs from a remote graph source.
///
/// Each call checks out exactly one session and holds it until the call
/// returns; no state survives between calls.
#[derive(Debug, Clone)]
pub struct SubgraphSampler<S: GraphSource> {
    source: S,
    config: SamplerConfig,
}

impl<S: GraphSource> SubgraphSampler<S> {
    pub fn new(source: S, config: SamplerConfig) -> Self {
        Self { source, config }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Sample the neighborhood within `n_hops` of `center`, holding at most
    /// `max_nodes` vertices. The center always counts, so `max_nodes` must
    /// be at least one.
    ///
    /// Failed remote queries are tolerated and counted in the returned
    /// subgraph's stats. Only a zero budget or a failure to obtain a
    /// session is an error.
    pub async fn sample_subgraph(
        &self,
        center: &VertexId,
        n_hops: usize,
        max_nodes: usize,
        bidirectional: bool,
    ) -> Result<Subgraph> {
        if max_nodes == 0 {
            return Err(PathfindError::InvalidRequest {
                reason: "max_nodes must be at least 1".to_string(),
            });
        }
        let session = self.source.session().await?;
        let mut builder = SubgraphBuilder::new(center, max_nodes, bidirectional);

        if n_hops <= self.config.per_hop_limit {
            self.expand_by_hop(&session, &mut builder, center, n_hops)
                .await;
        } else {
            self.expand_bulk(&session, &mut builder, center, n_hops)
                .await;
        }
        self.attach_features(&session, &mut builder).await;
        drop(session);

        let subgraph = builder.finish();
        tracing::info!(
            center = %center,
            n_hops,
            strategy = ?subgraph.stats.strategy,
            nodes = subgraph.num_nodes(),
            edges = subgraph.num_edges(),
            queries = subgraph.stats.queries,
            failed_queries = subgraph.stats.failed_queries,
            truncated = subgraph.stats.truncated,
            "Sampled subgraph"
        );
        Ok(subgraph)
    }

    async fn expand_by_hop(
        &self,
        session: &S::Session,
        builder: &mut SubgraphBuilder,
        center: &VertexId,
        n_hops: usize,
    ) {
        builder.stats.strategy = SampleStrategy::HopExpansion;

        if builder.is_full() {
            builder.stats.truncated = n_hops > 0;
        } else {
            'hops: for hop in 1..=n_hops {
                let outcome = session.expand_hop(center, hop).await;
                if !builder.record("expand_hop", &outcome) {
                    continue;
                }
                tracing::debug!(center = %center, hop, rows = outcome.rows, "Expanded hop");

                let Neighborhood { vertices, edges } = outcome.data;
                builder.note_types(vertices);
                let total = edges.len();
                for (i, edge) in edges.iter().enumerate() {
                    builder.admit(edge);
                    if builder.is_full() {
                        if i + 1 < total || hop < n_hops {
                            builder.stats.truncated = true;
                        }
                        tracing::debug!(center = %center, hop, nodes = builder.registry.size(), "Node budget reached");
                        break 'hops;
                    }
                }
            }
        }

        resolve_types(session, builder).await;
    }

    async fn expand_bulk(
        &self,
        session: &S::Session,
        builder: &mut SubgraphBuilder,
        center: &VertexId,
        n_hops: usize,
    ) {
        builder.stats.strategy = SampleStrategy::Bulk;

        let outcome = session.bulk_subgraph(center, n_hops).await;
        if builder.record("bulk_subgraph", &outcome) {
            tracing::debug!(center = %center, n_hops, rows = outcome.rows, "Fetched bulk subgraph");
            let Neighborhood { vertices, edges } = outcome.data;
            builder.note_types(vertices);
            for edge in &edges {
                builder.admit(edge);
            }
        }

        resolve_types(session, builder).await;
    }

    /// Fetch the scalar feature for every typed vertex, batched by type.
    async fn attach_features(&self, session: &S::Session, builder: &mut SubgraphBuilder) {
        let mut groups: BTreeMap<String, Vec<VertexId>> = BTreeMap::new();
        for vid in builder.registry.vertices() {
            let label = builder
                .node_types
                .get(vid)
                .map(String::as_str)
                .unwrap_or(UNKNOWN_TYPE);
            groups.entry(label.to_string()).or_default().push(vid.clone());
        }

        let fetched = session
            .fetch_properties_batched(
                &groups,
                &self.config.feature_field,
                self.config.property_batch_size,
            )
            .await;
        builder.stats.queries += fetched.batches;
        builder.stats.failed_queries += fetched.failed_batches;

        for vid in builder.registry.vertices() {
            match fetched.values.get(vid) {
                Some(value) => {
                    builder.node_features.insert(vid.clone(), *value as f32);
                }
                None => {
                    builder.node_features.insert(vid.clone(), 0.0);
                    builder.missing_features.insert(vid.clone());
                }
            }
        }
    }
}

/// Settle the type of every registered vertex: the type an expansion row
/// reported, else a type lookup, else `unknown`.
async fn resolve_types<G: GraphSession>(session: &G, builder: &mut SubgraphBuilder) {
    let vertices: Vec<VertexId> = builder.registry.vertices().to_vec();
    for vid in &vertices {
        if let Some(label) = builder.reported.remove(vid) {
            builder.set_type(vid, Some(label));
            continue;
        }
        let outcome = session.vertex_type(vid).await;
        let label = if builder.record("vertex_type", &outcome) {
            outcome.data
        } else {
            None
        };
        builder.set_type(vid, label);
    }
}

/// Call-local accumulator that becomes the [`Subgraph`].
struct SubgraphBuilder {
    registry: IdRegistry,
    max_nodes: usize,
    bidirectional: bool,
    seen: HashSet<EdgeTriple>,
    pairs: HashSet<(String, usize, usize)>,
    edges_by_type: BTreeMap<String, Vec<(usize, usize)>>,
    /// Types reported by expansion rows, possibly for unadmitted vertices.
    reported: HashMap<VertexId, String>,
    node_types: HashMap<VertexId, String>,
    node_features: HashMap<VertexId, f32>,
    missing_features: BTreeSet<VertexId>,
    stats: SampleStats,
}

impl SubgraphBuilder {
    fn new(center: &VertexId, max_nodes: usize, bidirectional: bool) -> Self {
        let mut registry = IdRegistry::new();
        registry.get_or_create_index(center);
        Self {
            registry,
            max_nodes,
            bidirectional,
            seen: HashSet::new(),
            pairs: HashSet::new(),
            edges_by_type: BTreeMap::new(),
            reported: HashMap::new(),
            node_types: HashMap::new(),
            node_features: HashMap::new(),
            missing_features: BTreeSet::new(),
            stats: SampleStats::default(),
        }
    }

    fn is_full(&self) -> bool {
        self.registry.size() >= self.max_nodes
    }

    /// Count a remote call; returns whether it succeeded.
    fn record<T>(&mut self, capability: &str, outcome: &QueryOutcome<T>) -> bool {
        self.stats.queries += 1;
        match outcome.failure() {
            None => true,
            Some(reason) => {
                self.stats.failed_queries += 1;
                tracing::warn!(capability, reason, "Query failed, continuing with partial results");
                false
            }
        }
    }

    fn note_types(&mut self, vertices: Vec<(VertexId, Option<String>)>) {
        for (vid, label) in vertices {
            if let Some(label) = label {
                self.reported.entry(vid).or_insert(label);
            }
        }
    }

    fn set_type(&mut self, vid: &VertexId, label: Option<String>) {
        let label = label.unwrap_or_else(|| UNKNOWN_TYPE.to_string());
        self.node_types.insert(vid.clone(), label);
    }

    /// Materialize an edge unless it is a repeat or would overrun the budget.
    fn admit(&mut self, edge: &EdgeTriple) {
        if self.seen.contains(edge) {
            return;
        }

        let new_src = !self.registry.contains(edge.src.as_str());
        let new_dst = edge.dst != edge.src && !self.registry.contains(edge.dst.as_str());
        let added = usize::from(new_src) + usize::from(new_dst);
        if self.registry.size() + added > self.max_nodes {
            self.stats.truncated = true;
            return;
        }

        let src = self.registry.get_or_create_index(&edge.src);
        let dst = self.registry.get_or_create_index(&edge.dst);
        self.push_pair(&edge.edge_type, src, dst);
        if self.bidirectional {
            self.push_pair(&edge.edge_type, dst, src);
        }
        self.seen.insert(edge.clone());
    }

    /// Reciprocal edges (`u -> v` and `v -> u`) materialize the same pairs
    /// when bidirectional; each pair is kept once per edge type.
    fn push_pair(&mut self, edge_type: &str, src: usize, dst: usize) {
        if self.pairs.insert((edge_type.to_string(), src, dst)) {
            self.edges_by_type
                .entry(edge_type.to_string())
                .or_default()
                .push((src, dst));
        }
    }

    fn finish(self) -> Subgraph {
        let edge_index = self.edges_by_type.values().flatten().copied().collect();
        let (vid_to_idx, idx_to_vid) = self.registry.into_parts();
        Subgraph {
            center_index: 0,
            edge_index,
            edges_by_type: self.edges_by_type,
            vid_to_idx,
            idx_to_vid,
            node_types: self.node_types,
            node_features: self.node_features,
            missing_features: self.missing_features,
            stats: self.stats,
        }
    }
}
