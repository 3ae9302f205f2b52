//! linkhop-pathfind: Multi-hop relationship discovery between two entities.
//!
//! Samples a bounded neighborhood around the first entity from the remote
//! graph and searches it for paths to the second. When the second entity is
//! outside that neighborhood, a shallower neighborhood is sampled around it
//! and paths are stitched through the vertices both share. Sampled subgraphs
//! can be exposed to an embedding consumer through the tensor store facade.

pub mod algorithms;
pub mod bridge;
pub mod config;
pub mod error;
pub mod graph;
pub mod loader;
pub mod registry;
pub mod sampler;
pub mod store;
pub mod types;

pub use config::{DiscoveryConfig, SamplerConfig, Settings};
pub use error::PathfindError;
pub use loader::{load_tensors, GraphTensors};
pub use registry::IdRegistry;
pub use sampler::SubgraphSampler;
pub use store::{InMemoryStore, StoreError, TensorStore};
pub use types::{DiscoveryReport, DiscoveryRequest};

use std::time::{Duration, Instant};

use chrono::Utc;
use linkhop_core::{DiscoveryMethod, PathDiscoveryResult, Subgraph, VertexId};
use linkhop_graph::{GraphError, GraphSource};
use uuid::Uuid;

use crate::algorithms::{find_paths_with, PathSearch};
use crate::bridge::{bridge_nodes, stitch_paths, BridgeSearch};

/// The discovery engine over one graph source.
pub struct PathfindEngine<S: GraphSource> {
    sampler: SubgraphSampler<S>,
    discovery: DiscoveryConfig,
}

impl<S: GraphSource> PathfindEngine<S> {
    /// Create a new engine with default sampler and discovery settings.
    pub fn new(source: S) -> Self {
        Self {
            sampler: SubgraphSampler::new(source, SamplerConfig::default()),
            discovery: DiscoveryConfig::default(),
        }
    }

    /// Set a custom sampler configuration.
    pub fn with_sampler_config(mut self, config: SamplerConfig) -> Self {
        self.sampler = SubgraphSampler::new(self.sampler.source().clone(), config);
        self
    }

    /// Set a custom discovery configuration.
    pub fn with_discovery_config(mut self, config: DiscoveryConfig) -> Self {
        self.discovery = config;
        self
    }

    pub fn sampler(&self) -> &SubgraphSampler<S> {
        &self.sampler
    }

    pub fn discovery_config(&self) -> &DiscoveryConfig {
        &self.discovery
    }

    /// Sample around `center` using the configured edge direction.
    pub async fn sample_subgraph(
        &self,
        center: &VertexId,
        n_hops: usize,
        max_nodes: usize,
    ) -> error::Result<Subgraph> {
        self.sampler
            .sample_subgraph(center, n_hops, max_nodes, self.sampler.config().bidirectional)
            .await
    }

    /// Find how `entity_a` and `entity_b` connect within `max_hops`, using
    /// the configured node budget.
    pub async fn find_multihop_relationships(
        &self,
        entity_a: &VertexId,
        entity_b: &VertexId,
        max_hops: usize,
    ) -> error::Result<PathDiscoveryResult> {
        self.find_multihop_with_budget(entity_a, entity_b, max_hops, self.discovery.node_budget)
            .await
    }

    /// Direct search in A's neighborhood, falling back to bridge stitching.
    ///
    /// The returned subgraph is always the one sampled around `entity_a`.
    pub async fn find_multihop_with_budget(
        &self,
        entity_a: &VertexId,
        entity_b: &VertexId,
        max_hops: usize,
        node_budget: usize,
    ) -> error::Result<PathDiscoveryResult> {
        let subgraph_a = self.sample_subgraph(entity_a, max_hops, node_budget).await?;

        if subgraph_a.contains(entity_b.as_str()) {
            let search = PathSearch::new(max_hops)
                .with_max_paths(self.discovery.max_paths)
                .with_revisit_threshold(self.discovery.revisit_threshold);
            let paths = find_paths_with(&subgraph_a, entity_a.as_str(), entity_b.as_str(), &search);
            tracing::info!(
                entity_a = %entity_a,
                entity_b = %entity_b,
                max_hops,
                paths = paths.len(),
                method = %DiscoveryMethod::Direct,
                "Discovery finished"
            );
            return Ok(PathDiscoveryResult {
                found: true,
                paths,
                method: DiscoveryMethod::Direct,
                bridge_nodes: Vec::new(),
                subgraph: subgraph_a,
            });
        }

        let leg_hops = max_hops / 2;
        let subgraph_b = self.sample_subgraph(entity_b, leg_hops, node_budget).await?;
        let bridges = bridge_nodes(&subgraph_a, &subgraph_b);

        if bridges.is_empty() {
            tracing::info!(
                entity_a = %entity_a,
                entity_b = %entity_b,
                max_hops,
                method = %DiscoveryMethod::None,
                "Discovery finished"
            );
            return Ok(PathDiscoveryResult::not_found(subgraph_a));
        }

        let search = BridgeSearch {
            leg_hops,
            max_bridge_nodes: self.discovery.max_bridge_nodes,
            paths_per_leg: self.discovery.paths_per_bridge_leg,
            max_paths: self.discovery.max_paths,
            revisit_threshold: self.discovery.revisit_threshold,
        };
        let paths = stitch_paths(
            &subgraph_a,
            &subgraph_b,
            entity_a.as_str(),
            entity_b.as_str(),
            &bridges,
            &search,
        );
        tracing::info!(
            entity_a = %entity_a,
            entity_b = %entity_b,
            max_hops,
            bridges = bridges.len(),
            paths = paths.len(),
            method = %DiscoveryMethod::Bridge,
            "Discovery finished"
        );

        Ok(PathDiscoveryResult {
            found: true,
            paths,
            method: DiscoveryMethod::Bridge,
            bridge_nodes: bridges,
            subgraph: subgraph_a,
        })
    }

    /// Validate and run one discovery request under its deadline.
    ///
    /// Orchestrates: validate → sample and search → optionally load tensors
    /// through the store facade → report.
    pub async fn discover(&self, request: DiscoveryRequest) -> error::Result<DiscoveryReport> {
        request.validate()?;
        let start = Instant::now();
        let request_id = Uuid::new_v4();

        let work = self.run_discovery(&request);
        let outcome = match request.timeout_ms.or(self.discovery.timeout_ms) {
            Some(timeout_ms) => tokio::time::timeout(Duration::from_millis(timeout_ms), work)
                .await
                .map_err(|_| {
                    tracing::warn!(%request_id, timeout_ms, "Discovery deadline exceeded");
                    PathfindError::RemoteUnavailable(GraphError::DeadlineExceeded { timeout_ms })
                })?,
            None => work.await,
        };
        let (result, tensors) = outcome?;

        let computation_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            %request_id,
            found = result.found,
            method = %result.method,
            computation_ms,
            "Discovery report ready"
        );

        Ok(DiscoveryReport {
            request_id,
            entity_a: request.entity_a,
            entity_b: request.entity_b,
            max_hops: request.max_hops,
            result,
            tensors,
            computation_ms,
            computed_at: Utc::now(),
        })
    }

    async fn run_discovery(
        &self,
        request: &DiscoveryRequest,
    ) -> error::Result<(PathDiscoveryResult, Option<GraphTensors>)> {
        let node_budget = request.node_budget.unwrap_or(self.discovery.node_budget);
        let result = self
            .find_multihop_with_budget(
                &request.entity_a,
                &request.entity_b,
                request.max_hops,
                node_budget,
            )
            .await?;

        let tensors = if request.include_tensors.unwrap_or(false) {
            let field = &self.sampler.config().feature_field;
            let store = InMemoryStore::from_subgraph(&result.subgraph, field);
            Some(load_tensors(&store, &result.subgraph, field).await?)
        } else {
            None
        };

        Ok((result, tensors))
    }
}
