//! Configuration for sampling and path discovery.

use serde::Deserialize;

use linkhop_core::config::{load_layered, load_section};
use linkhop_graph::GraphConfig;

use crate::error::Result;

/// Subgraph sampler settings (`[sampler]`).
#[derive(Debug, Clone, Deserialize)]
pub struct SamplerConfig {
    /// Scalar vertex property attached as the node feature.
    #[serde(default = "default_feature_field")]
    pub feature_field: String,

    /// Vertices per property fetch request.
    #[serde(default = "default_property_batch_size")]
    pub property_batch_size: usize,

    /// Emit every edge in both directions.
    #[serde(default = "default_true")]
    pub bidirectional: bool,

    /// Hop counts up to this value use one query per hop; larger use one bulk query.
    #[serde(default = "default_per_hop_limit")]
    pub per_hop_limit: usize,
}

/// Path discovery settings (`[discovery]`).
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
    /// Maximum vertices per sampled neighborhood.
    #[serde(default = "default_node_budget")]
    pub node_budget: usize,

    /// Cap on paths returned by one search.
    #[serde(default = "default_max_paths")]
    pub max_paths: usize,

    /// Shared vertices tried when stitching paths across two neighborhoods.
    #[serde(default = "default_max_bridge_nodes")]
    pub max_bridge_nodes: usize,

    /// Paths kept per leg (entity to bridge, bridge to entity).
    #[serde(default = "default_paths_per_bridge_leg")]
    pub paths_per_bridge_leg: usize,

    /// Paths with at most this many vertices may revisit vertices.
    #[serde(default = "default_revisit_threshold")]
    pub revisit_threshold: usize,

    /// Deadline for one discovery when the request sets none.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_feature_field() -> String {
    "embedding1".to_string()
}

fn default_property_batch_size() -> usize {
    100
}

fn default_true() -> bool {
    true
}

fn default_per_hop_limit() -> usize {
    2
}

fn default_node_budget() -> usize {
    500
}

fn default_max_paths() -> usize {
    5
}

fn default_max_bridge_nodes() -> usize {
    3
}

fn default_paths_per_bridge_leg() -> usize {
    2
}

fn default_revisit_threshold() -> usize {
    crate::algorithms::SHORT_PATH_REVISIT_LIMIT
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            feature_field: default_feature_field(),
            property_batch_size: default_property_batch_size(),
            bidirectional: default_true(),
            per_hop_limit: default_per_hop_limit(),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            node_budget: default_node_budget(),
            max_paths: default_max_paths(),
            max_bridge_nodes: default_max_bridge_nodes(),
            paths_per_bridge_leg: default_paths_per_bridge_leg(),
            revisit_threshold: default_revisit_threshold(),
            timeout_ms: None,
        }
    }
}

/// Everything the engine and CLI need, loaded in one pass.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub neo4j: GraphConfig,
    pub sampler: SamplerConfig,
    pub discovery: DiscoveryConfig,
}

impl Settings {
    /// Load `[neo4j]`, `[sampler]`, and `[discovery]` from file and environment.
    pub fn load(file_prefix: &str) -> Result<Self> {
        let cfg = load_layered(file_prefix)?;
        Ok(Self {
            neo4j: load_section(&cfg, "neo4j")?,
            sampler: load_section(&cfg, "sampler")?,
            discovery: load_section(&cfg, "discovery")?,
        })
    }
}
