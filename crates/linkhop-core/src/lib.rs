//! linkhop-core: Shared types, configuration, and error handling for linkhop.
//!
//! This crate provides the foundational types used across all linkhop components:
//! - Vertex identifiers, typed edges, and paths
//! - The sampled `Subgraph` shape shared by the sampler, path finder, and store facade
//! - Path discovery results
//! - Layered configuration loading
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use error::LinkhopError;
pub use types::{
    DiscoveryMethod, EdgeTriple, Path, PathDiscoveryResult, SampleStats, SampleStrategy,
    Subgraph, VertexId, UNKNOWN_TYPE,
};
