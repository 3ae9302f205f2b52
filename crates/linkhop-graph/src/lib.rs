//! linkhop-graph: Remote graph query adapter.
//!
//! This crate is the capability boundary to the remote property graph.
//! Samplers never talk to a database directly: they check out a
//! [`GraphSession`] from a [`GraphSource`] and use its four capabilities
//! (hop expansion, bulk subgraph, vertex type, batched property fetch).
//! Every capability reports success or failure plus a row count instead of
//! returning an error, so a failed query never escapes the adapter.

pub mod client;
pub mod memory;
pub mod pool;
pub mod queries;
pub mod source;

pub use client::{GraphClient, GraphConfig, GraphError};
pub use memory::{MemoryFixture, MemoryGraph};
pub use pool::{SessionPermit, SessionPool};
pub use queries::{Neo4jSession, Neo4jSource};
pub use source::{GraphSession, GraphSource, Neighborhood, QueryOutcome, QueryStatus};
