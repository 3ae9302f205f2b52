//! Neo4j connection management and shared graph client.

use neo4rs::{ConfigBuilder, Graph, Query};
use serde::Deserialize;

/// Errors from graph operations.
///
/// Only connection-level failures surface to samplers; per-query failures
/// are folded into [`crate::QueryOutcome`].
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Neo4j connection error: {0}")]
    Connection(String),

    #[error("Neo4j query error: {0}")]
    Query(#[from] neo4rs::Error),

    #[error("Session pool exhausted: no session free after {waited_ms}ms")]
    PoolExhausted { waited_ms: u64 },

    #[error("Session pool is closed")]
    PoolClosed,

    #[error("Deadline exceeded after {timeout_ms}ms")]
    DeadlineExceeded { timeout_ms: u64 },

    #[error("Invalid identifier for Cypher interpolation: {0:?}")]
    InvalidIdentifier(String),

    #[error("Fixture error: {0}")]
    Fixture(String),
}

/// Configuration for connecting to Neo4j.
///
/// Loaded from the `[neo4j]` section of `linkhop.toml` or
/// `LINKHOP__NEO4J__*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    #[serde(default = "default_uri")]
    pub uri: String,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default = "default_password")]
    pub password: String,
    /// Upper bound on concurrently checked-out sessions.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,
    /// How long a sampler waits for a free session before giving up.
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
    /// Per-query bound; a slower query is reported as failed.
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
    /// Vertex property holding the opaque vertex identifier.
    #[serde(default = "default_id_property")]
    pub id_property: String,
    /// Label every vertex carries; `id_property` is indexed under it.
    #[serde(default = "default_vertex_label")]
    pub vertex_label: String,
    /// Row cap for each level of a bulk subgraph query.
    #[serde(default = "default_bulk_edge_limit")]
    pub bulk_edge_limit: u32,
}

fn default_uri() -> String {
    "bolt://localhost:7687".to_string()
}

fn default_user() -> String {
    "neo4j".to_string()
}

fn default_password() -> String {
    "linkhop-dev".to_string()
}

fn default_max_connections() -> u32 {
    16
}

fn default_fetch_size() -> usize {
    256
}

fn default_acquire_timeout_ms() -> u64 {
    5_000
}

fn default_query_timeout_ms() -> u64 {
    10_000
}

fn default_id_property() -> String {
    "id".to_string()
}

fn default_vertex_label() -> String {
    "Vertex".to_string()
}

fn default_bulk_edge_limit() -> u32 {
    5_000
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            user: default_user(),
            password: default_password(),
            max_connections: default_max_connections(),
            fetch_size: default_fetch_size(),
            acquire_timeout_ms: default_acquire_timeout_ms(),
            query_timeout_ms: default_query_timeout_ms(),
            id_property: default_id_property(),
            vertex_label: default_vertex_label(),
            bulk_edge_limit: default_bulk_edge_limit(),
        }
    }
}

/// Thread-safe Neo4j graph client with connection pooling.
///
/// Clone is cheap (inner Arc).
#[derive(Clone)]
pub struct GraphClient {
    graph: Graph,
}

impl GraphClient {
    /// Connect to Neo4j with the given configuration.
    pub async fn connect(config: &GraphConfig) -> Result<Self, GraphError> {
        let neo_config = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password)
            .max_connections(config.max_connections as usize)
            .fetch_size(config.fetch_size)
            .build()
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        let graph = Graph::connect(neo_config)
            .await
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        tracing::info!(uri = %config.uri, "Connected to Neo4j");
        Ok(Self { graph })
    }

    /// Execute a write-only query (CREATE, MERGE, DELETE, SET).
    pub async fn run(&self, query: Query) -> Result<(), GraphError> {
        self.graph.run(query).await?;
        Ok(())
    }

    /// Execute a read query and collect all rows.
    pub async fn query_rows(&self, query: Query) -> Result<Vec<neo4rs::Row>, GraphError> {
        let mut stream = self.graph.execute(query).await?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GraphConfig::default();
        assert_eq!(config.uri, "bolt://localhost:7687");
        assert_eq!(config.max_connections, 16);
        assert_eq!(config.acquire_timeout_ms, 5_000);
        assert_eq!(config.id_property, "id");
        assert_eq!(config.vertex_label, "Vertex");
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: GraphConfig =
            serde_json::from_str(r#"{"uri": "bolt://graph:7687", "max_connections": 4}"#).unwrap();
        assert_eq!(config.uri, "bolt://graph:7687");
        assert_eq!(config.max_connections, 4);
        assert_eq!(config.user, "neo4j");
        assert_eq!(config.bulk_edge_limit, 5_000);
    }
}
