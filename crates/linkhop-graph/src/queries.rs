//! Neo4j-backed graph source: Cypher for each adapter capability.
//!
//! Every vertex carries the configured base label (default `Vertex`) and an
//! id property indexed under it, so each lookup starts with an index seek.
//! The vertex type is the first label other than the base label. Labels and
//! property names are interpolated into Cypher, so they are validated as
//! plain identifiers first.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use neo4rs::{query, Query, Row};

use linkhop_core::{EdgeTriple, VertexId};

use crate::client::{GraphClient, GraphConfig, GraphError};
use crate::pool::{SessionPermit, SessionPool};
use crate::source::{GraphSession, GraphSource, Neighborhood, QueryOutcome};

/// Settings shared by every session of one source.
#[derive(Debug)]
struct QuerySettings {
    id_property: String,
    vertex_label: String,
    query_timeout: Duration,
    bulk_edge_limit: u32,
}

/// Graph source backed by a Neo4j database.
#[derive(Clone)]
pub struct Neo4jSource {
    client: GraphClient,
    pool: SessionPool,
    settings: Arc<QuerySettings>,
}

impl Neo4jSource {
    /// Connect to Neo4j and size the session pool from the config.
    pub async fn connect(config: &GraphConfig) -> Result<Self, GraphError> {
        validate_names(config)?;
        let client = GraphClient::connect(config).await?;
        Self::from_client(client, config)
    }

    /// Wrap an existing client.
    pub fn from_client(client: GraphClient, config: &GraphConfig) -> Result<Self, GraphError> {
        validate_names(config)?;
        Ok(Self {
            client,
            pool: SessionPool::new(
                config.max_connections as usize,
                Duration::from_millis(config.acquire_timeout_ms),
            ),
            settings: Arc::new(QuerySettings {
                id_property: config.id_property.clone(),
                vertex_label: config.vertex_label.clone(),
                query_timeout: Duration::from_millis(config.query_timeout_ms),
                bulk_edge_limit: config.bulk_edge_limit,
            }),
        })
    }

    /// Create the id index under the base label if it does not exist yet.
    pub async fn ensure_index(&self) -> Result<(), GraphError> {
        let QuerySettings {
            id_property: id,
            vertex_label: label,
            ..
        } = self.settings.as_ref();
        let cypher = format!(
            "CREATE INDEX linkhop_{label}_{id} IF NOT EXISTS FOR (v:{label}) ON (v.{id})"
        );
        self.client.run(query(&cypher)).await?;
        tracing::info!(label = %label, property = %id, "Vertex id index ready");
        Ok(())
    }

    pub fn pool(&self) -> &SessionPool {
        &self.pool
    }

    pub fn client(&self) -> &GraphClient {
        &self.client
    }
}

fn validate_names(config: &GraphConfig) -> Result<(), GraphError> {
    cypher_identifier(&config.id_property)?;
    cypher_identifier(&config.vertex_label)?;
    Ok(())
}

#[async_trait]
impl GraphSource for Neo4jSource {
    type Session = Neo4jSession;

    async fn session(&self) -> Result<Neo4jSession, GraphError> {
        let permit = self.pool.checkout().await?;
        Ok(Neo4jSession {
            client: self.client.clone(),
            settings: self.settings.clone(),
            _permit: permit,
        })
    }
}

/// A checked-out Neo4j session. Dropping it frees the pool slot.
pub struct Neo4jSession {
    client: GraphClient,
    settings: Arc<QuerySettings>,
    _permit: SessionPermit,
}

impl Neo4jSession {
    /// Run a read query under the per-query timeout.
    async fn rows(&self, q: Query, what: &str) -> Result<Vec<Row>, String> {
        match tokio::time::timeout(self.settings.query_timeout, self.client.query_rows(q)).await {
            Ok(Ok(rows)) => Ok(rows),
            Ok(Err(e)) => Err(format!("{what}: {e}")),
            Err(_) => Err(format!(
                "{what}: timed out after {}ms",
                self.settings.query_timeout.as_millis()
            )),
        }
    }

    fn vertex_query(&self, cypher: &str, vid: &VertexId) -> Query {
        query(cypher)
            .param("vid", vid.to_string())
            .param("base", self.settings.vertex_label.clone())
    }
}

#[async_trait]
impl GraphSession for Neo4jSession {
    async fn expand_hop(&self, vid: &VertexId, hop: usize) -> QueryOutcome<Neighborhood> {
        if hop == 0 {
            return QueryOutcome::succeeded(Neighborhood::default(), 0);
        }

        let QuerySettings {
            id_property: id,
            vertex_label: label,
            ..
        } = self.settings.as_ref();
        let anchor = if hop == 1 {
            format!("MATCH (s:{label} {{{id}: $vid}})")
        } else {
            let walk = hop - 1;
            format!(
                "MATCH (a:{label} {{{id}: $vid}})-[*{walk}]->(s)
                 WITH DISTINCT s"
            )
        };
        let cypher = format!(
            "{anchor}
             MATCH (s)-[r]->(d)
             RETURN DISTINCT s.{id} AS src, d.{id} AS dst, type(r) AS edge_type,
                    {src_type} AS src_type, {dst_type} AS dst_type",
            src_type = type_of("s"),
            dst_type = type_of("d"),
        );

        match self.rows(self.vertex_query(&cypher, vid), "expand_hop").await {
            Ok(rows) => {
                let count = rows.len();
                let mut folded = RowFold::default();
                for row in &rows {
                    folded.push(row);
                }
                QueryOutcome::succeeded(folded.finish(), count)
            }
            Err(reason) => QueryOutcome::failed(reason),
        }
    }

    /// Walks out one level at a time, carrying only vertices not seen on an
    /// earlier level. Each level reads at most `bulk_edge_limit` rows, so
    /// the cost is bounded by `hops * bulk_edge_limit` regardless of how
    /// many paths run through a hub.
    async fn bulk_subgraph(&self, vid: &VertexId, hops: usize) -> QueryOutcome<Neighborhood> {
        let QuerySettings {
            id_property: id,
            vertex_label: label,
            ..
        } = self.settings.as_ref();

        let mut cypher = format!(
            "MATCH (c:{label} {{{id}: $vid}})
             WITH c, [c] AS seen, [c] AS frontier, [] AS rels"
        );
        for _ in 0..hops {
            cypher.push_str(
                "
             CALL {
                 WITH frontier
                 UNWIND frontier AS f
                 MATCH (f)-[r]-(n)
                 WITH r, n LIMIT $limit
                 RETURN collect(r) AS level_rels, collect(DISTINCT n) AS reached
             }
             WITH c, seen, rels + level_rels AS rels,
                  [x IN reached WHERE NOT x IN seen] AS fresh
             WITH c, seen + fresh AS seen, fresh AS frontier, rels",
            );
        }
        cypher.push_str(&format!(
            "
             UNWIND (CASE WHEN size(rels) = 0 THEN [null] ELSE rels END) AS r
             RETURN {center_type} AS center_type,
                    startNode(r).{id} AS src, endNode(r).{id} AS dst, type(r) AS edge_type,
                    {src_type} AS src_type, {dst_type} AS dst_type",
            center_type = type_of("c"),
            src_type = type_of("startNode(r)"),
            dst_type = type_of("endNode(r)"),
        ));

        let q = self
            .vertex_query(&cypher, vid)
            .param("limit", self.settings.bulk_edge_limit as i64);
        let rows = match self.rows(q, "bulk_subgraph").await {
            Ok(rows) => rows,
            Err(reason) => return QueryOutcome::failed(reason),
        };

        // The center comes first even when it has no edges at all.
        let center_type = rows.first().and_then(|row| nullable(row, "center_type"));
        let mut folded = RowFold::default();
        folded.vertex(vid, center_type);
        for row in &rows {
            folded.push(row);
        }
        let hood = folded.finish();
        let count = hood.edges.len();
        QueryOutcome::succeeded(hood, count)
    }

    async fn vertex_type(&self, vid: &VertexId) -> QueryOutcome<Option<String>> {
        let QuerySettings {
            id_property: id,
            vertex_label: label,
            ..
        } = self.settings.as_ref();
        let cypher = format!(
            "MATCH (v:{label} {{{id}: $vid}})
             RETURN {vertex_type} AS vertex_type LIMIT 1",
            vertex_type = type_of("v"),
        );

        match self.rows(self.vertex_query(&cypher, vid), "vertex_type").await {
            Ok(rows) => {
                let found = rows.first().and_then(|row| nullable(row, "vertex_type"));
                QueryOutcome::succeeded(found, rows.len())
            }
            Err(reason) => QueryOutcome::failed(reason),
        }
    }

    async fn fetch_properties(
        &self,
        label: &str,
        vids: &[VertexId],
        field: &str,
    ) -> QueryOutcome<HashMap<VertexId, f64>> {
        if vids.is_empty() {
            return QueryOutcome::succeeded(HashMap::new(), 0);
        }
        let (label, field) = match (cypher_identifier(label), cypher_identifier(field)) {
            (Ok(label), Ok(field)) => (label, field),
            (Err(e), _) | (_, Err(e)) => return QueryOutcome::failed(e.to_string()),
        };

        let id = &self.settings.id_property;
        let base = &self.settings.vertex_label;
        let cypher = format!(
            "MATCH (v:{base}:{label})
             WHERE v.{id} IN $ids
             RETURN v.{id} AS id, v.{field} AS value"
        );
        let ids: Vec<String> = vids.iter().map(|v| v.0.clone()).collect();
        let q = query(&cypher).param("ids", ids);

        match self.rows(q, "fetch_properties").await {
            Ok(rows) => {
                let count = rows.len();
                let mut values = HashMap::with_capacity(count);
                for row in &rows {
                    let Ok(vid) = row.get::<String>("id") else {
                        continue;
                    };
                    // Integer-typed properties are widened; nulls stay absent.
                    let value = row
                        .get::<f64>("value")
                        .ok()
                        .or_else(|| row.get::<i64>("value").ok().map(|v| v as f64));
                    if let Some(value) = value {
                        values.insert(VertexId(vid), value);
                    }
                }
                QueryOutcome::succeeded(values, count)
            }
            Err(reason) => QueryOutcome::failed(reason),
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────

/// Accept only `[A-Za-z_][A-Za-z0-9_]*`.
pub fn cypher_identifier(name: &str) -> Result<&str, GraphError> {
    let mut chars = name.chars();
    let valid_head = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if valid_head && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(name)
    } else {
        Err(GraphError::InvalidIdentifier(name.to_string()))
    }
}

fn row_to_edge(row: &Row) -> Option<EdgeTriple> {
    let src: String = row.get("src").ok()?;
    let dst: String = row.get("dst").ok()?;
    let edge_type: String = row.get("edge_type").unwrap_or_default();
    Some(EdgeTriple {
        src: VertexId(src),
        dst: VertexId(dst),
        edge_type,
    })
}

/// Cypher expression for the type of `node`: its first non-base label.
fn type_of(node: &str) -> String {
    format!("[l IN labels({node}) WHERE l <> $base][0]")
}

fn nullable(row: &Row, column: &str) -> Option<String> {
    row.get::<Option<String>>(column).ok().flatten()
}

/// Folds edge rows into a [`Neighborhood`], keeping each vertex and edge once.
#[derive(Default)]
struct RowFold {
    hood: Neighborhood,
    positions: HashMap<VertexId, usize>,
    edges: HashSet<EdgeTriple>,
}

impl RowFold {
    /// Record a vertex; a later type fills in a missing earlier one.
    fn vertex(&mut self, vid: &VertexId, label: Option<String>) {
        match self.positions.get(vid) {
            Some(&pos) => {
                if self.hood.vertices[pos].1.is_none() {
                    self.hood.vertices[pos].1 = label;
                }
            }
            None => {
                self.positions.insert(vid.clone(), self.hood.vertices.len());
                self.hood.vertices.push((vid.clone(), label));
            }
        }
    }

    fn push(&mut self, row: &Row) {
        let Some(edge) = row_to_edge(row) else {
            return;
        };
        self.vertex(&edge.src, nullable(row, "src_type"));
        self.vertex(&edge.dst, nullable(row, "dst_type"));
        if self.edges.insert(edge.clone()) {
            self.hood.edges.push(edge);
        }
    }

    fn finish(self) -> Neighborhood {
        self.hood
    }
}
