//! Capability traits for the remote graph.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use linkhop_core::{EdgeTriple, VertexId, UNKNOWN_TYPE};

use crate::client::GraphError;

/// Success or failure of a single remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryStatus {
    Succeeded,
    Failed(String),
}

/// What every capability returns: a status, the row count, and the data.
///
/// A failed call carries empty data, so callers can always consume `data`.
#[derive(Debug, Clone)]
pub struct QueryOutcome<T> {
    pub status: QueryStatus,
    pub rows: usize,
    pub data: T,
}

impl<T> QueryOutcome<T> {
    pub fn succeeded(data: T, rows: usize) -> Self {
        Self {
            status: QueryStatus::Succeeded,
            rows,
            data,
        }
    }

    pub fn is_succeeded(&self) -> bool {
        self.status == QueryStatus::Succeeded
    }

    /// Failure reason, if the call failed.
    pub fn failure(&self) -> Option<&str> {
        match &self.status {
            QueryStatus::Succeeded => None,
            QueryStatus::Failed(reason) => Some(reason),
        }
    }
}

impl<T: Default> QueryOutcome<T> {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            status: QueryStatus::Failed(reason.into()),
            rows: 0,
            data: T::default(),
        }
    }
}

/// Edges from one expansion request, plus the type the remote reported for
/// each vertex it saw (`None` when the row carried no type).
#[derive(Debug, Clone, Default)]
pub struct Neighborhood {
    pub vertices: Vec<(VertexId, Option<String>)>,
    pub edges: Vec<EdgeTriple>,
}

impl Neighborhood {
    /// Reported types, skipping vertices without one.
    pub fn types(&self) -> HashMap<VertexId, String> {
        self.vertices
            .iter()
            .filter_map(|(vid, label)| Some((vid.clone(), label.clone()?)))
            .collect()
    }
}

/// Merged result of a batched property fetch.
#[derive(Debug, Clone, Default)]
pub struct BatchedProperties {
    pub values: HashMap<VertexId, f64>,
    pub batches: usize,
    pub failed_batches: usize,
}

/// One checked-out connection to the remote graph.
///
/// Implementations release their connection when dropped.
#[async_trait]
pub trait GraphSession: Send + Sync {
    /// Edges whose source is reachable from `vid` by an outgoing walk of
    /// exactly `hop - 1` steps, with the types of their endpoints.
    async fn expand_hop(&self, vid: &VertexId, hop: usize) -> QueryOutcome<Neighborhood>;

    /// Every edge within `hops` undirected steps of `vid`, in one request.
    /// The center is always listed first among the vertices.
    async fn bulk_subgraph(&self, vid: &VertexId, hops: usize) -> QueryOutcome<Neighborhood>;

    /// Type label of a vertex. Used for vertices no expansion row typed.
    async fn vertex_type(&self, vid: &VertexId) -> QueryOutcome<Option<String>>;

    /// Numeric property `field` for vertices of type `label`.
    async fn fetch_properties(
        &self,
        label: &str,
        vids: &[VertexId],
        field: &str,
    ) -> QueryOutcome<HashMap<VertexId, f64>>;

    /// Fetch `field` for every typed vertex, `batch_size` vertices per request.
    ///
    /// Vertices grouped under `unknown` are skipped. A failed batch leaves
    /// its vertices without values and is counted in `failed_batches`.
    async fn fetch_properties_batched(
        &self,
        groups: &BTreeMap<String, Vec<VertexId>>,
        field: &str,
        batch_size: usize,
    ) -> BatchedProperties {
        let batch_size = batch_size.max(1);
        let mut merged = BatchedProperties::default();

        for (label, vids) in groups {
            if label == UNKNOWN_TYPE {
                continue;
            }
            for chunk in vids.chunks(batch_size) {
                merged.batches += 1;
                let outcome = self.fetch_properties(label, chunk, field).await;
                if let Some(reason) = outcome.failure() {
                    merged.failed_batches += 1;
                    tracing::warn!(
                        label = %label,
                        field,
                        batch = chunk.len(),
                        reason,
                        "Property fetch failed"
                    );
                    continue;
                }
                tracing::debug!(label = %label, field, rows = outcome.rows, "Fetched property batch");
                merged.values.extend(outcome.data);
            }
        }

        merged
    }
}

/// Something that can hand out [`GraphSession`]s.
///
/// Clone is expected to be cheap; sources are shared between samplers.
#[async_trait]
pub trait GraphSource: Clone + Send + Sync + 'static {
    type Session: GraphSession;

    /// Check out a session, waiting a bounded time for a free connection.
    async fn session(&self) -> Result<Self::Session, GraphError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Session that records property batches and fails the labels it is told to.
    struct RecordingSession {
        failing_label: Option<String>,
        calls: Mutex<Vec<(String, usize)>>,
    }

    #[async_trait]
    impl GraphSession for RecordingSession {
        async fn expand_hop(&self, _vid: &VertexId, _hop: usize) -> QueryOutcome<Neighborhood> {
            QueryOutcome::succeeded(Neighborhood::default(), 0)
        }

        async fn bulk_subgraph(&self, _vid: &VertexId, _hops: usize) -> QueryOutcome<Neighborhood> {
            QueryOutcome::succeeded(Neighborhood::default(), 0)
        }

        async fn vertex_type(&self, _vid: &VertexId) -> QueryOutcome<Option<String>> {
            QueryOutcome::succeeded(None, 0)
        }

        async fn fetch_properties(
            &self,
            label: &str,
            vids: &[VertexId],
            _field: &str,
        ) -> QueryOutcome<HashMap<VertexId, f64>> {
            self.calls.lock().unwrap().push((label.to_string(), vids.len()));
            if self.failing_label.as_deref() == Some(label) {
                return QueryOutcome::failed("boom");
            }
            let values: HashMap<VertexId, f64> = vids.iter().map(|v| (v.clone(), 1.0)).collect();
            let rows = values.len();
            QueryOutcome::succeeded(values, rows)
        }
    }

    fn vids(prefix: &str, n: usize) -> Vec<VertexId> {
        (0..n).map(|i| VertexId::new(format!("{prefix}{i}"))).collect()
    }

    #[test]
    fn test_failed_outcome_has_empty_data() {
        let outcome: QueryOutcome<Neighborhood> = QueryOutcome::failed("timeout");
        assert!(!outcome.is_succeeded());
        assert_eq!(outcome.failure(), Some("timeout"));
        assert_eq!(outcome.rows, 0);
        assert!(outcome.data.edges.is_empty());
    }

    #[test]
    fn test_neighborhood_types_skip_untyped() {
        let hood = Neighborhood {
            vertices: vec![
                (VertexId::from("player0"), Some("player".to_string())),
                (VertexId::from("x"), None),
            ],
            edges: vec![EdgeTriple::new("player0", "x", "follow")],
        };
        let types = hood.types();
        assert_eq!(types.len(), 1);
        assert_eq!(types.get("player0").map(String::as_str), Some("player"));
    }

    #[tokio::test]
    async fn test_batched_fetch_splits_groups() {
        let session = RecordingSession {
            failing_label: None,
            calls: Mutex::new(Vec::new()),
        };
        let mut groups = BTreeMap::new();
        groups.insert("player".to_string(), vids("player", 250));
        groups.insert("team".to_string(), vids("team", 3));

        let merged = session.fetch_properties_batched(&groups, "embedding1", 100).await;

        assert_eq!(merged.batches, 4);
        assert_eq!(merged.failed_batches, 0);
        assert_eq!(merged.values.len(), 253);
        let calls = session.calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![
                ("player".to_string(), 100),
                ("player".to_string(), 100),
                ("player".to_string(), 50),
                ("team".to_string(), 3),
            ]
        );
    }

    #[tokio::test]
    async fn test_batched_fetch_skips_unknown_and_tolerates_failures() {
        let session = RecordingSession {
            failing_label: Some("team".to_string()),
            calls: Mutex::new(Vec::new()),
        };
        let mut groups = BTreeMap::new();
        groups.insert("player".to_string(), vids("player", 2));
        groups.insert("team".to_string(), vids("team", 2));
        groups.insert(UNKNOWN_TYPE.to_string(), vids("mystery", 5));

        let merged = session.fetch_properties_batched(&groups, "embedding1", 100).await;

        assert_eq!(merged.batches, 2);
        assert_eq!(merged.failed_batches, 1);
        assert_eq!(merged.values.len(), 2);
        assert!(merged.values.contains_key("player0"));
        assert!(!merged.values.contains_key("team0"));
    }
}
