//! Tensor and edge-index store facade.
//!
//! Embedding consumers read node features and edge indices by dense node
//! index through [`TensorStore`], without knowing where a subgraph came
//! from. [`InMemoryStore`] is a memory-only cache seeded from one sampled
//! subgraph; writes never reach the remote graph.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use linkhop_core::Subgraph;

/// Group under which per-node features are stored.
pub const NODE_GROUP: &str = "node";

/// Edge type key holding the merged edge index of every type.
pub const ALL_EDGES: &str = "*";

/// Largest length an indexed write may grow a tensor to.
pub const MAX_TENSOR_LEN: usize = 1 << 24;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Not found: {key}")]
    NotFound { key: String },

    #[error("Index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Address of one stored tensor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TensorAttr {
    pub group: String,
    pub field: String,
}

impl TensorAttr {
    pub fn new(group: &str, field: &str) -> Self {
        Self {
            group: group.to_string(),
            field: field.to_string(),
        }
    }

    fn key(&self) -> String {
        format!("{}/{}", self.group, self.field)
    }
}

/// Everything a store currently holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreAttrs {
    pub tensors: Vec<TensorAttr>,
    pub edge_types: Vec<String>,
}

/// Keep pairs whose source is in the first set and destination in the second.
pub type EdgeFilter<'a> = (&'a [usize], &'a [usize]);

/// Uniform access to node feature tensors and edge indices.
#[async_trait]
pub trait TensorStore: Send + Sync {
    /// Values of `group/field`, all of them or only at `indices` (in that order).
    async fn get_tensor(
        &self,
        group: &str,
        field: &str,
        indices: Option<&[usize]>,
    ) -> Result<Vec<f32>, StoreError>;

    /// Replace `group/field`, or write `values` at `indices`.
    ///
    /// Indexed writes grow the tensor, filling new slots with `0.0`, up to
    /// [`MAX_TENSOR_LEN`]; a larger index is rejected before anything is written.
    async fn put_tensor(
        &self,
        group: &str,
        field: &str,
        values: &[f32],
        indices: Option<&[usize]>,
    ) -> Result<(), StoreError>;

    /// Returns whether the tensor existed.
    async fn remove_tensor(&self, group: &str, field: &str) -> Result<bool, StoreError>;

    async fn tensor_size(&self, group: &str, field: &str) -> Result<usize, StoreError>;

    async fn get_edge_index(
        &self,
        edge_type: &str,
        filter: Option<EdgeFilter<'_>>,
    ) -> Result<Vec<(usize, usize)>, StoreError>;

    async fn put_edge_index(
        &self,
        edge_type: &str,
        pairs: &[(usize, usize)],
    ) -> Result<(), StoreError>;

    /// Returns whether the edge index existed.
    async fn remove_edge_index(&self, edge_type: &str) -> Result<bool, StoreError>;

    async fn list_attrs(&self) -> StoreAttrs;
}

/// Memory-only [`TensorStore`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tensors: Arc<RwLock<HashMap<TensorAttr, Vec<f32>>>>,
    edges: Arc<RwLock<BTreeMap<String, Vec<(usize, usize)>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from a subgraph: `node/<feature_field>` in index order, one edge
    /// index per edge type, and the merged index under [`ALL_EDGES`].
    pub fn from_subgraph(subgraph: &Subgraph, feature_field: &str) -> Self {
        let features: Vec<f32> = subgraph
            .idx_to_vid
            .iter()
            .map(|vid| subgraph.feature(vid.as_str()))
            .collect();

        let mut tensors = HashMap::new();
        tensors.insert(TensorAttr::new(NODE_GROUP, feature_field), features);

        let mut edges = subgraph.edges_by_type.clone();
        edges.insert(ALL_EDGES.to_string(), subgraph.edge_index.clone());

        Self {
            tensors: Arc::new(RwLock::new(tensors)),
            edges: Arc::new(RwLock::new(edges)),
        }
    }
}

#[async_trait]
impl TensorStore for InMemoryStore {
    async fn get_tensor(
        &self,
        group: &str,
        field: &str,
        indices: Option<&[usize]>,
    ) -> Result<Vec<f32>, StoreError> {
        let attr = TensorAttr::new(group, field);
        let tensors = self.tensors.read().await;
        let values = tensors
            .get(&attr)
            .ok_or_else(|| StoreError::NotFound { key: attr.key() })?;

        match indices {
            None => Ok(values.clone()),
            Some(indices) => indices
                .iter()
                .map(|&i| {
                    values.get(i).copied().ok_or(StoreError::IndexOutOfRange {
                        index: i,
                        len: values.len(),
                    })
                })
                .collect(),
        }
    }

    async fn put_tensor(
        &self,
        group: &str,
        field: &str,
        values: &[f32],
        indices: Option<&[usize]>,
    ) -> Result<(), StoreError> {
        let attr = TensorAttr::new(group, field);
        let mut tensors = self.tensors.write().await;

        let Some(indices) = indices else {
            tensors.insert(attr, values.to_vec());
            return Ok(());
        };
        if indices.len() != values.len() {
            return Err(StoreError::LengthMismatch {
                expected: indices.len(),
                actual: values.len(),
            });
        }

        let current = tensors.get(&attr).map_or(0, Vec::len);
        let limit = current.max(MAX_TENSOR_LEN);
        if let Some(&index) = indices.iter().find(|&&i| i >= limit) {
            return Err(StoreError::IndexOutOfRange { index, len: limit });
        }

        let tensor = tensors.entry(attr).or_default();
        if let Some(&max) = indices.iter().max() {
            if max >= tensor.len() {
                tensor.resize(max + 1, 0.0);
            }
        }
        for (&i, &value) in indices.iter().zip(values) {
            tensor[i] = value;
        }
        Ok(())
    }

    async fn remove_tensor(&self, group: &str, field: &str) -> Result<bool, StoreError> {
        let attr = TensorAttr::new(group, field);
        Ok(self.tensors.write().await.remove(&attr).is_some())
    }

    async fn tensor_size(&self, group: &str, field: &str) -> Result<usize, StoreError> {
        let attr = TensorAttr::new(group, field);
        self.tensors
            .read()
            .await
            .get(&attr)
            .map(Vec::len)
            .ok_or_else(|| StoreError::NotFound { key: attr.key() })
    }

    async fn get_edge_index(
        &self,
        edge_type: &str,
        filter: Option<EdgeFilter<'_>>,
    ) -> Result<Vec<(usize, usize)>, StoreError> {
        let edges = self.edges.read().await;
        let pairs = edges.get(edge_type).ok_or_else(|| StoreError::NotFound {
            key: edge_type.to_string(),
        })?;

        let Some((sources, destinations)) = filter else {
            return Ok(pairs.clone());
        };
        let sources: HashSet<usize> = sources.iter().copied().collect();
        let destinations: HashSet<usize> = destinations.iter().copied().collect();
        Ok(pairs
            .iter()
            .filter(|(s, d)| sources.contains(s) && destinations.contains(d))
            .copied()
            .collect())
    }

    async fn put_edge_index(
        &self,
        edge_type: &str,
        pairs: &[(usize, usize)],
    ) -> Result<(), StoreError> {
        self.edges
            .write()
            .await
            .insert(edge_type.to_string(), pairs.to_vec());
        Ok(())
    }

    async fn remove_edge_index(&self, edge_type: &str) -> Result<bool, StoreError> {
        Ok(self.edges.write().await.remove(edge_type).is_some())
    }

    async fn list_attrs(&self) -> StoreAttrs {
        let mut tensors: Vec<TensorAttr> = self.tensors.read().await.keys().cloned().collect();
        tensors.sort();
        let edge_types = self.edges.read().await.keys().cloned().collect();
        StoreAttrs {
            tensors,
            edge_types,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkhop_core::VertexId;

    fn sampled() -> Subgraph {
        let mut sg = Subgraph::default();
        for (i, id) in ["player0", "player1", "team0"].iter().enumerate() {
            let vid = VertexId::from(*id);
            sg.vid_to_idx.insert(vid.clone(), i);
            sg.idx_to_vid.push(vid.clone());
            sg.node_features.insert(vid, i as f32 * 0.5);
        }
        sg.edges_by_type
            .insert("follow".to_string(), vec![(0, 1), (1, 0)]);
        sg.edges_by_type
            .insert("serve".to_string(), vec![(1, 2), (2, 1)]);
        sg.edge_index = sg.edges_by_type.values().flatten().copied().collect();
        sg
    }

    #[tokio::test]
    async fn test_seeded_from_subgraph() {
        let store = InMemoryStore::from_subgraph(&sampled(), "embedding1");
        let attrs = store.list_attrs().await;
        assert_eq!(attrs.tensors, vec![TensorAttr::new(NODE_GROUP, "embedding1")]);
        assert_eq!(attrs.edge_types, vec!["*", "follow", "serve"]);

        let all = store.get_tensor(NODE_GROUP, "embedding1", None).await.unwrap();
        assert_eq!(all, vec![0.0, 0.5, 1.0]);
        assert_eq!(store.get_edge_index(ALL_EDGES, None).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_indexed_get_preserves_order() {
        let store = InMemoryStore::from_subgraph(&sampled(), "embedding1");
        let picked = store
            .get_tensor(NODE_GROUP, "embedding1", Some(&[2, 0]))
            .await
            .unwrap();
        assert_eq!(picked, vec![1.0, 0.0]);
    }

    #[tokio::test]
    async fn test_index_out_of_range() {
        let store = InMemoryStore::from_subgraph(&sampled(), "embedding1");
        let err = store
            .get_tensor(NODE_GROUP, "embedding1", Some(&[5]))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::IndexOutOfRange { index: 5, len: 3 });
    }

    #[tokio::test]
    async fn test_missing_entries_not_found() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.get_tensor(NODE_GROUP, "embedding1", None).await,
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.get_edge_index("follow", None).await,
            Err(StoreError::NotFound { .. })
        ));
        assert!(!store.remove_tensor(NODE_GROUP, "embedding1").await.unwrap());
    }

    #[tokio::test]
    async fn test_partial_put_grows_with_zeros() {
        let store = InMemoryStore::new();
        store
            .put_tensor(NODE_GROUP, "score", &[1.5, 2.5], Some(&[1, 3]))
            .await
            .unwrap();
        assert_eq!(
            store.get_tensor(NODE_GROUP, "score", None).await.unwrap(),
            vec![0.0, 1.5, 0.0, 2.5]
        );
        assert_eq!(store.tensor_size(NODE_GROUP, "score").await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_partial_put_rejects_huge_index() {
        let store = InMemoryStore::from_subgraph(&sampled(), "embedding1");
        for index in [usize::MAX, 1 << 40, MAX_TENSOR_LEN] {
            let err = store
                .put_tensor(NODE_GROUP, "embedding1", &[1.0], Some(&[index]))
                .await
                .unwrap_err();
            assert_eq!(
                err,
                StoreError::IndexOutOfRange {
                    index,
                    len: MAX_TENSOR_LEN
                }
            );
        }
        // Nothing was written, not even to a tensor that did not exist yet.
        assert_eq!(store.tensor_size(NODE_GROUP, "embedding1").await.unwrap(), 3);
        assert!(store
            .put_tensor(NODE_GROUP, "fresh", &[1.0], Some(&[usize::MAX]))
            .await
            .is_err());
        assert!(matches!(
            store.tensor_size(NODE_GROUP, "fresh").await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_partial_put_length_mismatch() {
        let store = InMemoryStore::new();
        let err = store
            .put_tensor(NODE_GROUP, "score", &[1.0], Some(&[0, 1]))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::LengthMismatch {
                expected: 2,
                actual: 1
            }
        );
    }

    #[tokio::test]
    async fn test_full_put_replaces_and_remove_deletes() {
        let store = InMemoryStore::from_subgraph(&sampled(), "embedding1");
        store
            .put_tensor(NODE_GROUP, "embedding1", &[9.0], None)
            .await
            .unwrap();
        assert_eq!(store.tensor_size(NODE_GROUP, "embedding1").await.unwrap(), 1);
        assert!(store.remove_tensor(NODE_GROUP, "embedding1").await.unwrap());
        assert!(store.list_attrs().await.tensors.is_empty());
    }

    #[tokio::test]
    async fn test_edge_filter_by_source_and_destination() {
        let store = InMemoryStore::from_subgraph(&sampled(), "embedding1");
        let filtered = store
            .get_edge_index(ALL_EDGES, Some((&[1], &[0, 2])))
            .await
            .unwrap();
        assert_eq!(filtered, vec![(1, 0), (1, 2)]);
    }

    #[tokio::test]
    async fn test_edge_put_and_remove() {
        let store = InMemoryStore::new();
        store.put_edge_index("rival", &[(0, 1)]).await.unwrap();
        assert_eq!(
            store.get_edge_index("rival", None).await.unwrap(),
            vec![(0, 1)]
        );
        assert!(store.remove_edge_index("rival").await.unwrap());
        assert!(!store.remove_edge_index("rival").await.unwrap());
    }

    #[tokio::test]
    async fn test_clones_share_the_cache() {
        let store = InMemoryStore::new();
        let other = store.clone();
        store.put_tensor(NODE_GROUP, "x", &[1.0], None).await.unwrap();
        assert_eq!(other.tensor_size(NODE_GROUP, "x").await.unwrap(), 1);
    }
}
