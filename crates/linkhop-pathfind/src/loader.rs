//! Dense tensors for an embedding consumer.

use serde::{Deserialize, Serialize};

use linkhop_core::{Subgraph, VertexId};

use crate::store::{StoreError, TensorStore, ALL_EDGES, NODE_GROUP};

/// Node type codes used in [`GraphTensors::node_type`].
pub const PLAYER_TYPE_CODE: i64 = 0;
pub const TEAM_TYPE_CODE: i64 = 1;
pub const OTHER_TYPE_CODE: i64 = 2;

/// One subgraph in the layout a graph embedding model expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphTensors {
    /// One scalar feature per node index.
    pub x: Vec<f32>,
    /// COO edge index: sources in row 0, destinations in row 1.
    pub edge_index: [Vec<i64>; 2],
    pub node_type: Vec<i64>,
    pub center_index: usize,
    /// Vertex id of each node index.
    pub node_ids: Vec<VertexId>,
}

impl GraphTensors {
    pub fn num_nodes(&self) -> usize {
        self.x.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edge_index[0].len()
    }
}

pub fn type_code(label: &str) -> i64 {
    match label {
        "player" => PLAYER_TYPE_CODE,
        "team" => TEAM_TYPE_CODE,
        _ => OTHER_TYPE_CODE,
    }
}

/// Read features and edges for `subgraph` through `store`.
///
/// The store is expected to hold `node/<field>` for every node index and
/// the merged edge index; a shorter feature tensor is an error.
pub async fn load_tensors<T: TensorStore + ?Sized>(
    store: &T,
    subgraph: &Subgraph,
    field: &str,
) -> Result<GraphTensors, StoreError> {
    let num_nodes = subgraph.num_nodes();
    let indices: Vec<usize> = (0..num_nodes).collect();
    let x = store.get_tensor(NODE_GROUP, field, Some(&indices)).await?;

    let pairs = store.get_edge_index(ALL_EDGES, None).await?;
    let mut sources = Vec::with_capacity(pairs.len());
    let mut destinations = Vec::with_capacity(pairs.len());
    for (src, dst) in pairs {
        sources.push(src as i64);
        destinations.push(dst as i64);
    }

    let node_type = subgraph
        .idx_to_vid
        .iter()
        .map(|vid| type_code(subgraph.node_type(vid.as_str())))
        .collect();

    tracing::debug!(nodes = num_nodes, edges = sources.len(), field, "Loaded graph tensors");

    Ok(GraphTensors {
        x,
        edge_index: [sources, destinations],
        node_type,
        center_index: subgraph.center_index,
        node_ids: subgraph.idx_to_vid.clone(),
    })
}
