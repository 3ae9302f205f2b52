//! Adjacency view over a sampled subgraph.
//!
//! Converts the flattened `(src, dst)` edge index into per-node neighbor
//! lists for traversal. Built on demand; the subgraph stays the owner of
//! the data.

use linkhop_core::{Subgraph, VertexId};

/// Outgoing neighbor lists indexed by dense node index.
#[derive(Debug, Clone, Default)]
pub struct SubgraphAdjacency {
    /// `adjacency[i]` = destinations of edges leaving node `i`, in edge-index order.
    pub adjacency: Vec<Vec<usize>>,
    edge_count: usize,
}

impl SubgraphAdjacency {
    /// Build from a subgraph's flattened edge index.
    ///
    /// Pairs that reference an index outside the subgraph are skipped.
    pub fn from_subgraph(subgraph: &Subgraph) -> Self {
        Self::from_edges(subgraph.num_nodes(), &subgraph.edge_index)
    }

    pub fn from_edges(node_count: usize, edges: &[(usize, usize)]) -> Self {
        let mut adjacency = vec![Vec::new(); node_count];
        let mut edge_count = 0;
        for &(src, dst) in edges {
            if src < node_count && dst < node_count {
                adjacency[src].push(dst);
                edge_count += 1;
            }
        }
        Self {
            adjacency,
            edge_count,
        }
    }

    pub fn neighbors(&self, idx: usize) -> &[usize] {
        self.adjacency.get(idx).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Number of edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }
}

/// Translate an index path back to vertex ids.
pub(crate) fn to_vertex_path(subgraph: &Subgraph, indices: &[usize]) -> Vec<VertexId> {
    indices
        .iter()
        .filter_map(|&i| subgraph.vertex_at(i).cloned())
        .collect()
}
