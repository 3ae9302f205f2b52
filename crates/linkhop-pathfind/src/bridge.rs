//! Stitching paths across two independently sampled neighborhoods.
//!
//! When the second entity is outside the first entity's neighborhood, its
//! own (shallower) neighborhood is sampled and the vertices both share are
//! used as bridges: paths entity A -> bridge are searched in A's subgraph,
//! bridge -> entity B in B's subgraph, and each pair is joined at the bridge.

use linkhop_core::{Path, Subgraph, VertexId};

use crate::algorithms::{search_indices, PathSearch, DEFAULT_MAX_PATHS, SHORT_PATH_REVISIT_LIMIT};
use crate::graph::{to_vertex_path, SubgraphAdjacency};

/// Limits for one bridge search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeSearch {
    /// Hop budget of each leg.
    pub leg_hops: usize,
    pub max_bridge_nodes: usize,
    pub paths_per_leg: usize,
    pub max_paths: usize,
    pub revisit_threshold: usize,
}

impl BridgeSearch {
    /// Defaults for an overall hop budget of `max_hops`; each leg gets half.
    pub fn new(max_hops: usize) -> Self {
        Self {
            leg_hops: max_hops / 2,
            max_bridge_nodes: 3,
            paths_per_leg: 2,
            max_paths: DEFAULT_MAX_PATHS,
            revisit_threshold: SHORT_PATH_REVISIT_LIMIT,
        }
    }

    fn leg_search(&self) -> PathSearch {
        PathSearch::new(self.leg_hops).with_revisit_threshold(self.revisit_threshold)
    }
}

/// Vertices present in both subgraphs, ordered by their index in `a`.
pub fn bridge_nodes(a: &Subgraph, b: &Subgraph) -> Vec<VertexId> {
    a.idx_to_vid
        .iter()
        .filter(|vid| b.contains(vid.as_str()))
        .cloned()
        .collect()
}

/// Join A -> bridge and bridge -> B paths through the first bridges.
///
/// Each joined path drops the duplicated bridge vertex. At most
/// `paths_per_leg` paths per leg are combined and the result is capped at
/// `max_paths`.
pub fn stitch_paths(
    subgraph_a: &Subgraph,
    subgraph_b: &Subgraph,
    entity_a: &str,
    entity_b: &str,
    bridges: &[VertexId],
    search: &BridgeSearch,
) -> Vec<Path> {
    let (Some(a_idx), Some(b_idx)) = (subgraph_a.index_of(entity_a), subgraph_b.index_of(entity_b))
    else {
        return Vec::new();
    };

    let graph_a = SubgraphAdjacency::from_subgraph(subgraph_a);
    let graph_b = SubgraphAdjacency::from_subgraph(subgraph_b);
    let leg = search.leg_search();
    let mut stitched = Vec::new();

    for bridge in bridges.iter().take(search.max_bridge_nodes) {
        let (Some(bridge_in_a), Some(bridge_in_b)) = (
            subgraph_a.index_of(bridge.as_str()),
            subgraph_b.index_of(bridge.as_str()),
        ) else {
            continue;
        };

        let to_bridge = search_indices(&graph_a, a_idx, bridge_in_a, &leg);
        let from_bridge = search_indices(&graph_b, bridge_in_b, b_idx, &leg);
        tracing::debug!(
            bridge = %bridge,
            to_bridge = to_bridge.len(),
            from_bridge = from_bridge.len(),
            "Searched bridge legs"
        );

        for first in to_bridge.iter().take(search.paths_per_leg) {
            for second in from_bridge.iter().take(search.paths_per_leg) {
                let mut path = to_vertex_path(subgraph_a, first);
                path.extend(to_vertex_path(subgraph_b, &second[1..]));
                stitched.push(path);
            }
        }
    }

    stitched.truncate(search.max_paths);
    stitched
}
