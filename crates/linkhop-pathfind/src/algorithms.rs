//! Breadth-first path search inside a sampled subgraph.
//!
//! The search is deliberately not a simple-path enumeration. Paths of up to
//! [`SHORT_PATH_REVISIT_LIMIT`] vertices expand every neighbor, visited or
//! not, and mark nothing. Longer paths skip visited vertices and mark each
//! vertex they expand to. This surfaces near-direct cross links that a strict
//! global-visited BFS would drop, while keeping deeper branching bounded.

use std::collections::VecDeque;

use linkhop_core::{Path, Subgraph};

use crate::graph::{to_vertex_path, SubgraphAdjacency};

/// Paths with at most this many vertices may revisit vertices.
pub const SHORT_PATH_REVISIT_LIMIT: usize = 2;

/// Default cap on paths returned by one search.
pub const DEFAULT_MAX_PATHS: usize = 5;

/// Parameters of one path search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathSearch {
    /// Paths longer than `max_hops + 1` vertices are discarded.
    pub max_hops: usize,
    pub max_paths: usize,
    pub revisit_threshold: usize,
}

impl PathSearch {
    pub fn new(max_hops: usize) -> Self {
        Self {
            max_hops,
            max_paths: DEFAULT_MAX_PATHS,
            revisit_threshold: SHORT_PATH_REVISIT_LIMIT,
        }
    }

    pub fn with_max_paths(mut self, max_paths: usize) -> Self {
        self.max_paths = max_paths;
        self
    }

    pub fn with_revisit_threshold(mut self, revisit_threshold: usize) -> Self {
        self.revisit_threshold = revisit_threshold;
        self
    }

    fn max_path_len(&self) -> usize {
        self.max_hops.saturating_add(1)
    }
}

/// How a path expands its neighbors, keyed on its current length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expansion {
    /// Expand every neighbor; mark nothing.
    Lenient,
    /// Skip visited neighbors; mark every neighbor expanded to.
    Marking,
}

impl Expansion {
    fn for_path_len(len: usize, revisit_threshold: usize) -> Self {
        if len <= revisit_threshold {
            Self::Lenient
        } else {
            Self::Marking
        }
    }
}

/// Find up to five paths from `start` to `end` with at most `max_hops` edges.
///
/// Returns an empty list when either vertex is not in the subgraph.
pub fn find_paths(subgraph: &Subgraph, start: &str, end: &str, max_hops: usize) -> Vec<Path> {
    find_paths_with(subgraph, start, end, &PathSearch::new(max_hops))
}

pub fn find_paths_with(
    subgraph: &Subgraph,
    start: &str,
    end: &str,
    search: &PathSearch,
) -> Vec<Path> {
    let (Some(start_idx), Some(end_idx)) = (subgraph.index_of(start), subgraph.index_of(end))
    else {
        return Vec::new();
    };
    let graph = SubgraphAdjacency::from_subgraph(subgraph);
    search_indices(&graph, start_idx, end_idx, search)
        .iter()
        .map(|indices| to_vertex_path(subgraph, indices))
        .collect()
}

/// BFS over node indices. Paths are returned in the order they complete.
pub fn search_indices(
    graph: &SubgraphAdjacency,
    start: usize,
    end: usize,
    search: &PathSearch,
) -> Vec<Vec<usize>> {
    let node_count = graph.node_count();
    if start >= node_count || end >= node_count {
        return Vec::new();
    }

    let max_len = search.max_path_len();
    let mut visited = vec![false; node_count];
    visited[start] = true;

    let mut queue: VecDeque<(usize, Vec<usize>)> = VecDeque::new();
    queue.push_back((start, vec![start]));
    let mut found = Vec::new();

    while let Some((node, path)) = queue.pop_front() {
        if found.len() >= search.max_paths {
            break;
        }
        if node == end {
            found.push(path);
            continue;
        }

        let expansion = Expansion::for_path_len(path.len(), search.revisit_threshold);
        for &next in graph.neighbors(node) {
            if expansion == Expansion::Marking {
                if visited[next] {
                    continue;
                }
                visited[next] = true;
            }
            // Over-long continuations still count as visited above.
            if path.len() + 1 > max_len {
                continue;
            }
            let mut extended = path.clone();
            extended.push(next);
            queue.push_back((next, extended));
        }
    }

    found
}
