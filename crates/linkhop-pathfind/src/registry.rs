//! Dense index assignment for one sampling call.

use std::collections::HashMap;

use linkhop_core::VertexId;

/// Bijection between vertex ids and dense indices `0..size()`.
///
/// Indices are handed out in first-seen order and never removed. A registry
/// belongs to a single sampling call and is consumed into the resulting
/// subgraph when the call finishes.
#[derive(Debug, Default)]
pub struct IdRegistry {
    vid_to_idx: HashMap<VertexId, usize>,
    idx_to_vid: Vec<VertexId>,
}

impl IdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `vid`, assigning the next free index if it is new.
    pub fn get_or_create_index(&mut self, vid: &VertexId) -> usize {
        if let Some(&idx) = self.vid_to_idx.get(vid) {
            return idx;
        }
        let idx = self.idx_to_vid.len();
        self.vid_to_idx.insert(vid.clone(), idx);
        self.idx_to_vid.push(vid.clone());
        idx
    }

    pub fn index_of(&self, vid: &str) -> Option<usize> {
        self.vid_to_idx.get(vid).copied()
    }

    pub fn index_to_vid(&self, idx: usize) -> Option<&VertexId> {
        self.idx_to_vid.get(idx)
    }

    pub fn contains(&self, vid: &str) -> bool {
        self.vid_to_idx.contains_key(vid)
    }

    pub fn size(&self) -> usize {
        self.idx_to_vid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.idx_to_vid.is_empty()
    }

    /// Vertex ids in index order.
    pub fn vertices(&self) -> &[VertexId] {
        &self.idx_to_vid
    }

    pub fn into_parts(self) -> (HashMap<VertexId, usize>, Vec<VertexId>) {
        (self.vid_to_idx, self.idx_to_vid)
    }
}
