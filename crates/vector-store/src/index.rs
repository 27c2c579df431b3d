use crate::flat_index::FlatIndex;
use crate::ivf_index::IvfIndex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;

/// Which nearest-neighbor structure backs an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IndexKind {
    /// Exhaustive scan; exact results.
    #[default]
    Flat,
    /// Inverted file over k-means lists; approximate for `probes < lists`.
    Ivf { lists: usize, probes: usize },
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flat => f.write_str("flat"),
            Self::Ivf { lists, probes } => write!(f, "ivf(lists={lists}, probes={probes})"),
        }
    }
}

/// A stored vector's position and its squared L2 distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub position: usize,
    pub distance: f32,
}

impl Eq for Neighbor {}

impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Neighbor {
    // Nearer first, then lower position.
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.position.cmp(&other.position))
    }
}

/// Search contract shared by every index strategy.
pub trait NeighborIndex {
    fn dimension(&self) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `min(k, len)` nearest stored vectors, nearest first, ties broken
    /// by ascending position. `query` must already match `dimension()`.
    fn search(&self, query: &[f32], k: usize) -> Vec<Neighbor>;
}

/// Bounded selection of the k best neighbors.
pub(crate) struct TopK {
    k: usize,
    heap: BinaryHeap<Neighbor>,
}

impl TopK {
    pub(crate) fn new(k: usize) -> Self {
        Self {
            k,
            heap: BinaryHeap::with_capacity(k.saturating_add(1)),
        }
    }

    pub(crate) fn push(&mut self, candidate: Neighbor) {
        if self.k == 0 {
            return;
        }
        if self.heap.len() < self.k {
            self.heap.push(candidate);
            return;
        }
        // Max-heap: the root is the current worst kept neighbor.
        if let Some(worst) = self.heap.peek() {
            if candidate < *worst {
                self.heap.pop();
                self.heap.push(candidate);
            }
        }
    }

    pub(crate) fn into_sorted(self) -> Vec<Neighbor> {
        self.heap.into_sorted_vec()
    }
}

/// The index built by [`crate::IndexBuilder`] and loaded by [`crate::IndexedStore`].
#[derive(Debug, Clone, PartialEq)]
pub enum VectorIndex {
    Flat(FlatIndex),
    Ivf(IvfIndex),
}

impl VectorIndex {
    #[must_use]
    pub fn kind(&self) -> IndexKind {
        match self {
            Self::Flat(_) => IndexKind::Flat,
            Self::Ivf(ivf) => ivf.kind(),
        }
    }

    /// Stored vector at `position`
    #[must_use]
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        match self {
            Self::Flat(flat) => flat.vector(position),
            Self::Ivf(ivf) => ivf.vector(position),
        }
    }
}

impl NeighborIndex for VectorIndex {
    fn dimension(&self) -> usize {
        match self {
            Self::Flat(flat) => flat.dimension(),
            Self::Ivf(ivf) => ivf.dimension(),
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::Flat(flat) => flat.len(),
            Self::Ivf(ivf) => ivf.len(),
        }
    }

    fn search(&self, query: &[f32], k: usize) -> Vec<Neighbor> {
        match self {
            Self::Flat(flat) => flat.search(query, k),
            Self::Ivf(ivf) => ivf.search(query, k),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(position: usize, distance: f32) -> Neighbor {
        Neighbor { position, distance }
    }

    #[test]
    fn top_k_keeps_nearest_with_position_tiebreak() {
        let mut top = TopK::new(3);
        for candidate in [n(4, 2.0), n(0, 5.0), n(3, 1.0), n(1, 2.0), n(2, 2.0)] {
            top.push(candidate);
        }
        assert_eq!(top.into_sorted(), vec![n(3, 1.0), n(1, 2.0), n(2, 2.0)]);
    }

    #[test]
    fn top_k_with_fewer_candidates_returns_all() {
        let mut top = TopK::new(10);
        top.push(n(1, 0.5));
        top.push(n(0, 0.5));
        assert_eq!(top.into_sorted(), vec![n(0, 0.5), n(1, 0.5)]);
    }

    #[test]
    fn kind_serializes_with_tag() {
        let json = serde_json::to_string(&IndexKind::Ivf {
            lists: 4,
            probes: 2,
        })
        .unwrap();
        assert_eq!(json, r#"{"kind":"ivf","lists":4,"probes":2}"#);
        let flat: IndexKind = serde_json::from_str(r#"{"kind":"flat"}"#).unwrap();
        assert_eq!(flat, IndexKind::Flat);
    }
}
