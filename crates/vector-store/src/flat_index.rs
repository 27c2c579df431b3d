use crate::index::{Neighbor, NeighborIndex, TopK};
use crate::linalg::squared_l2;
use ndarray::{Array2, ArrayView2};

/// Exact index: every stored vector is scanned for each query.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    vectors: Array2<f32>,
}

impl FlatIndex {
    /// Wrap a `(count, dim)` matrix; row `i` becomes position `i`.
    #[must_use]
    pub fn from_matrix(vectors: Array2<f32>) -> Self {
        let vectors = if vectors.is_standard_layout() {
            vectors
        } else {
            vectors.as_standard_layout().into_owned()
        };
        Self { vectors }
    }

    #[must_use]
    pub fn vectors(&self) -> ArrayView2<'_, f32> {
        self.vectors.view()
    }

    #[must_use]
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        if position >= self.vectors.nrows() {
            return None;
        }
        self.vectors.row(position).to_slice()
    }
}

impl NeighborIndex for FlatIndex {
    fn dimension(&self) -> usize {
        self.vectors.ncols()
    }

    fn len(&self) -> usize {
        self.vectors.nrows()
    }

    fn search(&self, query: &[f32], k: usize) -> Vec<Neighbor> {
        let mut top = TopK::new(k.min(self.len()));
        for (position, row) in self.vectors.outer_iter().enumerate() {
            let Some(row) = row.to_slice() else {
                continue;
            };
            top.push(Neighbor {
                position,
                distance: squared_l2(query, row),
            });
        }
        top.into_sorted()
    }
}
