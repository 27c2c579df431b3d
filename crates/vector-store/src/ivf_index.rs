use crate::index::{IndexKind, Neighbor, NeighborIndex, TopK};
use crate::linalg::{argmin_l2, squared_l2};
use ndarray::{Array2, ArrayView2, Axis};

const KMEANS_ITERS: usize = 10;

/// Inverted-file index: vectors are bucketed under their nearest k-means
/// centroid and a query only scans the buckets nearest to it.
#[derive(Debug, Clone, PartialEq)]
pub struct IvfIndex {
    vectors: Array2<f32>,
    centroids: Array2<f32>,
    lists: Vec<Vec<usize>>,
    probes: usize,
}

impl IvfIndex {
    /// Cluster `vectors` into `lists` buckets. Both `lists` and `probes`
    /// are clamped to what the data can support.
    #[must_use]
    pub fn build(vectors: Array2<f32>, lists: usize, probes: usize) -> Self {
        let vectors = if vectors.is_standard_layout() {
            vectors
        } else {
            vectors.as_standard_layout().into_owned()
        };
        let lists = lists.clamp(1, vectors.nrows().max(1));
        let probes = probes.clamp(1, lists);

        let centroids = l2_kmeans(vectors.view(), lists, KMEANS_ITERS);
        let mut buckets = vec![Vec::new(); centroids.nrows()];
        for (position, row) in vectors.outer_iter().enumerate() {
            let Some(row) = row.to_slice() else {
                continue;
            };
            let list = argmin_l2(row, centroids.view()).unwrap_or(0);
            buckets[list].push(position);
        }

        log::debug!(
            "IVF built: {} vectors in {} lists (sizes {:?})",
            vectors.nrows(),
            buckets.len(),
            buckets.iter().map(Vec::len).collect::<Vec<_>>()
        );

        Self {
            vectors,
            centroids,
            lists: buckets,
            probes,
        }
    }

    /// Reassemble a persisted index, checking that every position is listed once.
    pub(crate) fn from_parts(
        vectors: Array2<f32>,
        centroids: Array2<f32>,
        lists: Vec<Vec<usize>>,
        probes: usize,
    ) -> std::result::Result<Self, String> {
        if centroids.nrows() != lists.len() {
            return Err(format!(
                "{} centroids for {} lists",
                centroids.nrows(),
                lists.len()
            ));
        }
        if centroids.ncols() != vectors.ncols() {
            return Err(format!(
                "centroid dimension {} differs from vector dimension {}",
                centroids.ncols(),
                vectors.ncols()
            ));
        }
        if probes == 0 || probes > lists.len() {
            return Err(format!("probes {probes} out of range for {} lists", lists.len()));
        }
        let mut seen = vec![false; vectors.nrows()];
        for position in lists.iter().flatten() {
            match seen.get_mut(*position) {
                Some(slot) if !*slot => *slot = true,
                Some(_) => return Err(format!("position {position} listed twice")),
                None => return Err(format!("position {position} out of range")),
            }
        }
        if let Some(missing) = seen.iter().position(|s| !s) {
            return Err(format!("position {missing} not assigned to any list"));
        }
        Ok(Self {
            vectors,
            centroids,
            lists,
            probes,
        })
    }

    #[must_use]
    pub fn kind(&self) -> IndexKind {
        IndexKind::Ivf {
            lists: self.lists.len(),
            probes: self.probes,
        }
    }

    #[must_use]
    pub fn vectors(&self) -> ArrayView2<'_, f32> {
        self.vectors.view()
    }

    #[must_use]
    pub fn centroids(&self) -> ArrayView2<'_, f32> {
        self.centroids.view()
    }

    #[must_use]
    pub fn lists(&self) -> &[Vec<usize>] {
        &self.lists
    }

    #[must_use]
    pub const fn probes(&self) -> usize {
        self.probes
    }

    #[must_use]
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        if position >= self.vectors.nrows() {
            return None;
        }
        self.vectors.row(position).to_slice()
    }

    /// Lists to scan: the `probes` nearest, widened until they hold `wanted` vectors.
    fn probe_order(&self, query: &[f32], wanted: usize) -> Vec<usize> {
        let mut ranked: Vec<Neighbor> = self
            .centroids
            .outer_iter()
            .enumerate()
            .filter_map(|(list, row)| {
                row.to_slice().map(|row| Neighbor {
                    position: list,
                    distance: squared_l2(query, row),
                })
            })
            .collect();
        ranked.sort();

        let mut chosen = Vec::with_capacity(self.probes);
        let mut available = 0usize;
        for candidate in ranked {
            if chosen.len() >= self.probes && available >= wanted {
                break;
            }
            available += self.lists[candidate.position].len();
            chosen.push(candidate.position);
        }
        chosen
    }
}

impl NeighborIndex for IvfIndex {
    fn dimension(&self) -> usize {
        self.vectors.ncols()
    }

    fn len(&self) -> usize {
        self.vectors.nrows()
    }

    fn search(&self, query: &[f32], k: usize) -> Vec<Neighbor> {
        let wanted = k.min(self.len());
        let mut top = TopK::new(wanted);
        for list in self.probe_order(query, wanted) {
            for &position in &self.lists[list] {
                let Some(row) = self.vector(position) else {
                    continue;
                };
                top.push(Neighbor {
                    position,
                    distance: squared_l2(query, row),
                });
            }
        }
        top.into_sorted()
    }
}

/// Lloyd's k-means seeded from evenly spaced rows. Deterministic for a given input.
fn l2_kmeans(vectors: ArrayView2<'_, f32>, k: usize, iters: usize) -> Array2<f32> {
    let count = vectors.nrows();
    let dim = vectors.ncols();
    if count == 0 || k == 0 {
        return Array2::zeros((1, dim));
    }

    let seeds: Vec<usize> = (0..k).map(|i| i * count / k).collect();
    let mut centroids = vectors.select(Axis(0), &seeds);

    let mut assign = vec![0usize; count];
    for _ in 0..iters.max(1) {
        let mut changed = false;
        for (i, row) in vectors.outer_iter().enumerate() {
            let Some(row) = row.to_slice() else {
                continue;
            };
            let cid = argmin_l2(row, centroids.view()).unwrap_or(0);
            if assign[i] != cid {
                assign[i] = cid;
                changed = true;
            }
        }

        let mut sums = Array2::<f32>::zeros((k, dim));
        let mut sizes = vec![0usize; k];
        for (i, row) in vectors.outer_iter().enumerate() {
            let mut sum = sums.row_mut(assign[i]);
            sum += &row;
            sizes[assign[i]] += 1;
        }
        for (cid, size) in sizes.iter().enumerate() {
            if *size == 0 {
                continue;
            }
            let mean = sums.row(cid).mapv(|v| v / *size as f32);
            centroids.row_mut(cid).assign(&mean);
        }

        if !changed {
            break;
        }
    }

    centroids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flat_index::FlatIndex;
    use ndarray::array;

    fn grid() -> Array2<f32> {
        let mut rows = Vec::new();
        for x in 0..6 {
            for y in 0..6 {
                let offset = if x < 3 { 0.0 } else { 100.0 };
                rows.push([x as f32 + offset, y as f32]);
            }
        }
        Array2::from_shape_vec((rows.len(), 2), rows.concat()).unwrap()
    }

    #[test]
    fn full_probe_matches_flat_search() {
        let vectors = grid();
        let flat = FlatIndex::from_matrix(vectors.clone());
        let ivf = IvfIndex::build(vectors, 4, 4);

        for query in [[0.0f32, 0.0], [101.5, 2.5], [50.0, 3.0]] {
            assert_eq!(ivf.search(&query, 7), flat.search(&query, 7));
        }
    }

    #[test]
    fn single_probe_widens_to_fill_k() {
        let vectors = grid();
        let ivf = IvfIndex::build(vectors, 6, 1);
        let results = ivf.search(&[0.0, 0.0], 36);
        assert_eq!(results.len(), 36);
    }

    #[test]
    fn lists_are_clamped_to_vector_count() {
        let ivf = IvfIndex::build(array![[0.0f32, 0.0], [1.0, 1.0]], 16, 8);
        assert_eq!(ivf.kind(), IndexKind::Ivf { lists: 2, probes: 2 });
        assert_eq!(ivf.lists().iter().map(Vec::len).sum::<usize>(), 2);
    }

    #[test]
    fn clusters_separate_distant_groups() {
        let ivf = IvfIndex::build(grid(), 2, 1);
        let left = ivf.search(&[1.0, 1.0], 1);
        assert_eq!(left[0].position, 7);
        assert_eq!(left[0].distance, 0.0);
    }

    #[test]
    fn from_parts_rejects_duplicate_positions() {
        let vectors = array![[0.0f32], [1.0]];
        let centroids = array![[0.5f32]];
        let err = IvfIndex::from_parts(vectors, centroids, vec![vec![0, 0]], 1).unwrap_err();
        assert!(err.contains("listed twice"), "{err}");
    }
}
