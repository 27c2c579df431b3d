use crate::batch::{ensure_aligned, ensure_k, ensure_query};
use crate::codec::decode_index;
use crate::commit::commit_pair;
use crate::error::{Result, VectorStoreError};
use crate::index::{IndexKind, NeighborIndex, VectorIndex};
use crate::manifest::{sha256_hex, StoreManifest};
use crate::metadata::MetadataStore;
use crate::paths::StorePaths;
use crate::types::SearchHit;
use std::path::Path;

/// A vector index together with its position-aligned metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedStore {
    index: VectorIndex,
    metadata: MetadataStore,
}

impl IndexedStore {
    /// Pair an index with metadata, rejecting any count mismatch.
    pub fn new(index: VectorIndex, metadata: MetadataStore) -> Result<Self> {
        ensure_aligned(index.len(), &metadata, Path::new("<memory>"))?;
        Ok(Self { index, metadata })
    }

    #[must_use]
    pub const fn index(&self) -> &VectorIndex {
        &self.index
    }

    #[must_use]
    pub const fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    #[must_use]
    pub fn kind(&self) -> IndexKind {
        self.index.kind()
    }

    /// Top-`k` records nearest to `query`, joined back to their ids and texts.
    pub fn search_vector(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        ensure_k(k)?;
        ensure_query(query, self.dimension())?;

        self.index
            .search(query, k)
            .into_iter()
            .map(|neighbor| {
                let (id, text) = self.metadata.get(neighbor.position).ok_or_else(|| {
                    VectorStoreError::Other(format!(
                        "index returned position {} with no metadata",
                        neighbor.position
                    ))
                })?;
                Ok(SearchHit {
                    id: id.to_string(),
                    distance: neighbor.distance,
                    text: text.to_string(),
                })
            })
            .collect()
    }

    /// Persist both files as one commit.
    pub async fn persist(&self, paths: &StorePaths) -> Result<StoreManifest> {
        commit_pair(paths, &self.index, &self.metadata).await
    }

    /// Load a committed pair and verify it against its manifest.
    pub async fn open(paths: &StorePaths) -> Result<Self> {
        let index_bytes = read_file(paths.index()).await?;
        let metadata_bytes = read_file(paths.metadata()).await?;
        let manifest_path = paths.manifest();
        let manifest = StoreManifest::read(&manifest_path)
            .await?
            .ok_or_else(|| VectorStoreError::NotFound {
                path: manifest_path.clone(),
            })?;

        let index = decode_index(paths.index(), &index_bytes)?;
        let metadata = MetadataStore::from_bytes(paths.metadata(), &metadata_bytes)?;
        ensure_aligned(index.len(), &metadata, paths.metadata())?;

        if manifest.count != index.len() || manifest.dimension != index.dimension() {
            return Err(VectorStoreError::inconsistent(
                &manifest_path,
                format!(
                    "manifest records {} vectors of dimension {}, index holds {} of dimension {}",
                    manifest.count,
                    manifest.dimension,
                    index.len(),
                    index.dimension()
                ),
            ));
        }
        if sha256_hex(&index_bytes) != manifest.index_sha256 {
            return Err(VectorStoreError::inconsistent(
                paths.index(),
                format!(
                    "index file does not match generation {} checksum",
                    manifest.generation
                ),
            ));
        }
        if sha256_hex(&metadata_bytes) != manifest.metadata_sha256 {
            return Err(VectorStoreError::inconsistent(
                paths.metadata(),
                format!(
                    "metadata file does not match generation {} checksum",
                    manifest.generation
                ),
            ));
        }

        log::info!(
            "Loaded generation {} ({} vectors, dim {}, {}) from {}",
            manifest.generation,
            index.len(),
            index.dimension(),
            index.kind(),
            paths.index().display()
        );
        Ok(Self { index, metadata })
    }
}

async fn read_file(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .map_err(|e| VectorStoreError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flat_index::FlatIndex;
    use ndarray::array;
    use tempfile::TempDir;

    fn sample() -> IndexedStore {
        IndexedStore::new(
            VectorIndex::Flat(FlatIndex::from_matrix(array![
                [0.0f32, 0.0],
                [1.0, 0.0],
                [5.0, 5.0]
            ])),
            MetadataStore::new(
                vec!["a".into(), "b".into(), "c".into()],
                vec!["alpha".into(), "beta".into(), "gamma".into()],
            ),
        )
        .unwrap()
    }

    #[test]
    fn misaligned_pair_is_refused() {
        let err = IndexedStore::new(
            VectorIndex::Flat(FlatIndex::from_matrix(array![[0.0f32]])),
            MetadataStore::default(),
        )
        .unwrap_err();
        assert!(matches!(err, VectorStoreError::InconsistentStore { .. }));
    }

    #[test]
    fn zero_k_is_a_validation_error() {
        assert!(matches!(
            sample().search_vector(&[0.0, 0.0], 0),
            Err(VectorStoreError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn generation_increments_per_commit() {
        let tmp = TempDir::new().unwrap();
        let paths = StorePaths::in_dir(tmp.path());
        let store = sample();

        assert_eq!(store.persist(&paths).await.unwrap().generation, 1);
        assert_eq!(store.persist(&paths).await.unwrap().generation, 2);
        assert!(!crate::paths::staging_path(paths.index()).exists());
    }

    #[tokio::test]
    async fn missing_manifest_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let paths = StorePaths::in_dir(tmp.path());
        sample().persist(&paths).await.unwrap();
        std::fs::remove_file(paths.manifest()).unwrap();

        let err = IndexedStore::open(&paths).await.unwrap_err();
        match err {
            VectorStoreError::NotFound { path } => assert_eq!(path, paths.manifest()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn swapped_index_from_another_build_is_detected() {
        let tmp = TempDir::new().unwrap();
        let paths = StorePaths::in_dir(tmp.path());
        sample().persist(&paths).await.unwrap();

        let other = IndexedStore::new(
            VectorIndex::Flat(FlatIndex::from_matrix(array![
                [9.0f32, 9.0],
                [8.0, 8.0],
                [7.0, 7.0]
            ])),
            sample().metadata().clone(),
        )
        .unwrap();
        let other_dir = TempDir::new().unwrap();
        let other_paths = StorePaths::in_dir(other_dir.path());
        other.persist(&other_paths).await.unwrap();
        std::fs::copy(other_paths.index(), paths.index()).unwrap();

        let err = IndexedStore::open(&paths).await.unwrap_err();
        assert!(matches!(err, VectorStoreError::InconsistentStore { .. }));
    }
}
