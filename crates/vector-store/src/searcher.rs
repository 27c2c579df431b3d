use crate::embeddings::{embed_one, Embedder};
use crate::error::{Result, VectorStoreError};
use crate::paths::StorePaths;
use crate::store::IndexedStore;
use crate::types::SearchHit;

/// Answers free-text queries against a loaded store.
pub struct IndexSearcher<E: Embedder> {
    store: IndexedStore,
    embedder: E,
}

impl<E: Embedder> IndexSearcher<E> {
    /// Load the committed pair at `paths` and pair it with `embedder`.
    pub async fn open(paths: &StorePaths, embedder: E) -> Result<Self> {
        let store = IndexedStore::open(paths).await?;
        Self::from_store(store, embedder)
    }

    /// Wrap an in-memory store; the embedder must produce vectors of the
    /// store's dimension.
    pub fn from_store(store: IndexedStore, embedder: E) -> Result<Self> {
        if embedder.dimension() != store.dimension() {
            return Err(VectorStoreError::DimensionMismatch {
                expected: store.dimension(),
                actual: embedder.dimension(),
            });
        }
        Ok(Self { store, embedder })
    }

    #[must_use]
    pub const fn store(&self) -> &IndexedStore {
        &self.store
    }

    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        let vector = embed_one(&self.embedder, query).await?;
        let hits = self.store.search_vector(&vector, k)?;
        log::debug!(
            "Query {query:?} returned {} of {} records",
            hits.len(),
            self.store.len()
        );
        Ok(hits)
    }
}
