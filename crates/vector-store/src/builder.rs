use crate::batch::stack_embeddings;
use crate::error::{Result, VectorStoreError};
use crate::flat_index::FlatIndex;
use crate::index::{IndexKind, VectorIndex};
use crate::ivf_index::IvfIndex;
use crate::manifest::StoreManifest;
use crate::metadata::MetadataStore;
use crate::paths::StorePaths;
use crate::store::IndexedStore;
use crate::types::EmbeddedRecord;

/// Turns embedded records into an [`IndexedStore`].
///
/// Records keep their input order: the record at input position `i` becomes
/// index position `i` and metadata entry `i`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexBuilder {
    kind: IndexKind,
}

impl IndexBuilder {
    pub fn new(kind: IndexKind) -> Result<Self> {
        if let IndexKind::Ivf { lists, probes } = kind {
            if lists == 0 || probes == 0 {
                return Err(VectorStoreError::validation(format!(
                    "ivf needs lists >= 1 and probes >= 1 (got lists={lists}, probes={probes})"
                )));
            }
        }
        Ok(Self { kind })
    }

    #[must_use]
    pub const fn flat() -> Self {
        Self {
            kind: IndexKind::Flat,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> IndexKind {
        self.kind
    }

    pub fn build(&self, records: &[EmbeddedRecord]) -> Result<IndexedStore> {
        let vectors = stack_embeddings(records)?;
        let (count, dim) = vectors.dim();

        let index = match self.kind {
            IndexKind::Flat => VectorIndex::Flat(FlatIndex::from_matrix(vectors)),
            IndexKind::Ivf { lists, probes } => {
                VectorIndex::Ivf(IvfIndex::build(vectors, lists, probes))
            }
        };
        let store = IndexedStore::new(index, MetadataStore::from_records(records))?;

        log::info!(
            "Built {} index over {count} vectors (dim {dim})",
            store.kind()
        );
        Ok(store)
    }

    /// Build and commit both files in one step.
    pub async fn build_and_persist(
        &self,
        records: &[EmbeddedRecord],
        paths: &StorePaths,
    ) -> Result<(IndexedStore, StoreManifest)> {
        let store = self.build(records)?;
        let manifest = store.persist(paths).await?;
        Ok((store, manifest))
    }
}
