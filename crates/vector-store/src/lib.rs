//! # Figvec Vector Store
//!
//! Embedding, exact nearest-neighbor indexing and persisted search for text
//! pulled out of design documents.
//!
//! ## Features
//!
//! - **Pluggable embedders** behind the [`Embedder`] trait (ONNX or stub)
//! - **Exact search** via a flat L2 index, with an optional IVF partition
//! - **Aligned persistence**: index file + metadata file committed together
//! - **Deterministic ordering**: ties resolve by ascending position
//!
//! ## Architecture
//!
//! ```text
//! TextNode[]
//!     │
//!     ├──> Embedder (ONNX / stub)
//!     │      └─> EmbeddedRecord { id, text, embedding }
//!     │
//!     ├──> IndexBuilder
//!     │      ├─> VectorIndex (flat | ivf)   position i
//!     │      └─> MetadataStore             position i
//!     │
//!     └──> commit (index, metadata, manifest)
//!            └─> IndexSearcher: query -> embed -> top-k -> SearchHit[]
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use figvec_vector_store::{
//!     EmbeddingModel, IndexBuilder, IndexSearcher, StorePaths, load_embedded_records,
//! };
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> figvec_vector_store::Result<()> {
//!     let records = load_embedded_records(Path::new("data/embedded_nodes.json")).await?;
//!     let paths = StorePaths::default();
//!     IndexBuilder::flat().build_and_persist(&records, &paths).await?;
//!
//!     let searcher = IndexSearcher::open(&paths, EmbeddingModel::stub()).await?;
//!     for hit in searcher.search("sign up button", 5).await? {
//!         println!("{} [{:.4}] {}", hit.id, hit.distance, hit.text);
//!     }
//!     Ok(())
//! }
//! ```

mod batch;
mod builder;
mod codec;
mod commit;
mod embeddings;
mod error;
mod flat_index;
mod index;
mod ivf_index;
mod linalg;
mod manifest;
mod metadata;
#[cfg(feature = "onnx")]
mod onnx;
mod paths;
mod records;
mod searcher;
mod store;
mod store_lock;
mod types;

pub use builder::IndexBuilder;
pub use embeddings::{
    embed_nodes, embed_one, Embedder, EmbeddingConfig, EmbeddingMode, EmbeddingModel,
    DEFAULT_BATCH_SIZE, DEFAULT_MODEL_ID,
};
pub use error::{Result, VectorStoreError};
pub use flat_index::FlatIndex;
pub use index::{IndexKind, Neighbor, NeighborIndex, VectorIndex};
pub use ivf_index::IvfIndex;
pub use manifest::StoreManifest;
pub use metadata::MetadataStore;
pub use paths::{StorePaths, DEFAULT_DATA_DIR, DEFAULT_INDEX_FILE_NAME, DEFAULT_METADATA_FILE_NAME};
pub use records::{load_embedded_records, write_embedded_records};
pub use searcher::IndexSearcher;
pub use store::IndexedStore;
pub use types::{EmbeddedRecord, SearchHit};

// Re-export extractor types for convenience
pub use figvec_node_extractor::TextNode;
