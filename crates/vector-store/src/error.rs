use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, VectorStoreError>;

#[derive(Error, Debug)]
pub enum VectorStoreError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Inconsistent store at {}: {detail}", path.display())]
    InconsistentStore { path: PathBuf, detail: String },

    #[error("Dimension mismatch: index has dimension {expected}, query has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt file {}: {detail}", path.display())]
    CorruptFile { path: PathBuf, detail: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Extractor error: {0}")]
    Extractor(#[from] figvec_node_extractor::ExtractorError),

    #[error("{0}")]
    Other(String),
}

impl VectorStoreError {
    /// Wrap an IO error with its path; a missing file becomes `NotFound`.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound { path }
        } else {
            Self::Io { path, source }
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn inconsistent(path: impl AsRef<Path>, detail: impl Into<String>) -> Self {
        Self::InconsistentStore {
            path: path.as_ref().to_path_buf(),
            detail: detail.into(),
        }
    }

    pub fn corrupt(path: impl AsRef<Path>, detail: impl Into<String>) -> Self {
        Self::CorruptFile {
            path: path.as_ref().to_path_buf(),
            detail: detail.into(),
        }
    }
}
