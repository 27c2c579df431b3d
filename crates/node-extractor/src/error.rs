use std::path::PathBuf;
use thiserror::Error;

/// Result type for extraction operations
pub type Result<T> = std::result::Result<T, ExtractorError>;

/// Errors that can occur while extracting text nodes
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// The document is not valid JSON
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Reading or writing a file failed
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A matching node lacks a required field
    #[error("Node at {node_path} is missing required field '{field}'")]
    MissingField { field: String, node_path: String },

    /// Document nesting exceeds the configured limit
    #[error("Document nesting exceeds max_depth {max_depth}")]
    TooDeep { max_depth: usize },
}

impl ExtractorError {
    /// Wrap an IO error with the path that produced it
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
