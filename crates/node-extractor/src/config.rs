use crate::error::{ExtractorError, Result};
use serde::{Deserialize, Serialize};

/// Node type exported for text-bearing shapes
pub const DEFAULT_NODE_TYPE: &str = "SHAPE_WITH_TEXT";

/// Configuration for text node extraction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Value of the `type` field a node must carry to be extracted
    pub node_type: String,

    /// Field holding the node's text content
    pub text_field: String,

    /// Top-level field holding the document tree
    pub root_field: String,

    /// Trim surrounding whitespace before the emptiness check
    pub trim_text: bool,

    /// Maximum nesting depth before extraction fails
    pub max_depth: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            node_type: DEFAULT_NODE_TYPE.to_string(),
            text_field: "characters".to_string(),
            root_field: "document".to_string(),
            trim_text: true,
            max_depth: 1024,
        }
    }
}

impl ExtractorConfig {
    /// Extract nodes of another type with the default field layout
    #[must_use]
    pub fn for_node_type(node_type: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            ..Default::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.node_type.trim().is_empty() {
            return Err(ExtractorError::invalid_config("node_type must not be empty"));
        }
        if self.text_field.trim().is_empty() {
            return Err(ExtractorError::invalid_config("text_field must not be empty"));
        }
        if self.root_field.trim().is_empty() {
            return Err(ExtractorError::invalid_config("root_field must not be empty"));
        }
        if self.max_depth == 0 {
            return Err(ExtractorError::invalid_config("max_depth must be > 0"));
        }
        Ok(())
    }
}
