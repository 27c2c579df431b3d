use figvec_node_extractor::TextNode;
use serde::{Deserialize, Serialize};

/// One unit of indexable content: a text and the vector that represents it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddedRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub text: String,
    pub embedding: Vec<f32>,
}

impl EmbeddedRecord {
    #[must_use]
    pub fn new(id: impl Into<String>, text: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            text: text.into(),
            embedding,
        }
    }

    #[must_use]
    pub fn from_node(node: TextNode, embedding: Vec<f32>) -> Self {
        Self {
            id: node.id,
            name: node.name,
            text: node.text,
            embedding,
        }
    }
}

/// A ranked search result joined back to its metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub id: String,
    /// Squared L2 distance; lower is more similar.
    pub distance: f32,
    pub text: String,
}
