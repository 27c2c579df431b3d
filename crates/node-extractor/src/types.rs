use serde::{Deserialize, Serialize};

/// A text-bearing node pulled out of a design document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextNode {
    /// Node id as exported by the design tool
    pub id: String,

    /// Layer name (empty when the export carries none)
    #[serde(default)]
    pub name: String,

    /// Text content
    pub text: String,
}

impl TextNode {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            text: text.into(),
        }
    }
}
