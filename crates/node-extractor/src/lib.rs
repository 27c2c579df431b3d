//! # Figvec Node Extractor
//!
//! Pulls labeled text out of design-tool document exports.
//!
//! ## Architecture
//!
//! ```text
//! Document JSON
//!     │
//!     ├──> root field ("document")
//!     │
//!     ├──> Depth-first walk over `children`
//!     │    └─> keep nodes whose `type` matches (SHAPE_WITH_TEXT)
//!     │
//!     └──> TextNode[] { id, name, text }
//! ```
//!
//! ## Example
//!
//! ```rust
//! use figvec_node_extractor::{ExtractorConfig, NodeExtractor};
//!
//! let extractor = NodeExtractor::new(ExtractorConfig::default()).unwrap();
//! let doc = r#"{"document": {"children": [
//!     {"id": "1:2", "name": "CTA", "type": "SHAPE_WITH_TEXT", "characters": " Sign up "}
//! ]}}"#;
//!
//! let nodes = extractor.extract_str(doc).unwrap();
//! assert_eq!(nodes[0].text, "Sign up");
//! ```

mod config;
mod error;
mod extractor;
mod types;

pub use config::{ExtractorConfig, DEFAULT_NODE_TYPE};
pub use error::{ExtractorError, Result};
pub use extractor::{read_nodes, write_nodes, NodeExtractor};
pub use types::TextNode;
