use crate::config::ExtractorConfig;
use crate::error::{ExtractorError, Result};
use crate::types::TextNode;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

/// Walks a design-document tree and collects text nodes of one type
pub struct NodeExtractor {
    config: ExtractorConfig,
}

struct Pending<'a> {
    node: &'a Value,
    depth: usize,
    path: String,
}

impl NodeExtractor {
    /// Create a new extractor with the given configuration
    pub fn new(config: ExtractorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub const fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extract nodes from a JSON file on disk
    pub fn extract_file(&self, path: impl AsRef<Path>) -> Result<Vec<TextNode>> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ExtractorError::io(path, e))?;
        log::debug!("Read {} bytes from {}", raw.len(), path.display());
        self.extract_str(&raw)
    }

    /// Extract nodes from a JSON string.
    ///
    /// Nesting is bounded only by `max_depth`; the parser grows its stack on
    /// the heap instead of applying serde_json's fixed recursion limit.
    pub fn extract_str(&self, raw: &str) -> Result<Vec<TextNode>> {
        let root = parse_document(raw)?;
        self.extract_value(&root)
    }

    /// Extract nodes from an already parsed document.
    ///
    /// Nodes are returned in depth-first pre-order with children visited in
    /// array order. A document without the root field yields no nodes.
    pub fn extract_value(&self, root: &Value) -> Result<Vec<TextNode>> {
        let Some(document) = root.get(&self.config.root_field) else {
            log::warn!(
                "Document has no '{}' field; nothing to extract",
                self.config.root_field
            );
            return Ok(Vec::new());
        };

        let mut out = Vec::new();
        let mut stack = vec![Pending {
            node: document,
            depth: 0,
            path: self.config.root_field.clone(),
        }];

        while let Some(Pending { node, depth, path }) = stack.pop() {
            if depth > self.config.max_depth {
                return Err(ExtractorError::TooDeep {
                    max_depth: self.config.max_depth,
                });
            }

            if let Some(text_node) = self.match_node(node, &path)? {
                out.push(text_node);
            }

            if let Some(children) = node.get("children").and_then(Value::as_array) {
                for (idx, child) in children.iter().enumerate().rev() {
                    stack.push(Pending {
                        node: child,
                        depth: depth + 1,
                        path: format!("{path}/children[{idx}]"),
                    });
                }
            }
        }

        log::info!(
            "Extracted {} '{}' nodes",
            out.len(),
            self.config.node_type
        );
        Ok(out)
    }

    fn match_node(&self, node: &Value, path: &str) -> Result<Option<TextNode>> {
        if node.get("type").and_then(Value::as_str) != Some(self.config.node_type.as_str()) {
            return Ok(None);
        }

        let raw_text = node
            .get(&self.config.text_field)
            .and_then(Value::as_str)
            .unwrap_or("");
        let text = if self.config.trim_text {
            raw_text.trim()
        } else {
            raw_text
        };
        if text.is_empty() {
            return Ok(None);
        }

        let id = node
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| ExtractorError::MissingField {
                field: "id".to_string(),
                node_path: path.to_string(),
            })?;
        let name = node.get("name").and_then(Value::as_str).unwrap_or("");

        Ok(Some(TextNode::new(id, name, text)))
    }
}

fn parse_document(raw: &str) -> Result<Value> {
    let mut de = serde_json::Deserializer::from_str(raw);
    de.disable_recursion_limit();
    let root = Value::deserialize(serde_stacker::Deserializer::new(&mut de))?;
    de.end()?;
    Ok(root)
}

/// Write nodes as pretty JSON, replacing the target atomically
pub fn write_nodes(path: impl AsRef<Path>, nodes: &[TextNode]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ExtractorError::io(parent, e))?;
    }
    let bytes = serde_json::to_vec_pretty(nodes)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, bytes).map_err(|e| ExtractorError::io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| ExtractorError::io(path, e))?;
    Ok(())
}

/// Read nodes previously written by [`write_nodes`]
pub fn read_nodes(path: impl AsRef<Path>) -> Result<Vec<TextNode>> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| ExtractorError::io(path, e))?;
    Ok(serde_json::from_slice(&bytes)?)
}
