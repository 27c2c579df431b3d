use crate::error::{Result, VectorStoreError};
use crate::types::EmbeddedRecord;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const METADATA_SCHEMA_VERSION: u32 = 1;

/// Parallel id/text sequences; entry `i` describes index position `i`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataStore {
    ids: Vec<String>,
    texts: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedMetadata {
    schema_version: u32,
    ids: Vec<String>,
    texts: Vec<String>,
}

impl MetadataStore {
    #[must_use]
    pub const fn new(ids: Vec<String>, texts: Vec<String>) -> Self {
        Self { ids, texts }
    }

    #[must_use]
    pub fn from_records(records: &[EmbeddedRecord]) -> Self {
        let (ids, texts) = records
            .iter()
            .map(|r| (r.id.clone(), r.text.clone()))
            .unzip();
        Self { ids, texts }
    }

    #[must_use]
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    #[must_use]
    pub fn texts(&self) -> &[String] {
        &self.texts
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Id and text stored for `position`
    #[must_use]
    pub fn get(&self, position: usize) -> Option<(&str, &str)> {
        let id = self.ids.get(position)?;
        let text = self.texts.get(position)?;
        Some((id.as_str(), text.as_str()))
    }

    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>> {
        let persisted = PersistedMetadata {
            schema_version: METADATA_SCHEMA_VERSION,
            ids: self.ids.clone(),
            texts: self.texts.clone(),
        };
        Ok(serde_json::to_vec_pretty(&persisted)?)
    }

    pub(crate) fn from_bytes(path: &Path, bytes: &[u8]) -> Result<Self> {
        let persisted: PersistedMetadata = serde_json::from_slice(bytes)
            .map_err(|e| VectorStoreError::corrupt(path, e.to_string()))?;
        if persisted.schema_version != METADATA_SCHEMA_VERSION {
            return Err(VectorStoreError::corrupt(
                path,
                format!(
                    "unsupported metadata schema_version {} (expected {METADATA_SCHEMA_VERSION})",
                    persisted.schema_version
                ),
            ));
        }
        Ok(Self {
            ids: persisted.ids,
            texts: persisted.texts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn preserves_record_order() {
        let records = vec![
            EmbeddedRecord::new("c", "third", vec![1.0]),
            EmbeddedRecord::new("a", "first", vec![2.0]),
        ];
        let store = MetadataStore::from_records(&records);
        assert_eq!(store.ids(), &["c".to_string(), "a".to_string()]);
        assert_eq!(store.get(1), Some(("a", "first")));
        assert_eq!(store.get(2), None);
    }

    #[test]
    fn bytes_roundtrip_and_schema_check() {
        let store = MetadataStore::new(vec!["1:1".into()], vec!["Welcome".into()]);
        let bytes = store.to_bytes().unwrap();
        let loaded = MetadataStore::from_bytes(Path::new("m.json"), &bytes).unwrap();
        assert_eq!(loaded, store);

        let future = br#"{"schema_version": 9, "ids": [], "texts": []}"#;
        let err = MetadataStore::from_bytes(Path::new("m.json"), future).unwrap_err();
        assert!(matches!(err, VectorStoreError::CorruptFile { .. }));
    }
}
