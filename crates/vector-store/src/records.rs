use crate::error::{Result, VectorStoreError};
use crate::types::EmbeddedRecord;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct RawRecord {
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    text: Option<String>,
    #[serde(default)]
    embedding: Option<Vec<f32>>,
}

/// Load an embedded-records file.
///
/// Key presence is checked here so a malformed record is rejected with its
/// position rather than surfacing later as a vector-construction failure.
/// Embedding shape is left to the builder.
pub async fn load_embedded_records(path: impl AsRef<Path>) -> Result<Vec<EmbeddedRecord>> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| VectorStoreError::io(path, e))?;
    let raw: Vec<RawRecord> = serde_json::from_slice(&bytes).map_err(|e| {
        VectorStoreError::validation(format!("{}: not a record array: {e}", path.display()))
    })?;

    let mut records = Vec::with_capacity(raw.len());
    for (idx, item) in raw.into_iter().enumerate() {
        let id = item.id.ok_or_else(|| {
            VectorStoreError::validation(format!("{}: record {idx} has no 'id'", path.display()))
        })?;
        let text = item.text.ok_or_else(|| {
            VectorStoreError::validation(format!(
                "{}: record {idx} ('{id}') has no 'text'",
                path.display()
            ))
        })?;
        records.push(EmbeddedRecord {
            id,
            name: item.name.unwrap_or_default(),
            text,
            embedding: item.embedding.unwrap_or_default(),
        });
    }

    log::info!("Loaded {} embedded records from {}", records.len(), path.display());
    Ok(records)
}

/// Write embedded records as pretty JSON via a temp file and rename.
pub async fn write_embedded_records(
    path: impl AsRef<Path>,
    records: &[EmbeddedRecord],
) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| VectorStoreError::io(parent, e))?;
    }
    let bytes = serde_json::to_vec_pretty(records)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes)
        .await
        .map_err(|e| VectorStoreError::io(&tmp, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| VectorStoreError::io(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_text_is_rejected_with_position() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("embedded.json");
        tokio::fs::write(
            &path,
            r#"[{"id":"a","text":"x","embedding":[1.0]},{"id":"b","embedding":[2.0]}]"#,
        )
        .await
        .unwrap();

        let err = load_embedded_records(&path).await.unwrap_err();
        assert!(matches!(err, VectorStoreError::Validation(_)));
        assert!(err.to_string().contains("record 1 ('b')"), "{err}");
    }

    #[tokio::test]
    async fn missing_embedding_loads_as_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("embedded.json");
        tokio::fs::write(&path, r#"[{"id":"a","text":"x"}]"#)
            .await
            .unwrap();

        let records = load_embedded_records(&path).await.unwrap();
        assert!(records[0].embedding.is_empty());
    }

    #[tokio::test]
    async fn absent_file_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = load_embedded_records(tmp.path().join("nope.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, VectorStoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn written_records_load_back() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out").join("embedded.json");
        let records = vec![
            EmbeddedRecord::new("1:1", "Welcome", vec![0.5, -0.25]),
            EmbeddedRecord::new("1:2", "Sign up", vec![0.0, 1.0]),
        ];
        write_embedded_records(&path, &records).await.unwrap();
        assert_eq!(load_embedded_records(&path).await.unwrap(), records);
    }
}
