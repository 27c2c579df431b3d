//! Validation shared by the builder and the searcher.
//!
//! Both sides rely on one rule: vector position `i` in the index, `ids[i]`
//! and `texts[i]` describe the same record. The builder establishes it when
//! stacking, the searcher re-checks it when loading.

use crate::error::{Result, VectorStoreError};
use crate::metadata::MetadataStore;
use crate::types::EmbeddedRecord;
use ndarray::Array2;
use std::path::Path;

/// Stack record embeddings, in input order, into a `(count, dim)` matrix.
pub(crate) fn stack_embeddings(records: &[EmbeddedRecord]) -> Result<Array2<f32>> {
    let first = records
        .first()
        .ok_or_else(|| VectorStoreError::validation("cannot build an index from zero records"))?;
    let dim = first.embedding.len();

    let mut flat = Vec::with_capacity(records.len() * dim);
    for (position, record) in records.iter().enumerate() {
        if record.embedding.is_empty() {
            return Err(VectorStoreError::validation(format!(
                "record {position} ('{}') has no embedding",
                record.id
            )));
        }
        if record.embedding.len() != dim {
            return Err(VectorStoreError::validation(format!(
                "record {position} ('{}') has embedding dimension {}, expected {dim}",
                record.id,
                record.embedding.len()
            )));
        }
        ensure_finite(&record.embedding, || {
            format!("record {position} ('{}')", record.id)
        })?;
        flat.extend_from_slice(&record.embedding);
    }

    Array2::from_shape_vec((records.len(), dim), flat)
        .map_err(|e| VectorStoreError::validation(format!("embedding matrix shape: {e}")))
}

/// Reject NaN and infinite components.
pub(crate) fn ensure_finite(vector: &[f32], what: impl FnOnce() -> String) -> Result<()> {
    if let Some(component) = vector.iter().position(|v| !v.is_finite()) {
        return Err(VectorStoreError::validation(format!(
            "{} has a non-finite component at {component}",
            what()
        )));
    }
    Ok(())
}

pub(crate) fn ensure_query(vector: &[f32], dimension: usize) -> Result<()> {
    if vector.len() != dimension {
        return Err(VectorStoreError::DimensionMismatch {
            expected: dimension,
            actual: vector.len(),
        });
    }
    ensure_finite(vector, || "query embedding".to_string())
}

pub(crate) fn ensure_k(k: usize) -> Result<()> {
    if k == 0 {
        return Err(VectorStoreError::validation("k must be at least 1"));
    }
    Ok(())
}

/// Check that the metadata sequences line up with `count` index vectors.
pub(crate) fn ensure_aligned(
    count: usize,
    metadata: &MetadataStore,
    metadata_path: &Path,
) -> Result<()> {
    if metadata.ids().len() != metadata.texts().len() {
        return Err(VectorStoreError::inconsistent(
            metadata_path,
            format!(
                "{} ids but {} texts",
                metadata.ids().len(),
                metadata.texts().len()
            ),
        ));
    }
    if metadata.len() != count {
        return Err(VectorStoreError::inconsistent(
            metadata_path,
            format!(
                "metadata describes {} records but the index holds {count} vectors",
                metadata.len()
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, embedding: Vec<f32>) -> EmbeddedRecord {
        EmbeddedRecord::new(id, id, embedding)
    }

    #[test]
    fn stacks_in_input_order() {
        let matrix = stack_embeddings(&[
            record("a", vec![1.0, 2.0]),
            record("b", vec![3.0, 4.0]),
        ])
        .unwrap();
        assert_eq!(matrix.dim(), (2, 2));
        assert_eq!(matrix.row(1).to_vec(), vec![3.0, 4.0]);
    }

    #[test]
    fn rejects_empty_batch_missing_and_mixed_dimensions() {
        assert!(matches!(
            stack_embeddings(&[]),
            Err(VectorStoreError::Validation(_))
        ));
        assert!(matches!(
            stack_embeddings(&[record("a", vec![])]),
            Err(VectorStoreError::Validation(_))
        ));
        let err = stack_embeddings(&[
            record("a", vec![0.0; 3]),
            record("b", vec![0.0; 4]),
        ])
        .unwrap_err();
        assert!(matches!(err, VectorStoreError::Validation(_)));
        assert!(err.to_string().contains("'b'"), "{err}");
    }

    #[test]
    fn rejects_non_finite_components() {
        let err = stack_embeddings(&[record("a", vec![0.0, f32::NAN])]).unwrap_err();
        assert!(matches!(err, VectorStoreError::Validation(_)));
        let err = stack_embeddings(&[record("a", vec![f32::INFINITY])]).unwrap_err();
        assert!(matches!(err, VectorStoreError::Validation(_)));
    }

    #[test]
    fn query_dimension_must_match() {
        assert!(matches!(
            ensure_query(&[1.0, 2.0, 3.0], 2),
            Err(VectorStoreError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
        assert!(ensure_query(&[1.0, 2.0], 2).is_ok());
    }

    #[test]
    fn non_finite_query_is_rejected() {
        assert!(matches!(
            ensure_query(&[f32::NAN, 0.0], 2),
            Err(VectorStoreError::Validation(_))
        ));
        assert!(matches!(
            ensure_query(&[0.0, f32::NEG_INFINITY], 2),
            Err(VectorStoreError::Validation(_))
        ));
    }

    #[test]
    fn misaligned_metadata_is_inconsistent() {
        let metadata = MetadataStore::new(vec!["a".into()], vec!["x".into()]);
        let err = ensure_aligned(2, &metadata, Path::new("meta.json")).unwrap_err();
        assert!(matches!(err, VectorStoreError::InconsistentStore { .. }));
        assert!(ensure_aligned(1, &metadata, Path::new("meta.json")).is_ok());
    }
}
