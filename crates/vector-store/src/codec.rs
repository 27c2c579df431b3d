//! Binary index file format.
//!
//! ```text
//! "FVIX" | version u16 | kind u8 | dim u32 | count u64 | count*dim f32
//! kind = ivf: lists u32 | probes u32 | lists*dim f32 | per list: len u32, len*u32
//! ```
//!
//! All integers and floats are little-endian.

use crate::error::{Result, VectorStoreError};
use crate::flat_index::FlatIndex;
use crate::index::{NeighborIndex, VectorIndex};
use crate::ivf_index::IvfIndex;
use ndarray::{Array2, ArrayView2};
use std::path::Path;

const INDEX_MAGIC: &[u8; 4] = b"FVIX";
const INDEX_FORMAT_VERSION: u16 = 1;
const KIND_FLAT: u8 = 0;
const KIND_IVF: u8 = 1;

pub(crate) fn encode_index(index: &VectorIndex) -> Vec<u8> {
    let dim = index.dimension();
    let count = index.len();
    let mut out = Vec::with_capacity(19 + count * dim * 4);
    out.extend_from_slice(INDEX_MAGIC);
    out.extend_from_slice(&INDEX_FORMAT_VERSION.to_le_bytes());

    match index {
        VectorIndex::Flat(flat) => {
            out.push(KIND_FLAT);
            put_header(&mut out, dim, count);
            put_matrix(&mut out, flat.vectors());
        }
        VectorIndex::Ivf(ivf) => {
            out.push(KIND_IVF);
            put_header(&mut out, dim, count);
            put_matrix(&mut out, ivf.vectors());
            put_u32(&mut out, ivf.lists().len());
            put_u32(&mut out, ivf.probes());
            put_matrix(&mut out, ivf.centroids());
            for list in ivf.lists() {
                put_u32(&mut out, list.len());
                for position in list {
                    put_u32(&mut out, *position);
                }
            }
        }
    }
    out
}

pub(crate) fn decode_index(path: &Path, bytes: &[u8]) -> Result<VectorIndex> {
    let mut reader = Reader {
        path,
        bytes,
        offset: 0,
    };

    if reader.take(4)? != INDEX_MAGIC {
        return Err(VectorStoreError::corrupt(path, "not an index file (bad magic)"));
    }
    let version = u16::from_le_bytes(reader.array()?);
    if version != INDEX_FORMAT_VERSION {
        return Err(VectorStoreError::corrupt(
            path,
            format!("unsupported index format version {version} (expected {INDEX_FORMAT_VERSION})"),
        ));
    }
    let kind = reader.take(1)?[0];
    let dim = reader.u32()? as usize;
    let count = usize::try_from(u64::from_le_bytes(reader.array()?))
        .map_err(|_| VectorStoreError::corrupt(path, "vector count overflows usize"))?;
    if dim == 0 {
        return Err(VectorStoreError::corrupt(path, "dimension is zero"));
    }
    let vectors = reader.matrix(count, dim)?;

    let index = match kind {
        KIND_FLAT => VectorIndex::Flat(FlatIndex::from_matrix(vectors)),
        KIND_IVF => {
            let list_count = reader.u32()? as usize;
            let probes = reader.u32()? as usize;
            let centroids = reader.matrix(list_count, dim)?;
            let mut lists = Vec::with_capacity(list_count);
            for _ in 0..list_count {
                let len = reader.u32()? as usize;
                let mut list = Vec::with_capacity(len.min(count));
                for _ in 0..len {
                    list.push(reader.u32()? as usize);
                }
                lists.push(list);
            }
            let ivf = IvfIndex::from_parts(vectors, centroids, lists, probes)
                .map_err(|detail| VectorStoreError::corrupt(path, detail))?;
            VectorIndex::Ivf(ivf)
        }
        other => {
            return Err(VectorStoreError::corrupt(
                path,
                format!("unknown index kind tag {other}"),
            ))
        }
    };

    if reader.offset != bytes.len() {
        return Err(VectorStoreError::corrupt(
            path,
            format!("{} trailing bytes", bytes.len() - reader.offset),
        ));
    }
    Ok(index)
}

fn put_header(out: &mut Vec<u8>, dim: usize, count: usize) {
    put_u32(out, dim);
    out.extend_from_slice(&(count as u64).to_le_bytes());
}

#[allow(clippy::cast_possible_truncation)]
fn put_u32(out: &mut Vec<u8>, value: usize) {
    out.extend_from_slice(&(value as u32).to_le_bytes());
}

fn put_matrix(out: &mut Vec<u8>, matrix: ArrayView2<'_, f32>) {
    for value in matrix {
        out.extend_from_slice(&value.to_le_bytes());
    }
}

struct Reader<'a> {
    path: &'a Path,
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| {
                VectorStoreError::corrupt(
                    self.path,
                    format!("truncated at byte {} (wanted {len} more)", self.offset),
                )
            })?;
        let slice = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let slice = self.take(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn matrix(&mut self, rows: usize, cols: usize) -> Result<Array2<f32>> {
        let values = rows
            .checked_mul(cols)
            .ok_or_else(|| VectorStoreError::corrupt(self.path, "matrix size overflows"))?;
        let byte_len = values
            .checked_mul(4)
            .ok_or_else(|| VectorStoreError::corrupt(self.path, "matrix size overflows"))?;
        let raw = self.take(byte_len)?;
        let data: Vec<f32> = raw
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| VectorStoreError::corrupt(self.path, format!("matrix shape: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn flat_and_ivf_decode_to_equal_indexes() {
        let vectors = array![[0.0f32, 0.0], [1.0, 0.0], [5.0, 5.0], [6.0, 5.0]];
        for index in [
            VectorIndex::Flat(FlatIndex::from_matrix(vectors.clone())),
            VectorIndex::Ivf(IvfIndex::build(vectors.clone(), 2, 1)),
        ] {
            let bytes = encode_index(&index);
            let decoded = decode_index(Path::new("idx"), &bytes).unwrap();
            assert_eq!(decoded, index);
        }
    }

    #[test]
    fn truncated_and_padded_files_are_corrupt() {
        let index = VectorIndex::Flat(FlatIndex::from_matrix(array![[1.0f32, 2.0]]));
        let mut bytes = encode_index(&index);

        let truncated = &bytes[..bytes.len() - 1];
        assert!(matches!(
            decode_index(Path::new("idx"), truncated),
            Err(VectorStoreError::CorruptFile { .. })
        ));

        bytes.push(0);
        assert!(matches!(
            decode_index(Path::new("idx"), &bytes),
            Err(VectorStoreError::CorruptFile { .. })
        ));
    }

    #[test]
    fn bad_magic_is_rejected() {
        let err = decode_index(Path::new("idx"), b"JUNKJUNKJUNK").unwrap_err();
        assert!(err.to_string().contains("bad magic"), "{err}");
    }
}
