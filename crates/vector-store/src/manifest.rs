use crate::error::{Result, VectorStoreError};
use crate::index::IndexKind;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

pub const MANIFEST_SCHEMA_VERSION: u32 = 1;

/// Commit record for an index/metadata pair.
///
/// Written after both data files are in place; a pair is only trusted when
/// its files hash to the values recorded here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreManifest {
    pub schema_version: u32,
    pub generation: u64,
    pub built_at_unix_ms: u64,
    #[serde(flatten)]
    pub kind: IndexKind,
    pub dimension: usize,
    pub count: usize,
    pub index_sha256: String,
    pub metadata_sha256: String,
}

impl StoreManifest {
    pub(crate) fn new(
        generation: u64,
        kind: IndexKind,
        dimension: usize,
        count: usize,
        index_bytes: &[u8],
        metadata_bytes: &[u8],
    ) -> Self {
        Self {
            schema_version: MANIFEST_SCHEMA_VERSION,
            generation,
            built_at_unix_ms: unix_now_ms(),
            kind,
            dimension,
            count,
            index_sha256: sha256_hex(index_bytes),
            metadata_sha256: sha256_hex(metadata_bytes),
        }
    }

    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub(crate) fn from_bytes(path: &Path, bytes: &[u8]) -> Result<Self> {
        let manifest: Self = serde_json::from_slice(bytes)
            .map_err(|e| VectorStoreError::corrupt(path, e.to_string()))?;
        if manifest.schema_version != MANIFEST_SCHEMA_VERSION {
            return Err(VectorStoreError::corrupt(
                path,
                format!(
                    "unsupported manifest schema_version {} (expected {MANIFEST_SCHEMA_VERSION})",
                    manifest.schema_version
                ),
            ));
        }
        Ok(manifest)
    }

    /// Read the manifest at `path` if one exists.
    pub async fn read(path: &Path) -> Result<Option<Self>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Self::from_bytes(path, &bytes).map(Some),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(VectorStoreError::io(path, err)),
        }
    }
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

fn unix_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
