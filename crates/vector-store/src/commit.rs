//! Two-file commit for an index/metadata pair.
//!
//! All three files are staged as `*.tmp` siblings and synced before any of
//! them replaces a live file. The manifest is renamed last and is the commit
//! point: until it lands, the recorded checksums still describe the previous
//! pair, so a reader that races or survives a crash mid-swap sees a checksum
//! mismatch instead of misaligned data.

use crate::codec::encode_index;
use crate::error::{Result, VectorStoreError};
use crate::index::{NeighborIndex, VectorIndex};
use crate::manifest::StoreManifest;
use crate::metadata::MetadataStore;
use crate::paths::{staging_path, StorePaths};
use crate::store_lock::acquire_store_write_lock;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

pub(crate) async fn commit_pair(
    paths: &StorePaths,
    index: &VectorIndex,
    metadata: &MetadataStore,
) -> Result<StoreManifest> {
    let _lock = acquire_store_write_lock(&paths.lock()).await?;

    let manifest_path = paths.manifest();
    let generation = match StoreManifest::read(&manifest_path).await {
        Ok(Some(previous)) => previous.generation.saturating_add(1),
        Ok(None) => 1,
        Err(err) => {
            log::warn!("Ignoring unreadable previous manifest: {err}");
            1
        }
    };

    let index_bytes = encode_index(index);
    let metadata_bytes = metadata.to_bytes()?;
    let manifest = StoreManifest::new(
        generation,
        index.kind(),
        index.dimension(),
        index.len(),
        &index_bytes,
        &metadata_bytes,
    );
    let manifest_bytes = manifest.to_bytes()?;

    let staged = [
        (paths.index().to_path_buf(), index_bytes),
        (paths.metadata().to_path_buf(), metadata_bytes),
        (manifest_path, manifest_bytes),
    ];

    let mut tmps: Vec<PathBuf> = Vec::with_capacity(staged.len());
    for (target, bytes) in &staged {
        let tmp = staging_path(target);
        if let Err(err) = stage_file(&tmp, bytes).await {
            tmps.push(tmp);
            discard(&tmps).await;
            return Err(err);
        }
        tmps.push(tmp);
    }

    for ((target, _), tmp) in staged.iter().zip(&tmps) {
        tokio::fs::rename(tmp, target)
            .await
            .map_err(|e| VectorStoreError::io(target, e))?;
        log::debug!("Committed {}", target.display());
    }

    for (target, _) in &staged {
        sync_parent_dir(target).await;
    }

    log::info!(
        "Committed generation {} ({} vectors, dim {}) to {}",
        manifest.generation,
        manifest.count,
        manifest.dimension,
        paths.index().display()
    );
    Ok(manifest)
}

async fn stage_file(tmp: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = tmp.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| VectorStoreError::io(parent, e))?;
    }
    let mut file = tokio::fs::File::create(tmp)
        .await
        .map_err(|e| VectorStoreError::io(tmp, e))?;
    file.write_all(bytes)
        .await
        .map_err(|e| VectorStoreError::io(tmp, e))?;
    file.sync_all()
        .await
        .map_err(|e| VectorStoreError::io(tmp, e))?;
    Ok(())
}

async fn discard(tmps: &[PathBuf]) {
    for tmp in tmps {
        let _ = tokio::fs::remove_file(tmp).await;
    }
}

#[cfg(unix)]
async fn sync_parent_dir(path: &Path) {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return;
    };
    let parent = parent.to_path_buf();
    let synced = tokio::task::spawn_blocking(move || std::fs::File::open(&parent)?.sync_all()).await;
    if let Ok(Err(err)) = synced {
        log::warn!("fsync of parent directory for {} failed: {err}", path.display());
    }
}

#[cfg(not(unix))]
async fn sync_parent_dir(_path: &Path) {}
