use crate::error::{Result, VectorStoreError};
use fs2::FileExt;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Exclusive advisory lock held for the duration of a commit.
pub(crate) struct StoreWriteLock {
    file: std::fs::File,
    path: PathBuf,
}

impl Drop for StoreWriteLock {
    fn drop(&mut self) {
        if let Err(err) = self.file.unlock() {
            log::warn!("release store lock {}: {err}", self.path.display());
        }
    }
}

pub(crate) async fn acquire_store_write_lock(path: &Path) -> Result<StoreWriteLock> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| VectorStoreError::io(parent, e))?;
    }

    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || -> Result<StoreWriteLock> {
        use std::fs::OpenOptions;

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| VectorStoreError::io(&path, e))?;

        let start = Instant::now();
        file.lock_exclusive()
            .map_err(|e| VectorStoreError::io(&path, e))?;
        let waited = start.elapsed();
        if waited.as_millis() > 0 {
            log::info!("Waited {waited:?} for store lock {}", path.display());
        }

        Ok(StoreWriteLock { file, path })
    })
    .await
    .map_err(|e| VectorStoreError::Other(format!("join store lock task: {e}")))?
}
