use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_INDEX_FILE_NAME: &str = "vectors.index";
pub const DEFAULT_METADATA_FILE_NAME: &str = "vectors_meta.json";

const MANIFEST_SUFFIX: &str = ".manifest.json";
const LOCK_SUFFIX: &str = ".lock";

/// Locations of one persisted index/metadata pair and its sidecars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    index: PathBuf,
    metadata: PathBuf,
}

impl Default for StorePaths {
    fn default() -> Self {
        let dir = PathBuf::from(DEFAULT_DATA_DIR);
        Self::new(
            dir.join(DEFAULT_INDEX_FILE_NAME),
            dir.join(DEFAULT_METADATA_FILE_NAME),
        )
    }
}

impl StorePaths {
    #[must_use]
    pub fn new(index: impl Into<PathBuf>, metadata: impl Into<PathBuf>) -> Self {
        Self {
            index: index.into(),
            metadata: metadata.into(),
        }
    }

    /// Default file names inside `dir`
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(
            dir.join(DEFAULT_INDEX_FILE_NAME),
            dir.join(DEFAULT_METADATA_FILE_NAME),
        )
    }

    #[must_use]
    pub fn index(&self) -> &Path {
        &self.index
    }

    #[must_use]
    pub fn metadata(&self) -> &Path {
        &self.metadata
    }

    /// Commit record written last during a build
    #[must_use]
    pub fn manifest(&self) -> PathBuf {
        with_suffix(&self.index, MANIFEST_SUFFIX)
    }

    /// Advisory single-writer lock file
    #[must_use]
    pub fn lock(&self) -> PathBuf {
        with_suffix(&self.index, LOCK_SUFFIX)
    }
}

/// Sibling of `path` used for staging before the rename.
#[must_use]
pub(crate) fn staging_path(path: &Path) -> PathBuf {
    with_suffix(path, ".tmp")
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sidecars_sit_next_to_the_index() {
        let paths = StorePaths::new("out/faiss.index", "out/meta.json");
        assert_eq!(paths.manifest(), PathBuf::from("out/faiss.index.manifest.json"));
        assert_eq!(paths.lock(), PathBuf::from("out/faiss.index.lock"));
        assert_eq!(
            staging_path(paths.metadata()),
            PathBuf::from("out/meta.json.tmp")
        );
    }

    #[test]
    fn defaults_live_under_data() {
        let paths = StorePaths::default();
        assert_eq!(paths.index(), Path::new("data/vectors.index"));
        assert_eq!(paths.metadata(), Path::new("data/vectors_meta.json"));
    }
}
