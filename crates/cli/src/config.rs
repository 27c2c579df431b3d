//! Settings file support.
//!
//! `figvec.toml` (or `--config <path>`) overrides the built-in defaults;
//! environment variables and flags are applied on top by clap.

use anyhow::{Context, Result};
use clap::ValueEnum;
use figvec_vector_store::{
    EmbeddingConfig, EmbeddingMode, IndexKind, DEFAULT_BATCH_SIZE, DEFAULT_DATA_DIR,
    DEFAULT_INDEX_FILE_NAME, DEFAULT_METADATA_FILE_NAME, VectorStoreError,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "figvec.toml";
pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_IVF_LISTS: usize = 64;
pub const DEFAULT_IVF_PROBES: usize = 8;

const DEFAULT_DOCUMENT_FILE_NAME: &str = "figma_data.json";
const DEFAULT_NODES_FILE_NAME: &str = "text_nodes.json";
const DEFAULT_EMBEDDED_FILE_NAME: &str = "embedded_nodes.json";

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKindName {
    #[default]
    Flat,
    Ivf,
}

/// Files read and written by each stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathSettings {
    pub document: PathBuf,
    pub nodes: PathBuf,
    pub embedded: PathBuf,
    pub index: PathBuf,
    pub metadata: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        let dir = PathBuf::from(DEFAULT_DATA_DIR);
        Self {
            document: dir.join(DEFAULT_DOCUMENT_FILE_NAME),
            nodes: dir.join(DEFAULT_NODES_FILE_NAME),
            embedded: dir.join(DEFAULT_EMBEDDED_FILE_NAME),
            index: dir.join(DEFAULT_INDEX_FILE_NAME),
            metadata: dir.join(DEFAULT_METADATA_FILE_NAME),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexSettings {
    pub kind: IndexKindName,
    pub lists: usize,
    pub probes: usize,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            kind: IndexKindName::Flat,
            lists: DEFAULT_IVF_LISTS,
            probes: DEFAULT_IVF_PROBES,
        }
    }
}

impl IndexSettings {
    #[must_use]
    pub const fn to_kind(&self) -> IndexKind {
        match self.kind {
            IndexKindName::Flat => IndexKind::Flat,
            IndexKindName::Ivf => IndexKind::Ivf {
                lists: self.lists,
                probes: self.probes,
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub paths: PathSettings,
    pub embedding: EmbeddingConfig,
    pub batch_size: usize,
    pub index: IndexSettings,
    pub top_k: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            paths: PathSettings::default(),
            embedding: EmbeddingConfig::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            index: IndexSettings::default(),
            top_k: DEFAULT_TOP_K,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSettings {
    paths: Option<RawPaths>,
    embedding: Option<RawEmbedding>,
    index: Option<RawIndex>,
    query: Option<RawQuery>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPaths {
    document: Option<PathBuf>,
    nodes: Option<PathBuf>,
    embedded: Option<PathBuf>,
    index: Option<PathBuf>,
    metadata: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEmbedding {
    mode: Option<EmbeddingMode>,
    model: Option<String>,
    model_dir: Option<PathBuf>,
    batch_size: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawIndex {
    kind: Option<IndexKindName>,
    lists: Option<usize>,
    probes: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawQuery {
    top_k: Option<usize>,
}

impl Settings {
    /// Load settings from `explicit` if given, else from `figvec.toml` in the
    /// working directory when present, else the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            return Self::from_toml(&raw)
                .with_context(|| format!("Invalid config {}", path.display()));
        }

        let implicit = Path::new(DEFAULT_CONFIG_FILE);
        if !implicit.is_file() {
            return Ok(Self::default());
        }
        log::debug!("Using {}", implicit.display());
        let raw = std::fs::read_to_string(implicit)
            .with_context(|| format!("Failed to read config {}", implicit.display()))?;
        Self::from_toml(&raw).with_context(|| format!("Invalid config {}", implicit.display()))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let raw: RawSettings = toml::from_str(raw)?;
        let mut cfg = Self::default();

        if let Some(paths) = raw.paths {
            let target = &mut cfg.paths;
            overwrite(&mut target.document, paths.document);
            overwrite(&mut target.nodes, paths.nodes);
            overwrite(&mut target.embedded, paths.embedded);
            overwrite(&mut target.index, paths.index);
            overwrite(&mut target.metadata, paths.metadata);
        }

        if let Some(embedding) = raw.embedding {
            overwrite(&mut cfg.embedding.mode, embedding.mode);
            overwrite(&mut cfg.embedding.model_id, embedding.model);
            overwrite(&mut cfg.embedding.model_dir, embedding.model_dir);
            overwrite(&mut cfg.batch_size, embedding.batch_size);
        }

        if let Some(index) = raw.index {
            overwrite(&mut cfg.index.kind, index.kind);
            overwrite(&mut cfg.index.lists, index.lists);
            overwrite(&mut cfg.index.probes, index.probes);
        }

        if let Some(query) = raw.query {
            overwrite(&mut cfg.top_k, query.top_k);
        }

        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(
                VectorStoreError::validation("embedding.batch_size must be at least 1").into(),
            );
        }
        if self.top_k == 0 {
            return Err(VectorStoreError::validation("query.top_k must be at least 1").into());
        }
        if self.index.lists == 0 || self.index.probes == 0 {
            return Err(VectorStoreError::validation(
                "index.lists and index.probes must be at least 1",
            )
            .into());
        }
        Ok(())
    }
}

fn overwrite<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_file_keeps_defaults() {
        assert_eq!(Settings::from_toml("").unwrap(), Settings::default());
        let defaults = Settings::default();
        assert_eq!(defaults.paths.document, Path::new("data/figma_data.json"));
        assert_eq!(defaults.paths.index, Path::new("data/vectors.index"));
        assert_eq!(defaults.paths.metadata, Path::new("data/vectors_meta.json"));
        assert_eq!(defaults.top_k, 5);
    }

    #[test]
    fn sections_override_defaults() {
        let cfg = Settings::from_toml(
            r#"
            [paths]
            index = "out/ui.index"

            [embedding]
            mode = "stub"
            batch_size = 4

            [index]
            kind = "ivf"
            lists = 3

            [query]
            top_k = 9
            "#,
        )
        .unwrap();

        assert_eq!(cfg.paths.index, Path::new("out/ui.index"));
        assert_eq!(cfg.paths.metadata, Path::new("data/vectors_meta.json"));
        assert_eq!(cfg.embedding.mode, EmbeddingMode::Stub);
        assert_eq!(cfg.batch_size, 4);
        assert_eq!(
            cfg.index.to_kind(),
            IndexKind::Ivf {
                lists: 3,
                probes: DEFAULT_IVF_PROBES
            }
        );
        assert_eq!(cfg.top_k, 9);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Settings::from_toml("[paths]\nindx = \"x\"").is_err());
        assert!(Settings::from_toml("[server]\nport = 1").is_err());
    }

    #[test]
    fn zero_values_are_validation_errors() {
        for raw in [
            "[query]\ntop_k = 0",
            "[embedding]\nbatch_size = 0",
            "[index]\nprobes = 0",
        ] {
            let err = Settings::from_toml(raw).unwrap_err();
            assert!(
                matches!(
                    err.downcast_ref::<VectorStoreError>(),
                    Some(VectorStoreError::Validation(_))
                ),
                "{raw}: {err:#}"
            );
        }
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        assert!(Settings::load(Some(&tmp.path().join("nope.toml"))).is_err());
    }
}
