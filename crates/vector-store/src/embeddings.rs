use crate::error::{Result, VectorStoreError};
use crate::linalg::normalize;
use crate::types::EmbeddedRecord;
use async_trait::async_trait;
use figvec_node_extractor::TextNode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_MODEL_ID: &str = "all-minilm-l6-v2";
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Maps texts to fixed-dimension vectors.
///
/// Implementations must return exactly one vector per input text, each of
/// length [`Embedder::dimension`], in input order.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn model_id(&self) -> &str;

    fn dimension(&self) -> usize;

    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Embed a single text and verify the result against the embedder's contract.
pub async fn embed_one<E: Embedder + ?Sized>(embedder: &E, text: &str) -> Result<Vec<f32>> {
    let inputs = vec![text.to_string()];
    let mut vectors = embedder.encode(&inputs).await?;
    check_encoded(embedder, inputs.len(), &vectors)?;
    vectors
        .pop()
        .ok_or_else(|| VectorStoreError::Embedding("Empty embedding result".to_string()))
}

/// Embed node texts in batches and attach each vector to its node, keeping order.
pub async fn embed_nodes<E, F>(
    embedder: &E,
    nodes: Vec<TextNode>,
    batch_size: usize,
    mut on_progress: F,
) -> Result<Vec<EmbeddedRecord>>
where
    E: Embedder + ?Sized,
    F: FnMut(usize),
{
    let batch_size = batch_size.max(1);
    let mut records = Vec::with_capacity(nodes.len());
    let mut pending = nodes.into_iter().peekable();

    while pending.peek().is_some() {
        let batch: Vec<TextNode> = pending.by_ref().take(batch_size).collect();
        let texts: Vec<String> = batch.iter().map(|n| n.text.clone()).collect();
        let vectors = embedder.encode(&texts).await?;
        check_encoded(embedder, texts.len(), &vectors)?;

        let done = batch.len();
        records.extend(
            batch
                .into_iter()
                .zip(vectors)
                .map(|(node, vector)| EmbeddedRecord::from_node(node, vector)),
        );
        on_progress(done);
    }

    log::info!(
        "Embedded {} texts with '{}' (dim {})",
        records.len(),
        embedder.model_id(),
        embedder.dimension()
    );
    Ok(records)
}

fn check_encoded<E: Embedder + ?Sized>(
    embedder: &E,
    expected_count: usize,
    vectors: &[Vec<f32>],
) -> Result<()> {
    if vectors.len() != expected_count {
        return Err(VectorStoreError::Embedding(format!(
            "'{}' returned {} vectors for {expected_count} texts",
            embedder.model_id(),
            vectors.len()
        )));
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != embedder.dimension()) {
        return Err(VectorStoreError::Embedding(format!(
            "'{}' returned a vector of dimension {} (declared {})",
            embedder.model_id(),
            bad.len(),
            embedder.dimension()
        )));
    }
    Ok(())
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingMode {
    #[default]
    Onnx,
    Stub,
}

impl EmbeddingMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Onnx => "onnx",
            Self::Stub => "stub",
        }
    }
}

impl fmt::Display for EmbeddingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmbeddingMode {
    type Err = VectorStoreError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "onnx" => Ok(Self::Onnx),
            "stub" => Ok(Self::Stub),
            other => Err(VectorStoreError::Embedding(format!(
                "Unsupported embedding mode '{other}' (expected 'onnx' or 'stub')"
            ))),
        }
    }
}

/// Everything needed to construct an [`EmbeddingModel`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmbeddingConfig {
    pub mode: EmbeddingMode,
    pub model_id: String,
    pub model_dir: PathBuf,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            mode: EmbeddingMode::default(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            model_dir: PathBuf::from("models"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(not(feature = "onnx"), allow(dead_code))]
pub(crate) struct ModelSpec {
    pub id: String,
    pub dimension: usize,
    pub max_length: usize,
    pub max_batch: usize,
}

impl ModelSpec {
    fn lookup(raw_id: &str) -> Result<Self> {
        let id = normalize_model_id(raw_id);
        let (dimension, max_length, max_batch) = match id.as_str() {
            "all-minilm-l6-v2" | "all-minilm-l12-v2" => (384, 256, 32),
            "bge-small" => (384, 512, 32),
            "bge-base" | "all-mpnet-base-v2" => (768, 384, 16),
            _ => {
                return Err(VectorStoreError::Embedding(format!(
                    "Unknown embedding model id '{raw_id}'. Available: {}",
                    KNOWN_MODELS.join(", ")
                )))
            }
        };
        Ok(Self {
            id,
            dimension,
            max_length,
            max_batch,
        })
    }
}

const KNOWN_MODELS: &[&str] = &[
    "all-minilm-l6-v2",
    "all-minilm-l12-v2",
    "all-mpnet-base-v2",
    "bge-small",
    "bge-base",
];

fn normalize_model_id(raw: &str) -> String {
    let lowered = raw.trim().to_ascii_lowercase();
    let bare = lowered
        .strip_prefix("sentence-transformers/")
        .or_else(|| lowered.strip_prefix("baai/"))
        .unwrap_or(&lowered);
    match bare {
        "bge-small-en-v1.5" => "bge-small".to_string(),
        "bge-base-en-v1.5" => "bge-base".to_string(),
        other => other.to_string(),
    }
}

/// Deterministic pseudo-embeddings for tests and offline runs.
#[derive(Clone, Debug)]
struct StubBackend {
    dimension: usize,
}

impl StubBackend {
    fn embed_batch(&self, texts: &[String]) -> Vec<Vec<f32>> {
        texts
            .iter()
            .map(|text| stub_embed(text, self.dimension))
            .collect()
    }
}

fn stub_embed(text: &str, dimension: usize) -> Vec<f32> {
    let mut state =
        fnv1a_64(text.as_bytes()) ^ (dimension as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    let mut vec = Vec::with_capacity(dimension);
    for _ in 0..dimension {
        let bits = splitmix64(&mut state);
        let high = (bits >> 32) as u32;
        let mantissa = high >> 9;
        let unit = f32::from_bits(0x3f80_0000 | mantissa) - 1.0;
        vec.push(unit.mul_add(2.0, -1.0));
    }
    normalize(&mut vec);
    vec
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

const fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Sentence-embedding model selected by [`EmbeddingConfig`].
pub struct EmbeddingModel {
    id: String,
    dimension: usize,
    backend: EmbeddingBackend,
}

enum EmbeddingBackend {
    Stub(StubBackend),
    #[cfg(feature = "onnx")]
    Onnx(std::sync::Arc<crate::onnx::OnnxBackend>),
}

impl EmbeddingModel {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let spec = ModelSpec::lookup(&config.model_id)?;
        let backend = match config.mode {
            EmbeddingMode::Stub => EmbeddingBackend::Stub(StubBackend {
                dimension: spec.dimension,
            }),
            EmbeddingMode::Onnx => Self::onnx_backend(&spec, config)?,
        };
        log::info!(
            "Embedding model '{}' ready ({} mode, dim {})",
            spec.id,
            config.mode,
            spec.dimension
        );
        Ok(Self {
            id: spec.id,
            dimension: spec.dimension,
            backend,
        })
    }

    /// Stub model with the default model's dimension
    #[must_use]
    pub fn stub() -> Self {
        let dimension = 384;
        Self {
            id: DEFAULT_MODEL_ID.to_string(),
            dimension,
            backend: EmbeddingBackend::Stub(StubBackend { dimension }),
        }
    }

    #[cfg(feature = "onnx")]
    fn onnx_backend(spec: &ModelSpec, config: &EmbeddingConfig) -> Result<EmbeddingBackend> {
        let backend = crate::onnx::OnnxBackend::new(spec, &config.model_dir)?;
        Ok(EmbeddingBackend::Onnx(std::sync::Arc::new(backend)))
    }

    #[cfg(not(feature = "onnx"))]
    fn onnx_backend(spec: &ModelSpec, _config: &EmbeddingConfig) -> Result<EmbeddingBackend> {
        Err(VectorStoreError::Embedding(format!(
            "Model '{}' needs ONNX Runtime, but this build lacks the 'onnx' feature; \
             rebuild with --features onnx or use the stub embedding mode",
            spec.id
        )))
    }
}

#[async_trait]
impl Embedder for EmbeddingModel {
    fn model_id(&self) -> &str {
        &self.id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        match &self.backend {
            EmbeddingBackend::Stub(stub) => Ok(stub.embed_batch(texts)),
            #[cfg(feature = "onnx")]
            EmbeddingBackend::Onnx(backend) => {
                let backend = backend.clone();
                let owned = texts.to_vec();
                tokio::task::spawn_blocking(move || backend.embed_batch_blocking(&owned))
                    .await
                    .map_err(|e| VectorStoreError::Embedding(format!("Join error: {e}")))?
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::l2_norm;

    struct ShortEmbedder;

    #[async_trait]
    impl Embedder for ShortEmbedder {
        fn model_id(&self) -> &str {
            "short"
        }

        fn dimension(&self) -> usize {
            2
        }

        async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().skip(1).map(|_| vec![0.0, 1.0]).collect())
        }
    }

    #[tokio::test]
    async fn stub_is_deterministic_and_normalized() {
        let model = EmbeddingModel::stub();
        let a = embed_one(&model, "Sign up").await.unwrap();
        let b = embed_one(&model, "Sign up").await.unwrap();
        let c = embed_one(&model, "Log in").await.unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 384);
        assert!((l2_norm(&a) - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn embed_nodes_keeps_order_across_batches() {
        let model = EmbeddingModel::stub();
        let nodes: Vec<TextNode> = (0..5)
            .map(|i| TextNode::new(format!("1:{i}"), "", format!("text {i}")))
            .collect();
        let mut progress = Vec::new();
        let records = embed_nodes(&model, nodes, 2, |n| progress.push(n))
            .await
            .unwrap();

        assert_eq!(progress, vec![2, 2, 1]);
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1:0", "1:1", "1:2", "1:3", "1:4"]);
        assert_eq!(
            records[3].embedding,
            embed_one(&model, "text 3").await.unwrap()
        );
    }

    #[tokio::test]
    async fn short_embedder_output_is_rejected() {
        let nodes = vec![TextNode::new("a", "", "x"), TextNode::new("b", "", "y")];
        let err = embed_nodes(&ShortEmbedder, nodes, 8, |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, VectorStoreError::Embedding(_)));
    }

    #[test]
    fn model_ids_normalize() {
        assert_eq!(
            ModelSpec::lookup("sentence-transformers/all-MiniLM-L6-v2")
                .unwrap()
                .id,
            "all-minilm-l6-v2"
        );
        assert_eq!(ModelSpec::lookup("BAAI/bge-small-en-v1.5").unwrap().id, "bge-small");
        assert!(ModelSpec::lookup("mystery-model").is_err());
    }

    #[test]
    fn stub_mode_needs_no_assets() {
        let config = EmbeddingConfig {
            mode: EmbeddingMode::Stub,
            model_id: "all-mpnet-base-v2".to_string(),
            model_dir: PathBuf::from("/nonexistent"),
        };
        let model = EmbeddingModel::new(&config).unwrap();
        assert_eq!(model.dimension(), 768);
    }

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("STUB".parse::<EmbeddingMode>().unwrap(), EmbeddingMode::Stub);
        assert!("gpu".parse::<EmbeddingMode>().is_err());
    }
}
