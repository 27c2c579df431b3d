//! Sentence-transformer inference on the ONNX Runtime CPU provider.
//!
//! Texts are tokenized with padding to the longest text in the chunk, run
//! through the model, mean-pooled over the attention mask and L2-normalized.

use crate::embeddings::ModelSpec;
use crate::error::{Result, VectorStoreError};
use crate::linalg::normalize;
use ndarray::{Array2, ArrayD, Axis, Ix2, Ix3};
use ort::session::{builder::GraphOptimizationLevel, Session, SessionInputs};
use ort::value::{DynTensor, Tensor};
use std::path::Path;
use std::sync::Mutex;
use tokenizers::{Encoding, PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

const MAX_INTRA_THREADS: usize = 4;

pub(crate) struct OnnxBackend {
    model_id: String,
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    chunk_size: usize,
    dimension: usize,
}

fn failure(what: &str, err: impl std::fmt::Display) -> VectorStoreError {
    VectorStoreError::Embedding(format!("{what}: {err}"))
}

impl OnnxBackend {
    pub(crate) fn new(spec: &ModelSpec, model_dir: &Path) -> Result<Self> {
        let dir = model_dir.join(&spec.id);
        let model_file = dir.join("model.onnx");
        let tokenizer_file = dir.join("tokenizer.json");
        for required in [&model_file, &tokenizer_file] {
            if !required.is_file() {
                return Err(VectorStoreError::Embedding(format!(
                    "'{}' asset missing: {}",
                    spec.id,
                    required.display()
                )));
            }
        }

        // The tokenizer's own rayon pool fights ORT's threads.
        if !tokenizers::utils::parallelism::is_parallelism_configured() {
            tokenizers::utils::parallelism::set_parallelism(false);
        }
        let tokenizer = load_tokenizer(&tokenizer_file, spec.max_length)?;

        let threads = std::thread::available_parallelism()
            .map_or(1, |n| n.get().min(MAX_INTRA_THREADS));
        let session = Session::builder()
            .map_err(|e| failure("ORT session builder", e))?
            .with_intra_threads(threads)
            .map_err(|e| failure("ORT intra threads", e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| failure("ORT optimization level", e))?
            .commit_from_file(&model_file)
            .map_err(|e| failure("ORT model load", e))?;

        log::info!(
            "ONNX session for '{}' ready ({threads} threads, max_length {}, chunk {})",
            spec.id,
            spec.max_length,
            spec.max_batch
        );

        Ok(Self {
            model_id: spec.id.clone(),
            session: Mutex::new(session),
            tokenizer,
            chunk_size: spec.max_batch.max(1),
            dimension: spec.dimension,
        })
    }

    pub(crate) fn embed_batch_blocking(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.chunk_size) {
            let encodings = self
                .tokenizer
                .encode_batch(chunk.to_vec(), true)
                .map_err(|e| failure("tokenize", e))?;
            let tokens = TokenBatch::from_encodings(&encodings)?;
            let output = self.run(&tokens)?;
            let pooled = pool(output, &tokens.attention_mask)?;

            for row in pooled.outer_iter() {
                if row.len() != self.dimension {
                    return Err(VectorStoreError::Embedding(format!(
                        "'{}' emitted {} components, expected {}",
                        self.model_id,
                        row.len(),
                        self.dimension
                    )));
                }
                let mut vector = row.to_vec();
                normalize(&mut vector);
                vectors.push(vector);
            }
        }
        Ok(vectors)
    }

    fn run(&self, tokens: &TokenBatch) -> Result<ArrayD<f32>> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| VectorStoreError::Embedding("ONNX session mutex poisoned".into()))?;

        // Models differ in which of the three BERT inputs they declare.
        let mut feed: Vec<(String, DynTensor)> = Vec::with_capacity(session.inputs.len());
        for input in &session.inputs {
            let source = match input.name.as_str() {
                "input_ids" => &tokens.input_ids,
                "attention_mask" => &tokens.attention_mask,
                "token_type_ids" => &tokens.token_type_ids,
                other => {
                    return Err(VectorStoreError::Embedding(format!(
                        "'{}' declares unsupported input '{other}'",
                        self.model_id
                    )))
                }
            };
            let tensor = Tensor::from_array(source.clone().into_dyn())
                .map_err(|e| failure("ORT input tensor", e))?
                .upcast();
            feed.push((input.name.clone(), tensor));
        }

        let outputs = session
            .run(SessionInputs::from(feed))
            .map_err(|e| failure("ORT forward pass", e))?;
        if outputs.len() == 0 {
            return Err(VectorStoreError::Embedding(format!(
                "'{}' produced no outputs",
                self.model_id
            )));
        }
        let view = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| failure("ORT output decode", e))?;
        Ok(view.to_owned())
    }
}

fn load_tokenizer(path: &Path, max_length: usize) -> Result<Tokenizer> {
    let mut tokenizer = Tokenizer::from_file(path).map_err(|e| failure("tokenizer load", e))?;
    tokenizer.with_padding(Some(PaddingParams {
        strategy: PaddingStrategy::BatchLongest,
        ..PaddingParams::default()
    }));
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length,
            ..TruncationParams::default()
        }))
        .map_err(|e| failure("tokenizer truncation", e))?;
    Ok(tokenizer)
}

/// Padded `(batch, seq_len)` model inputs.
struct TokenBatch {
    input_ids: Array2<i64>,
    attention_mask: Array2<i64>,
    token_type_ids: Array2<i64>,
}

impl TokenBatch {
    fn from_encodings(encodings: &[Encoding]) -> Result<Self> {
        let seq_len = encodings.first().map_or(0, Encoding::len);
        if encodings.iter().any(|e| e.len() != seq_len) {
            return Err(VectorStoreError::Embedding(
                "tokenizer returned ragged batch despite padding".to_string(),
            ));
        }
        let shape = (encodings.len(), seq_len);
        let take = |field: fn(&Encoding) -> &[u32]| {
            Array2::from_shape_fn(shape, |(row, col)| i64::from(field(&encodings[row])[col]))
        };
        Ok(Self {
            input_ids: take(Encoding::get_ids),
            attention_mask: take(Encoding::get_attention_mask),
            token_type_ids: take(Encoding::get_type_ids),
        })
    }
}

/// Reduce model output to one row per text.
///
/// Rank-2 outputs are already pooled; rank-3 token states are averaged over
/// the positions the attention mask keeps.
fn pool(output: ArrayD<f32>, attention_mask: &Array2<i64>) -> Result<Array2<f32>> {
    match output.ndim() {
        2 => output
            .into_dimensionality::<Ix2>()
            .map_err(|e| VectorStoreError::Embedding(format!("pooled output shape: {e}"))),
        3 => {
            let hidden = output
                .into_dimensionality::<Ix3>()
                .map_err(|e| VectorStoreError::Embedding(format!("token output shape: {e}")))?;
            if hidden.dim().0 != attention_mask.nrows() || hidden.dim().1 != attention_mask.ncols()
            {
                return Err(VectorStoreError::Embedding(format!(
                    "token output shape {:?} does not match inputs {:?}",
                    hidden.shape(),
                    attention_mask.shape()
                )));
            }
            let weights = attention_mask.mapv(|m| m as f32);
            let kept = weights.sum_axis(Axis(1)).mapv(|n| n.max(1.0));
            let summed = (&hidden * &weights.insert_axis(Axis(2))).sum_axis(Axis(1));
            Ok(summed / &kept.insert_axis(Axis(1)))
        }
        _ => Err(VectorStoreError::Embedding(format!(
            "unexpected output rank {} (shape {:?})",
            output.ndim(),
            output.shape()
        ))),
    }
}
