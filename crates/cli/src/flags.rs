use clap::ValueEnum;
use figvec_vector_store::EmbeddingMode;

#[derive(Copy, Clone, Debug, ValueEnum)]
pub(crate) enum EmbedMode {
    Onnx,
    Stub,
}

impl EmbedMode {
    pub(crate) const fn as_domain(self) -> EmbeddingMode {
        match self {
            EmbedMode::Onnx => EmbeddingMode::Onnx,
            EmbedMode::Stub => EmbeddingMode::Stub,
        }
    }
}
