//! Sentence embedding pipeline.
//!
//! [`SentenceEmbedder`] tokenizes a batch of texts, pads them into one tensor
//! batch, runs the model once, pools the output per sentence and
//! L2-normalizes the result. The tokenizer and the model sit behind the
//! [`TextTokenizer`] and [`NumericModel`] traits; the default backends are
//! HuggingFace `tokenizers` and ONNX Runtime.
pub mod batch;
pub mod download;
pub mod inference;
pub mod mock;
pub mod onnx;
pub mod pooling;
pub mod tokenizer;
pub mod vector;

use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info};

use crate::config::EmbedderConfig;
use batch::Batch;
use inference::{NamedTensor, RawModelOutput};
use pooling::ModelOutput;

/// Errors that can occur while building or running an embedder.
///
/// Every message names the stage that failed.
#[derive(Error, Debug)]
pub enum EmbedderError {
    #[error("construction failed: invalid config: {0}")]
    InvalidConfig(String),

    #[error("construction failed: {what} not found: {}", .path.display())]
    FileNotFound { what: &'static str, path: PathBuf },

    #[error("construction failed: model load failed: {0}")]
    ModelLoadFailed(String),

    #[error("tokenization failed for input {index}: {reason}")]
    TokenizationFailed { index: usize, reason: String },

    #[error("inference failed: {0}")]
    InferenceFailed(String),
}

/// Tokenizer output for one sentence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenEncoding {
    /// Token IDs, special tokens included.
    pub input_ids: Vec<i64>,
    /// Attention mask (1 for real tokens, 0 for padding).
    pub attention_mask: Vec<i64>,
}

/// Maps text to token ids.
pub trait TextTokenizer: Send + Sync {
    fn encode(&self, text: &str) -> anyhow::Result<TokenEncoding>;
}

/// An opaque numeric model: named `i64` tensors in, first `f32` output out.
///
/// Implementations must be `Send + Sync`; backends whose execution needs
/// exclusive access serialize internally.
pub trait NumericModel: Send + Sync {
    /// Input names the model declares.
    fn input_names(&self) -> &[String];

    /// Statically declared width of the first output, if the model has one.
    fn output_dim(&self) -> Option<usize>;

    fn run(&self, inputs: &[NamedTensor<'_>]) -> Result<RawModelOutput, EmbedderError>;
}

/// Batch sentence embedder.
///
/// Owns its tokenizer and model; both are released when the embedder is
/// dropped.
pub struct SentenceEmbedder {
    tokenizer: Box<dyn TextTokenizer>,
    model: Box<dyn NumericModel>,
    config: EmbedderConfig,
    with_token_type_ids: bool,
}

impl SentenceEmbedder {
    /// Load the ONNX model and `tokenizer.json` named by `config`.
    ///
    /// Both artifact paths are checked before either is loaded.
    ///
    /// # Panics
    ///
    /// Panics if the ONNX Runtime shared library cannot be loaded; `ort` is
    /// built with `load-dynamic` and locates it through `ORT_DYLIB_PATH` or
    /// the system library path. Missing artifacts are reported as errors
    /// before the runtime is touched.
    pub fn new(config: EmbedderConfig) -> Result<Self, EmbedderError> {
        config
            .validate()
            .map_err(|e| EmbedderError::InvalidConfig(e.to_string()))?;

        let model_path = config.model_path();
        let tokenizer_path = config.tokenizer_path();

        if !model_path.is_file() {
            return Err(EmbedderError::FileNotFound {
                what: "ONNX model",
                path: model_path,
            });
        }
        if !tokenizer_path.is_file() {
            return Err(EmbedderError::FileNotFound {
                what: "tokenizer",
                path: tokenizer_path,
            });
        }

        let tokenizer = tokenizer::HfTokenizer::from_file(&tokenizer_path)
            .map_err(|e| EmbedderError::ModelLoadFailed(format!("tokenizer error: {e:#}")))?;
        info!("Tokenizer loaded (vocab size: {})", tokenizer.vocab_size());

        let model = onnx::OnnxModel::load(&model_path, config.intra_threads)?;

        Self::with_backends(config, Box::new(tokenizer), Box::new(model))
    }

    /// Build an embedder over caller-supplied backends.
    pub fn with_backends(
        config: EmbedderConfig,
        tokenizer: Box<dyn TextTokenizer>,
        model: Box<dyn NumericModel>,
    ) -> Result<Self, EmbedderError> {
        config
            .validate()
            .map_err(|e| EmbedderError::InvalidConfig(e.to_string()))?;

        let with_token_type_ids = inference::wants_token_type_ids(model.as_ref());
        debug!(
            "Embedder ready: max_tokens={}, normalize={}, token_type_ids={with_token_type_ids}",
            config.max_tokens, config.normalize
        );

        Ok(Self {
            tokenizer,
            model,
            config,
            with_token_type_ids,
        })
    }

    /// Embed a single text.
    pub fn encode(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        let mut vectors = self.encode_batch(&[text])?;
        vectors
            .pop()
            .ok_or_else(|| EmbedderError::InferenceFailed("model returned no embedding".into()))
    }

    /// Embed `texts` in one model call, preserving input order.
    ///
    /// An empty slice returns an empty result without tokenizing or running
    /// the model. Any failure fails the whole batch.
    pub fn encode_batch<S: AsRef<str>>(&self, texts: &[S]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let encodings = texts
            .iter()
            .enumerate()
            .map(|(index, text)| {
                self.tokenizer
                    .encode(text.as_ref())
                    .map_err(|e| EmbedderError::TokenizationFailed {
                        index,
                        reason: format!("{e:#}"),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let batch = Batch::build(&encodings, self.config.max_tokens, self.with_token_type_ids);
        let raw = inference::invoke(self.model.as_ref(), &batch)?;
        let output = ModelOutput::from_raw(raw, batch.batch_size, batch.seq_len)?;

        let mut vectors = output.pool(&batch.attention_mask);
        if self.config.normalize {
            for v in &mut vectors {
                vector::l2_normalize_in_place(v);
            }
        }

        Ok(vectors)
    }

    #[must_use]
    pub fn config(&self) -> &EmbedderConfig {
        &self.config
    }

    #[must_use]
    pub fn max_tokens(&self) -> usize {
        self.config.max_tokens
    }

    #[must_use]
    pub fn normalize(&self) -> bool {
        self.config.normalize
    }

    /// Embedding width declared by the model, if it declares one.
    #[must_use]
    pub fn dimensions(&self) -> Option<usize> {
        self.model.output_dim()
    }
}
