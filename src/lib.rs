//! # mpnet-embedder — sentence embeddings with all-mpnet-base-v2
//!
//! Turns sentences into fixed-length vectors for semantic similarity using a
//! pretrained transformer exported to ONNX.
//!
//! ## Architecture
//!
//! - **[`config`]** — Embedder configuration (JSON, defaults, validation)
//! - **[`embedder`]** — Batch encoding pipeline: tokenize, pad, run, pool, normalize
//!   - [`embedder::batch`] — padded `[batch, seq_len]` input tensors
//!   - [`embedder::inference`] — named-tensor boundary to the model
//!   - [`embedder::pooling`] — rank-2 passthrough / rank-3 masked mean pooling
//!   - [`embedder::vector`] — L2 normalization and cosine similarity
//!   - [`embedder::onnx`], [`embedder::tokenizer`] — ONNX Runtime and HuggingFace backends
//!   - [`embedder::download`] — model artifact download
//!
//! ```no_run
//! use mpnet_embedder::{EmbedderConfig, SentenceEmbedder};
//!
//! let embedder = SentenceEmbedder::new(EmbedderConfig::default())?;
//! let vectors = embedder.encode_batch(&["A cat sits on the mat", "Hello world"])?;
//! assert_eq!(vectors.len(), 2);
//! # Ok::<(), mpnet_embedder::EmbedderError>(())
//! ```

pub mod config;
pub mod embedder;

pub use config::EmbedderConfig;
pub use embedder::vector::cosine_similarity;
pub use embedder::{EmbedderError, NumericModel, SentenceEmbedder, TextTokenizer, TokenEncoding};
