//! HuggingFace `tokenizers` adapter.
//!
//! Padding and truncation are switched off here: the batch builder pads every
//! sequence to the batch length and applies the `max_tokens` limit itself.
use std::path::Path;

use anyhow::{Context, Result};
use tokenizers::Tokenizer;

use super::{TextTokenizer, TokenEncoding};

/// Wrapper around a `tokenizer.json` tokenizer.
pub struct HfTokenizer {
    inner: Tokenizer,
}

impl HfTokenizer {
    /// Load a tokenizer from a `tokenizer.json` file.
    pub fn from_file(path: &Path) -> Result<Self> {
        anyhow::ensure!(path.is_file(), "tokenizer not found: {}", path.display());

        let mut inner = Tokenizer::from_file(path)
            .map_err(|e| anyhow::anyhow!("failed to load tokenizer: {e}"))
            .with_context(|| format!("reading {}", path.display()))?;

        inner
            .with_truncation(None)
            .map_err(|e| anyhow::anyhow!("failed to disable truncation: {e}"))?;
        inner.with_padding(None);

        Ok(Self { inner })
    }

    /// Get the vocabulary size, added tokens included.
    #[must_use]
    pub fn vocab_size(&self) -> usize {
        self.inner.get_vocab_size(true)
    }
}

impl TextTokenizer for HfTokenizer {
    fn encode(&self, text: &str) -> Result<TokenEncoding> {
        let encoding = self
            .inner
            .encode(text, true)
            .map_err(|e| anyhow::anyhow!("failed to encode text: {e}"))?;

        let input_ids = encoding.get_ids().iter().map(|&id| i64::from(id)).collect();
        let attention_mask = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| i64::from(m))
            .collect();

        Ok(TokenEncoding {
            input_ids,
            attention_mask,
        })
    }
}
