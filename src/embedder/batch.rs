//! Padded batch tensors built from per-sentence token encodings.
//!
//! All tensors are row-major `[batch_size, seq_len]` with
//! `seq_len = min(max_tokens, longest encoding)`.
use tracing::{debug, warn};

use super::TokenEncoding;

/// Token id written into padding positions (`<pad>` in the MPNet vocabulary).
pub const PAD_TOKEN_ID: i64 = 1;

/// Rectangular input tensors for one encode call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub batch_size: usize,
    pub seq_len: usize,
    pub input_ids: Vec<i64>,
    pub attention_mask: Vec<i64>,
    /// All zeros; present only when the model declares a `token_type_ids` input.
    pub token_type_ids: Option<Vec<i64>>,
    /// Number of rows that lost trailing tokens to the `max_tokens` limit.
    pub truncated: usize,
}

impl Batch {
    /// Pad and truncate `encodings` into a single batch.
    ///
    /// Positions past an encoding's real length carry [`PAD_TOKEN_ID`] and
    /// mask `0`. A real position whose mask value is missing counts as active.
    #[must_use]
    pub fn build(encodings: &[TokenEncoding], max_tokens: usize, with_token_type_ids: bool) -> Self {
        let batch_size = encodings.len();
        let longest = encodings.iter().map(|e| e.input_ids.len()).max().unwrap_or(0);
        let seq_len = longest.min(max_tokens);

        let mut input_ids = vec![PAD_TOKEN_ID; batch_size * seq_len];
        let mut attention_mask = vec![0i64; batch_size * seq_len];
        let mut truncated = 0;

        for (row, enc) in encodings.iter().enumerate() {
            if enc.input_ids.len() > seq_len {
                truncated += 1;
            }

            let offset = row * seq_len;
            let real = enc.input_ids.len().min(seq_len);
            for j in 0..real {
                input_ids[offset + j] = enc.input_ids[j];
                attention_mask[offset + j] = enc.attention_mask.get(j).copied().unwrap_or(1);
            }
        }

        if truncated > 0 {
            warn!(
                "Truncated {truncated} of {batch_size} sequences from {longest} to {seq_len} tokens"
            );
        }
        debug!("Built batch: batch_size={batch_size}, seq_len={seq_len}");

        Self {
            batch_size,
            seq_len,
            input_ids,
            attention_mask,
            token_type_ids: with_token_type_ids.then(|| vec![0i64; batch_size * seq_len]),
            truncated,
        }
    }

    /// Tensor shape shared by every input: `[batch_size, seq_len]`.
    #[must_use]
    pub fn shape(&self) -> [usize; 2] {
        [self.batch_size, self.seq_len]
    }

    /// Attention mask row for sentence `i`.
    #[must_use]
    pub fn mask_row(&self, i: usize) -> &[i64] {
        &self.attention_mask[i * self.seq_len..(i + 1) * self.seq_len]
    }

    /// Input id row for sentence `i`.
    #[must_use]
    pub fn ids_row(&self, i: usize) -> &[i64] {
        &self.input_ids[i * self.seq_len..(i + 1) * self.seq_len]
    }
}
