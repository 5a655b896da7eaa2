//! Deterministic in-process backends for testing the pipeline without
//! model files.
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::bail;

use super::inference::{ATTENTION_MASK, INPUT_IDS, NamedTensor, RawModelOutput, TOKEN_TYPE_IDS};
use super::{EmbedderError, NumericModel, TextTokenizer, TokenEncoding};

/// Sentence start id (`<s>`).
pub const BOS_ID: i64 = 0;
/// Sentence end id (`</s>`).
pub const EOS_ID: i64 = 2;

/// Shared call counter, readable after the backend has moved into an embedder.
#[derive(Debug, Clone, Default)]
pub struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    #[must_use]
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Whitespace tokenizer with hashed word ids.
///
/// Each word maps to an id in `5..1005`, wrapped in `<s>` / `</s>`.
#[derive(Debug, Default)]
pub struct MockTokenizer {
    fail_on: Option<String>,
    calls: CallCounter,
}

impl MockTokenizer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject any text containing `pattern`.
    #[must_use]
    pub fn failing_on(mut self, pattern: &str) -> Self {
        self.fail_on = Some(pattern.to_string());
        self
    }

    #[must_use]
    pub fn calls(&self) -> CallCounter {
        self.calls.clone()
    }
}

impl TextTokenizer for MockTokenizer {
    fn encode(&self, text: &str) -> anyhow::Result<TokenEncoding> {
        self.calls.bump();
        if let Some(pattern) = &self.fail_on {
            if text.contains(pattern.as_str()) {
                bail!("mock tokenizer rejects {pattern:?}");
            }
        }

        let mut input_ids = vec![BOS_ID];
        input_ids.extend(text.split_whitespace().map(word_id));
        input_ids.push(EOS_ID);
        let attention_mask = vec![1; input_ids.len()];

        Ok(TokenEncoding {
            input_ids,
            attention_mask,
        })
    }
}

fn word_id(word: &str) -> i64 {
    let mut hasher = DefaultHasher::new();
    word.to_lowercase().hash(&mut hasher);
    5 + (hasher.finish() % 1000) as i64
}

/// Hidden vector the mock model emits for `token_id`. Every component is at
/// least 1.0, so padding that leaks into a mean is always visible.
#[must_use]
pub fn token_vector(token_id: i64, dim: usize) -> Vec<f32> {
    (0..dim)
        .map(|k| 1.0 + ((token_id * 31 + k as i64 * 7).rem_euclid(13)) as f32)
        .collect()
}

/// Model whose hidden state for a token depends only on the token id.
#[derive(Debug)]
pub struct MockModel {
    dim: usize,
    input_names: Vec<String>,
    pooled: bool,
    fail: bool,
    calls: CallCounter,
    last_inputs: Mutex<Vec<String>>,
}

impl MockModel {
    /// Per-token model (`[batch, seq_len, dim]` output).
    #[must_use]
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            input_names: vec![INPUT_IDS.to_string(), ATTENTION_MASK.to_string()],
            pooled: false,
            fail: false,
            calls: CallCounter::default(),
            last_inputs: Mutex::new(Vec::new()),
        }
    }

    /// Declare a `token_type_ids` input.
    #[must_use]
    pub fn with_token_type_ids(mut self) -> Self {
        self.input_names.push(TOKEN_TYPE_IDS.to_string());
        self
    }

    /// Emit `[batch, dim]` output, mean-pooled inside the model.
    #[must_use]
    pub fn pooled(mut self) -> Self {
        self.pooled = true;
        self
    }

    /// Fail every run.
    #[must_use]
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    #[must_use]
    pub fn calls(&self) -> CallCounter {
        self.calls.clone()
    }

    /// Input names seen by the most recent run, in order.
    #[must_use]
    pub fn last_input_names(&self) -> Vec<String> {
        self.last_inputs
            .lock()
            .map(|names| names.clone())
            .unwrap_or_default()
    }
}

impl NumericModel for MockModel {
    fn input_names(&self) -> &[String] {
        &self.input_names
    }

    fn output_dim(&self) -> Option<usize> {
        Some(self.dim)
    }

    fn run(&self, inputs: &[NamedTensor<'_>]) -> Result<RawModelOutput, EmbedderError> {
        self.calls.bump();
        if let Ok(mut names) = self.last_inputs.lock() {
            *names = inputs.iter().map(|t| t.name.to_string()).collect();
        }

        if self.fail {
            return Err(EmbedderError::InferenceFailed("mock model failure".into()));
        }

        for t in inputs {
            if t.shape[0] * t.shape[1] != t.data.len() {
                return Err(EmbedderError::InferenceFailed(format!(
                    "{} has {} values for shape {:?}",
                    t.name,
                    t.data.len(),
                    t.shape
                )));
            }
            if !self.input_names.iter().any(|n| n == t.name) {
                return Err(EmbedderError::InferenceFailed(format!(
                    "unexpected input {}",
                    t.name
                )));
            }
        }

        let find = |name: &str| {
            inputs
                .iter()
                .find(|t| t.name == name)
                .ok_or_else(|| EmbedderError::InferenceFailed(format!("missing input {name}")))
        };
        let ids = find(INPUT_IDS)?;
        let mask = find(ATTENTION_MASK)?;
        let [batch, seq_len] = ids.shape;

        let hidden: Vec<f32> = ids
            .data
            .iter()
            .flat_map(|&id| token_vector(id, self.dim))
            .collect();

        if !self.pooled {
            return Ok(RawModelOutput {
                shape: vec![batch, seq_len, self.dim],
                data: hidden,
            });
        }

        let mut data = Vec::with_capacity(batch * self.dim);
        for i in 0..batch {
            let row = &hidden[i * seq_len * self.dim..(i + 1) * seq_len * self.dim];
            let mask_row = &mask.data[i * seq_len..(i + 1) * seq_len];
            data.extend(super::pooling::mean_pooling(row, mask_row, self.dim));
        }
        Ok(RawModelOutput {
            shape: vec![batch, self.dim],
            data,
        })
    }
}
