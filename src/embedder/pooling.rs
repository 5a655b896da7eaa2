//! Reduction of raw model output to one vector per sentence.
//!
//! Sentence-transformer exports come in two flavours: some graphs end in a
//! pooling node and emit `[batch, dim]`, most emit the last hidden state
//! `[batch, seq_len, dim]`. The shape is inspected once in
//! [`ModelOutput::from_raw`] and the rest of the pipeline works on the enum.
use super::EmbedderError;
use super::inference::RawModelOutput;

/// Model output classified by rank.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutput {
    /// `[batch, dim]`, already pooled by the model.
    Pooled { batch: usize, dim: usize, data: Vec<f32> },
    /// `[batch, seq_len, dim]`, one hidden vector per token.
    PerToken {
        batch: usize,
        seq_len: usize,
        dim: usize,
        data: Vec<f32>,
    },
}

impl ModelOutput {
    /// Classify `raw` and check it against the batch it was computed from.
    pub fn from_raw(
        raw: RawModelOutput,
        batch: usize,
        seq_len: usize,
    ) -> Result<Self, EmbedderError> {
        let RawModelOutput { shape, data } = raw;

        let output = match shape.as_slice() {
            &[n, dim] => {
                check_batch(n, batch)?;
                Self::Pooled {
                    batch: n,
                    dim,
                    data,
                }
            }
            &[n, l, dim] => {
                check_batch(n, batch)?;
                if l != seq_len {
                    return Err(EmbedderError::InferenceFailed(format!(
                        "output sequence length {l} does not match input length {seq_len}"
                    )));
                }
                Self::PerToken {
                    batch: n,
                    seq_len: l,
                    dim,
                    data,
                }
            }
            other => {
                return Err(EmbedderError::InferenceFailed(format!(
                    "unsupported output rank {} (shape {other:?})",
                    other.len()
                )));
            }
        };

        let expected = shape
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| {
                EmbedderError::InferenceFailed(format!("output shape {shape:?} overflows usize"))
            })?;
        if output.data().len() != expected {
            return Err(EmbedderError::InferenceFailed(format!(
                "output has {} values, shape {shape:?} needs {expected}",
                output.data().len()
            )));
        }

        Ok(output)
    }

    /// Embedding width `D`.
    #[must_use]
    pub fn dim(&self) -> usize {
        match self {
            Self::Pooled { dim, .. } | Self::PerToken { dim, .. } => *dim,
        }
    }

    fn data(&self) -> &[f32] {
        match self {
            Self::Pooled { data, .. } | Self::PerToken { data, .. } => data,
        }
    }

    /// Produce one vector per sentence.
    ///
    /// `attention_mask` is the row-major `[batch, seq_len]` mask the model was
    /// fed. It is ignored for already-pooled output.
    #[must_use]
    pub fn pool(&self, attention_mask: &[i64]) -> Vec<Vec<f32>> {
        match self {
            Self::Pooled { dim, data, .. } => {
                if *dim == 0 {
                    return vec![Vec::new(); self.batch()];
                }
                data.chunks_exact(*dim).map(<[f32]>::to_vec).collect()
            }
            Self::PerToken {
                batch,
                seq_len,
                dim,
                data,
            } => (0..*batch)
                .map(|i| {
                    let hidden = &data[i * seq_len * dim..(i + 1) * seq_len * dim];
                    let mask = &attention_mask[i * seq_len..(i + 1) * seq_len];
                    mean_pooling(hidden, mask, *dim)
                })
                .collect(),
        }
    }

    fn batch(&self) -> usize {
        match self {
            Self::Pooled { batch, .. } | Self::PerToken { batch, .. } => *batch,
        }
    }
}

fn check_batch(n: usize, batch: usize) -> Result<(), EmbedderError> {
    if n != batch {
        return Err(EmbedderError::InferenceFailed(format!(
            "output batch size {n} does not match input batch size {batch}"
        )));
    }
    Ok(())
}

/// Mean of the hidden vectors at active mask positions.
///
/// `hidden` holds one sentence, `[seq_len, dim]` flattened. A fully masked
/// sentence yields the zero vector.
#[must_use]
pub fn mean_pooling(hidden: &[f32], mask: &[i64], dim: usize) -> Vec<f32> {
    let mut result = vec![0.0f32; dim];
    let mut count = 0usize;

    for (t, &m) in mask.iter().enumerate() {
        if m == 0 {
            continue;
        }
        let token = &hidden[t * dim..(t + 1) * dim];
        for (acc, &h) in result.iter_mut().zip(token) {
            *acc += h;
        }
        count += 1;
    }

    if count > 0 {
        let count = count as f32;
        for v in &mut result {
            *v /= count;
        }
    }

    result
}
