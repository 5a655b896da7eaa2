//! Boundary between the batch tensors and a [`NumericModel`].
use tracing::debug;

use super::batch::Batch;
use super::{EmbedderError, NumericModel};

pub const INPUT_IDS: &str = "input_ids";
pub const ATTENTION_MASK: &str = "attention_mask";
pub const TOKEN_TYPE_IDS: &str = "token_type_ids";

/// A named `i64` input tensor borrowed from a [`Batch`].
#[derive(Debug, Clone, Copy)]
pub struct NamedTensor<'a> {
    pub name: &'static str,
    pub shape: [usize; 2],
    pub data: &'a [i64],
}

/// First model output as dense `f32` data plus its shape.
#[derive(Debug, Clone, PartialEq)]
pub struct RawModelOutput {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

/// Feed `batch` to `model` and return its first output.
///
/// `token_type_ids` is passed only when the batch carries it.
pub fn invoke(model: &dyn NumericModel, batch: &Batch) -> Result<RawModelOutput, EmbedderError> {
    let shape = batch.shape();
    let mut inputs = vec![
        NamedTensor {
            name: INPUT_IDS,
            shape,
            data: &batch.input_ids,
        },
        NamedTensor {
            name: ATTENTION_MASK,
            shape,
            data: &batch.attention_mask,
        },
    ];
    if let Some(token_type_ids) = &batch.token_type_ids {
        inputs.push(NamedTensor {
            name: TOKEN_TYPE_IDS,
            shape,
            data: token_type_ids,
        });
    }

    let output = model.run(&inputs)?;
    debug!("Model output shape: {:?}", output.shape);
    Ok(output)
}

/// Whether a model's declared inputs include `token_type_ids`.
#[must_use]
pub fn wants_token_type_ids(model: &dyn NumericModel) -> bool {
    model.input_names().iter().any(|n| n == TOKEN_TYPE_IDS)
}
