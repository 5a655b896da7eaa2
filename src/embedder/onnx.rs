//! ONNX Runtime backend using the `ort` crate.
use std::path::Path;
use std::sync::Mutex;

use ort::session::Session;
use ort::value::{Tensor, ValueType};
use tracing::{debug, info};

use super::inference::{NamedTensor, RawModelOutput};
use super::{EmbedderError, NumericModel};

/// An ONNX inference session implementing [`NumericModel`].
///
/// `Session::run` needs exclusive access, so runs are serialized by a mutex.
pub struct OnnxModel {
    session: Mutex<Session>,
    input_names: Vec<String>,
    output_dim: Option<usize>,
}

impl OnnxModel {
    /// Load a model file with `intra_threads` intra-op threads.
    ///
    /// # Panics
    ///
    /// With the `load-dynamic` feature, `ort` panics on first use if the
    /// ONNX Runtime shared library cannot be found (see `ORT_DYLIB_PATH`).
    pub fn load(model_path: &Path, intra_threads: usize) -> Result<Self, EmbedderError> {
        if !model_path.is_file() {
            return Err(EmbedderError::FileNotFound {
                what: "ONNX model",
                path: model_path.to_path_buf(),
            });
        }

        info!("Initializing ONNX Runtime...");

        let session = Session::builder()
            .map_err(|e| EmbedderError::ModelLoadFailed(format!("session builder error: {e}")))?
            .with_intra_threads(intra_threads)
            .map_err(|e| EmbedderError::ModelLoadFailed(format!("thread config error: {e}")))?
            .commit_from_file(model_path)
            .map_err(|e| EmbedderError::ModelLoadFailed(format!("model load error: {e}")))?;

        let input_names: Vec<String> = session
            .inputs()
            .iter()
            .map(|input| input.name().to_string())
            .collect();

        // Last axis of the first output; dynamic axes are reported as -1.
        let output_dim = session.outputs().first().and_then(|output| match output.dtype() {
            ValueType::Tensor { shape, .. } => shape
                .last()
                .and_then(|&d| usize::try_from(d).ok())
                .filter(|&d| d > 0),
            _ => None,
        });

        info!(
            "ONNX model loaded from {} (inputs: {input_names:?}, dim: {output_dim:?})",
            model_path.display()
        );

        Ok(Self {
            session: Mutex::new(session),
            input_names,
            output_dim,
        })
    }
}

impl NumericModel for OnnxModel {
    fn input_names(&self) -> &[String] {
        &self.input_names
    }

    fn output_dim(&self) -> Option<usize> {
        self.output_dim
    }

    fn run(&self, inputs: &[NamedTensor<'_>]) -> Result<RawModelOutput, EmbedderError> {
        // (shape, data) tuples avoid coupling to an ndarray version
        let mut values = Vec::with_capacity(inputs.len());
        for input in inputs {
            let tensor = Tensor::from_array((input.shape, input.data.to_vec())).map_err(|e| {
                EmbedderError::InferenceFailed(format!("{} tensor error: {e}", input.name))
            })?;
            values.push((input.name, tensor));
        }

        let mut session = self
            .session
            .lock()
            .map_err(|e| EmbedderError::InferenceFailed(format!("lock poisoned: {e}")))?;
        let outputs = session
            .run(values)
            .map_err(|e| EmbedderError::InferenceFailed(format!("session run failed: {e}")))?;

        if outputs.len() == 0 {
            return Err(EmbedderError::InferenceFailed("model produced no outputs".into()));
        }

        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| EmbedderError::InferenceFailed(format!("output extraction: {e}")))?;

        let shape = shape
            .iter()
            .map(|&d| usize::try_from(d))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| {
                EmbedderError::InferenceFailed(format!("negative output dimension in {shape:?}"))
            })?;
        debug!("ONNX run complete, output shape {shape:?}");

        Ok(RawModelOutput {
            shape,
            data: data.to_vec(),
        })
    }
}
