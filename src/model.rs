//! Encoder inference: input tensors, the model seam, and the ONNX Runtime backend.

use std::fmt;
use std::path::PathBuf;

use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use thiserror::Error;

use crate::tokenizer::{Encoding, TokenizationError};

/// Input names the encoder graph must declare.
pub const INPUT_NAMES: [&str; 3] = ["input_ids", "attention_mask", "token_type_ids"];

/// Errors raised while loading or running the encoder.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// The model artifact does not exist.
    #[error("model not found at {}", path.display())]
    ModelNotFound {
        /// Configured model path.
        path: PathBuf,
    },
    /// ONNX Runtime rejected the session, inputs or outputs.
    #[error("onnx runtime error: {0}")]
    Runtime(#[from] ort::Error),
    /// The graph does not declare one of `INPUT_NAMES`.
    #[error("model does not declare input `{name}`")]
    MissingInput {
        /// Expected input name.
        name: &'static str,
    },
    /// The graph declares no outputs.
    #[error("model declares no outputs")]
    NoOutputs,
    /// The output tensor does not have the expected layout.
    #[error("model output shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Expected layout.
        expected: String,
        /// Observed layout.
        actual: String,
    },
}

/// Where the model lives and how its session is configured.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelOptions {
    /// Path to the `.onnx` artifact.
    pub path: PathBuf,
    /// ONNX Runtime intra-op thread count.
    pub intra_threads: usize,
}

/// The three `[1, N]` input sequences fed to the encoder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelInputs {
    /// Token ids.
    pub input_ids: Vec<i64>,
    /// Attention mask, all ones.
    pub attention_mask: Vec<i64>,
    /// Segment ids, all zeros for single-segment input.
    pub token_type_ids: Vec<i64>,
}

impl ModelInputs {
    /// Builds model inputs from an encoding, rejecting empty ones.
    pub fn from_encoding(encoding: &Encoding) -> Result<Self, TokenizationError> {
        if encoding.is_empty() || encoding.attention_mask.is_empty() {
            return Err(TokenizationError::EmptyInput);
        }
        Ok(Self {
            input_ids: encoding.ids.clone(),
            attention_mask: encoding.attention_mask.clone(),
            token_type_ids: vec![0; encoding.len()],
        })
    }

    /// Sequence length N.
    pub fn seq_len(&self) -> usize {
        self.input_ids.len()
    }

    /// Tensor shape shared by all three inputs.
    pub fn shape(&self) -> [usize; 2] {
        [1, self.seq_len()]
    }
}

/// Per-token embeddings of a single sequence, row-major `[seq_len, dim]`.
#[derive(Clone, Debug, PartialEq)]
pub struct TokenEmbeddings {
    seq_len: usize,
    dim: usize,
    values: Vec<f32>,
}

impl TokenEmbeddings {
    /// Wraps `seq_len * dim` row-major values.
    pub fn new(seq_len: usize, dim: usize, values: Vec<f32>) -> Result<Self, InferenceError> {
        if seq_len == 0 || dim == 0 || values.len() != seq_len * dim {
            return Err(InferenceError::ShapeMismatch {
                expected: format!("{seq_len}x{dim} non-empty values"),
                actual: format!("{} values", values.len()),
            });
        }
        Ok(Self {
            seq_len,
            dim,
            values,
        })
    }

    /// Validates a raw `[1, N, D]` output tensor against the input length.
    pub fn from_output(
        shape: &[i64],
        values: Vec<f32>,
        expected_tokens: usize,
    ) -> Result<Self, InferenceError> {
        let mismatch = || InferenceError::ShapeMismatch {
            expected: format!("[1, {expected_tokens}, D]"),
            actual: format!("{shape:?}"),
        };
        let [batch, seq_len, dim] = shape else {
            return Err(mismatch());
        };
        if *batch != 1 || usize::try_from(*seq_len).ok() != Some(expected_tokens) {
            return Err(mismatch());
        }
        let dim = usize::try_from(*dim).map_err(|_| mismatch())?;
        Self::new(expected_tokens, dim, values)
    }

    /// Number of token rows.
    pub fn seq_len(&self) -> usize {
        self.seq_len
    }

    /// Width of each row.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Embedding row for token `index`.
    pub fn token(&self, index: usize) -> &[f32] {
        let start = index * self.dim;
        &self.values[start..start + self.dim]
    }

    /// Flat row-major values.
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }
}

/// A model that maps one tokenized sequence to per-token embeddings.
pub trait EncoderModel {
    /// Runs a single forward pass.
    fn forward(&mut self, inputs: &ModelInputs) -> Result<TokenEmbeddings, InferenceError>;
}

/// Encoder backed by an ONNX Runtime session.
pub struct OnnxEncoder {
    session: Session,
    output_name: String,
}

impl OnnxEncoder {
    /// Builds a session for the configured model and checks its signature.
    pub fn load(options: &ModelOptions) -> Result<Self, InferenceError> {
        if !options.path.exists() {
            return Err(InferenceError::ModelNotFound {
                path: options.path.clone(),
            });
        }
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(options.intra_threads.max(1))?
            .commit_from_file(&options.path)?;

        for name in INPUT_NAMES {
            if !session.inputs.iter().any(|input| input.name == name) {
                return Err(InferenceError::MissingInput { name });
            }
        }
        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .ok_or(InferenceError::NoOutputs)?;

        tracing::info!(
            path = %options.path.display(),
            output = %output_name,
            intra_threads = options.intra_threads,
            "loaded onnx model"
        );
        Ok(Self {
            session,
            output_name,
        })
    }

    /// Name of the output tensor read after each run.
    pub fn output_name(&self) -> &str {
        &self.output_name
    }
}

impl fmt::Debug for OnnxEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnnxEncoder")
            .field("output_name", &self.output_name)
            .finish_non_exhaustive()
    }
}

impl EncoderModel for OnnxEncoder {
    fn forward(&mut self, inputs: &ModelInputs) -> Result<TokenEmbeddings, InferenceError> {
        let shape = inputs.shape();
        let ids = Tensor::from_array((shape, inputs.input_ids.clone().into_boxed_slice()))?;
        let mask = Tensor::from_array((shape, inputs.attention_mask.clone().into_boxed_slice()))?;
        let type_ids =
            Tensor::from_array((shape, inputs.token_type_ids.clone().into_boxed_slice()))?;
        tracing::debug!(?shape, "running encoder forward pass");

        let outputs = self.session.run(ort::inputs![
            "input_ids" => ids,
            "attention_mask" => mask,
            "token_type_ids" => type_ids
        ])?;
        // first declared output holds the per-token hidden states
        let (out_shape, data) = outputs[self.output_name.as_str()].try_extract_tensor::<f32>()?;
        let dims: Vec<i64> = out_shape.iter().copied().collect();
        tracing::debug!(?dims, "encoder output");
        TokenEmbeddings::from_output(&dims, data.to_vec(), inputs.seq_len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoding(ids: Vec<i64>) -> Encoding {
        let attention_mask = vec![1; ids.len()];
        Encoding {
            ids,
            attention_mask,
        }
    }

    #[test]
    fn inputs_share_shape() {
        let inputs = ModelInputs::from_encoding(&encoding(vec![101, 7592, 102])).expect("inputs");
        assert_eq!(inputs.shape(), [1, 3]);
        assert_eq!(inputs.attention_mask, vec![1, 1, 1]);
        assert_eq!(inputs.token_type_ids, vec![0, 0, 0]);
    }

    #[test]
    fn empty_encoding_is_rejected() {
        let err = ModelInputs::from_encoding(&encoding(Vec::new())).unwrap_err();
        assert_eq!(err, TokenizationError::EmptyInput);
    }

    #[test]
    fn accepts_matching_output() {
        let values = vec![1.0, 2.0, 3.0, 3.0, 4.0, 5.0];
        let embeddings = TokenEmbeddings::from_output(&[1, 2, 3], values, 2).expect("embeddings");
        assert_eq!(embeddings.seq_len(), 2);
        assert_eq!(embeddings.dim(), 3);
        assert_eq!(embeddings.token(1), &[3.0, 4.0, 5.0]);
    }

    #[test]
    fn rejects_wrong_rank() {
        let err = TokenEmbeddings::from_output(&[1, 6], vec![0.0; 6], 2).unwrap_err();
        assert!(matches!(err, InferenceError::ShapeMismatch { .. }));
    }

    #[test]
    fn rejects_sequence_length_drift() {
        let err = TokenEmbeddings::from_output(&[1, 3, 2], vec![0.0; 6], 2).unwrap_err();
        assert!(matches!(err, InferenceError::ShapeMismatch { .. }));
    }

    #[test]
    fn rejects_short_buffer() {
        let err = TokenEmbeddings::from_output(&[1, 2, 384], vec![0.0; 383], 2).unwrap_err();
        assert!(matches!(err, InferenceError::ShapeMismatch { .. }));
    }

    #[test]
    fn missing_model_file_fails_before_runtime() {
        let options = ModelOptions {
            path: PathBuf::from("no/such/model.onnx"),
            intra_threads: 1,
        };
        let err = OnnxEncoder::load(&options).unwrap_err();
        assert!(matches!(err, InferenceError::ModelNotFound { .. }));
    }
}
