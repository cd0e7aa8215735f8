//! Tokenize → infer → pool for one text.

use crate::config::{EmbedConfig, UnknownTokenPolicy};
use crate::embeddings::EmbeddedRecord;
use crate::error::PipelineError;
use crate::model::{EncoderModel, InferenceError, ModelInputs};
use crate::pooling::mean_pool;
use crate::tokenizer::{encode, unmapped_words, TokenizationError};
use crate::vocab::Vocabulary;

/// Knobs consulted after the model and vocabulary are loaded.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Width every token embedding must have.
    pub embedding_dim: usize,
    /// Handling of words without an id.
    pub unknown_tokens: UnknownTokenPolicy,
}

impl From<&EmbedConfig> for PipelineSettings {
    fn from(config: &EmbedConfig) -> Self {
        Self {
            embedding_dim: config.embedding_dim,
            unknown_tokens: config.unknown_tokens,
        }
    }
}

/// Embeds `text` into one mean-pooled vector.
pub fn embed_text<M: EncoderModel>(
    text: &str,
    vocab: &Vocabulary,
    model: &mut M,
    settings: &PipelineSettings,
) -> Result<EmbeddedRecord, PipelineError> {
    let encoding = encode(text, vocab);
    if settings.unknown_tokens == UnknownTokenPolicy::Reject && encoding.unmapped_count() > 0 {
        return Err(TokenizationError::UnmappedTokens {
            words: unmapped_words(text, &encoding),
        }
        .into());
    }
    let inputs = ModelInputs::from_encoding(&encoding)?;
    tracing::info!(tokens = inputs.seq_len(), "tokenized input");

    let embeddings = model.forward(&inputs)?;
    if embeddings.seq_len() != inputs.seq_len() || embeddings.dim() != settings.embedding_dim {
        return Err(InferenceError::ShapeMismatch {
            expected: format!("[1, {}, {}]", inputs.seq_len(), settings.embedding_dim),
            actual: format!("[1, {}, {}]", embeddings.seq_len(), embeddings.dim()),
        }
        .into());
    }

    let pooled = mean_pool(&embeddings);
    Ok(EmbeddedRecord::new(text, pooled))
}
