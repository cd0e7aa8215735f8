//! Run-level error aggregating the per-stage failures.

use std::fmt;

use thiserror::Error;

use crate::config::ConfigError;
use crate::model::InferenceError;
use crate::store::PersistenceError;
use crate::tokenizer::TokenizationError;

/// Any failure that aborts a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration or vocabulary could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Text could not be turned into model input.
    #[error(transparent)]
    Tokenization(#[from] TokenizationError),
    /// Model loading or the forward pass failed.
    #[error(transparent)]
    Inference(#[from] InferenceError),
    /// The record could not be stored.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Stage that produced a `PipelineError`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Configuration or vocabulary loading.
    Config,
    /// Tokenization.
    Tokenization,
    /// Model loading or inference.
    Inference,
    /// Database insert.
    Persistence,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Config => "config",
            Self::Tokenization => "tokenization",
            Self::Inference => "inference",
            Self::Persistence => "persistence",
        };
        f.write_str(label)
    }
}

impl PipelineError {
    /// Stage the failure came from.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Config,
            Self::Tokenization(_) => ErrorKind::Tokenization,
            Self::Inference(_) => ErrorKind::Inference,
            Self::Persistence(_) => ErrorKind::Persistence,
        }
    }

    /// Whether rerunning unchanged inputs could succeed.
    ///
    /// Only connection failures qualify; every other error is a property of the
    /// inputs, the model or the schema and will recur.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Persistence(PersistenceError::Connect { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_stage() {
        let err = PipelineError::from(TokenizationError::EmptyInput);
        assert_eq!(err.kind(), ErrorKind::Tokenization);
        assert!(!err.is_transient());
        assert_eq!(err.to_string(), "tokenization resulted in empty input tensors");

        let err = PipelineError::from(ConfigError::MissingVocab {
            origin: "tokenizer.json".into(),
        });
        assert_eq!(err.kind(), ErrorKind::Config);
        assert_eq!(err.kind().to_string(), "config");
    }
}
