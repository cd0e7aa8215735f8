//! Word-to-id vocabulary read from a HuggingFace `tokenizer.json`.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::config::{read_to_string, ConfigError};

/// Vocabulary entry substituted for out-of-vocabulary words when present.
pub const UNKNOWN_TOKEN: &str = "[UNK]";

/// Immutable token to id mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    entries: HashMap<String, u32>,
}

impl Vocabulary {
    /// Loads the `model.vocab` table from a tokenizer file on disk.
    pub fn from_tokenizer_file(path: &Path) -> Result<Self, ConfigError> {
        let json = read_to_string(path)?;
        let vocab = Self::from_tokenizer_json(&json, &path.display().to_string())?;
        tracing::info!(path = %path.display(), entries = vocab.len(), "loaded vocabulary");
        Ok(vocab)
    }

    /// Parses a tokenizer document; `origin` labels errors.
    pub fn from_tokenizer_json(json: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: TokenizerConfig =
            serde_json::from_str(json).map_err(|source| ConfigError::Parse {
                origin: origin.to_string(),
                source,
            })?;
        let entries = config
            .model
            .and_then(|model| model.vocab)
            .ok_or_else(|| ConfigError::MissingVocab {
                origin: origin.to_string(),
            })?;
        Ok(Self { entries })
    }

    /// Looks up the id for `token`.
    pub fn get(&self, token: &str) -> Option<u32> {
        self.entries.get(token).copied()
    }

    /// Id of the `[UNK]` entry, if the vocabulary has one.
    pub fn unknown_id(&self) -> Option<u32> {
        self.get(UNKNOWN_TOKEN)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the vocabulary holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, u32)> for Vocabulary {
    fn from_iter<I: IntoIterator<Item = (S, u32)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(token, id)| (token.into(), id))
                .collect(),
        }
    }
}

// Only the fields we read; everything else in tokenizer.json is ignored.
#[derive(Deserialize)]
struct TokenizerConfig {
    #[serde(default)]
    model: Option<ModelSection>,
}

#[derive(Deserialize)]
struct ModelSection {
    #[serde(default)]
    vocab: Option<HashMap<String, u32>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_nested_vocab() {
        let json = r#"{
            "version": "1.0",
            "normalizer": null,
            "model": {
                "type": "WordPiece",
                "unk_token": "[UNK]",
                "vocab": { "[PAD]": 0, "[UNK]": 100, "hello": 7592 }
            }
        }"#;
        let vocab = Vocabulary::from_tokenizer_json(json, "inline").expect("vocab");
        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab.get("hello"), Some(7592));
        assert_eq!(vocab.unknown_id(), Some(100));
        assert_eq!(vocab.get("world"), None);
    }

    #[test]
    fn null_vocab_is_missing() {
        let err = Vocabulary::from_tokenizer_json(r#"{"model": {"vocab": null}}"#, "inline")
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingVocab { .. }));
    }

    #[test]
    fn absent_model_is_missing() {
        let err = Vocabulary::from_tokenizer_json(r#"{"version": "1.0"}"#, "inline").unwrap_err();
        assert!(matches!(err, ConfigError::MissingVocab { .. }));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let err = Vocabulary::from_tokenizer_json("{ model: ", "broken.json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn negative_ids_are_rejected() {
        let err = Vocabulary::from_tokenizer_json(r#"{"model": {"vocab": {"a": -3}}}"#, "inline")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = Vocabulary::from_tokenizer_file(Path::new("no/such/tokenizer.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
