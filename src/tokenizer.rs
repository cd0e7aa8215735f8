//! Naive whitespace tokenizer over a fixed vocabulary.
//!
//! No sub-word splitting, padding, truncation or special tokens: one word maps to
//! one id and the attention mask is all ones.

use thiserror::Error;

use crate::vocab::Vocabulary;

/// Id emitted for a word that is neither in the vocabulary nor covered by `[UNK]`.
pub const UNMAPPED_ID: i64 = -1;

/// Errors raised while turning text into model input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenizationError {
    /// The text contained no words.
    #[error("tokenization resulted in empty input tensors")]
    EmptyInput,
    /// Some words had no id and the run was configured to reject them.
    #[error("{} word(s) could not be mapped to a valid id: {}", words.len(), words.join(", "))]
    UnmappedTokens {
        /// Offending words in input order.
        words: Vec<String>,
    },
}

/// Token ids plus the parallel attention mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoding {
    /// Vocabulary id per word, `UNMAPPED_ID` where lookup failed.
    pub ids: Vec<i64>,
    /// 1 for every position.
    pub attention_mask: Vec<i64>,
}

impl Encoding {
    /// Number of tokens.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether no tokens were produced.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Number of positions carrying `UNMAPPED_ID`.
    pub fn unmapped_count(&self) -> usize {
        self.ids.iter().filter(|&&id| id == UNMAPPED_ID).count()
    }
}

/// Splits `text` on whitespace and maps every word through `vocab`.
pub fn encode(text: &str, vocab: &Vocabulary) -> Encoding {
    let fallback = vocab.unknown_id().map(i64::from).unwrap_or(UNMAPPED_ID);
    let ids: Vec<i64> = text
        .split_whitespace()
        .map(|word| vocab.get(word).map(i64::from).unwrap_or(fallback))
        .collect();
    let attention_mask = vec![1; ids.len()];
    let encoding = Encoding {
        ids,
        attention_mask,
    };

    let unmapped = encoding.unmapped_count();
    if unmapped > 0 {
        tracing::warn!(
            unmapped,
            tokens = encoding.len(),
            "some words could not be mapped to a valid id"
        );
    }
    encoding
}

/// Words of `text` whose position in `encoding` holds `UNMAPPED_ID`.
pub fn unmapped_words(text: &str, encoding: &Encoding) -> Vec<String> {
    text.split_whitespace()
        .zip(&encoding.ids)
        .filter(|(_, id)| **id == UNMAPPED_ID)
        .map(|(word, _)| word.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab_with_unk() -> Vocabulary {
        [("hello", 1), ("world", 2), ("[UNK]", 0)].into_iter().collect()
    }

    #[test]
    fn maps_known_words() {
        let encoding = encode("hello world", &vocab_with_unk());
        assert_eq!(encoding.ids, vec![1, 2]);
        assert_eq!(encoding.attention_mask, vec![1, 1]);
    }

    #[test]
    fn length_matches_word_count() {
        let text = "  hello\tworld \n hello   again ";
        let encoding = encode(text, &vocab_with_unk());
        assert_eq!(encoding.len(), 4);
        assert_eq!(encoding.attention_mask.len(), encoding.ids.len());
        assert!(encoding.attention_mask.iter().all(|&m| m == 1));
    }

    #[test]
    fn falls_back_to_unk() {
        let encoding = encode("hello stranger", &vocab_with_unk());
        assert_eq!(encoding.ids, vec![1, 0]);
        assert_eq!(encoding.unmapped_count(), 0);
    }

    #[test]
    fn sentinel_without_unk() {
        let vocab: Vocabulary = [("hello", 1)].into_iter().collect();
        let text = "hello stranger hello";
        let encoding = encode(text, &vocab);
        assert_eq!(encoding.ids, vec![1, UNMAPPED_ID, 1]);
        assert_eq!(encoding.attention_mask, vec![1, 1, 1]);
        assert_eq!(encoding.unmapped_count(), 1);
        assert_eq!(unmapped_words(text, &encoding), vec!["stranger".to_string()]);
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let encoding = encode("Hello", &vocab_with_unk());
        assert_eq!(encoding.ids, vec![0]);
    }

    #[test]
    fn blank_text_is_empty() {
        let encoding = encode(" \t\n", &vocab_with_unk());
        assert!(encoding.is_empty());
        assert!(encoding.attention_mask.is_empty());
    }
}
