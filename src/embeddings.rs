//! Row persisted by a pipeline run.

use serde::{Deserialize, Serialize};

/// Source text plus its pooled embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedRecord {
    /// Text that was embedded; stored in the `description` column.
    pub description: String,
    /// Mean-pooled embedding vector.
    pub embedding: Vec<f32>,
}

impl EmbeddedRecord {
    /// Pairs a description with its embedding.
    pub fn new(description: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            description: description.into(),
            embedding,
        }
    }

    /// Number of vector components.
    pub fn dimensions(&self) -> usize {
        self.embedding.len()
    }
}
