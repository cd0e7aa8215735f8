//! Unweighted mean pooling over token embeddings.
//!
//! The attention mask is not consulted: every row counts. Inputs are never padded,
//! so this equals masked mean pooling.

use crate::model::{InferenceError, TokenEmbeddings};

/// Averages `token_count` rows of `embedding_dim` values from a row-major buffer.
pub fn pool(
    output: &[f32],
    token_count: usize,
    embedding_dim: usize,
) -> Result<Vec<f32>, InferenceError> {
    if token_count == 0 || embedding_dim == 0 || output.len() < token_count * embedding_dim {
        return Err(InferenceError::ShapeMismatch {
            expected: format!("{token_count}x{embedding_dim} values"),
            actual: format!("{} values", output.len()),
        });
    }

    let mut pooled = vec![0.0f32; embedding_dim];
    for row in output.chunks_exact(embedding_dim).take(token_count) {
        for (acc, value) in pooled.iter_mut().zip(row) {
            *acc += value;
        }
    }
    let count = token_count as f32;
    for value in &mut pooled {
        *value /= count;
    }
    Ok(pooled)
}

/// Mean of every token row.
pub fn mean_pool(embeddings: &TokenEmbeddings) -> Vec<f32> {
    let mut pooled = vec![0.0f32; embeddings.dim()];
    for index in 0..embeddings.seq_len() {
        for (acc, value) in pooled.iter_mut().zip(embeddings.token(index)) {
            *acc += value;
        }
    }
    let count = embeddings.seq_len() as f32;
    for value in &mut pooled {
        *value /= count;
    }
    pooled
}
