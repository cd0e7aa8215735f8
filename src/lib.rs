#![warn(missing_docs)]
//! Embed one text with a local ONNX encoder and store the pooled vector in pgvector.

pub mod config;
pub mod embeddings;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod pooling;
pub mod runtime;
pub mod store;
pub mod tokenizer;
pub mod vocab;

pub use config::{Cli, ConfigError, EmbedConfig, InputSource, UnknownTokenPolicy};
pub use embeddings::EmbeddedRecord;
pub use error::{ErrorKind, PipelineError};
pub use model::{
    EncoderModel, InferenceError, ModelInputs, ModelOptions, OnnxEncoder, TokenEmbeddings,
};
pub use pipeline::{embed_text, PipelineSettings};
pub use pooling::{mean_pool, pool};
pub use runtime::{report, run, run_with};
pub use store::{PersistenceError, PgVectorStore, StdoutSink, TableName, VectorSink};
pub use tokenizer::{encode, Encoding, TokenizationError, UNMAPPED_ID};
pub use vocab::{Vocabulary, UNKNOWN_TOKEN};
