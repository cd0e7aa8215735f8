//! Application runner: load, embed, persist, report.

use std::process::ExitCode;

use crate::config::EmbedConfig;
use crate::embeddings::EmbeddedRecord;
use crate::error::PipelineError;
use crate::model::{EncoderModel, OnnxEncoder};
use crate::pipeline::{embed_text, PipelineSettings};
use crate::store::{PgVectorStore, StdoutSink, VectorSink};
use crate::vocab::Vocabulary;

/// Loads the ONNX model and runs the pipeline against the configured sink.
pub async fn run(config: &EmbedConfig) -> Result<EmbeddedRecord, PipelineError> {
    let mut model = OnnxEncoder::load(&config.model)?;
    println!("ONNX model loaded successfully.");

    if config.dry_run {
        return run_with(config, &mut model, &StdoutSink).await;
    }
    let store = PgVectorStore::new(
        config.database_url.clone(),
        config.table.clone(),
        config.prepare_table,
    );
    let record = run_with(config, &mut model, &store).await?;
    println!("Embedding inserted successfully!");
    Ok(record)
}

/// Runs vocabulary loading, embedding and persistence with a caller-supplied
/// model and sink.
///
/// The vocabulary is validated before the input is tokenized, and the sink is
/// only called once a pooled vector exists.
pub async fn run_with<M, S>(
    config: &EmbedConfig,
    model: &mut M,
    sink: &S,
) -> Result<EmbeddedRecord, PipelineError>
where
    M: EncoderModel,
    S: VectorSink + ?Sized,
{
    let vocabulary = Vocabulary::from_tokenizer_file(&config.tokenizer_path)?;
    let text = config.input.read()?;
    let record = embed_text(&text, &vocabulary, model, &PipelineSettings::from(config))?;
    println!("Embedding dimension: {}", record.dimensions());

    sink.persist(&record).await?;
    Ok(record)
}

/// Top-level handler: prints the outcome and maps it to a process exit code.
pub fn report(result: &Result<EmbeddedRecord, PipelineError>) -> ExitCode {
    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(
                kind = %err.kind(),
                transient = err.is_transient(),
                "pipeline run failed"
            );
            println!("An error occurred: {err}");
            ExitCode::FAILURE
        }
    }
}
