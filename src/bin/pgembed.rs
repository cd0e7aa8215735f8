use std::process::ExitCode;

use clap::Parser;
use pgembed::{report, run, Cli, PipelineError};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.build_config() {
        Ok(config) => run(&config).await,
        Err(err) => Err(PipelineError::from(err)),
    };
    report(&result)
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pgembed=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
