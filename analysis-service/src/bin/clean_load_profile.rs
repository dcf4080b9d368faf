use std::env;
use std::sync::Arc;

use analysis_service::{
    config::AppConfig,
    observability,
    pipeline::Pipeline,
    sinks::CleanedCsvSink,
    sources::LoadProfileExcelSource,
    transform::{ReadingDedup, ReadingValidation},
};
use anyhow::{bail, Result};
use load_analytics::domain::LoadReading;

/// Clean one or more raw head-end Excel exports into the combined CSV the
/// analysis jobs consume.
///
/// Usage:
///   clean_load_profile <export.xlsx> [<export.xlsx> ...]
#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        bail!("usage: clean_load_profile <export.xlsx> [<export.xlsx> ...]");
    }
    let files: Vec<&String> = args[1..].iter().collect();
    tracing::info!(files = files.len(), "cleaning raw load profile exports");

    // Output path comes from config (ANALYSIS_CONFIG can point elsewhere).
    let cfg = AppConfig::load()?;

    let source = LoadProfileExcelSource::new(files);
    let sink = CleanedCsvSink::new(&cfg.input.combined_csv);

    let pipeline: Pipeline<_, LoadReading, _> = Pipeline {
        source,
        transforms: vec![
            Arc::new(ReadingValidation::default()),
            Arc::new(ReadingDedup::default()),
        ],
        sink,
    };

    pipeline.run().await?;

    Ok(())
}
