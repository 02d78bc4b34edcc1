//! `kontext train`: run the full pipeline.

use crate::commands::replicate_client;
use crate::config::CliConfig;
use anyhow::{Context, Result};
use colored::Colorize;
use kontext_training::{LogProgressSink, Pipeline, TrainingLayout};
use std::path::PathBuf;

pub async fn execute(
    config: &CliConfig,
    source: Option<PathBuf>,
    output: Option<PathBuf>,
    json_output: bool,
) -> Result<()> {
    let client = replicate_client(config)?;

    let source_dir = source.unwrap_or_else(|| config.pipeline.source_dir.clone());
    let layout = TrainingLayout::new(output.unwrap_or_else(|| config.pipeline.output_dir.clone()));
    let progress = LogProgressSink;

    let pipeline = Pipeline {
        config: config.training.clone(),
        options: config.pipeline.options.clone(),
        source_dir,
        layout: layout.clone(),
        backend: &client,
        generator: &client,
        progress: &progress,
    };
    let report = pipeline.run().await.context("Training pipeline failed")?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    println!("{}", "Training complete".bold().green());
    println!("  Images:   {} accepted, {} rejected", report.accepted, report.rejected.len());
    println!("  Archive:  {}", report.archive.path.display().to_string().dimmed());
    println!("  Job:      {}", report.submission.job.id.to_string().cyan());
    println!("  Model:    {}", report.verification.model.cyan());
    println!(
        "  Verified: {}/{} prompts",
        report.verification.succeeded(),
        report.verification.attempts.len()
    );
    println!("  Report:   {}", layout.report_path().display().to_string().dimmed());
    println!();
    Ok(())
}
