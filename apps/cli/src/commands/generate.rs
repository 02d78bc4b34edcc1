//! `kontext generate`: thumbnail batch from a trained model.

use crate::commands::replicate_client;
use crate::config::CliConfig;
use anyhow::Result;
use colored::Colorize;
use kontext_remote::{generate_batch, thumbnail_prompts};
use std::path::PathBuf;

pub async fn execute(
    config: &CliConfig,
    output: Option<PathBuf>,
    model: Option<String>,
    json_output: bool,
) -> Result<()> {
    let client = replicate_client(config)?;

    let output_dir = output.unwrap_or_else(|| config.generate.output_dir.clone());
    let model = model.unwrap_or_else(|| config.generate.model.clone());
    let prompts = thumbnail_prompts(&config.generate.trigger_word);

    let report = generate_batch(&client, &model, &prompts, &output_dir).await?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    println!("{}", format!("Generated {}/{} images", report.generated.len(), report.total()).bold().cyan());
    println!("  Output: {}", output_dir.display().to_string().dimmed());
    for image in &report.generated {
        println!("  {} {}", "✓".green(), image.path.display());
    }
    for failure in &report.failed {
        println!("  {} #{}: {}", "✗".red(), failure.number, failure.error.dimmed());
    }
    println!();
    Ok(())
}
