//! `kontext submit`: start a training from an existing archive.

use crate::commands::replicate_client;
use crate::config::CliConfig;
use anyhow::{Context, Result};
use colored::Colorize;
use kontext_training::{LogProgressSink, MonitorOptions, monitor_training, open_archive, submit_training};
use std::path::PathBuf;

pub async fn execute(config: &CliConfig, archive: PathBuf, wait: bool, json_output: bool) -> Result<()> {
    let client = replicate_client(config)?;

    config.training.validate()?;
    config.pipeline.options.validate()?;
    let archive = open_archive(&archive).with_context(|| format!("Cannot use archive {}", archive.display()))?;

    let submission = submit_training(&client, &config.training, &config.pipeline.options, &archive).await?;

    let monitor = if wait {
        let options = MonitorOptions::new(&config.training, &config.pipeline.options);
        Some(monitor_training(&client, &submission.job, &options, &LogProgressSink).await?)
    } else {
        None
    };

    if json_output {
        let out = serde_json::json!({ "submission": submission, "monitor": monitor });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!("{}", "Training submitted".bold().green());
    println!("  Job:         {}", submission.job.id.to_string().cyan());
    println!("  Status:      {}", submission.job.status);
    println!("  Destination: {}", submission.job.destination);
    println!("  Images:      {}", archive.image_count);
    if let Some(monitor) = monitor {
        println!("  Finished:    {}", monitor.job.status.to_string().green());
        if let Some(version) = monitor.model_version {
            println!("  Version:     {}", version.cyan());
        }
    } else {
        println!();
        println!("  {}", "Tip: pass --wait to follow the job until it finishes.".dimmed());
    }
    println!();
    Ok(())
}
