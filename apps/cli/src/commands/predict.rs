//! `kontext predict`: single image from a trained model.

use crate::commands::replicate_client;
use crate::config::CliConfig;
use anyhow::{Context, Result};
use serde_json::json;
use tracing::info;

pub async fn execute(config: &CliConfig, prompt: Option<String>, model: Option<String>) -> Result<()> {
    let client = replicate_client(config)?;

    let prompt = prompt.unwrap_or_else(|| config.generate.prompt.clone());
    let model = model.unwrap_or_else(|| config.generate.model.clone());
    info!(model = %model, prompt = %prompt, "Sending prediction request");

    let urls = client
        .run(&model, &json!({ "prompt": prompt }))
        .await
        .context("Prediction failed")?;
    let url = urls.first().context("Prediction returned no output URL")?;

    println!("{url}");
    Ok(())
}
