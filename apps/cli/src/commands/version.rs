//! `kontext version`: latest published version of a model.

use crate::commands::replicate_client;
use crate::config::CliConfig;
use anyhow::{Context, Result};
use kontext_training::ModelRef;

pub async fn execute(config: &CliConfig, model: Option<String>) -> Result<()> {
    let client = replicate_client(config)?;

    let model = model.unwrap_or_else(|| config.generate.version_model.clone());
    let model = ModelRef::parse(&model)?;
    let version = client
        .latest_version(&model)
        .await
        .with_context(|| format!("Failed to get the latest version of {model}"))?;

    println!("{version}");
    Ok(())
}
