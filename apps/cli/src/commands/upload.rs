//! `kontext upload`: push JPEGs to Supabase Storage and record bucket stats.

use crate::config::{CliConfig, SUPABASE_KEY_ENV, SUPABASE_URL_ENV, require_env};
use anyhow::{Context, Result};
use colored::Colorize;
use kontext_remote::StorageClient;
use kontext_remote::storage::upload_directory;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

pub async fn execute(
    config: &CliConfig,
    dir: Option<PathBuf>,
    bucket: Option<String>,
    json_output: bool,
) -> Result<()> {
    let key = require_env(SUPABASE_KEY_ENV)?;
    let url = match std::env::var(SUPABASE_URL_ENV) {
        Ok(url) if !url.trim().is_empty() => url,
        _ => config
            .storage
            .url
            .clone()
            .with_context(|| format!("{SUPABASE_URL_ENV} is not set and [storage].url is missing"))?,
    };

    let dir = dir.unwrap_or_else(|| config.storage.upload_dir.clone());
    let bucket = bucket.unwrap_or_else(|| config.storage.bucket.clone());
    let client = StorageClient::with_timeout(url, key, Duration::from_secs(config.storage.request_timeout_secs))
        .context("Failed to create storage client")?;

    client.ensure_bucket(&bucket).await.context("Failed to prepare bucket")?;
    let summary = upload_directory(&client, &bucket, &dir)
        .await
        .with_context(|| format!("Failed to upload {}", dir.display()))?;

    let stats = client.bucket_stats(&bucket).await.context("Failed to read bucket stats")?;
    std::fs::write(&config.storage.stats_file, serde_json::to_string_pretty(&stats)?)
        .with_context(|| format!("Failed to write {}", config.storage.stats_file.display()))?;
    info!(path = %config.storage.stats_file.display(), "Storage stats written");

    if json_output {
        let out = serde_json::json!({ "summary": summary, "stats": stats });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!("{}", "Upload finished".bold().green());
    println!("  Uploaded: {}", summary.uploaded.to_string().green());
    println!("  Failed:   {}", summary.failed.to_string().red());
    println!("  Total:    {}", summary.total);
    println!();
    println!("{}", format!("Bucket '{}'", stats.bucket_name).bold().cyan());
    println!("  Files: {}", stats.total_files);
    println!("  Size:  {} MB", stats.total_size_mb);
    println!("  URL:   {}", stats.supabase_url.dimmed());
    println!();
    Ok(())
}
