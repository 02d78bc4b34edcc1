//! Command implementations for the Kontext CLI.

pub mod generate;
pub mod predict;
pub mod submit;
pub mod train;
pub mod upload;
pub mod version;

use crate::config::{CliConfig, REPLICATE_TOKEN_ENV, require_env};
use anyhow::{Context, Result};
use kontext_remote::ReplicateClient;

/// Build the Replicate client. Fails before any request when the `[replicate]`
/// section is invalid or the token is missing.
pub fn replicate_client(config: &CliConfig) -> Result<ReplicateClient> {
    config.replicate.validate()?;
    let token = require_env(REPLICATE_TOKEN_ENV)?;
    ReplicateClient::with_settings(token, config.replicate.settings()).context("Failed to create Replicate client")
}
