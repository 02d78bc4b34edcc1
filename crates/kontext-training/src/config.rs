use crate::error::{TrainingError, TrainingResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Immutable configuration shared by every pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub model_name: String,
    pub trigger_word: String,
    pub resolution: u32,
    pub max_train_steps: u64,
    pub learning_rate: f64,
    pub batch_size: u32,
    pub save_steps: u64,
    pub validation_prompt: String,
    pub output_model_name: String,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            model_name: "black-forest-labs/flux-kontext-dev".to_string(),
            trigger_word: "DANI".to_string(),
            resolution: 1024,
            max_train_steps: 1000,
            learning_rate: 1e-4,
            batch_size: 1,
            save_steps: 250,
            validation_prompt: "DANI portrait for tech review thumbnail".to_string(),
            output_model_name: "daniel-flux-kontext-v2".to_string(),
        }
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> TrainingResult<()> {
        if self.trigger_word.trim().is_empty() {
            return Err(TrainingError::Configuration("trigger_word is required".to_string()));
        }
        if self.output_model_name.trim().is_empty() {
            return Err(TrainingError::Configuration("output_model_name is required".to_string()));
        }
        if self.resolution == 0 {
            return Err(TrainingError::Configuration("resolution must be >= 1".to_string()));
        }
        if self.max_train_steps == 0 {
            return Err(TrainingError::Configuration("max_train_steps must be >= 1".to_string()));
        }
        if !(self.learning_rate.is_finite()) || self.learning_rate <= 0.0 {
            return Err(TrainingError::Configuration("learning_rate must be > 0".to_string()));
        }
        if self.batch_size == 0 {
            return Err(TrainingError::Configuration("batch_size must be >= 1".to_string()));
        }
        if self.save_steps == 0 {
            return Err(TrainingError::Configuration("save_steps must be >= 1".to_string()));
        }
        Ok(())
    }
}

/// Tunables for the stages that are not part of the training request itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    /// Cap on collected images, independent of the directory size.
    pub max_items: usize,
    /// Lower bound on the shorter image side, in pixels.
    pub min_dimension: u32,
    /// Minimum number of images that must survive validation.
    pub min_items: usize,
    pub include_extensions: Vec<String>,
    /// Owner of the destination model (`owner/output_model_name`).
    pub destination_owner: String,
    /// Trainer version used for LoRA training (`owner/name:version`).
    pub trainer_version: String,
    pub lora_type: String,
    pub poll_interval_secs: u64,
    pub timeout_secs: u64,
    pub progress_every_steps: u64,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_items: 20,
            min_dimension: 512,
            min_items: 5,
            include_extensions: vec![
                "jpg".to_string(),
                "jpeg".to_string(),
                "png".to_string(),
                "webp".to_string(),
            ],
            destination_owner: "daniel-carreon".to_string(),
            trainer_version: "replicate/fast-flux-trainer:8b10794665aed907bb98a1a5324cd1d3a8bea0e9b31e65210967fb9c9e2e08ed".to_string(),
            lora_type: "subject".to_string(),
            poll_interval_secs: 15,
            timeout_secs: 2 * 60 * 60,
            progress_every_steps: 50,
        }
    }
}

impl PipelineOptions {
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> TrainingResult<()> {
        if self.max_items == 0 {
            return Err(TrainingError::Configuration("max_items must be >= 1".to_string()));
        }
        if self.min_items > self.max_items {
            return Err(TrainingError::Configuration(format!(
                "min_items ({}) cannot exceed max_items ({})",
                self.min_items, self.max_items
            )));
        }
        if self.destination_owner.trim().is_empty() {
            return Err(TrainingError::Configuration("destination_owner is required".to_string()));
        }
        if !self.trainer_version.contains(':') {
            return Err(TrainingError::Configuration(format!(
                "trainer_version must look like owner/name:version, got {}",
                self.trainer_version
            )));
        }
        if self.progress_every_steps == 0 {
            return Err(TrainingError::Configuration("progress_every_steps must be >= 1".to_string()));
        }
        if self.poll_interval_secs == 0 {
            return Err(TrainingError::Configuration("poll_interval_secs must be >= 1".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(TrainingError::Configuration("timeout_secs must be >= 1".to_string()));
        }
        Ok(())
    }
}
