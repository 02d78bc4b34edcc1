use crate::config::{PipelineOptions, TrainingConfig};
use crate::error::{TrainingError, TrainingResult};
use serde::{Deserialize, Serialize};

/// Opaque identifier issued by the remote trainer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrainingJobId(pub String);

impl std::fmt::Display for TrainingJobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingStatus {
    Starting,
    Processing,
    Succeeded,
    Failed,
    Canceled,
}

impl TrainingStatus {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }

    /// Map a remote status string; unknown values are treated as still running.
    #[must_use]
    pub fn from_remote(status: &str) -> Self {
        match status {
            "starting" => Self::Starting,
            "succeeded" => Self::Succeeded,
            "failed" => Self::Failed,
            "canceled" | "cancelled" => Self::Canceled,
            _ => Self::Processing,
        }
    }
}

impl std::fmt::Display for TrainingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Starting => "starting",
            Self::Processing => "processing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingJob {
    pub id: TrainingJobId,
    pub status: TrainingStatus,
    /// Destination model, `owner/name`.
    pub destination: String,
}

/// `owner/name` reference to a remote model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelRef {
    pub owner: String,
    pub name: String,
}

impl ModelRef {
    #[must_use]
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self { owner: owner.into(), name: name.into() }
    }

    pub fn parse(s: &str) -> TrainingResult<Self> {
        let base = s.split(':').next().unwrap_or(s);
        match base.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self::new(owner, name))
            }
            _ => Err(TrainingError::Configuration(format!("invalid model reference (expected owner/name): {s}"))),
        }
    }
}

impl std::fmt::Display for ModelRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Remote model as reported by the existence check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteModel {
    pub model: ModelRef,
    #[serde(default)]
    pub latest_version: Option<String>,
}

/// Settings used when the destination model has to be created first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewModel {
    pub model: ModelRef,
    pub visibility: String,
    pub hardware: String,
    pub description: String,
}

impl NewModel {
    #[must_use]
    pub fn for_subject(model: ModelRef, trigger_word: &str) -> Self {
        Self {
            model,
            visibility: "public".to_string(),
            // Overridden by the trainer's own hardware.
            hardware: "gpu-t4".to_string(),
            description: format!("Fine-tuned model for subject: {trigger_word}"),
        }
    }
}

/// Payload for starting a LoRA training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRequest {
    /// Trainer version, `owner/name:version`.
    pub trainer_version: String,
    pub destination: ModelRef,
    pub input: TrainingInput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingInput {
    pub input_images: String,
    pub trigger_word: String,
    pub lora_type: String,
    pub max_train_steps: u64,
    pub learning_rate: f64,
    pub resolution: u32,
    pub batch_size: u32,
    pub save_steps: u64,
}

impl TrainingRequest {
    #[must_use]
    pub fn from_config(config: &TrainingConfig, options: &PipelineOptions, archive_url: String) -> Self {
        Self {
            trainer_version: options.trainer_version.clone(),
            destination: ModelRef::new(options.destination_owner.clone(), config.output_model_name.clone()),
            input: TrainingInput {
                input_images: archive_url,
                trigger_word: config.trigger_word.clone(),
                lora_type: options.lora_type.clone(),
                max_train_steps: config.max_train_steps,
                learning_rate: config.learning_rate,
                resolution: config.resolution,
                batch_size: config.batch_size,
                save_steps: config.save_steps,
            },
        }
    }
}
