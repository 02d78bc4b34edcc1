use crate::archive::Archive;
use crate::error::TrainingResult;
use crate::job::{ModelRef, NewModel, RemoteModel, TrainingJob, TrainingJobId, TrainingRequest, TrainingStatus};
use async_trait::async_trait;

/// One observation of a remote training job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingSnapshot {
    pub status: TrainingStatus,
    /// Raw trainer logs, if the backend exposes them.
    pub logs: Option<String>,
    /// Model version produced by a finished training (`owner/name:version`).
    pub model_version: Option<String>,
    pub error: Option<String>,
}

/// Remote service that hosts destination models and runs trainings.
#[async_trait]
pub trait TrainingBackend: Send + Sync {
    fn id(&self) -> &'static str;

    /// `Ok(None)` when the model does not exist yet.
    async fn find_model(&self, model: &ModelRef) -> TrainingResult<Option<RemoteModel>>;

    async fn create_model(&self, model: &NewModel) -> TrainingResult<RemoteModel>;

    /// Make the archive reachable by the trainer and return its URL.
    async fn upload_archive(&self, archive: &Archive) -> TrainingResult<String>;

    async fn create_training(&self, request: &TrainingRequest) -> TrainingResult<TrainingJob>;

    async fn training_status(&self, job_id: &TrainingJobId) -> TrainingResult<TrainingSnapshot>;
}

/// Remote text-to-image inference.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Run `prompt` against `model` (`owner/name` or `owner/name:version`)
    /// and return the output URLs.
    async fn generate(&self, model: &str, prompt: &str) -> TrainingResult<Vec<String>>;
}
