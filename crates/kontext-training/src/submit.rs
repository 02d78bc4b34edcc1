use crate::archive::Archive;
use crate::backend::TrainingBackend;
use crate::config::{PipelineOptions, TrainingConfig};
use crate::error::{TrainingError, TrainingResult};
use crate::job::{ModelRef, NewModel, TrainingJob, TrainingRequest};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub job: TrainingJob,
    pub archive_url: String,
    /// True when the destination model had to be created first.
    pub destination_created: bool,
}

/// Create `model` unless it already exists. Returns whether it was created.
pub async fn ensure_destination_model(
    backend: &dyn TrainingBackend,
    model: &ModelRef,
    trigger_word: &str,
) -> TrainingResult<bool> {
    info!(model = %model, "Checking destination model");
    if backend.find_model(model).await?.is_some() {
        info!(model = %model, "Destination model already exists");
        return Ok(false);
    }

    info!(model = %model, "Destination model not found, creating it");
    backend
        .create_model(&NewModel::for_subject(model.clone(), trigger_word))
        .await?;
    info!(model = %model, "Destination model created");
    Ok(true)
}

/// Upload `archive` and start a training for it. Failures are not retried.
pub async fn submit_training(
    backend: &dyn TrainingBackend,
    config: &TrainingConfig,
    options: &PipelineOptions,
    archive: &Archive,
) -> TrainingResult<Submission> {
    let destination = ModelRef::new(options.destination_owner.clone(), config.output_model_name.clone());
    let destination_created = ensure_destination_model(backend, &destination, &config.trigger_word)
        .await
        .map_err(TrainingError::submission)?;

    info!(archive = %archive.path.display(), backend = backend.id(), "Uploading training data");
    let archive_url = backend
        .upload_archive(archive)
        .await
        .map_err(TrainingError::submission)?;

    let request = TrainingRequest::from_config(config, options, archive_url.clone());
    info!(
        destination = %request.destination,
        trainer = %request.trainer_version,
        parameters = %serde_json::to_string(&request.input)?,
        "Starting training"
    );

    let job = backend
        .create_training(&request)
        .await
        .map_err(TrainingError::submission)?;
    info!(job_id = %job.id, status = %job.status, "Training started");

    Ok(Submission { job, archive_url, destination_created })
}
