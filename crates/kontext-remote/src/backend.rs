//! `kontext-training` seams implemented on top of Replicate.

use crate::replicate::{error_text, ReplicateClient};
use async_trait::async_trait;
use kontext_training::{
    Archive, ImageGenerator, ModelRef, NewModel, RemoteModel, TrainingBackend, TrainingJob, TrainingJobId,
    TrainingRequest, TrainingResult, TrainingSnapshot, TrainingStatus,
};
use serde_json::json;

#[async_trait]
impl TrainingBackend for ReplicateClient {
    fn id(&self) -> &'static str {
        "replicate"
    }

    async fn find_model(&self, model: &ModelRef) -> TrainingResult<Option<RemoteModel>> {
        let info = self.get_model(model).await?;
        Ok(info.map(|info| RemoteModel {
            model: ModelRef::new(info.owner, info.name),
            latest_version: info.latest_version.map(|v| v.id),
        }))
    }

    async fn create_model(&self, model: &NewModel) -> TrainingResult<RemoteModel> {
        let info = ReplicateClient::create_model(self, model).await?;
        Ok(RemoteModel {
            model: ModelRef::new(info.owner, info.name),
            latest_version: info.latest_version.map(|v| v.id),
        })
    }

    async fn upload_archive(&self, archive: &Archive) -> TrainingResult<String> {
        Ok(self.upload_file(&archive.path).await?)
    }

    async fn create_training(&self, request: &TrainingRequest) -> TrainingResult<TrainingJob> {
        let training = ReplicateClient::create_training(self, request).await?;
        Ok(TrainingJob {
            id: TrainingJobId(training.id),
            status: TrainingStatus::from_remote(&training.status),
            destination: request.destination.to_string(),
        })
    }

    async fn training_status(&self, job_id: &TrainingJobId) -> TrainingResult<TrainingSnapshot> {
        let training = self.get_training(&job_id.0).await?;
        Ok(TrainingSnapshot {
            status: TrainingStatus::from_remote(&training.status),
            error: error_text(training.error.as_ref()),
            logs: training.logs,
            model_version: training.output.and_then(|o| o.version),
        })
    }
}

#[async_trait]
impl ImageGenerator for ReplicateClient {
    async fn generate(&self, model: &str, prompt: &str) -> TrainingResult<Vec<String>> {
        Ok(self.run(model, &json!({ "prompt": prompt })).await?)
    }
}
