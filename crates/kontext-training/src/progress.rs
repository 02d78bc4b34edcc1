use crate::job::{TrainingJobId, TrainingStatus};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    Started { job_id: TrainingJobId },
    Status { job_id: TrainingJobId, status: TrainingStatus },
    Step { job_id: TrainingJobId, step: u64, total: u64 },
    Checkpoint { job_id: TrainingJobId, step: u64 },
    Finished { job_id: TrainingJobId, status: TrainingStatus },
}

pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: ProgressEvent);
}

/// Reports progress through `tracing`.
#[derive(Debug, Default)]
pub struct LogProgressSink;

impl ProgressSink for LogProgressSink {
    fn on_event(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Started { job_id } => info!(%job_id, "Monitoring training"),
            ProgressEvent::Status { job_id, status } => info!(%job_id, %status, "Training status changed"),
            ProgressEvent::Step { job_id, step, total } => {
                let percent = if total == 0 { 0.0 } else { step as f64 / total as f64 * 100.0 };
                info!(%job_id, step, total, percent = %format!("{percent:.1}"), "Training progress");
            }
            ProgressEvent::Checkpoint { job_id, step } => info!(%job_id, step, "Checkpoint saved"),
            ProgressEvent::Finished { job_id, status } => info!(%job_id, %status, "Training finished"),
        }
    }
}
