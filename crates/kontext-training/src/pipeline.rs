//! The six-stage training pipeline.
//!
//! collect → validate → package → submit → monitor → verify. Each stage
//! consumes the previous stage's output and any stage error aborts the run.
//! Per-image validation rejections are the only failures that do not.

use crate::archive::{package_dataset, Archive};
use crate::backend::{ImageGenerator, TrainingBackend};
use crate::config::{PipelineOptions, TrainingConfig};
use crate::dataset::{collect_dataset, CollectOptions};
use crate::error::TrainingResult;
use crate::layout::TrainingLayout;
use crate::monitor::{monitor_training, MonitorOptions, MonitorOutcome};
use crate::progress::ProgressSink;
use crate::submit::{submit_training, Submission};
use crate::validate::{ensure_minimum, validate_dataset, ValidationRejection};
use crate::verify::{verification_prompts, verify_model, VerificationReport};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{error, info};

/// Everything a successful run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub collected: usize,
    pub accepted: usize,
    pub rejected: Vec<ValidationRejection>,
    pub archive: Archive,
    pub submission: Submission,
    pub monitor: MonitorOutcome,
    pub verification: VerificationReport,
}

/// Pipeline collaborators and inputs for one run.
pub struct Pipeline<'a> {
    pub config: TrainingConfig,
    pub options: PipelineOptions,
    pub source_dir: PathBuf,
    pub layout: TrainingLayout,
    pub backend: &'a dyn TrainingBackend,
    pub generator: &'a dyn ImageGenerator,
    pub progress: &'a dyn ProgressSink,
}

impl Pipeline<'_> {
    /// Run all stages and write the report next to the archive.
    pub async fn run(&self) -> TrainingResult<PipelineReport> {
        info!(source_dir = %self.source_dir.display(), "Starting training pipeline");
        match self.run_stages().await {
            Ok(report) => {
                info!(job_id = %report.submission.job.id, "Training pipeline completed");
                Ok(report)
            }
            Err(e) => {
                error!(error = %e, "Training pipeline failed");
                Err(e)
            }
        }
    }

    async fn run_stages(&self) -> TrainingResult<PipelineReport> {
        let started_at = Utc::now();
        self.config.validate()?;
        self.options.validate()?;

        let collect_options = CollectOptions {
            max_items: self.options.max_items,
            include_extensions: self.options.include_extensions.clone(),
        };
        let dataset = collect_dataset(&self.source_dir, &self.config.trigger_word, &collect_options)?;
        let collected = dataset.len();

        let outcome = validate_dataset(&dataset, self.options.min_dimension);
        ensure_minimum(&outcome, self.options.min_items)?;

        self.layout.ensure_dirs()?;
        let archive = package_dataset(&outcome.accepted, &self.config, &self.layout.archive_path())?;

        let submission = submit_training(self.backend, &self.config, &self.options, &archive).await?;

        let monitor_options = MonitorOptions::new(&self.config, &self.options);
        let monitor = monitor_training(self.backend, &submission.job, &monitor_options, self.progress).await?;

        let model = monitor
            .model_version
            .clone()
            .unwrap_or_else(|| submission.job.destination.clone());
        let prompts = verification_prompts(&self.config.trigger_word);
        let verification = verify_model(self.generator, &model, &prompts).await?;

        let report = PipelineReport {
            started_at,
            finished_at: Utc::now(),
            collected,
            accepted: outcome.accepted.len(),
            rejected: outcome.rejected,
            archive,
            submission,
            monitor,
            verification,
        };

        let report_path = self.layout.report_path();
        std::fs::write(&report_path, serde_json::to_string_pretty(&report)?)?;
        info!(path = %report_path.display(), "Pipeline report written");
        Ok(report)
    }
}
