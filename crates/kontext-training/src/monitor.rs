//! Polling monitor for remote training jobs.
//!
//! The remote job is polled at a fixed interval until it reaches a terminal
//! status or the timeout elapses. Step counts are read from the trainer logs
//! and turned into progress and checkpoint events.

use crate::backend::TrainingBackend;
use crate::config::{PipelineOptions, TrainingConfig};
use crate::error::{TrainingError, TrainingResult};
use crate::job::{TrainingJob, TrainingJobId, TrainingStatus};
use crate::progress::{ProgressEvent, ProgressSink};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

// Matches tqdm bars (`| 120/1000 [`) and plain `step 120/1000` lines.
static STEP_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\||(?i:step))\s*(\d+)\s*/\s*(\d+)").expect("step pattern is valid")
});

#[derive(Debug, Clone)]
pub struct MonitorOptions {
    pub poll_interval: Duration,
    pub timeout: Duration,
    pub progress_every_steps: u64,
    pub save_steps: u64,
    pub max_train_steps: u64,
}

impl MonitorOptions {
    #[must_use]
    pub fn new(config: &TrainingConfig, options: &PipelineOptions) -> Self {
        Self {
            poll_interval: options.poll_interval(),
            timeout: options.timeout(),
            progress_every_steps: options.progress_every_steps,
            save_steps: config.save_steps,
            max_train_steps: config.max_train_steps,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorOutcome {
    pub job: TrainingJob,
    pub final_step: Option<u64>,
    pub model_version: Option<String>,
    pub polls: u32,
}

/// Latest training step in `logs`.
///
/// Only markers counting towards `total_steps` are training progress; other
/// bars (latent caching, weight upload) share the same shape and are skipped.
#[must_use]
pub fn parse_latest_step(logs: &str, total_steps: u64) -> Option<u64> {
    STEP_PATTERN
        .captures_iter(logs)
        .filter_map(|c| Some((c[1].parse::<u64>().ok()?, c[2].parse::<u64>().ok()?)))
        .filter(|&(step, total)| total == total_steps && step <= total)
        .map(|(step, _)| step)
        .last()
}

/// Turns raw step observations into cadence-aligned events.
#[derive(Debug)]
struct StepTracker {
    last_step: u64,
    progress_every: u64,
    save_steps: u64,
    total: u64,
}

impl StepTracker {
    fn observe(&mut self, job_id: &TrainingJobId, step: u64, sink: &dyn ProgressSink) {
        if step <= self.last_step {
            return;
        }

        if step / self.progress_every > self.last_step / self.progress_every {
            sink.on_event(ProgressEvent::Step { job_id: job_id.clone(), step, total: self.total });
        }

        if self.save_steps > 0 {
            let mut next = (self.last_step / self.save_steps + 1) * self.save_steps;
            while next <= step {
                sink.on_event(ProgressEvent::Checkpoint { job_id: job_id.clone(), step: next });
                next += self.save_steps;
            }
        }

        self.last_step = step;
    }
}

/// Poll `job` until it finishes, fails, or `options.timeout` elapses.
///
/// A job still running at the timeout is reported as `TrainingError::Timeout`.
pub async fn monitor_training(
    backend: &dyn TrainingBackend,
    job: &TrainingJob,
    options: &MonitorOptions,
    sink: &dyn ProgressSink,
) -> TrainingResult<MonitorOutcome> {
    sink.on_event(ProgressEvent::Started { job_id: job.id.clone() });

    let started = Instant::now();
    let mut tracker = StepTracker {
        last_step: 0,
        progress_every: options.progress_every_steps.max(1),
        save_steps: options.save_steps,
        total: options.max_train_steps,
    };
    let mut status = job.status;
    let mut final_step = None;
    let mut polls = 0u32;

    loop {
        let snapshot = backend.training_status(&job.id).await?;
        polls += 1;
        debug!(job_id = %job.id, status = %snapshot.status, polls, "Polled training");

        if snapshot.status != status {
            status = snapshot.status;
            sink.on_event(ProgressEvent::Status { job_id: job.id.clone(), status });
        }

        let step = snapshot
            .logs
            .as_deref()
            .and_then(|logs| parse_latest_step(logs, options.max_train_steps));
        if let Some(step) = step {
            tracker.observe(&job.id, step, sink);
            final_step = Some(step);
        }

        if status.is_terminal() {
            sink.on_event(ProgressEvent::Finished { job_id: job.id.clone(), status });
            if status != TrainingStatus::Succeeded {
                if let Some(error) = &snapshot.error {
                    warn!(job_id = %job.id, error = %error, "Training reported an error");
                }
                return Err(TrainingError::TrainingFailed { job_id: job.id.to_string(), status: status.to_string() });
            }

            return Ok(MonitorOutcome {
                job: TrainingJob { status, ..job.clone() },
                final_step,
                model_version: snapshot.model_version,
                polls,
            });
        }

        let elapsed = started.elapsed();
        if elapsed >= options.timeout {
            warn!(job_id = %job.id, status = %status, "Training did not finish before the timeout");
            return Err(TrainingError::Timeout { job_id: job.id.to_string(), seconds: options.timeout.as_secs() });
        }

        tokio::time::sleep(options.poll_interval.min(options.timeout - elapsed)).await;
    }
}
