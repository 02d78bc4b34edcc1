//! Kontext Training
//!
//! Training-data preparation and submission pipeline for remote LoRA
//! fine-tuning:
//! - Collecting and captioning source images (`collect_dataset`)
//! - Validating them and enforcing a minimum viable count
//! - Packaging images, captions and a manifest into one archive
//! - Submitting, monitoring and smoke-testing the remote training
//!   through the `TrainingBackend` and `ImageGenerator` seams

pub mod archive;
pub mod backend;
pub mod config;
pub mod dataset;
pub mod error;
pub mod job;
pub mod layout;
pub mod monitor;
pub mod pipeline;
pub mod progress;
pub mod submit;
pub mod validate;
pub mod verify;

pub use archive::{open_archive, package_dataset, Archive, ArchiveManifest};
pub use backend::{ImageGenerator, TrainingBackend, TrainingSnapshot};
pub use config::{PipelineOptions, TrainingConfig};
pub use dataset::{collect_dataset, CollectOptions, Dataset, TrainingItem};
pub use error::{TrainingError, TrainingResult};
pub use job::{ModelRef, NewModel, RemoteModel, TrainingJob, TrainingJobId, TrainingRequest, TrainingStatus};
pub use layout::TrainingLayout;
pub use monitor::{monitor_training, MonitorOptions, MonitorOutcome};
pub use pipeline::{Pipeline, PipelineReport};
pub use progress::{LogProgressSink, ProgressEvent, ProgressSink};
pub use submit::{ensure_destination_model, submit_training, Submission};
pub use validate::{ensure_minimum, validate_dataset, RejectionReason, ValidationOutcome, ValidationRejection};
pub use verify::{verification_prompts, verify_model, VerificationReport};
