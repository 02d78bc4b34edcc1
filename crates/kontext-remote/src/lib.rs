//! Remote collaborators for Kontext.
//!
//! # Services
//!
//! - **Replicate**: model lookup/creation, file upload, trainings and
//!   predictions. `ReplicateClient` implements the `TrainingBackend` and
//!   `ImageGenerator` traits from `kontext-training`.
//! - **Supabase Storage**: bucket management and bulk JPEG upload.

pub mod backend;
pub mod batch;
pub mod download;
pub mod error;
pub mod replicate;
pub mod storage;

pub use batch::{generate_batch, thumbnail_prompts, GenerationReport};
pub use download::{download_as_jpeg, save_as_jpeg};
pub use error::{ApiError, ApiResult};
pub use replicate::{output_urls, ReplicateClient, ReplicateSettings};
pub use storage::{upload_directory, StorageClient, StorageStats, UploadSummary};
