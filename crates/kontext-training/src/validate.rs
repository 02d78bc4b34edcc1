use crate::dataset::{Dataset, TrainingItem};
use crate::error::{TrainingError, TrainingResult};
use image::{ColorType, ImageReader};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DEFAULT_MIN_DIMENSION: u32 = 512;
pub const DEFAULT_MIN_ITEMS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectionReason {
    /// The file disappeared between collection and validation.
    Missing,
    Undecodable { detail: String },
    TooSmall { width: u32, height: u32, min_dimension: u32 },
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "image not found"),
            Self::Undecodable { detail } => write!(f, "not a decodable image: {detail}"),
            Self::TooSmall { width, height, min_dimension } => {
                write!(f, "image too small: {width}x{height} (shorter side must be >= {min_dimension})")
            }
        }
    }
}

/// A per-item, non-fatal rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRejection {
    pub path: PathBuf,
    pub reason: RejectionReason,
}

/// Accepted image whose colour mode will be flattened to RGB.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorWarning {
    pub path: PathBuf,
    pub color: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub accepted: Dataset,
    pub rejected: Vec<ValidationRejection>,
    pub warnings: Vec<ColorWarning>,
}

/// Filter `dataset` down to images that exist, decode, and are large enough.
///
/// Rejections are logged and collected; they never stop the remaining items
/// from being checked.
pub fn validate_dataset(dataset: &[TrainingItem], min_dimension: u32) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::default();

    for item in dataset {
        match inspect_image(&item.source_path, min_dimension) {
            Ok(color) => {
                if color.channel_count() != 3 {
                    warn!(path = %item.source_path.display(), color = ?color, "Image is not RGB; it is packaged unchanged");
                    outcome.warnings.push(ColorWarning {
                        path: item.source_path.clone(),
                        color: format!("{color:?}"),
                    });
                }
                outcome.accepted.push(item.clone());
            }
            Err(reason) => {
                warn!(path = %item.source_path.display(), reason = %reason, "Image rejected");
                outcome.rejected.push(ValidationRejection { path: item.source_path.clone(), reason });
            }
        }
    }

    info!(
        accepted = outcome.accepted.len(),
        rejected = outcome.rejected.len(),
        non_rgb = outcome.warnings.len(),
        "Dataset validated"
    );
    outcome
}

/// The one hard stop of the pipeline.
pub fn ensure_minimum(outcome: &ValidationOutcome, min_items: usize) -> TrainingResult<()> {
    let found = outcome.accepted.len();
    if found < min_items {
        return Err(TrainingError::InsufficientData { found, required: min_items });
    }
    Ok(())
}

fn inspect_image(path: &Path, min_dimension: u32) -> Result<ColorType, RejectionReason> {
    if !path.is_file() {
        return Err(RejectionReason::Missing);
    }

    let reader = ImageReader::open(path)
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => RejectionReason::Missing,
            _ => RejectionReason::Undecodable { detail: e.to_string() },
        })?
        .with_guessed_format()
        .map_err(|e| RejectionReason::Undecodable { detail: e.to_string() })?;

    let img = reader
        .decode()
        .map_err(|e| RejectionReason::Undecodable { detail: e.to_string() })?;

    let (width, height) = (img.width(), img.height());
    if width.min(height) < min_dimension {
        return Err(RejectionReason::TooSmall { width, height, min_dimension });
    }

    Ok(img.color())
}
