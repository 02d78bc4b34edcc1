use crate::error::{TrainingError, TrainingResult};
use std::path::{Path, PathBuf};

/// Filesystem layout for the files a pipeline run produces.
///
/// Default layout is `<output_dir>/training_data.zip` and
/// `<output_dir>/pipeline_report.json`.
#[derive(Debug, Clone)]
pub struct TrainingLayout {
    root: PathBuf,
}

impl TrainingLayout {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn archive_path(&self) -> PathBuf {
        self.root.join("training_data.zip")
    }

    #[must_use]
    pub fn report_path(&self) -> PathBuf {
        self.root.join("pipeline_report.json")
    }

    pub fn ensure_dirs(&self) -> TrainingResult<()> {
        std::fs::create_dir_all(&self.root)
            .map_err(|e| TrainingError::Packaging(format!("cannot create {}: {e}", self.root.display())))
    }
}
