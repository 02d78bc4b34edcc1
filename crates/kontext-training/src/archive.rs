use crate::config::TrainingConfig;
use crate::dataset::TrainingItem;
use crate::error::{TrainingError, TrainingResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const MANIFEST_NAME: &str = "config.json";

/// Summary written as the last entry of every archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveManifest {
    pub trigger_word: String,
    pub resolution: u32,
    pub total_images: usize,
}

/// A packaged training set on local disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Archive {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub image_count: usize,
    pub sha256: String,
}

impl Archive {
    #[must_use]
    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / 1024.0 / 1024.0
    }
}

#[must_use]
pub fn image_entry_name(index: usize, source: &Path) -> String {
    format!("image_{index:03}.{}", image_extension(source))
}

#[must_use]
pub fn caption_entry_name(index: usize) -> String {
    format!("image_{index:03}.txt")
}

fn image_extension(source: &Path) -> String {
    match source.extension().and_then(|e| e.to_str()).map(str::to_lowercase) {
        Some(ext) if ext == "jpeg" => "jpg".to_string(),
        Some(ext) if !ext.is_empty() => ext,
        _ => "jpg".to_string(),
    }
}

/// Write `dataset` plus captions and a manifest to a zip at `target`.
///
/// The archive is assembled in a temporary file next to `target` and only
/// moved into place once complete; on failure nothing is left at `target`.
pub fn package_dataset(dataset: &[TrainingItem], config: &TrainingConfig, target: &Path) -> TrainingResult<Archive> {
    let dir = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)
        .map_err(|e| TrainingError::Packaging(format!("cannot create {}: {e}", dir.display())))?;

    let mut tmp = NamedTempFile::new_in(&dir)
        .map_err(|e| TrainingError::Packaging(format!("cannot create temp file in {}: {e}", dir.display())))?;

    write_entries(tmp.as_file_mut(), dataset, config)?;

    tmp.persist(target)
        .map_err(|e| TrainingError::Packaging(format!("cannot write {}: {}", target.display(), e.error)))?;

    let archive = Archive {
        path: target.to_path_buf(),
        size_bytes: file_size(target)?,
        image_count: dataset.len(),
        sha256: sha256_file(target)?,
    };

    info!(
        path = %archive.path.display(),
        images = archive.image_count,
        size_mb = %format!("{:.1}", archive.size_mb()),
        "Training archive created"
    );
    Ok(archive)
}

fn write_entries(file: &mut std::fs::File, dataset: &[TrainingItem], config: &TrainingConfig) -> TrainingResult<()> {
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (index, item) in dataset.iter().enumerate() {
        let bytes = std::fs::read(&item.source_path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => TrainingError::FileNotFound(item.source_path.clone()),
            _ => TrainingError::Packaging(format!("cannot read {}: {e}", item.source_path.display())),
        })?;

        let image_name = image_entry_name(index, &item.source_path);
        debug!(entry = %image_name, source = %item.source_path.display(), "Adding image");
        add_entry(&mut zip, &image_name, &bytes, options)?;
        add_entry(&mut zip, &caption_entry_name(index), item.caption.as_bytes(), options)?;
    }

    let manifest = ArchiveManifest {
        trigger_word: config.trigger_word.clone(),
        resolution: config.resolution,
        total_images: dataset.len(),
    };
    add_entry(&mut zip, MANIFEST_NAME, serde_json::to_string_pretty(&manifest)?.as_bytes(), options)?;

    zip.finish().map_err(|e| TrainingError::Packaging(e.to_string()))?;
    Ok(())
}

fn add_entry<W: Write + std::io::Seek>(
    zip: &mut ZipWriter<W>,
    name: &str,
    bytes: &[u8],
    options: SimpleFileOptions,
) -> TrainingResult<()> {
    zip.start_file(name, options)
        .map_err(|e| TrainingError::Packaging(format!("{name}: {e}")))?;
    zip.write_all(bytes)
        .map_err(|e| TrainingError::Packaging(format!("{name}: {e}")))?;
    Ok(())
}

/// Describe an existing archive, e.g. one packaged by an earlier run.
///
/// The image count comes from the manifest when present, otherwise from the
/// non-caption entries.
pub fn open_archive(path: &Path) -> TrainingResult<Archive> {
    if !path.is_file() {
        return Err(TrainingError::FileNotFound(path.to_path_buf()));
    }
    let file = std::fs::File::open(path)?;
    let mut zip = zip::ZipArchive::new(file)
        .map_err(|e| TrainingError::Packaging(format!("{} is not a zip archive: {e}", path.display())))?;

    let manifest: Option<ArchiveManifest> = match zip.by_name(MANIFEST_NAME) {
        Ok(entry) => Some(serde_json::from_reader(entry)?),
        Err(_) => None,
    };
    let image_count = manifest.map_or_else(
        || {
            zip.file_names()
                .filter(|n| !n.ends_with('/') && !n.ends_with(".txt") && *n != MANIFEST_NAME)
                .count()
        },
        |m| m.total_images,
    );

    Ok(Archive {
        path: path.to_path_buf(),
        size_bytes: file_size(path)?,
        image_count,
        sha256: sha256_file(path)?,
    })
}

fn file_size(path: &Path) -> TrainingResult<u64> {
    std::fs::metadata(path)
        .map(|m| m.len())
        .map_err(|e| TrainingError::Packaging(format!("cannot stat {}: {e}", path.display())))
}

pub fn sha256_file(path: &Path) -> TrainingResult<String> {
    let hash_error = |e: std::io::Error| TrainingError::Packaging(format!("cannot hash {}: {e}", path.display()));
    let mut file = std::fs::File::open(path).map_err(hash_error)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher).map_err(hash_error)?;
    Ok(hex::encode(hasher.finalize()))
}
