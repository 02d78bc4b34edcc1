use crate::error::{TrainingError, TrainingResult};
use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Caption templates cycled by position; `{trigger}` is replaced by the trigger word.
pub const CAPTION_TEMPLATES: [&str; 5] = [
    "{trigger} portrait",
    "{trigger} professional headshot",
    "{trigger} tech review thumbnail",
    "{trigger} content creator photo",
    "{trigger} youtube thumbnail style",
];

/// A single source image paired with its caption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingItem {
    pub source_path: PathBuf,
    pub caption: String,
    pub trigger_word: String,
}

/// Ordered training items, in discovery order.
pub type Dataset = Vec<TrainingItem>;

#[derive(Debug, Clone)]
pub struct CollectOptions {
    pub max_items: usize,
    pub include_extensions: Vec<String>,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            max_items: 20,
            include_extensions: vec!["jpg", "jpeg", "png", "webp"].into_iter().map(String::from).collect(),
        }
    }
}

/// Caption for the item at `index`.
#[must_use]
pub fn caption_for(index: usize, trigger_word: &str) -> String {
    CAPTION_TEMPLATES[index % CAPTION_TEMPLATES.len()].replace("{trigger}", trigger_word)
}

/// Collect up to `options.max_items` images from `source_dir`.
///
/// Entries are sorted by file name so that an identical listing always yields
/// identical caption assignments. Only the top level of the directory is read.
pub fn collect_dataset(source_dir: &Path, trigger_word: &str, options: &CollectOptions) -> TrainingResult<Dataset> {
    if !source_dir.is_dir() {
        return Err(TrainingError::DirectoryNotFound(source_dir.to_path_buf()));
    }

    let mut builder = WalkBuilder::new(source_dir);
    // Source folders are often git-ignored; only hidden files are skipped.
    builder
        .standard_filters(false)
        .hidden(true)
        .max_depth(Some(1))
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b));

    let mut found = 0usize;
    let mut dataset = Dataset::new();
    for entry in builder.build() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                debug!(error = %e, "Skipping unreadable directory entry");
                continue;
            }
        };

        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }

        let path = entry.path();
        if !is_allowed_extension(path, &options.include_extensions) {
            continue;
        }

        found += 1;
        if dataset.len() < options.max_items {
            dataset.push(TrainingItem {
                source_path: path.to_path_buf(),
                caption: caption_for(dataset.len(), trigger_word),
                trigger_word: trigger_word.to_string(),
            });
        }
    }

    info!(
        source_dir = %source_dir.display(),
        found,
        collected = dataset.len(),
        cap = options.max_items,
        "Dataset collected"
    );
    Ok(dataset)
}

fn is_allowed_extension(path: &Path, allowed: &[String]) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    let ext = ext.to_lowercase();
    allowed.iter().any(|a| a.eq_ignore_ascii_case(&ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"not really an image").unwrap();
    }

    #[test]
    fn test_missing_directory() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope");
        let err = collect_dataset(&missing, "DANI", &CollectOptions::default()).unwrap_err();
        assert!(matches!(err, TrainingError::DirectoryNotFound(p) if p == missing));
    }

    #[test]
    fn test_collect_caps_and_filters_extensions() {
        let temp = TempDir::new().unwrap();
        for i in 0..8 {
            touch(temp.path(), &format!("img_{i}.jpg"));
        }
        touch(temp.path(), "notes.txt");
        std::fs::create_dir(temp.path().join("nested.jpg")).unwrap();

        let options = CollectOptions { max_items: 6, ..Default::default() };
        let ds = collect_dataset(temp.path(), "DANI", &options).unwrap();

        assert_eq!(ds.len(), 6);
        assert!(ds.iter().all(|item| item.source_path.extension().unwrap() == "jpg"));
        assert!(ds.iter().all(|item| item.trigger_word == "DANI"));
    }

    #[test]
    fn test_captions_cycle_by_position() {
        let temp = TempDir::new().unwrap();
        for i in 0..7 {
            touch(temp.path(), &format!("{i:02}.png"));
        }

        let ds = collect_dataset(temp.path(), "DANI", &CollectOptions::default()).unwrap();
        assert_eq!(ds[0].caption, "DANI portrait");
        assert_eq!(ds[4].caption, "DANI youtube thumbnail style");
        assert_eq!(ds[5].caption, "DANI portrait");
        assert_eq!(ds[6].caption, "DANI professional headshot");
    }

    #[test]
    fn test_collection_is_deterministic() {
        let temp = TempDir::new().unwrap();
        for name in ["c.jpg", "a.JPG", "b.jpeg", "e.webp", "d.png"] {
            touch(temp.path(), name);
        }

        let first = collect_dataset(temp.path(), "DANI", &CollectOptions::default()).unwrap();
        let second = collect_dataset(temp.path(), "DANI", &CollectOptions::default()).unwrap();
        assert_eq!(first, second);

        let names: Vec<_> = first
            .iter()
            .map(|i| i.source_path.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.JPG", "b.jpeg", "c.jpg", "d.png", "e.webp"]);
    }
}
