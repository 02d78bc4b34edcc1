//! Thumbnail batch generation against a trained model.

use crate::download::download_as_jpeg;
use crate::error::ApiResult;
use crate::replicate::ReplicateClient;
use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

pub const DEFAULT_MODEL_VERSION: &str =
    "daniel-carreon/danielcarreong:56c9356f9c4f271e294b8533b398f318881f02e1568e4733fc6cacfad1a759bc";

pub const DEFAULT_OUTPUT_DIR: &str = "output/generacion_ai_thumbnail";

const VARIATIONS: [&str; 10] = [
    "He is smiling confidently at the camera.",
    "He is smiling, with one hand raised in a gesturing motion, as if explaining a concept.",
    "He is smiling, looking slightly away from the camera with a thoughtful expression.",
    "He is smiling, leaning slightly forward over a desk with a background of blurred code.",
    "He is smiling warmly, with a soft, approachable look.",
    "He has a serious, focused expression, looking directly at the camera.",
    "He has a thoughtful expression, with his hand on his chin.",
    "He has a neutral, authoritative expression, with arms crossed.",
    "He has a serious expression, looking at a glowing abstract UI element floating in front of him.",
    "He has a mysterious, pensive expression, with dramatic key lighting from one side.",
];

#[must_use]
pub fn base_prompt(trigger: &str) -> String {
    format!(
        "Medium close-up shot of {trigger}, framed from the chest up, for a YouTube thumbnail about AI technology. \
         He is wearing a smart, professional blazer. The background is a modern, minimalist tech office. \
         The image is ultra-sharp, 8k, with cinematic, dramatic lighting."
    )
}

/// Base prompt followed by each of the ten variations.
#[must_use]
pub fn thumbnail_prompts(trigger: &str) -> Vec<String> {
    let base = base_prompt(trigger);
    VARIATIONS.iter().map(|v| format!("{base} {v}")).collect()
}

#[must_use]
pub fn thumbnail_file_name(number: usize) -> String {
    format!("thumbnail_ai_{number}.jpg")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedImage {
    pub number: usize,
    pub prompt: String,
    pub url: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationFailure {
    pub number: usize,
    pub prompt: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    pub model: String,
    pub generated: Vec<GeneratedImage>,
    pub failed: Vec<GenerationFailure>,
}

impl GenerationReport {
    #[must_use]
    pub fn total(&self) -> usize {
        self.generated.len() + self.failed.len()
    }
}

async fn generate_one(client: &ReplicateClient, model: &str, prompt: &str, output: &Path) -> ApiResult<String> {
    let urls = client.run(model, &json!({ "prompt": prompt })).await?;
    let url = urls
        .into_iter()
        .next()
        .ok_or_else(|| crate::error::ApiError::DecodeError("prediction returned no image URL".to_string()))?;
    download_as_jpeg(client.http(), &url, output).await?;
    Ok(url)
}

/// Generate one image per prompt into `output_dir`.
///
/// Images are numbered from 1. A failed prompt is recorded in the report and
/// the batch moves on.
pub async fn generate_batch(
    client: &ReplicateClient,
    model: &str,
    prompts: &[String],
    output_dir: &Path,
) -> ApiResult<GenerationReport> {
    tokio::fs::create_dir_all(output_dir).await?;
    info!(model, output_dir = %output_dir.display(), count = prompts.len(), "Generating image batch");

    let mut report = GenerationReport { model: model.to_string(), ..Default::default() };
    for (i, prompt) in prompts.iter().enumerate() {
        let number = i + 1;
        let path = output_dir.join(thumbnail_file_name(number));
        info!(progress = %format!("{}/{}", number, prompts.len()), "Generating image");

        match generate_one(client, model, prompt, &path).await {
            Ok(url) => report.generated.push(GeneratedImage { number, prompt: prompt.clone(), url, path }),
            Err(e) => {
                warn!(number, error = %e, "Image generation failed");
                report.failed.push(GenerationFailure { number, prompt: prompt.clone(), error: e.to_string() });
            }
        }
    }

    if report.generated.is_empty() && !report.failed.is_empty() {
        error!(model, "No images were generated");
    }
    info!(generated = report.generated.len(), failed = report.failed.len(), "Batch finished");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thumbnail_prompts() {
        let prompts = thumbnail_prompts("DANI");
        assert_eq!(prompts.len(), 10);
        assert!(prompts.iter().all(|p| p.starts_with("Medium close-up shot of DANI,")));
        assert!(prompts[0].ends_with("He is smiling confidently at the camera."));
        assert!(prompts[9].ends_with("dramatic key lighting from one side."));
    }

    #[test]
    fn test_file_names_start_at_one() {
        assert_eq!(thumbnail_file_name(1), "thumbnail_ai_1.jpg");
        assert_eq!(thumbnail_file_name(10), "thumbnail_ai_10.jpg");
    }
}
