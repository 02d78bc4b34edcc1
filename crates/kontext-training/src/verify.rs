use crate::backend::ImageGenerator;
use crate::error::{TrainingError, TrainingResult};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const VERIFICATION_TEMPLATES: [&str; 4] = [
    "{trigger} portrait for tech review thumbnail",
    "{trigger} professional headshot",
    "{trigger} content creator photo",
    "{trigger} youtube thumbnail style",
];

#[must_use]
pub fn verification_prompts(trigger_word: &str) -> Vec<String> {
    VERIFICATION_TEMPLATES.iter().map(|t| t.replace("{trigger}", trigger_word)).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationAttempt {
    pub prompt: String,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub model: String,
    pub attempts: Vec<VerificationAttempt>,
}

impl VerificationReport {
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.attempts.iter().filter(|a| a.error.is_none()).count()
    }
}

/// Smoke-check a trained model with a small prompt batch.
///
/// Outputs are logged, not scored. Fails only when every attempt failed.
pub async fn verify_model(
    generator: &dyn ImageGenerator,
    model: &str,
    prompts: &[String],
) -> TrainingResult<VerificationReport> {
    let mut attempts = Vec::with_capacity(prompts.len());

    for (i, prompt) in prompts.iter().enumerate() {
        info!(model, attempt = i + 1, total = prompts.len(), prompt = %prompt, "Generating test image");
        match generator.generate(model, prompt).await {
            Ok(outputs) => {
                info!(attempt = i + 1, outputs = ?outputs, "Test image generated");
                attempts.push(VerificationAttempt { prompt: prompt.clone(), outputs, error: None });
            }
            Err(e) => {
                warn!(attempt = i + 1, error = %e, "Test image generation failed");
                attempts.push(VerificationAttempt { prompt: prompt.clone(), outputs: Vec::new(), error: Some(e.to_string()) });
            }
        }
    }

    let report = VerificationReport { model: model.to_string(), attempts };
    if !prompts.is_empty() && report.succeeded() == 0 {
        return Err(TrainingError::Verification(format!(
            "all {} test generations failed for {model}",
            prompts.len()
        )));
    }

    info!(model, succeeded = report.succeeded(), total = prompts.len(), "Test image generation completed");
    Ok(report)
}
