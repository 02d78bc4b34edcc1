//! Replicate HTTP client.
//!
//! Covers the parts of the Replicate API the pipeline needs: model lookup and
//! creation, file upload, trainings, and predictions.
//!
//! ```no_run
//! use kontext_remote::ReplicateClient;
//!
//! # async fn example() -> Result<(), kontext_remote::ApiError> {
//! let client = ReplicateClient::new("r8_...".to_string())?;
//! let urls = client
//!     .run("daniel-carreon/daniel-flux-lora", &serde_json::json!({"prompt": "DANIELC portrait"}))
//!     .await?;
//! println!("{}", urls[0]);
//! # Ok(())
//! # }
//! ```

use crate::error::{ApiError, ApiResult};
use kontext_training::{ModelRef, NewModel, TrainingRequest};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

pub const DEFAULT_BASE_URL: &str = "https://api.replicate.com/v1";

/// Connection and polling settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicateSettings {
    pub base_url: String,
    /// Per-request timeout applied to every HTTP call.
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    /// Upper bound for a single prediction, including queueing.
    pub prediction_timeout: Duration,
}

impl Default for ReplicateSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_secs(2),
            prediction_timeout: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct VersionInfo {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ModelInfo {
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub visibility: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub latest_version: Option<VersionInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TrainingOutput {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub weights: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TrainingResponse {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub logs: Option<String>,
    #[serde(default)]
    pub output: Option<TrainingOutput>,
    #[serde(default)]
    pub error: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PredictionResponse {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

#[derive(Deserialize)]
struct FileUrls {
    get: String,
}

#[derive(Deserialize)]
struct FileResponse {
    id: String,
    urls: FileUrls,
}

#[derive(Deserialize)]
struct ReplicateErrorBody {
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

/// Output URLs of a prediction; Replicate returns either one URL or a list.
#[must_use]
pub fn output_urls(output: &Value) -> Vec<String> {
    match output {
        Value::String(url) => vec![url.clone()],
        Value::Array(items) => items.iter().filter_map(|v| v.as_str().map(String::from)).collect(),
        _ => Vec::new(),
    }
}

pub(crate) fn error_text(error: Option<&Value>) -> Option<String> {
    match error? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn is_terminal(status: &str) -> bool {
    matches!(status, "succeeded" | "failed" | "canceled")
}

/// Replicate API client.
#[derive(Debug, Clone)]
pub struct ReplicateClient {
    api_token: String,
    settings: ReplicateSettings,
    client: Client,
}

impl ReplicateClient {
    /// Creates a client against the public API with default settings.
    pub fn new(api_token: String) -> ApiResult<Self> {
        Self::with_settings(api_token, ReplicateSettings::default())
    }

    /// Creates a client with custom base URL, timeouts and poll cadence.
    pub fn with_settings(api_token: String, settings: ReplicateSettings) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ApiError::RequestError(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { api_token, settings, client })
    }

    #[must_use]
    pub fn settings(&self) -> &ReplicateSettings {
        &self.settings
    }

    /// Underlying HTTP client, for fetching prediction outputs.
    #[must_use]
    pub fn http(&self) -> &Client {
        &self.client
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.settings.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    async fn check(response: Response) -> ApiResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
        let message = serde_json::from_str::<ReplicateErrorBody>(&body)
            .ok()
            .and_then(|b| b.detail.or(b.title))
            .unwrap_or(body);

        // 404 is an expected answer for existence checks.
        if status.as_u16() == 404 {
            debug!(status = %status, message = %message, "Replicate resource not found");
        } else {
            error!(status = %status, message = %message, "Replicate API returned error status");
        }
        Err(ApiError::Status { status: status.as_u16(), message })
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str) -> ApiResult<T> {
        let response = self.client.get(self.url(path)).bearer_auth(&self.api_token).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn post_json<T: for<'de> Deserialize<'de>>(&self, path: &str, body: &Value) -> ApiResult<T> {
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(&self.api_token)
            .json(body)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Looks up a model; a 404 is reported as `Ok(None)`.
    pub async fn get_model(&self, model: &ModelRef) -> ApiResult<Option<ModelInfo>> {
        debug!(model = %model, "Fetching model");
        match self.get_json(&format!("models/{}/{}", model.owner, model.name)).await {
            Ok(info) => Ok(Some(info)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn create_model(&self, model: &NewModel) -> ApiResult<ModelInfo> {
        info!(model = %model.model, visibility = %model.visibility, "Creating model");
        let body = json!({
            "owner": model.model.owner,
            "name": model.model.name,
            "visibility": model.visibility,
            "hardware": model.hardware,
            "description": model.description,
        });
        self.post_json("models", &body).await
    }

    /// Latest version id of `model`.
    pub async fn latest_version(&self, model: &ModelRef) -> ApiResult<String> {
        let info = self.get_model(model).await?.ok_or_else(|| ApiError::Status {
            status: 404,
            message: format!("model {model} not found"),
        })?;
        info.latest_version
            .map(|v| v.id)
            .ok_or_else(|| ApiError::DecodeError(format!("model {model} has no published version")))
    }

    /// Uploads a local file and returns the URL Replicate serves it from.
    pub async fn upload_file(&self, path: &Path) -> ApiResult<String> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map_or_else(|| "upload.bin".to_string(), |n| n.to_string_lossy().to_string());
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        info!(file = %path.display(), size = bytes.len(), mime = %mime, "Uploading file");

        let part = Part::bytes(bytes).file_name(file_name).mime_str(mime.as_ref())?;
        let form = Form::new().part("content", part);

        let response = self
            .client
            .post(self.url("files"))
            .bearer_auth(&self.api_token)
            .multipart(form)
            .send()
            .await?;
        let file: FileResponse = Self::check(response).await?.json().await?;
        debug!(file_id = %file.id, url = %file.urls.get, "File uploaded");
        Ok(file.urls.get)
    }

    pub async fn create_training(&self, request: &TrainingRequest) -> ApiResult<TrainingResponse> {
        let trainer = ModelRef::parse(&request.trainer_version)
            .map_err(|e| ApiError::RequestError(e.to_string()))?;
        let version = request
            .trainer_version
            .split_once(':')
            .map(|(_, v)| v)
            .ok_or_else(|| ApiError::RequestError(format!("trainer version missing in {}", request.trainer_version)))?;

        let body = json!({
            "destination": request.destination.to_string(),
            "input": request.input,
        });
        self.post_json(
            &format!("models/{}/{}/versions/{}/trainings", trainer.owner, trainer.name, version),
            &body,
        )
        .await
    }

    pub async fn get_training(&self, id: &str) -> ApiResult<TrainingResponse> {
        self.get_json(&format!("trainings/{id}")).await
    }

    /// Starts a prediction. `model` is `owner/name` (latest version) or
    /// `owner/name:version`.
    pub async fn create_prediction(&self, model: &str, input: &Value) -> ApiResult<PredictionResponse> {
        match model.split_once(':') {
            Some((_, version)) => {
                self.post_json("predictions", &json!({ "version": version, "input": input })).await
            }
            None => {
                let model = ModelRef::parse(model).map_err(|e| ApiError::RequestError(e.to_string()))?;
                self.post_json(
                    &format!("models/{}/{}/predictions", model.owner, model.name),
                    &json!({ "input": input }),
                )
                .await
            }
        }
    }

    pub async fn get_prediction(&self, id: &str) -> ApiResult<PredictionResponse> {
        self.get_json(&format!("predictions/{id}")).await
    }

    /// Runs a prediction to completion and returns its output URLs.
    pub async fn run(&self, model: &str, input: &Value) -> ApiResult<Vec<String>> {
        let started = Instant::now();
        let mut prediction = self.create_prediction(model, input).await?;
        debug!(prediction_id = %prediction.id, status = %prediction.status, "Prediction created");

        while !is_terminal(&prediction.status) {
            if started.elapsed() >= self.settings.prediction_timeout {
                return Err(ApiError::PredictionTimeout {
                    id: prediction.id,
                    seconds: self.settings.prediction_timeout.as_secs(),
                });
            }
            tokio::time::sleep(self.settings.poll_interval).await;
            prediction = self.get_prediction(&prediction.id).await?;
        }

        if prediction.status != "succeeded" {
            return Err(ApiError::PredictionFailed {
                detail: error_text(prediction.error.as_ref()),
                id: prediction.id,
                status: prediction.status,
            });
        }

        Ok(prediction.output.as_ref().map(output_urls).unwrap_or_default())
    }
}
