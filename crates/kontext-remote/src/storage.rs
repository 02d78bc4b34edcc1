//! Supabase Storage client and the bulk-upload flow built on it.

use crate::error::{ApiError, ApiResult};
use chrono::{DateTime, Local, Utc};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Bucket {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub public: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredObject {
    pub bucket: String,
    pub path: String,
    pub public_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ObjectMetadata {
    #[serde(default)]
    size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectEntry {
    pub name: String,
    #[serde(default)]
    metadata: Option<ObjectMetadata>,
}

impl ObjectEntry {
    #[must_use]
    pub fn size(&self) -> u64 {
        self.metadata.as_ref().and_then(|m| m.size).unwrap_or(0)
    }
}

/// Tally of one bulk upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadSummary {
    pub uploaded: usize,
    pub failed: usize,
    pub total: usize,
    pub objects: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageStats {
    pub bucket_name: String,
    pub total_files: usize,
    pub total_size_mb: f64,
    pub last_updated: DateTime<Utc>,
    pub supabase_url: String,
}

#[derive(Debug, Clone)]
pub struct StorageClient {
    base_url: String,
    service_key: String,
    client: Client,
}

impl StorageClient {
    pub fn new(base_url: String, service_key: String) -> ApiResult<Self> {
        Self::with_timeout(base_url, service_key, Duration::from_secs(60))
    }

    pub fn with_timeout(base_url: String, service_key: String, timeout: Duration) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ApiError::RequestError(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { base_url: base_url.trim_end_matches('/').to_string(), service_key, client })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/storage/v1/{}", self.base_url, path)
    }

    #[must_use]
    pub fn public_url(&self, bucket: &str, path: &str) -> String {
        self.url(&format!("object/public/{bucket}/{path}"))
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.bearer_auth(&self.service_key).header("apikey", &self.service_key)
    }

    async fn check(response: Response) -> ApiResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
        error!(status = %status, message = %message, "Storage API returned error status");
        Err(ApiError::Status { status: status.as_u16(), message })
    }

    pub async fn list_buckets(&self) -> ApiResult<Vec<Bucket>> {
        let response = self.authed(self.client.get(self.url("bucket"))).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn create_bucket(&self, name: &str, public: bool) -> ApiResult<()> {
        let body = json!({ "id": name, "name": name, "public": public });
        let response = self.authed(self.client.post(self.url("bucket"))).json(&body).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Creates a public bucket unless one with this name exists. Returns whether it was created.
    pub async fn ensure_bucket(&self, name: &str) -> ApiResult<bool> {
        let buckets = self.list_buckets().await?;
        if buckets.iter().any(|b| b.name == name) {
            info!(bucket = name, "Bucket already exists");
            return Ok(false);
        }
        info!(bucket = name, "Creating bucket");
        self.create_bucket(name, true).await?;
        Ok(true)
    }

    pub async fn upload(&self, bucket: &str, path: &str, bytes: Vec<u8>, content_type: &str) -> ApiResult<StoredObject> {
        let response = self
            .authed(self.client.post(self.url(&format!("object/{bucket}/{path}"))))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(StoredObject {
            bucket: bucket.to_string(),
            path: path.to_string(),
            public_url: self.public_url(bucket, path),
        })
    }

    pub async fn list_objects(&self, bucket: &str) -> ApiResult<Vec<ObjectEntry>> {
        let body = json!({ "prefix": "", "limit": 1000, "offset": 0 });
        let response = self
            .authed(self.client.post(self.url(&format!("object/list/{bucket}"))))
            .json(&body)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn bucket_stats(&self, bucket: &str) -> ApiResult<StorageStats> {
        let objects = self.list_objects(bucket).await?;
        let total_size: u64 = objects.iter().map(ObjectEntry::size).sum();
        Ok(StorageStats {
            bucket_name: bucket.to_string(),
            total_files: objects.len(),
            total_size_mb: (total_size as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0,
            last_updated: Utc::now(),
            supabase_url: self.base_url.clone(),
        })
    }
}

/// `*.jpg` / `*.jpeg` files directly under `dir`, sorted by name.
pub fn list_jpegs(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Object name for an upload: `compressed_<timestamp>_<file name>`.
#[must_use]
pub fn object_name(path: &Path, now: DateTime<Local>) -> String {
    let file_name = path.file_name().map_or_else(String::new, |n| n.to_string_lossy().to_string());
    format!("compressed_{}_{}", now.format("%Y%m%d_%H%M%S"), file_name)
}

/// Upload every JPEG under `dir` to `bucket`.
///
/// Individual failures are counted and logged; the returned summary is the
/// only record of the run.
pub async fn upload_directory(client: &StorageClient, bucket: &str, dir: &Path) -> ApiResult<UploadSummary> {
    if !dir.is_dir() {
        return Err(ApiError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("directory not found: {}", dir.display()),
        )));
    }

    let files = list_jpegs(dir)?;
    let mut summary = UploadSummary { total: files.len(), ..Default::default() };
    info!(bucket, total = summary.total, "Uploading images");

    for (i, path) in files.iter().enumerate() {
        let bytes = match tokio::fs::read(path).await {
            Ok(b) => b,
            Err(e) => {
                summary.failed += 1;
                warn!(file = %path.display(), error = %e, "Failed to read image");
                continue;
            }
        };
        let name = object_name(path, Local::now());
        let mime = mime_guess::from_path(path).first_raw().unwrap_or("image/jpeg");

        match client.upload(bucket, &name, bytes, mime).await {
            Ok(object) => {
                summary.uploaded += 1;
                info!(progress = %format!("{}/{}", i + 1, summary.total), object = %object.path, "Uploaded");
                summary.objects.push(object.path);
            }
            Err(e) => {
                summary.failed += 1;
                warn!(progress = %format!("{}/{}", i + 1, summary.total), file = %path.display(), error = %e, "Upload failed");
            }
        }
    }

    debug!(?summary, "Upload finished");
    Ok(summary)
}
