//! Download generated images and store them as RGB JPEGs.

use crate::error::{ApiError, ApiResult};
use image::codecs::jpeg::JpegEncoder;
use reqwest::Client;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

pub const JPEG_QUALITY: u8 = 95;

/// Fetch `url` and return the body.
pub async fn download(client: &Client, url: &str) -> ApiResult<bytes::Bytes> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
            message: format!("download failed for {url}"),
        });
    }
    Ok(response.bytes().await?)
}

/// Decode `bytes`, drop any alpha/palette, and write a JPEG to `output`.
pub fn save_as_jpeg(bytes: &[u8], output: &Path, quality: u8) -> ApiResult<()> {
    let img = image::load_from_memory(bytes)?;
    let rgb = img.to_rgb8();

    let mut writer = BufWriter::new(File::create(output)?);
    let encoder = JpegEncoder::new_with_quality(&mut writer, quality);
    rgb.write_with_encoder(encoder)?;
    Ok(())
}

pub async fn download_as_jpeg(client: &Client, url: &str, output: &Path) -> ApiResult<()> {
    let bytes = download(client, url).await?;
    save_as_jpeg(&bytes, output, JPEG_QUALITY)?;
    info!(url, path = %output.display(), "Image saved");
    Ok(())
}
