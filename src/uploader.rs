//! Asset Upload Client
//!
//! Pushes captured photo bytes to the object-storage service and returns a
//! publicly fetchable URL for the inference service to read. One attempt per
//! call; whether to retry is the caller's decision.

use crate::environment::Environment;
use log::debug;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, ClientBuilder, StatusCode};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UploadError {
    /// Reqwest error, typically related to network issues or request failures.
    #[error("Reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),

    /// The upload service rejected the file.
    #[error("upload rejected: {0}")]
    Rejected(String),

    /// The supplied mime type could not be attached to the form.
    #[error("unsupported media type: {0}")]
    Media(String),
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    error: Option<UploadErrorBody>,
}

#[derive(Deserialize)]
struct UploadErrorBody {
    message: String,
}

#[derive(Debug, Clone)]
pub struct AssetUploader {
    client: Client,
    environment: Environment,
    cloud_name: String,
    upload_preset: String,
}

impl AssetUploader {
    pub fn new(environment: Environment, cloud_name: String, upload_preset: String) -> Self {
        Self {
            client: ClientBuilder::new()
                .timeout(Duration::from_secs(60))
                .build()
                .expect("Failed to create HTTP client"),
            environment,
            cloud_name,
            upload_preset,
        }
    }

    fn build_url(&self) -> String {
        format!(
            "{}/v1_1/{}/image/upload",
            self.environment.upload_url().trim_end_matches('/'),
            self.cloud_name
        )
    }

    /// Upload raw image bytes and return the public URL of the stored copy.
    pub async fn upload(&self, bytes: Vec<u8>, mime_type: &str) -> Result<String, UploadError> {
        let size = bytes.len();
        let part = Part::bytes(bytes)
            .file_name("photo")
            .mime_str(mime_type)
            .map_err(|e| UploadError::Media(e.to_string()))?;
        let form = Form::new()
            .part("file", part)
            .text("upload_preset", self.upload_preset.clone());

        let response = self
            .client
            .post(self.build_url())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!("upload of {} bytes answered {}", size, status);
        parse_upload_response(status, &body)
    }
}

fn parse_upload_response(status: StatusCode, body: &str) -> Result<String, UploadError> {
    let parsed: UploadResponse = serde_json::from_str(body).unwrap_or(UploadResponse {
        secure_url: None,
        error: None,
    });

    // The service reports validation failures in-body; prefer its message
    // over the bare status code.
    if let Some(error) = parsed.error {
        return Err(UploadError::Rejected(error.message));
    }
    if !status.is_success() {
        return Err(UploadError::Rejected(format!(
            "upload failed with status {}",
            status
        )));
    }
    parsed
        .secure_url
        .ok_or_else(|| UploadError::Rejected("upload service returned no URL".to_string()))
}

/// Mime type for a photo file, by extension. The booth produces JPEGs, so
/// that is also the fallback.
pub fn guess_mime(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("heic") => "image/heic",
        _ => "image/jpeg",
    }
}
