//! Image host client.
//!
//! Uploads one image per request as multipart form data and returns the
//! durable public URL the host assigns.

use reqwest::multipart::{Form, Part};
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;

use crate::config::ImageHostConfig;

/// Largest upload accepted (host limit is 32 MB; product photos never need it).
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Content types accepted for upload.
const ALLOWED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/gif"];

/// Errors that can occur when uploading to the image host.
#[derive(Debug, Error)]
pub enum ImageHostError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Host returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// File is empty.
    #[error("empty file: {0}")]
    EmptyFile(String),

    /// File exceeds [`MAX_IMAGE_BYTES`].
    #[error("file too large: {0}")]
    TooLarge(String),

    /// Not an image type we accept.
    #[error("unsupported content type: {0}")]
    UnsupportedType(String),
}

/// An image ready to upload.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Check size and type before any network call.
    ///
    /// # Errors
    ///
    /// Returns `ImageHostError` describing the first problem found.
    pub fn validate(&self) -> Result<(), ImageHostError> {
        if self.bytes.is_empty() {
            return Err(ImageHostError::EmptyFile(self.file_name.clone()));
        }
        if self.bytes.len() > MAX_IMAGE_BYTES {
            return Err(ImageHostError::TooLarge(self.file_name.clone()));
        }
        if !ALLOWED_CONTENT_TYPES.contains(&self.content_type.as_str()) {
            return Err(ImageHostError::UnsupportedType(self.content_type.clone()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    success: bool,
    data: Option<UploadedImage>,
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct UploadedImage {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Image host API client.
#[derive(Clone)]
pub struct ImageHostClient {
    client: reqwest::Client,
    upload_url: String,
    api_key: secrecy::SecretString,
}

impl ImageHostClient {
    /// Create a new image host client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &ImageHostConfig) -> Result<Self, ImageHostError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("knotwork/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            upload_url: config.upload_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Upload one image and return its public URL.
    ///
    /// # Errors
    ///
    /// Returns `ImageHostError` if validation, the request or the host fails.
    #[tracing::instrument(skip(self, upload), fields(file = %upload.file_name, bytes = upload.bytes.len()))]
    pub async fn upload(&self, upload: ImageUpload) -> Result<String, ImageHostError> {
        upload.validate()?;

        let part = Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str(&upload.content_type)?;
        let form = Form::new().part("image", part);

        let response = self
            .client
            .post(&self.upload_url)
            .query(&[("key", self.api_key.expose_secret())])
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let parsed = parse_upload_response(status.as_u16(), &body)?;
        tracing::info!(url = %parsed, "Image uploaded");
        Ok(parsed)
    }
}

fn parse_upload_response(status: u16, body: &str) -> Result<String, ImageHostError> {
    let parsed: UploadResponse = serde_json::from_str(body).map_err(|e| {
        if (200..300).contains(&status) {
            ImageHostError::Parse(e.to_string())
        } else {
            ImageHostError::Api {
                status,
                message: body.chars().take(200).collect(),
            }
        }
    })?;

    match parsed {
        UploadResponse {
            success: true,
            data: Some(image),
            ..
        } if (200..300).contains(&status) => Ok(image.url),
        UploadResponse { error, .. } => Err(ImageHostError::Api {
            status,
            message: error.map_or_else(|| "upload rejected".to_string(), |e| e.message),
        }),
    }
}
