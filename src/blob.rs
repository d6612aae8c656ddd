//! Attachment uploads straight to blob storage.
//!
//! Files are PUT to `<container>/<blob><sas>` and the signature-free URL is
//! what gets stored on the record.

use chrono::Utc;
use color_eyre::{eyre::eyre, Result};
use futures::future::try_join_all;
use std::path::Path;
use tracing::{debug, info};

use crate::config::{BlobConfig, Config};
use crate::sync::SyncError;
use crate::table::types::{mime_type_for, Attachment};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A file ready to upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
  pub name: String,
  pub content_type: Option<String>,
  pub bytes: Vec<u8>,
}

impl UploadFile {
  /// Read a file from disk, guessing its content type from the extension.
  pub async fn read(path: &Path) -> Result<Self, SyncError> {
    let bytes = tokio::fs::read(path).await?;
    let name = path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_else(|| "file".to_string());
    let content_type = match mime_type_for(&name) {
      DEFAULT_CONTENT_TYPE => None,
      mime => Some(mime.to_string()),
    };

    Ok(Self {
      name,
      content_type,
      bytes,
    })
  }
}

#[derive(Clone)]
pub struct BlobUploader {
  http: reqwest::Client,
  base_url: String,
  sas: String,
}

impl BlobUploader {
  pub fn new(config: &BlobConfig) -> Result<Self> {
    let sas = Config::get_blob_sas()?;
    Self::with_sas(&config.base_url(), sas)
  }

  pub fn with_sas(base_url: &str, sas: String) -> Result<Self> {
    let http = reqwest::Client::builder()
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base_url: base_url.trim_end_matches('/').to_string(),
      sas,
    })
  }

  /// Upload one file and return its public URL (signature stripped).
  pub async fn upload(&self, file: &UploadFile) -> Result<String, SyncError> {
    let blob_name = blob_name(&file.name, Utc::now().timestamp_millis());
    let public_url = format!("{}/{}", self.base_url, blob_name);
    let upload_url = format!("{}{}", public_url, self.sas);
    let content_type = file
      .content_type
      .as_deref()
      .unwrap_or(DEFAULT_CONTENT_TYPE);

    debug!(blob = %blob_name, size = file.bytes.len(), content_type, "Uploading blob");

    let response = self
      .http
      .put(&upload_url)
      .header("x-ms-blob-type", "BlockBlob")
      .header(reqwest::header::CONTENT_TYPE, content_type)
      .body(file.bytes.clone())
      .send()
      .await
      .map_err(|e| SyncError::Network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(SyncError::Api {
        status: i64::from(status.as_u16()),
        message: if body.is_empty() {
          status.to_string()
        } else {
          body
        },
      });
    }

    info!(url = %public_url, "File uploaded");
    Ok(public_url)
  }

  /// Upload several files concurrently; URLs come back in input order.
  pub async fn upload_all(&self, files: &[UploadFile]) -> Result<Vec<String>, SyncError> {
    try_join_all(files.iter().map(|f| self.upload(f))).await
  }

  /// Upload a file from disk and describe it as an attachment.
  pub async fn upload_attachment(&self, path: &Path) -> Result<Attachment, SyncError> {
    let file = UploadFile::read(path).await?;
    let url = self.upload(&file).await?;

    Ok(Attachment {
      id: format!("attachment_{}", Utc::now().timestamp_millis()),
      name: file.name.clone(),
      size: file.bytes.len() as u64,
      mime_type: file
        .content_type
        .clone()
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
      token: None,
      url,
      width: None,
      height: None,
      thumbnail_url: None,
    })
  }

  /// Append the signature to a bare URL in this container, for downloading.
  pub fn signed_url(&self, url: &str) -> String {
    let already_signed = url.contains("sv=") || url.contains("sig=");
    if url.starts_with(&self.base_url) && !already_signed {
      format!("{}{}", url, self.sas)
    } else {
      url.to_string()
    }
  }
}

/// `<millis>-<name>` with anything outside `[A-Za-z0-9._-]` replaced by `_`.
fn blob_name(file_name: &str, millis: i64) -> String {
  let sanitized: String = file_name
    .chars()
    .map(|c| {
      if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
        c
      } else {
        '_'
      }
    })
    .collect();
  format!("{}-{}", millis, sanitized)
}
