//! Media upload pipeline
//!
//! Turns a selected file into a stored object and its public URL. Runs before
//! any record write that carries an image; a failed upload writes nothing.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use rand::Rng;
use tracing::{debug, error};

use crate::error::{CmsError, Result};
use crate::gateway::Gateway;

const TOKEN_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const TOKEN_LEN: usize = 11;

/// A file picked in an upload field.
#[derive(Clone, Debug)]
pub struct MediaFile {
    pub name: String,
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

impl MediaFile {
    pub fn new(name: &str, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.to_string(),
            bytes: bytes.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }

    /// Extension of the original file name, without the dot.
    pub fn extension(&self) -> &str {
        match self.name.rsplit_once('.') {
            Some((_, ext)) if !ext.is_empty() => ext,
            _ => "bin",
        }
    }
}

/// Result of a successful upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadedMedia {
    pub bucket: String,
    pub key: String,
    pub url: String,
}

/// Uploads files through the gateway's object storage.
#[derive(Clone)]
pub struct MediaUploader {
    gateway: Arc<dyn Gateway>,
}

impl MediaUploader {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    /// Store `file` in `bucket` and resolve its public URL.
    pub async fn upload(&self, file: &MediaFile, bucket: &str) -> Result<UploadedMedia> {
        let key = storage_key(file.extension());
        debug!(
            "Uploading {} ({} bytes) to {}/{}",
            file.name,
            file.bytes.len(),
            bucket,
            key
        );

        let stored = self
            .gateway
            .store_object(bucket, &key, file.bytes.clone(), file.content_type.as_deref())
            .await
            .map_err(|e| {
                error!("Error uploading image to {}: {}", bucket, e);
                CmsError::upload(bucket, e)
            })?;

        let url = self.gateway.public_url(bucket, &stored);
        debug!("Uploaded {} as {}", file.name, url);

        Ok(UploadedMedia {
            bucket: bucket.to_string(),
            key: stored,
            url,
        })
    }
}

/// Collision-resistant object key: random token, current time, extension.
pub fn storage_key(extension: &str) -> String {
    let mut rng = rand::rng();
    let token: String = (0..TOKEN_LEN)
        .map(|_| TOKEN_ALPHABET[rng.random_range(0..TOKEN_ALPHABET.len())] as char)
        .collect();
    format!("{}-{}.{}", token, Utc::now().timestamp_millis(), extension)
}
