//! Configuration for the CMS client
//!
//! Values are layered: built-in defaults, then an optional file, then
//! environment variables prefixed with `CMS` (nested keys separated by `__`,
//! e.g. `CMS_BACKEND__URL`).

use std::path::Path;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::{CmsError, Result};
use crate::model::EntityKind;

/// Connection settings for the hosted backend.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackendConfig {
    /// Project URL, e.g. `https://xyz.example.co`
    pub url: String,
    /// Public (anon) project key
    pub api_key: String,
    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Read timeout in milliseconds
    pub read_timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:54321".to_string(),
            api_key: String::new(),
            connect_timeout_ms: 5000,
            read_timeout_ms: 30000,
        }
    }
}

impl BackendConfig {
    pub fn new(url: &str, api_key: &str) -> Self {
        Self {
            url: url.to_string(),
            api_key: api_key.to_string(),
            ..Default::default()
        }
    }

    /// Set timeouts
    pub fn with_timeouts(mut self, connect_ms: u64, read_ms: u64) -> Self {
        self.connect_timeout_ms = connect_ms;
        self.read_timeout_ms = read_ms;
        self
    }
}

/// Storage buckets used by each editable kind.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct BucketConfig {
    pub faculty: String,
    pub activity: String,
    pub achievement: String,
    pub general: String,
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            faculty: EntityKind::Faculty.image_policy().bucket.to_string(),
            activity: EntityKind::Activity.image_policy().bucket.to_string(),
            achievement: EntityKind::Achievement.image_policy().bucket.to_string(),
            general: "images".to_string(),
        }
    }
}

impl BucketConfig {
    pub fn bucket_for(&self, kind: EntityKind) -> &str {
        match kind {
            EntityKind::Faculty => &self.faculty,
            EntityKind::Activity => &self.activity,
            EntityKind::Achievement => &self.achievement,
            _ => &self.general,
        }
    }
}

/// Placeholder images used when a record carries no image.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct FallbackImages {
    pub admin_photo: String,
    pub admin_image: String,
    pub public_photo: String,
    pub public_image: String,
}

impl Default for FallbackImages {
    fn default() -> Self {
        Self {
            admin_photo: "../guru.jpg".to_string(),
            admin_image: "../assets/img.jpeg".to_string(),
            public_photo: "guru.jpg".to_string(),
            public_image: "assets/img.jpeg".to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct CmsConfig {
    pub backend: BackendConfig,
    pub buckets: BucketConfig,
    pub fallbacks: FallbackImages,
    /// Number of newest records shown per public section
    pub public_limit: usize,
    /// Idle time before the admin session is ended
    pub inactivity_timeout_secs: u64,
}

impl Default for CmsConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            buckets: BucketConfig::default(),
            fallbacks: FallbackImages::default(),
            public_limit: 6,
            inactivity_timeout_secs: 30 * 60,
        }
    }
}

impl CmsConfig {
    /// Load configuration from an optional file and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix("CMS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| CmsError::Config(e.to_string()))?
            .try_deserialize::<CmsConfig>()
            .map_err(|e| CmsError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn with_backend(mut self, backend: BackendConfig) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_public_limit(mut self, limit: usize) -> Self {
        self.public_limit = limit;
        self
    }

    pub fn with_inactivity_timeout_secs(mut self, secs: u64) -> Self {
        self.inactivity_timeout_secs = secs;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.backend.url.trim().is_empty() {
            return Err(CmsError::Config("backend.url must not be empty".to_string()));
        }
        if self.public_limit == 0 {
            return Err(CmsError::Config("public_limit must be positive".to_string()));
        }
        Ok(())
    }
}
