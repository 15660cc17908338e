//! Site content singleton and the read-only student directory

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::error::{CmsError, GatewayError, Result};
use crate::gateway::{Filter, Gateway, Query};
use crate::model::{CONTENT_ID, ContentRecord, EntityKind, SiteContent, Student};
use crate::repository::WriteOutcome;

/// Holds the single content record. Writes are upserts on [`CONTENT_ID`].
pub struct ContentRepository {
    gateway: Arc<dyn Gateway>,
    cache: RwLock<Option<SiteContent>>,
}

impl ContentRepository {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self {
            gateway,
            cache: RwLock::new(None),
        }
    }

    /// Cached content, if any was loaded.
    pub fn current(&self) -> Option<SiteContent> {
        self.cache.read().clone()
    }

    pub fn clear(&self) {
        *self.cache.write() = None;
    }

    /// Fetch the content record. `None` when the store has none yet.
    pub async fn load(&self) -> Result<Option<SiteContent>> {
        let collection = EntityKind::Content.collection();
        let rows = self
            .gateway
            .query(
                collection,
                &Query::new()
                    .filter(Filter::eq("id", CONTENT_ID))
                    .limit(Some(1)),
            )
            .await
            .map_err(|e| {
                error!("Error fetching content: {}", e);
                CmsError::Fetch(e)
            })?;

        let content = match rows.into_iter().next() {
            Some(row) => Some(serde_json::from_value::<SiteContent>(Value::Object(row)).map_err(
                |e| CmsError::Fetch(GatewayError::new(format!("malformed content record: {}", e))),
            )?),
            None => {
                debug!("No content record found");
                None
            }
        };

        *self.cache.write() = content.clone();
        Ok(content)
    }

    /// Write the content record, then reload it.
    pub async fn save(&self, content: &SiteContent) -> Result<WriteOutcome<SiteContent>> {
        let collection = EntityKind::Content.collection();
        let record = serde_json::to_value(ContentRecord::from(content))
            .map_err(|e| CmsError::Other(anyhow::anyhow!("failed to encode content: {}", e)))?;

        info!("Saving site content");
        self.gateway
            .upsert(collection, record)
            .await
            .map_err(|e| {
                error!("Error saving content: {}", e);
                CmsError::Write(e)
            })?;

        let mut warnings = Vec::new();
        let saved = match self.load().await {
            Ok(Some(saved)) => saved,
            Ok(None) => content.clone(),
            Err(e) => {
                warn!("Refresh after content save failed: {}", e);
                warnings.push(e);
                content.clone()
            }
        };

        Ok(WriteOutcome {
            value: saved,
            warnings,
        })
    }
}

/// Read-only access to student rows.
pub struct StudentDirectory {
    gateway: Arc<dyn Gateway>,
}

impl StudentDirectory {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    pub async fn list(&self) -> Result<Vec<Student>> {
        let kind = EntityKind::Student;
        let rows = self
            .gateway
            .query(kind.collection(), &Query::new().order(kind.default_order()))
            .await
            .map_err(CmsError::Fetch)?;

        rows.into_iter()
            .map(|row| {
                serde_json::from_value(Value::Object(row)).map_err(|e| {
                    CmsError::Fetch(GatewayError::new(format!("malformed student record: {}", e)))
                })
            })
            .collect()
    }

    pub async fn count(&self) -> Result<u64> {
        self.gateway
            .count(EntityKind::Student.collection())
            .await
            .map_err(CmsError::Fetch)
    }
}
