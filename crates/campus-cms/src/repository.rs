//! Entity repositories
//!
//! A [`Repository`] owns the cached collection of one entity kind and the
//! create/update/remove operations against the gateway. Every successful
//! mutation re-fetches the whole collection instead of splicing the changed
//! record, so the cache always matches what the store returned last.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::error::{CmsError, GatewayError, Result};
use crate::gateway::{Gateway, Order, Query, Record};
use crate::media::{MediaFile, MediaUploader};
use crate::model::{Draft, Entity, EntityKind, ImageRequirement};

/// A completed write plus anything that degraded along the way.
#[derive(Debug)]
pub struct WriteOutcome<T> {
    pub value: T,
    /// Non-fatal failures, e.g. a photo that could not be uploaded
    pub warnings: Vec<CmsError>,
}

impl<T> WriteOutcome<T> {
    fn new(value: T, warnings: Vec<CmsError>) -> Self {
        Self { value, warnings }
    }
}

/// How a repository fetches its collection.
#[derive(Clone, Debug, PartialEq)]
pub struct Listing {
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl Listing {
    pub fn for_kind(kind: EntityKind) -> Self {
        Self {
            order: kind.default_order(),
            limit: None,
        }
    }
}

struct CacheState<E> {
    generation: u64,
    items: Arc<Vec<E>>,
}

#[derive(Clone, Copy)]
enum WriteMode<'a> {
    Create,
    Update(&'a str),
}

pub struct Repository<E: Entity> {
    gateway: Arc<dyn Gateway>,
    uploader: MediaUploader,
    bucket: String,
    listing: Listing,
    issued: AtomicU64,
    cache: RwLock<CacheState<E>>,
}

impl<E: Entity> Repository<E> {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        let uploader = MediaUploader::new(gateway.clone());
        Self {
            gateway,
            uploader,
            bucket: E::KIND.image_policy().bucket.to_string(),
            listing: Listing::for_kind(E::KIND),
            issued: AtomicU64::new(0),
            cache: RwLock::new(CacheState {
                generation: 0,
                items: Arc::new(Vec::new()),
            }),
        }
    }

    /// Upload images for this kind to `bucket`.
    pub fn with_bucket(mut self, bucket: &str) -> Self {
        self.bucket = bucket.to_string();
        self
    }

    /// Fetch with a different order or a row limit.
    pub fn with_listing(mut self, listing: Listing) -> Self {
        self.listing = listing;
        self
    }

    pub fn kind(&self) -> EntityKind {
        E::KIND
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Current cached collection.
    pub fn snapshot(&self) -> Arc<Vec<E>> {
        self.cache.read().items.clone()
    }

    /// Look up a cached record by identity.
    pub fn find(&self, id: &str) -> Option<E> {
        self.cache.read().items.iter().find(|e| e.id() == id).cloned()
    }

    /// Drop the cached collection.
    pub fn clear(&self) {
        let mut cache = self.cache.write();
        // Outrank every listing already in flight.
        cache.generation = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        cache.items = Arc::new(Vec::new());
    }

    /// Fetch the collection and replace the cache with it.
    ///
    /// Each call takes a generation number; a response that resolves after a
    /// newer one has already been applied is discarded.
    pub async fn list(&self) -> Result<Arc<Vec<E>>> {
        let generation = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let collection = E::KIND.collection();

        let query = Query::new()
            .order(self.listing.order.clone())
            .limit(self.listing.limit);

        let rows = self
            .gateway
            .query(collection, &query)
            .await
            .map_err(|e| {
                error!("Error fetching {}: {}", collection, e);
                CmsError::Fetch(e)
            })?;

        let items: Vec<E> = rows
            .into_iter()
            .filter_map(|row| match decode::<E>(row) {
                Ok(item) => Some(item),
                Err(e) => {
                    warn!("Skipping {} row: {}", collection, e);
                    None
                }
            })
            .collect();

        let mut cache = self.cache.write();
        if generation < cache.generation {
            debug!(
                "Discarding stale {} listing (generation {} < {})",
                collection, generation, cache.generation
            );
            return Ok(cache.items.clone());
        }

        cache.generation = generation;
        cache.items = Arc::new(items);
        debug!("{} data loaded: {} items", collection, cache.items.len());
        Ok(cache.items.clone())
    }

    /// Create a record, uploading `image` first when given.
    pub async fn create(
        &self,
        draft: E::Draft,
        image: Option<&MediaFile>,
    ) -> Result<WriteOutcome<E>> {
        self.write(WriteMode::Create, draft, image).await
    }

    /// Update the record `id`, uploading `image` first when given.
    ///
    /// Without a new image the stored image reference is left as it is.
    pub async fn update(
        &self,
        id: &str,
        draft: E::Draft,
        image: Option<&MediaFile>,
    ) -> Result<WriteOutcome<E>> {
        self.write(WriteMode::Update(id), draft, image).await
    }

    /// Delete the record `id`.
    pub async fn remove(&self, id: &str) -> Result<WriteOutcome<()>> {
        let collection = E::KIND.collection();
        info!("Deleting {} id={}", collection, id);

        self.gateway.delete(collection, id).await.map_err(|e| {
            error!("Error deleting {} id={}: {}", collection, id, e);
            CmsError::Write(e)
        })?;

        let warnings = self.refresh_after_write().await.into_iter().collect();
        Ok(WriteOutcome::new((), warnings))
    }

    async fn write(
        &self,
        mode: WriteMode<'_>,
        mut draft: E::Draft,
        image: Option<&MediaFile>,
    ) -> Result<WriteOutcome<E>> {
        draft.normalize();
        draft.validate()?;
        self.check_image_requirement(mode, &draft, image)?;

        let mut warnings = Vec::new();
        if let Some(file) = image {
            match self.uploader.upload(file, &self.bucket).await {
                Ok(uploaded) => draft.set_image_url(Some(uploaded.url)),
                Err(e) if E::KIND.image_policy().requirement == ImageRequirement::Optional => {
                    warn!(
                        "Photo upload for {} failed, proceeding without it: {}",
                        E::KIND,
                        e
                    );
                    warnings.push(e);
                }
                Err(e) => return Err(e),
            }
        }

        let collection = E::KIND.collection();
        let payload = serde_json::to_value(&draft)
            .map_err(|e| CmsError::Other(anyhow::anyhow!("failed to encode {}: {}", collection, e)))?;

        let record = match mode {
            WriteMode::Create => {
                info!("Adding new {} record", E::KIND);
                self.gateway.insert(collection, payload).await
            }
            WriteMode::Update(id) => {
                info!("Updating {} id={}", E::KIND, id);
                self.gateway.update(collection, id, payload).await
            }
        }
        .map_err(|e| {
            error!("Error saving {}: {}", collection, e);
            CmsError::Write(e)
        })?;

        let entity = decode::<E>(record)?;
        warnings.extend(self.refresh_after_write().await);
        Ok(WriteOutcome::new(entity, warnings))
    }

    fn check_image_requirement(
        &self,
        mode: WriteMode<'_>,
        draft: &E::Draft,
        image: Option<&MediaFile>,
    ) -> Result<()> {
        match E::KIND.image_policy().requirement {
            ImageRequirement::Required
                if matches!(mode, WriteMode::Create)
                    && image.is_none()
                    && draft.image_url().is_none() =>
            {
                Err(CmsError::validation("image", "Please select an image!"))
            }
            ImageRequirement::Unsupported if image.is_some() => Err(CmsError::validation(
                "image",
                format!("{} records do not carry images", E::KIND.label()),
            )),
            _ => Ok(()),
        }
    }

    /// Re-fetch after a confirmed write. A failure here does not undo the
    /// write, so it is reported as a warning.
    async fn refresh_after_write(&self) -> Option<CmsError> {
        match self.list().await {
            Ok(_) => None,
            Err(e) => {
                warn!("Refresh after write failed for {}: {}", E::KIND, e);
                Some(e)
            }
        }
    }
}

pub(crate) fn decode<E: Entity>(record: Record) -> Result<E> {
    serde_json::from_value(Value::Object(record)).map_err(|e| {
        CmsError::Fetch(GatewayError::new(format!(
            "malformed {} record: {}",
            E::KIND,
            e
        )))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MemoryGateway;
    use crate::gateway::memory::Operation;
    use crate::model::{Faculty, FacultyDraft, FacultyRole, Leadership, LeadershipDraft};
    use serde_json::json;

    fn faculty_draft(name: &str) -> FacultyDraft {
        FacultyDraft {
            name: name.to_string(),
            role: Some(FacultyRole::Professor),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_cache_starts_empty() {
        let repo: Repository<Faculty> = Repository::new(Arc::new(MemoryGateway::new()));
        assert!(repo.snapshot().is_empty());
        assert_eq!(repo.kind(), EntityKind::Faculty);
        assert_eq!(repo.bucket(), "faculty-photos");
    }

    #[tokio::test]
    async fn test_create_refreshes_cache() {
        let gateway = Arc::new(MemoryGateway::new());
        let repo: Repository<Faculty> = Repository::new(gateway.clone());

        let outcome = repo.create(faculty_draft("A. Rao"), None).await.unwrap();
        assert_eq!(outcome.value.id, "f1");
        assert!(outcome.warnings.is_empty());
        assert_eq!(gateway.calls(Operation::Query), 1);

        let cached = repo.snapshot();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].name, "A. Rao");
    }

    #[tokio::test]
    async fn test_validation_happens_before_network() {
        let gateway = Arc::new(MemoryGateway::new());
        let repo: Repository<Faculty> = Repository::new(gateway.clone());

        let err = repo.create(FacultyDraft::default(), None).await.unwrap_err();
        assert!(matches!(err, CmsError::Validation { field: "name", .. }));
        assert_eq!(gateway.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_cache() {
        let gateway = Arc::new(MemoryGateway::new());
        let repo: Repository<Faculty> = Repository::new(gateway.clone());
        repo.create(faculty_draft("A"), None).await.unwrap();

        gateway.fail_next(Operation::Query, "network down");
        let err = repo.list().await.unwrap_err();
        assert!(matches!(err, CmsError::Fetch(ref e) if e.message == "network down"));
        assert_eq!(repo.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_failure_is_a_warning() {
        let gateway = Arc::new(MemoryGateway::new());
        let repo: Repository<Faculty> = Repository::new(gateway.clone());

        gateway.fail_next(Operation::Query, "timeout");
        let outcome = repo.create(faculty_draft("A"), None).await.unwrap();
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(gateway.rows("faculty").len(), 1);
    }

    #[tokio::test]
    async fn test_stale_listing_is_discarded() {
        let gateway = Arc::new(MemoryGateway::new());
        let repo: Arc<Repository<Leadership>> = Arc::new(Repository::new(gateway.clone()));

        // The first listing sees an empty table but its reply is held back.
        gateway.hold_next(Operation::Query);
        let slow = tokio::spawn({
            let repo = repo.clone();
            async move { repo.list().await }
        });
        while gateway.parked() == 0 {
            tokio::task::yield_now().await;
        }

        gateway.seed(
            "leadership",
            vec![json!({"name": "Dean", "position": "Dean", "display_order": 1})],
        );
        let fresh = repo.list().await.unwrap();
        assert_eq!(fresh.len(), 1);

        gateway.release();
        let late = slow.await.unwrap().unwrap();
        assert_eq!(late.len(), 1);
        assert_eq!(repo.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn test_undecodable_rows_are_skipped() {
        let gateway = Arc::new(MemoryGateway::new());
        gateway.seed(
            "faculty",
            vec![
                json!({"name": "A. Rao", "role": "Professor"}),
                json!({"name": "B. Sen", "role": "Dean"}),
                json!({"name": "C. Das", "role": "Lab Instructor", "created_at": null}),
            ],
        );
        let repo: Repository<Faculty> = Repository::new(gateway);

        let listed = repo.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "A. Rao");
        assert_eq!(repo.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn test_clear_discards_listing_in_flight() {
        let gateway = Arc::new(MemoryGateway::new());
        gateway.seed("faculty", vec![json!({"name": "A. Rao", "role": "Professor"})]);
        let repo: Arc<Repository<Faculty>> = Arc::new(Repository::new(gateway.clone()));

        gateway.hold_next(Operation::Query);
        let pending = tokio::spawn({
            let repo = repo.clone();
            async move { repo.list().await }
        });
        while gateway.parked() == 0 {
            tokio::task::yield_now().await;
        }

        repo.clear();
        gateway.release();
        let late = pending.await.unwrap().unwrap();
        assert!(late.is_empty());
        assert!(repo.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_update_without_image_keeps_photo() {
        let gateway = Arc::new(MemoryGateway::new());
        gateway.seed(
            "leadership",
            vec![json!({
                "id": "l1",
                "name": "Dr. Iyer",
                "position": "Principal",
                "photo_url": "https://cdn.test/iyer.png",
                "display_order": 1
            })],
        );
        let repo: Repository<Leadership> = Repository::new(gateway.clone());

        let draft = LeadershipDraft {
            name: "Dr. Iyer".to_string(),
            position: "Director".to_string(),
            display_order: 1,
            photo_url: None,
        };
        let outcome = repo.update("l1", draft, None).await.unwrap();
        assert_eq!(outcome.value.position, "Director");
        assert_eq!(
            outcome.value.photo_url.as_deref(),
            Some("https://cdn.test/iyer.png")
        );
    }
}
