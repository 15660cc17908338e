//! Public site loader
//!
//! Fetches every public section concurrently and replaces the static page
//! markup with live records. A section whose fetch fails or comes back empty
//! keeps its static markup. Nothing here writes to the store.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::CmsConfig;
use crate::content::ContentRepository;
use crate::error::Result;
use crate::gateway::{Gateway, Order};
use crate::model::{Achievement, Activity, Entity, Faculty, GalleryImage, Leadership};
use crate::render::{MissionText, PublicViews, Region, Surface};
use crate::repository::{Listing, Repository};

/// What happened to one public section.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SectionStatus {
    /// Live records were rendered.
    Rendered(usize),
    /// The static markup was kept.
    Static,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicLoadReport {
    pub faculty: SectionStatus,
    pub leadership: SectionStatus,
    pub activities: SectionStatus,
    pub achievements: SectionStatus,
    pub gallery: SectionStatus,
    pub content: SectionStatus,
}

pub struct PublicSiteLoader {
    surface: Arc<dyn Surface>,
    views: PublicViews,
    faculty: Repository<Faculty>,
    leadership: Repository<Leadership>,
    activities: Repository<Activity>,
    achievements: Repository<Achievement>,
    gallery: Repository<GalleryImage>,
    content: ContentRepository,
}

impl PublicSiteLoader {
    pub fn new(config: &CmsConfig, gateway: Arc<dyn Gateway>, surface: Arc<dyn Surface>) -> Self {
        let newest = |limit: usize| Listing {
            order: Some(Order::desc("created_at")),
            limit: Some(limit),
        };

        Self {
            surface,
            views: PublicViews::new(config.fallbacks.clone()),
            faculty: Repository::new(gateway.clone()).with_listing(Listing {
                order: Some(Order::asc("created_at")),
                limit: None,
            }),
            leadership: Repository::new(gateway.clone()),
            activities: Repository::new(gateway.clone()).with_listing(newest(config.public_limit)),
            achievements: Repository::new(gateway.clone())
                .with_listing(newest(config.public_limit)),
            gallery: Repository::new(gateway.clone()).with_listing(newest(config.public_limit)),
            content: ContentRepository::new(gateway),
        }
    }

    /// Load and render every section.
    pub async fn load(&self) -> PublicLoadReport {
        let (faculty, leadership, activities, achievements, gallery, content) = futures::join!(
            self.section(&self.faculty, |items| {
                self.place(Region::PublicFaculty, self.views.faculty(items), items.len())
            }),
            self.section(&self.leadership, |items| {
                self.place(Region::PublicLeadership, self.views.leadership(items), items.len())
            }),
            self.section(&self.activities, |items| {
                self.place(Region::PublicActivities, self.views.activities(items), items.len())
            }),
            self.section(&self.achievements, |items| {
                self.place(Region::PublicAchievements, self.views.achievements(items), items.len())
            }),
            self.section(&self.gallery, |items| {
                let Some((slides, dots)) = self.views.gallery(items) else {
                    return SectionStatus::Static;
                };
                self.surface.replace_html(Region::PublicGalleryTrack, &slides);
                self.surface.replace_html(Region::PublicGalleryDots, &dots);
                SectionStatus::Rendered(items.len())
            }),
            self.load_content(),
        );

        let report = PublicLoadReport {
            faculty,
            leadership,
            activities,
            achievements,
            gallery,
            content,
        };
        info!("Public site loaded: {:?}", report);
        report
    }

    async fn section<E: Entity>(
        &self,
        repo: &Repository<E>,
        render: impl FnOnce(&[E]) -> SectionStatus,
    ) -> SectionStatus {
        match repo.list().await {
            Ok(items) if items.is_empty() => {
                debug!("No {} records, using static content", E::KIND);
                SectionStatus::Static
            }
            Ok(items) => render(items.as_slice()),
            Err(e) => {
                warn!("Error fetching {}, using static content: {}", E::KIND, e);
                SectionStatus::Static
            }
        }
    }

    fn place(&self, region: Region, html: Option<String>, count: usize) -> SectionStatus {
        match html {
            Some(html) => {
                self.surface.replace_html(region, &html);
                SectionStatus::Rendered(count)
            }
            None => SectionStatus::Static,
        }
    }

    async fn load_content(&self) -> SectionStatus {
        match self.try_load_content().await {
            Ok(status) => status,
            Err(e) => {
                warn!("Error fetching content, using static content: {}", e);
                SectionStatus::Static
            }
        }
    }

    async fn try_load_content(&self) -> Result<SectionStatus> {
        let Some(content) = self.content.load().await? else {
            debug!("No content record, using static content");
            return Ok(SectionStatus::Static);
        };

        let fragments = self.views.content(&content);
        let mut updated = 0;
        for (region, text) in [
            (Region::Tagline, &fragments.tagline),
            (Region::AboutIntro, &fragments.description),
            (Region::Vision, &fragments.vision),
        ] {
            if let Some(text) = text {
                self.surface.replace_text(region, text);
                updated += 1;
            }
        }
        match &fragments.mission {
            Some(MissionText::Markup(html)) => {
                self.surface.replace_html(Region::Mission, html);
                updated += 1;
            }
            Some(MissionText::Text(text)) => {
                self.surface.replace_text(Region::Mission, text);
                updated += 1;
            }
            None => {}
        }

        Ok(if updated == 0 {
            SectionStatus::Static
        } else {
            SectionStatus::Rendered(updated)
        })
    }
}
