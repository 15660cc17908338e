//! View renderers
//!
//! Renderers are pure projections of a cached collection into markup. The
//! same input always produces the same output, so re-rendering after every
//! refresh is safe. Where the markup lands is up to a [`Surface`].

pub mod admin;
pub mod public;

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::dispatch::Action;
use crate::model::EntityKind;

pub use admin::AdminViews;
pub use public::{ContentFragments, MissionText, PublicViews};

/// Projects a collection of `E` into a markup fragment.
pub trait View<E> {
    fn render(&self, items: &[E]) -> String;
}

/// Page regions the core writes into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Region {
    FacultyTable,
    ActivityGrid,
    AchievementGrid,
    GalleryGrid,
    LeadershipTable,
    /// Dashboard stat card by position: students, faculty, activities, achievements, leadership
    StatCard(usize),
    PublicFaculty,
    PublicLeadership,
    PublicActivities,
    PublicAchievements,
    PublicGalleryTrack,
    PublicGalleryDots,
    Tagline,
    AboutIntro,
    Vision,
    Mission,
}

impl Region {
    /// Selector of the element whose content is replaced.
    pub fn selector(&self) -> String {
        match self {
            Region::FacultyTable => "#facultyTableBody".to_string(),
            Region::ActivityGrid => "#activitiesSection .card-grid".to_string(),
            Region::AchievementGrid => "#achievementsSection .gallery-grid".to_string(),
            Region::GalleryGrid => "#gallerySection .gallery-grid".to_string(),
            Region::LeadershipTable => "#leadershipTableBody".to_string(),
            Region::StatCard(i) => format!(".stat-card:nth-child({}) h3", i + 1),
            Region::PublicFaculty => "#faculty .faculty-grid".to_string(),
            Region::PublicLeadership => "#leadership .faculty-grid".to_string(),
            Region::PublicActivities => "#activities .activity-grid".to_string(),
            Region::PublicAchievements => "#achievements .cards".to_string(),
            Region::PublicGalleryTrack => ".gallery-track".to_string(),
            Region::PublicGalleryDots => ".gallery-dots".to_string(),
            Region::Tagline => "#tagline-text".to_string(),
            Region::AboutIntro => ".about-intro".to_string(),
            Region::Vision => "#mission .cards .card:nth-child(1) p".to_string(),
            Region::Mission => "#mission .cards .card:nth-child(2) p".to_string(),
        }
    }

    /// Admin region listing records of `kind`, if the console has one.
    pub fn admin_list(kind: EntityKind) -> Option<Region> {
        match kind {
            EntityKind::Faculty => Some(Region::FacultyTable),
            EntityKind::Activity => Some(Region::ActivityGrid),
            EntityKind::Achievement => Some(Region::AchievementGrid),
            EntityKind::Gallery => Some(Region::GalleryGrid),
            EntityKind::Leadership => Some(Region::LeadershipTable),
            EntityKind::Content | EntityKind::Student => None,
        }
    }
}

/// Something that displays rendered markup, normally the page DOM.
pub trait Surface: Send + Sync {
    /// Replace the markup of `region`.
    fn replace_html(&self, region: Region, html: &str);

    /// Replace the text of `region`; the surface must not interpret it as markup.
    fn replace_text(&self, region: Region, text: &str);
}

/// Keeps the latest content per region. Used headless and in tests.
#[derive(Default)]
pub struct MemorySurface {
    regions: RwLock<HashMap<Region, String>>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, region: Region) -> Option<String> {
        self.regions.read().get(&region).cloned()
    }
}

impl Surface for MemorySurface {
    fn replace_html(&self, region: Region, html: &str) {
        self.regions.write().insert(region, html.to_string());
    }

    fn replace_text(&self, region: Region, text: &str) {
        self.regions.write().insert(region, escape(text));
    }
}

/// Escape text for element content or a double-quoted attribute.
pub fn escape(text: &str) -> String {
    htmlescape::encode_minimal(text)
}

/// Edit/delete affordance resolved through the command table.
pub(crate) fn action_button(kind: EntityKind, action: Action, id: &str) -> String {
    let (title, icon) = match action {
        Action::Edit => ("Edit", "fa-pen"),
        Action::Delete => ("Delete", "fa-trash"),
    };
    format!(
        r#"<button class="btn-icon btn-{action}" title="{title}" data-kind="{kind}" data-action="{action}" data-id="{id}"><i class="fa-solid {icon}"></i></button>"#,
        action = action,
        title = title,
        kind = kind,
        id = escape(id),
        icon = icon,
    )
}
