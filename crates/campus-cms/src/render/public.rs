//! Public site sections
//!
//! Every renderer returns `None` for an empty collection so the page keeps
//! its static markup.

use crate::config::FallbackImages;
use crate::model::{Achievement, Activity, Faculty, GalleryImage, Leadership, SiteContent};

use super::escape;

const GALLERY_DEFAULT_CAPTION: &str = "AIML Department";

#[derive(Clone, Debug, Default)]
pub struct PublicViews {
    fallbacks: FallbackImages,
}

/// Mission text, either plain text or trusted list markup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MissionText {
    Text(String),
    Markup(String),
}

impl MissionText {
    /// Missions written as lists (`M1:` items or bullets) keep their markup.
    pub fn classify(mission: &str) -> Self {
        if mission.contains("M1:") || mission.contains('•') {
            MissionText::Markup(mission.to_string())
        } else {
            MissionText::Text(mission.to_string())
        }
    }
}

/// Text updates for the about and mission sections. Empty fields are `None`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContentFragments {
    pub tagline: Option<String>,
    pub description: Option<String>,
    pub vision: Option<String>,
    pub mission: Option<MissionText>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl PublicViews {
    pub fn new(fallbacks: FallbackImages) -> Self {
        Self { fallbacks }
    }

    fn person_card(&self, name: &str, subtitle: &str, photo: Option<&str>) -> String {
        format!(
            r#"<article class="faculty-card"><img src="{photo}" alt="{name} portrait" loading="lazy"><div class="info"><h3>{name}</h3><p class="role">{subtitle}</p></div></article>"#,
            photo = escape(photo.unwrap_or(&self.fallbacks.public_photo)),
            name = escape(name),
            subtitle = escape(subtitle),
        )
    }

    pub fn faculty(&self, items: &[Faculty]) -> Option<String> {
        if items.is_empty() {
            return None;
        }
        Some(
            items
                .iter()
                .map(|f| self.person_card(&f.name, f.role.as_str(), f.photo_url.as_deref()))
                .collect(),
        )
    }

    pub fn leadership(&self, items: &[Leadership]) -> Option<String> {
        if items.is_empty() {
            return None;
        }
        Some(
            items
                .iter()
                .map(|l| self.person_card(&l.name, &l.position, l.photo_url.as_deref()))
                .collect(),
        )
    }

    pub fn activities(&self, items: &[Activity]) -> Option<String> {
        if items.is_empty() {
            return None;
        }
        Some(
            items
                .iter()
                .map(|a| {
                    format!(
                        r#"<article class="activity-card"><img src="{img}" alt="{title}" loading="lazy"><div class="content"><h3>{title}</h3><p>{desc}</p></div></article>"#,
                        img = escape(a.image_url.as_deref().unwrap_or(&self.fallbacks.public_image)),
                        title = escape(&a.title),
                        desc = escape(a.description.as_deref().unwrap_or_default()),
                    )
                })
                .collect(),
        )
    }

    pub fn achievements(&self, items: &[Achievement]) -> Option<String> {
        if items.is_empty() {
            return None;
        }
        Some(
            items
                .iter()
                .map(|a| {
                    format!(
                        r#"<article class="card"><img src="{img}" alt="{title}" loading="lazy"></article>"#,
                        img = escape(a.image_url.as_deref().unwrap_or(&self.fallbacks.public_image)),
                        title = escape(a.title()),
                    )
                })
                .collect(),
        )
    }

    /// Carousel slides and their navigation dots. The first slide is active.
    pub fn gallery(&self, items: &[GalleryImage]) -> Option<(String, String)> {
        if items.is_empty() {
            return None;
        }

        let slides = items
            .iter()
            .enumerate()
            .map(|(i, g)| {
                format!(
                    r#"<div class="{class}"><img src="{img}" alt="{alt}" loading="lazy"><div class="gallery-caption"><h4>{caption}</h4><p>{desc}</p></div></div>"#,
                    class = if i == 0 { "gallery-slide active" } else { "gallery-slide" },
                    img = escape(g.image_url.as_deref().unwrap_or(&self.fallbacks.public_image)),
                    alt = escape(g.caption.as_deref().unwrap_or("Gallery Image")),
                    caption = escape(g.caption.as_deref().unwrap_or(GALLERY_DEFAULT_CAPTION)),
                    desc = escape(g.description.as_deref().unwrap_or_default()),
                )
            })
            .collect();

        let dots = (0..items.len())
            .map(|i| {
                format!(
                    r#"<button class="dot{active}" data-slide="{i}" aria-label="Show image {n}"></button>"#,
                    active = if i == 0 { " active" } else { "" },
                    i = i,
                    n = i + 1,
                )
            })
            .collect();

        Some((slides, dots))
    }

    /// Field updates for the content sections. Text is left unescaped; the
    /// surface writes it as text, except for mission markup.
    pub fn content(&self, content: &SiteContent) -> ContentFragments {
        ContentFragments {
            tagline: non_empty(&content.tagline).map(|t| format!("💡 \"{}\"", t)),
            description: non_empty(&content.description).map(str::to_string),
            vision: non_empty(&content.vision).map(str::to_string),
            mission: non_empty(&content.mission).map(MissionText::classify),
        }
    }
}
