//! Admin console listings

use crate::config::FallbackImages;
use crate::dispatch::Action;
use crate::model::{Achievement, Activity, Entity, Faculty, GalleryImage, Leadership};

use super::{View, action_button, escape};

const FACULTY_EMPTY: &str = r#"<tr><td colspan="5" class="empty-row">No faculty members found. Add one to get started!</td></tr>"#;
const ACTIVITY_EMPTY: &str =
    r#"<p class="empty-grid">No activities found. Add one to get started!</p>"#;
const ACHIEVEMENT_EMPTY: &str =
    r#"<p class="empty-grid">No achievements found. Add one to get started!</p>"#;
const GALLERY_EMPTY: &str =
    r#"<p class="empty-grid">No gallery images found. Upload one to get started!</p>"#;
const LEADERSHIP_EMPTY: &str = r#"<tr><td colspan="5" class="empty-row">No leadership members found. Add one to get started!</td></tr>"#;

/// Renderers for the admin tables and grids.
#[derive(Clone, Debug, Default)]
pub struct AdminViews {
    fallbacks: FallbackImages,
}

impl AdminViews {
    pub fn new(fallbacks: FallbackImages) -> Self {
        Self { fallbacks }
    }

    fn actions<E: Entity>(entity: &E) -> String {
        format!(
            "{}{}",
            action_button(E::KIND, Action::Edit, entity.id()),
            action_button(E::KIND, Action::Delete, entity.id())
        )
    }
}

fn render_all<E>(items: &[E], empty: &str, row: impl Fn(&E) -> String) -> String {
    if items.is_empty() {
        return empty.to_string();
    }
    items.iter().map(row).collect()
}

impl View<Faculty> for AdminViews {
    fn render(&self, items: &[Faculty]) -> String {
        render_all(items, FACULTY_EMPTY, |f| {
            format!(
                r#"<tr data-id="{id}"><td><img src="{photo}" alt="Faculty" class="table-img"></td><td>{name}</td><td>{role}</td><td>{dept}</td><td>{actions}</td></tr>"#,
                id = escape(&f.id),
                photo = escape(f.photo_url.as_deref().unwrap_or(&self.fallbacks.admin_photo)),
                name = escape(&f.name),
                role = escape(f.role.as_str()),
                dept = escape(f.department()),
                actions = Self::actions(f),
            )
        })
    }
}

impl View<Activity> for AdminViews {
    fn render(&self, items: &[Activity]) -> String {
        render_all(items, ACTIVITY_EMPTY, |a| {
            format!(
                r#"<div class="activity-card" data-id="{id}"><img src="{img}" alt="Activity"><div class="card-content"><h3>{title}</h3><p>{desc}</p><div class="card-actions">{actions}</div></div></div>"#,
                id = escape(&a.id),
                img = escape(a.image_url.as_deref().unwrap_or(&self.fallbacks.admin_image)),
                title = escape(&a.title),
                desc = escape(a.description.as_deref().unwrap_or_default()),
                actions = Self::actions(a),
            )
        })
    }
}

fn grid_item(id: &str, image: &str, alt: &str, actions: String) -> String {
    format!(
        r#"<div class="gallery-item" data-id="{id}"><img src="{img}" alt="{alt}"><div class="gallery-overlay">{actions}</div></div>"#,
        id = escape(id),
        img = escape(image),
        alt = escape(alt),
        actions = actions,
    )
}

impl View<Achievement> for AdminViews {
    fn render(&self, items: &[Achievement]) -> String {
        render_all(items, ACHIEVEMENT_EMPTY, |a| {
            grid_item(
                &a.id,
                a.image_url.as_deref().unwrap_or(&self.fallbacks.admin_image),
                a.title(),
                Self::actions(a),
            )
        })
    }
}

impl View<GalleryImage> for AdminViews {
    fn render(&self, items: &[GalleryImage]) -> String {
        render_all(items, GALLERY_EMPTY, |g| {
            grid_item(
                &g.id,
                g.image_url.as_deref().unwrap_or(&self.fallbacks.admin_image),
                g.caption.as_deref().unwrap_or("Gallery"),
                Self::actions(g),
            )
        })
    }
}

impl View<Leadership> for AdminViews {
    fn render(&self, items: &[Leadership]) -> String {
        render_all(items, LEADERSHIP_EMPTY, |l| {
            format!(
                r#"<tr data-id="{id}"><td><img src="{photo}" alt="Leadership" class="table-img"></td><td>{name}</td><td>{position}</td><td>{order}</td><td>{actions}</td></tr>"#,
                id = escape(&l.id),
                photo = escape(l.photo_url.as_deref().unwrap_or(&self.fallbacks.admin_photo)),
                name = escape(&l.name),
                position = escape(&l.position),
                order = l.display_order,
                actions = Self::actions(l),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FacultyRole;
    use chrono::Utc;

    fn faculty(id: &str, name: &str) -> Faculty {
        Faculty {
            id: id.to_string(),
            name: name.to_string(),
            role: FacultyRole::Professor,
            department: None,
            photo_url: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_empty_faculty_placeholder() {
        let html = View::<Faculty>::render(&AdminViews::default(), &[]);
        assert!(html.contains(r#"colspan="5""#));
        assert!(html.contains("No faculty members found"));
    }

    #[test]
    fn test_faculty_row_uses_fallbacks() {
        let views = AdminViews::default();
        let html = View::<Faculty>::render(&views, &[faculty("f1", "A. Rao")]);
        assert_eq!(html.matches("<tr").count(), 1);
        assert!(html.contains(r#"src="../guru.jpg""#));
        assert!(html.contains("<td>AIML</td>"));
        assert!(html.contains("<td>Professor</td>"));
        assert!(html.contains(r#"data-action="delete" data-id="f1""#));
    }

    #[test]
    fn test_render_is_idempotent_and_escaped() {
        let views = AdminViews::default();
        let items = [faculty("f1", "<script>x</script>"), faculty("f2", "B")];
        let first = View::<Faculty>::render(&views, &items);
        assert_eq!(first, View::<Faculty>::render(&views, &items));
        assert!(!first.contains("<script>"));
        assert_eq!(first.matches("<tr").count(), 2);
    }

    #[test]
    fn test_activity_without_description() {
        let activity = Activity {
            id: "a1".to_string(),
            title: "Hackathon".to_string(),
            description: None,
            image_url: None,
            created_at: Utc::now(),
        };
        let html = View::<Activity>::render(&AdminViews::default(), &[activity]);
        assert!(html.contains("<h3>Hackathon</h3><p></p>"));
        assert!(html.contains(r#"class="activity-card" data-id="a1""#));
    }
}
