//! Entity model types
//!
//! Records are stored remotely and mirrored locally as fully-formed values.
//! Each editable kind has a matching draft type that carries the form fields
//! sent on create and update.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{CmsError, Result};
use crate::gateway::Order;

/// Department assigned to faculty records created from the admin console.
pub const DEFAULT_DEPARTMENT: &str = "AIML";

/// Title stored for achievements submitted without one.
pub const DEFAULT_ACHIEVEMENT_TITLE: &str = "Achievement";

/// Fixed identity of the site content record.
pub const CONTENT_ID: i64 = 1;

/// Kinds of records managed by the CMS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Faculty,
    Activity,
    Achievement,
    Gallery,
    Leadership,
    Content,
    Student,
}

impl EntityKind {
    /// Remote collection backing this kind.
    pub fn collection(&self) -> &'static str {
        match self {
            EntityKind::Faculty => "faculty",
            EntityKind::Activity => "activities",
            EntityKind::Achievement => "achievements",
            EntityKind::Gallery => "gallery",
            EntityKind::Leadership => "leadership",
            EntityKind::Content => "content",
            EntityKind::Student => "students",
        }
    }

    /// Human-readable name used in notices.
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Faculty => "Faculty member",
            EntityKind::Activity => "Activity",
            EntityKind::Achievement => "Achievement",
            EntityKind::Gallery => "Image",
            EntityKind::Leadership => "Leadership member",
            EntityKind::Content => "Content",
            EntityKind::Student => "Student",
        }
    }

    /// Ordering used by list views of this kind.
    pub fn default_order(&self) -> Option<Order> {
        match self {
            EntityKind::Leadership => Some(Order::asc("display_order")),
            EntityKind::Content => None,
            _ => Some(Order::desc("created_at")),
        }
    }

    /// How records of this kind treat an attached image.
    pub fn image_policy(&self) -> ImagePolicy {
        match self {
            EntityKind::Faculty => ImagePolicy::optional("faculty-photos"),
            EntityKind::Activity => ImagePolicy::required("activity-images"),
            EntityKind::Achievement => ImagePolicy::required("achievement-images"),
            EntityKind::Gallery => ImagePolicy::required("images"),
            EntityKind::Leadership => ImagePolicy::optional("images"),
            EntityKind::Content | EntityKind::Student => ImagePolicy::none(),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Faculty => "faculty",
            EntityKind::Activity => "activity",
            EntityKind::Achievement => "achievement",
            EntityKind::Gallery => "gallery",
            EntityKind::Leadership => "leadership",
            EntityKind::Content => "content",
            EntityKind::Student => "student",
        };
        f.write_str(name)
    }
}

impl FromStr for EntityKind {
    type Err = CmsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "faculty" => Ok(EntityKind::Faculty),
            "activity" => Ok(EntityKind::Activity),
            "achievement" => Ok(EntityKind::Achievement),
            "gallery" => Ok(EntityKind::Gallery),
            "leadership" => Ok(EntityKind::Leadership),
            "content" => Ok(EntityKind::Content),
            "student" => Ok(EntityKind::Student),
            other => Err(CmsError::validation(
                "kind",
                format!("unknown entity kind: {}", other),
            )),
        }
    }
}

/// Whether a kind needs an image to be saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageRequirement {
    /// The write is aborted when no image is available.
    Required,
    /// Upload failures degrade to a record without an image.
    Optional,
    /// The kind carries no image.
    Unsupported,
}

/// Per-kind image handling data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImagePolicy {
    pub requirement: ImageRequirement,
    /// Default storage bucket for uploads of this kind
    pub bucket: &'static str,
}

impl ImagePolicy {
    const fn required(bucket: &'static str) -> Self {
        Self {
            requirement: ImageRequirement::Required,
            bucket,
        }
    }

    const fn optional(bucket: &'static str) -> Self {
        Self {
            requirement: ImageRequirement::Optional,
            bucket,
        }
    }

    const fn none() -> Self {
        Self {
            requirement: ImageRequirement::Unsupported,
            bucket: "",
        }
    }
}

/// A persisted record mirrored in a repository cache.
pub trait Entity: DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: EntityKind;

    /// Form fields used to create or update records of this kind.
    type Draft: Draft;

    fn id(&self) -> &str;

    /// Form fields pre-filled from this record.
    fn to_draft(&self) -> Self::Draft;
}

/// Editable fields of an entity, as collected by a form.
pub trait Draft: Serialize + Default + Clone + Send + Sync + 'static {
    /// Trim input and fill in defaults.
    fn normalize(&mut self) {}

    /// Check required fields. Runs before any network call.
    fn validate(&self) -> Result<()>;

    /// Image reference currently carried by the draft.
    fn image_url(&self) -> Option<&str> {
        None
    }

    /// Replace the image reference written with this draft.
    fn set_image_url(&mut self, _url: Option<String>) {}
}

/// Identities come back from the store either as numbers or strings.
fn de_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Int(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Int(n) => n.to_string(),
    })
}

fn require(field: &'static str, value: &str, message: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(CmsError::validation(field, message))
    } else {
        Ok(())
    }
}

fn trim_in_place(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}

fn trim_optional(value: &mut Option<String>) {
    if let Some(v) = value.as_mut() {
        trim_in_place(v);
        if v.is_empty() {
            *value = None;
        }
    }
}

// ============== Faculty ==============

/// Faculty role, limited to the options offered by the admin form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FacultyRole {
    #[serde(rename = "Professor")]
    Professor,
    #[serde(rename = "Associate Professor")]
    AssociateProfessor,
    #[serde(rename = "Assistant Professor")]
    AssistantProfessor,
    #[serde(rename = "Head of Department")]
    HeadOfDepartment,
    #[serde(rename = "Lab Instructor")]
    LabInstructor,
}

impl FacultyRole {
    pub const ALL: [FacultyRole; 5] = [
        FacultyRole::Professor,
        FacultyRole::AssociateProfessor,
        FacultyRole::AssistantProfessor,
        FacultyRole::HeadOfDepartment,
        FacultyRole::LabInstructor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FacultyRole::Professor => "Professor",
            FacultyRole::AssociateProfessor => "Associate Professor",
            FacultyRole::AssistantProfessor => "Assistant Professor",
            FacultyRole::HeadOfDepartment => "Head of Department",
            FacultyRole::LabInstructor => "Lab Instructor",
        }
    }
}

impl fmt::Display for FacultyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FacultyRole {
    type Err = CmsError;

    fn from_str(s: &str) -> Result<Self> {
        FacultyRole::ALL
            .into_iter()
            .find(|role| role.as_str() == s.trim())
            .ok_or_else(|| CmsError::validation("role", "Please select a role!"))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Faculty {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    pub name: String,
    pub role: FacultyRole,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Faculty {
    pub fn department(&self) -> &str {
        self.department.as_deref().unwrap_or(DEFAULT_DEPARTMENT)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FacultyDraft {
    pub name: String,
    pub role: Option<FacultyRole>,
    pub department: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

impl Default for FacultyDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            role: None,
            department: DEFAULT_DEPARTMENT.to_string(),
            photo_url: None,
        }
    }
}

impl Draft for FacultyDraft {
    fn normalize(&mut self) {
        trim_in_place(&mut self.name);
        trim_in_place(&mut self.department);
        if self.department.is_empty() {
            self.department = DEFAULT_DEPARTMENT.to_string();
        }
    }

    fn validate(&self) -> Result<()> {
        require("name", &self.name, "Please enter faculty name!")?;
        if self.role.is_none() {
            return Err(CmsError::validation("role", "Please select a role!"));
        }
        Ok(())
    }

    fn image_url(&self) -> Option<&str> {
        self.photo_url.as_deref()
    }

    fn set_image_url(&mut self, url: Option<String>) {
        self.photo_url = url;
    }
}

impl Entity for Faculty {
    const KIND: EntityKind = EntityKind::Faculty;
    type Draft = FacultyDraft;

    fn id(&self) -> &str {
        &self.id
    }

    fn to_draft(&self) -> FacultyDraft {
        FacultyDraft {
            name: self.name.clone(),
            role: Some(self.role),
            department: self.department().to_string(),
            photo_url: self.photo_url.clone(),
        }
    }
}

// ============== Activity ==============

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ActivityDraft {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Draft for ActivityDraft {
    fn normalize(&mut self) {
        trim_in_place(&mut self.title);
        trim_in_place(&mut self.description);
    }

    fn validate(&self) -> Result<()> {
        require("title", &self.title, "Please fill in all required fields!")?;
        require(
            "description",
            &self.description,
            "Please fill in all required fields!",
        )
    }

    fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    fn set_image_url(&mut self, url: Option<String>) {
        self.image_url = url;
    }
}

impl Entity for Activity {
    const KIND: EntityKind = EntityKind::Activity;
    type Draft = ActivityDraft;

    fn id(&self) -> &str {
        &self.id
    }

    fn to_draft(&self) -> ActivityDraft {
        ActivityDraft {
            title: self.title.clone(),
            description: self.description.clone().unwrap_or_default(),
            image_url: self.image_url.clone(),
        }
    }
}

// ============== Achievement ==============

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Achievement {
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or(DEFAULT_ACHIEVEMENT_TITLE)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AchievementDraft {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Draft for AchievementDraft {
    fn normalize(&mut self) {
        trim_in_place(&mut self.title);
        if self.title.is_empty() {
            self.title = DEFAULT_ACHIEVEMENT_TITLE.to_string();
        }
    }

    fn validate(&self) -> Result<()> {
        Ok(())
    }

    fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    fn set_image_url(&mut self, url: Option<String>) {
        self.image_url = url;
    }
}

impl Entity for Achievement {
    const KIND: EntityKind = EntityKind::Achievement;
    type Draft = AchievementDraft;

    fn id(&self) -> &str {
        &self.id
    }

    fn to_draft(&self) -> AchievementDraft {
        AchievementDraft {
            title: self.title().to_string(),
            image_url: self.image_url.clone(),
        }
    }
}

// ============== Gallery ==============

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GalleryImage {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct GalleryDraft {
    pub caption: Option<String>,
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Draft for GalleryDraft {
    fn normalize(&mut self) {
        trim_optional(&mut self.caption);
        trim_optional(&mut self.description);
    }

    fn validate(&self) -> Result<()> {
        Ok(())
    }

    fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    fn set_image_url(&mut self, url: Option<String>) {
        self.image_url = url;
    }
}

impl Entity for GalleryImage {
    const KIND: EntityKind = EntityKind::Gallery;
    type Draft = GalleryDraft;

    fn id(&self) -> &str {
        &self.id
    }

    fn to_draft(&self) -> GalleryDraft {
        GalleryDraft {
            caption: self.caption.clone(),
            description: self.description.clone(),
            image_url: self.image_url.clone(),
        }
    }
}

// ============== Leadership ==============

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Leadership {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    pub name: String,
    pub position: String,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub display_order: i32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct LeadershipDraft {
    pub name: String,
    pub position: String,
    pub display_order: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

impl Draft for LeadershipDraft {
    fn normalize(&mut self) {
        trim_in_place(&mut self.name);
        trim_in_place(&mut self.position);
    }

    fn validate(&self) -> Result<()> {
        require("name", &self.name, "Please enter a name!")?;
        require("position", &self.position, "Please enter a position!")
    }

    fn image_url(&self) -> Option<&str> {
        self.photo_url.as_deref()
    }

    fn set_image_url(&mut self, url: Option<String>) {
        self.photo_url = url;
    }
}

impl Entity for Leadership {
    const KIND: EntityKind = EntityKind::Leadership;
    type Draft = LeadershipDraft;

    fn id(&self) -> &str {
        &self.id
    }

    fn to_draft(&self) -> LeadershipDraft {
        LeadershipDraft {
            name: self.name.clone(),
            position: self.position.clone(),
            display_order: self.display_order,
            photo_url: self.photo_url.clone(),
        }
    }
}

// ============== Content ==============

/// Site-wide text shown on the public about and mission sections.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteContent {
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub vision: Option<String>,
    #[serde(default)]
    pub mission: Option<String>,
}

/// Wire form of the content record, always addressed by [`CONTENT_ID`].
#[derive(Serialize)]
pub(crate) struct ContentRecord<'a> {
    pub id: i64,
    pub tagline: &'a str,
    pub description: &'a str,
    pub vision: &'a str,
    pub mission: &'a str,
}

impl<'a> From<&'a SiteContent> for ContentRecord<'a> {
    fn from(c: &'a SiteContent) -> Self {
        Self {
            id: CONTENT_ID,
            tagline: c.tagline.as_deref().unwrap_or_default(),
            description: c.description.as_deref().unwrap_or_default(),
            vision: c.vision.as_deref().unwrap_or_default(),
            mission: c.mission.as_deref().unwrap_or_default(),
        }
    }
}

// ============== Student ==============

/// Student row. Only counted by the dashboard.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Student {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_faculty_deserialize_numeric_id() {
        let faculty: Faculty = serde_json::from_value(json!({
            "id": 42,
            "name": "A. Rao",
            "role": "Professor",
            "department": null,
            "photo_url": null,
            "created_at": "2025-01-10T08:00:00+00:00"
        }))
        .unwrap();
        assert_eq!(faculty.id, "42");
        assert_eq!(faculty.department(), "AIML");
        assert_eq!(faculty.role, FacultyRole::Professor);
    }

    #[test]
    fn test_faculty_draft_validation() {
        let mut draft = FacultyDraft {
            name: "   ".to_string(),
            ..Default::default()
        };
        draft.normalize();
        let err = draft.validate().unwrap_err();
        assert!(matches!(err, CmsError::Validation { field: "name", .. }));

        draft.name = "A. Rao".to_string();
        let err = draft.validate().unwrap_err();
        assert!(matches!(err, CmsError::Validation { field: "role", .. }));

        draft.role = Some(FacultyRole::Professor);
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn test_faculty_draft_omits_missing_photo() {
        let draft = FacultyDraft {
            name: "A. Rao".to_string(),
            role: Some(FacultyRole::Professor),
            ..Default::default()
        };
        let value = serde_json::to_value(&draft).unwrap();
        assert_eq!(
            value,
            json!({"name": "A. Rao", "role": "Professor", "department": "AIML"})
        );
    }

    #[test]
    fn test_achievement_title_default() {
        let mut draft = AchievementDraft::default();
        draft.normalize();
        assert_eq!(draft.title, "Achievement");
    }

    #[test]
    fn test_role_from_str() {
        assert_eq!(
            "Assistant Professor".parse::<FacultyRole>().unwrap(),
            FacultyRole::AssistantProfessor
        );
        assert!("Janitor".parse::<FacultyRole>().is_err());
    }

    #[test]
    fn test_kind_policies() {
        assert_eq!(
            EntityKind::Faculty.image_policy().requirement,
            ImageRequirement::Optional
        );
        assert_eq!(
            EntityKind::Achievement.image_policy().requirement,
            ImageRequirement::Required
        );
        assert_eq!(
            EntityKind::Leadership.default_order(),
            Some(Order::asc("display_order"))
        );
        assert_eq!("gallery".parse::<EntityKind>().unwrap(), EntityKind::Gallery);
    }

    #[test]
    fn test_content_record_uses_fixed_id() {
        let content = SiteContent {
            tagline: Some("Learn by building".to_string()),
            ..Default::default()
        };
        let value = serde_json::to_value(ContentRecord::from(&content)).unwrap();
        assert_eq!(value["id"], 1);
        assert_eq!(value["tagline"], "Learn by building");
        assert_eq!(value["mission"], "");
    }
}
