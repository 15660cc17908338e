//! Campus CMS Behaviour Tests
//!
//! End-to-end flows through the admin console and public loader against the
//! in-memory gateway.

use std::sync::Arc;
use std::time::Duration;

use campus_cms::gateway::memory::Operation;
use campus_cms::{
    Activity, ActivityDraft, AdminConsole, CmsConfig, CmsError, Confirm, FacultyDraft,
    FacultyRole, FormMode, GalleryDraft, InactivityMonitor, Leadership, LeadershipDraft,
    MediaFile, MemoryGateway, MemorySurface, ModalState, NoticeLevel, NoticeLog,
    PublicSiteLoader, Region, Repository, Section, SectionStatus, SiteContent, SubmitOutcome,
};
use proptest::prelude::*;
use proptest::test_runner::Config;
use serde_json::json;

struct Harness {
    gateway: Arc<MemoryGateway>,
    surface: Arc<MemorySurface>,
    notices: Arc<NoticeLog>,
    console: AdminConsole,
}

fn harness_with(confirm: Arc<dyn Confirm>) -> Harness {
    let gateway = Arc::new(MemoryGateway::new());
    let surface = Arc::new(MemorySurface::new());
    let notices = Arc::new(NoticeLog::new());
    let console = AdminConsole::open(
        &CmsConfig::default(),
        gateway.clone(),
        surface.clone(),
        notices.clone(),
        &true,
        confirm,
    )
    .unwrap();

    Harness {
        gateway,
        surface,
        notices,
        console,
    }
}

fn harness() -> Harness {
    harness_with(Arc::new(|_: &str| true))
}

fn photo() -> MediaFile {
    MediaFile::new("portrait.jpg", vec![0xFFu8, 0xD8, 0xFF]).with_content_type("image/jpeg")
}

// ============== Faculty Flows ==============

#[tokio::test]
async fn test_add_faculty_without_photo() {
    let h = harness();
    let faculty = h.console.faculty();

    faculty.open_add();
    faculty.set_fields(FacultyDraft {
        name: "A. Rao".to_string(),
        role: Some(FacultyRole::Professor),
        ..Default::default()
    });
    let outcome = faculty.submit().await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::Saved(ref f) if f.id == "f1"));

    let cached = faculty.repository().snapshot();
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].id, "f1");
    assert_eq!(cached[0].name, "A. Rao");
    assert_eq!(cached[0].role, FacultyRole::Professor);
    assert_eq!(cached[0].department(), "AIML");
    assert_eq!(cached[0].photo_url, None);

    let table = h.surface.get(Region::FacultyTable).unwrap();
    assert_eq!(table.matches("<tr").count(), 1);
    assert!(table.contains(r#"src="../guru.jpg""#));
    assert_eq!(faculty.state(), ModalState::Closed);
}

#[tokio::test]
async fn test_policy_failure_lets_faculty_proceed_without_photo() {
    let h = harness();
    h.gateway.deny_bucket("faculty-photos");
    let faculty = h.console.faculty();

    faculty.open_add();
    faculty.set_fields(FacultyDraft {
        name: "B. Iyer".to_string(),
        role: Some(FacultyRole::AssistantProfessor),
        ..Default::default()
    });
    faculty.attach_image(photo());
    let outcome = faculty.submit().await.unwrap();

    let SubmitOutcome::Saved(saved) = outcome else {
        panic!("expected the faculty member to be saved");
    };
    assert_eq!(saved.photo_url, None);
    assert_eq!(h.gateway.object_count(), 0);

    let notices = h.notices.take();
    assert_eq!(notices.len(), 2);
    assert_eq!(notices[0].level, NoticeLevel::Warning);
    assert!(notices[0].text.contains("'faculty-photos'"));
    assert!(notices[0].text.contains("Proceeding without photo"));
    assert_eq!(notices[1].text, "Faculty member added successfully!");
}

#[tokio::test]
async fn test_policy_failure_aborts_activity() {
    let h = harness();
    h.gateway.deny_bucket("activity-images");
    let activities = h.console.activities();

    activities.open_add();
    activities.set_fields(ActivityDraft {
        title: "Robotics Workshop".to_string(),
        description: "Two-day hands-on session".to_string(),
        image_url: None,
    });
    activities.attach_image(photo());
    let err = activities.submit().await.unwrap_err();

    assert!(err.is_policy_violation());
    assert_eq!(h.gateway.calls(Operation::Insert), 0);
    assert!(h.gateway.rows("activities").is_empty());
    assert_eq!(activities.state(), ModalState::Open(FormMode::Add));
    assert!(h.notices.take()[0].text.contains("'activity-images'"));
}

#[tokio::test]
async fn test_achievement_without_image_never_reaches_gateway() {
    let h = harness();
    let achievements = h.console.achievements();

    achievements.open_add();
    let err = achievements.submit().await.unwrap_err();

    assert!(matches!(err, CmsError::Validation { field: "image", .. }));
    assert_eq!(err.user_message(), "Please select an image!");
    assert_eq!(h.gateway.total_calls(), 0);
}

#[tokio::test]
async fn test_achievement_with_image_gets_default_title() {
    let h = harness();
    let achievements = h.console.achievements();

    achievements.open_add();
    achievements.attach_image(photo());
    achievements.submit().await.unwrap();

    let cached = achievements.repository().snapshot();
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].title(), "Achievement");
    assert!(
        cached[0]
            .image_url
            .as_deref()
            .unwrap()
            .contains("/storage/v1/object/public/achievement-images/")
    );
}

#[tokio::test]
async fn test_double_submit_writes_once() {
    let h = harness();
    let faculty = h.console.faculty();

    faculty.open_add();
    faculty.set_fields(FacultyDraft {
        name: "C. Das".to_string(),
        role: Some(FacultyRole::LabInstructor),
        ..Default::default()
    });

    let (first, second) = tokio::join!(faculty.submit(), faculty.submit());
    assert!(matches!(first.unwrap(), SubmitOutcome::Saved(_)));
    assert!(matches!(second.unwrap(), SubmitOutcome::Ignored));
    assert_eq!(h.gateway.calls(Operation::Insert), 1);
    assert_eq!(h.gateway.rows("faculty").len(), 1);
    assert!(!faculty.is_submitting());
}

// ============== Edit and Delete Through the Command Table ==============

fn seed_faculty(gateway: &MemoryGateway) {
    gateway.seed(
        "faculty",
        vec![
            json!({
                "id": "f1",
                "name": "A. Rao",
                "role": "Professor",
                "department": "AIML",
                "photo_url": "https://cdn.test/rao.jpg"
            }),
            json!({"id": "f2", "name": "D. Sen", "role": "Head of Department"}),
        ],
    );
}

#[tokio::test]
async fn test_edit_prefills_from_cache() {
    let h = harness();
    seed_faculty(&h.gateway);
    h.console.show_section(Section::Faculty).await.unwrap();

    h.console.dispatch("faculty", "edit", "f1").await.unwrap();
    let faculty = h.console.faculty();
    assert_eq!(
        faculty.state(),
        ModalState::Open(FormMode::Edit {
            target_id: "f1".to_string()
        })
    );
    assert_eq!(faculty.title(), "Edit Faculty member");

    let fields = faculty.fields();
    assert_eq!(fields.name, "A. Rao");
    assert_eq!(fields.role, Some(FacultyRole::Professor));
    assert_eq!(fields.department, "AIML");
    assert_eq!(fields.photo_url.as_deref(), Some("https://cdn.test/rao.jpg"));
}

#[tokio::test]
async fn test_edit_missing_id_reports_not_found() {
    let h = harness();
    seed_faculty(&h.gateway);
    h.console.show_section(Section::Faculty).await.unwrap();

    let err = h.console.dispatch("faculty", "edit", "f9").await.unwrap_err();
    assert!(matches!(err, CmsError::NotFound { .. }));
    assert_eq!(h.console.faculty().state(), ModalState::Closed);
    assert_eq!(h.notices.take()[0].text, "Faculty member not found!");
}

#[tokio::test]
async fn test_update_keeps_untouched_fields() {
    let h = harness();
    seed_faculty(&h.gateway);
    h.console.show_section(Section::Faculty).await.unwrap();

    let faculty = h.console.faculty();
    faculty.open_edit("f1").unwrap();
    faculty.edit_fields(|d| {
        d.role = Some(FacultyRole::HeadOfDepartment);
        d.photo_url = None;
    });
    faculty.submit().await.unwrap();

    let updated = faculty.repository().find("f1").unwrap();
    assert_eq!(updated.role, FacultyRole::HeadOfDepartment);
    assert_eq!(updated.name, "A. Rao");
    assert_eq!(updated.photo_url.as_deref(), Some("https://cdn.test/rao.jpg"));
    assert_eq!(faculty.repository().snapshot().len(), 2);
}

#[tokio::test]
async fn test_delete_then_list_excludes_id() {
    let h = harness();
    seed_faculty(&h.gateway);
    h.console.show_section(Section::Faculty).await.unwrap();

    h.console.dispatch("faculty", "delete", "f1").await.unwrap();
    let ids: Vec<String> = h
        .console
        .faculty()
        .repository()
        .snapshot()
        .iter()
        .map(|f| f.id.clone())
        .collect();
    assert_eq!(ids, vec!["f2".to_string()]);

    let table = h.surface.get(Region::FacultyTable).unwrap();
    assert!(!table.contains(r#"data-id="f1""#));

    // Deleting an id that no longer exists is a no-op.
    h.console.dispatch("faculty", "delete", "f1").await.unwrap();
    assert_eq!(h.console.faculty().repository().snapshot().len(), 1);
}

#[tokio::test]
async fn test_refused_confirmation_keeps_record() {
    let h = harness_with(Arc::new(|_: &str| false));
    seed_faculty(&h.gateway);
    h.console.show_section(Section::Faculty).await.unwrap();

    h.console.dispatch("faculty", "delete", "f1").await.unwrap();
    assert_eq!(h.gateway.calls(Operation::Delete), 0);
    assert_eq!(h.gateway.rows("faculty").len(), 2);
}

#[tokio::test]
async fn test_unknown_command_is_an_error() {
    let h = harness();
    let err = h.console.dispatch("content", "delete", "1").await.unwrap_err();
    assert!(matches!(err, CmsError::UnknownCommand { .. }));
}

// ============== Sections, Stats and Session ==============

#[tokio::test]
async fn test_dashboard_stats_and_degradation() {
    let h = harness();
    seed_faculty(&h.gateway);
    h.gateway
        .seed("students", vec![json!({"name": "S1"}), json!({"name": "S2"})]);

    h.console.shortcut('1').await.unwrap();
    assert_eq!(h.console.current_section(), Section::Dashboard);
    assert_eq!(h.surface.get(Region::StatCard(0)).as_deref(), Some("2"));
    assert_eq!(h.surface.get(Region::StatCard(1)).as_deref(), Some("2"));

    h.gateway.fail_next(Operation::Count, "connection reset");
    let stats = h.console.refresh_stats().await;
    assert!(stats.degraded);
    assert_eq!(h.surface.get(Region::StatCard(1)).as_deref(), Some("0"));
}

#[tokio::test]
async fn test_section_fetch_failure_is_reported() {
    let h = harness();
    h.gateway.fail_next(Operation::Query, "JWT expired");

    let err = h.console.show_section(Section::Gallery).await.unwrap_err();
    assert!(matches!(err, CmsError::Fetch(ref e) if e.message == "JWT expired"));
    let notices = h.notices.take();
    assert_eq!(notices[0].level, NoticeLevel::Error);
    assert!(notices[0].text.contains("JWT expired"));
}

#[tokio::test]
async fn test_content_section_load_and_save() {
    let h = harness();
    h.console.shortcut('7').await.unwrap();
    assert_eq!(h.console.current_section(), Section::Content);

    let content = h.console.content();
    content.set_fields(SiteContent {
        tagline: Some("Shaping intelligent systems".to_string()),
        ..Default::default()
    });
    content.save().await.unwrap();

    let rows = h.gateway.rows("content");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], 1);
    assert_eq!(rows[0]["tagline"], "Shaping intelligent systems");
}

#[tokio::test(start_paused = true)]
async fn test_inactivity_ends_session() {
    let h = harness();
    seed_faculty(&h.gateway);
    h.console.show_section(Section::Faculty).await.unwrap();
    h.console.faculty().open_edit("f2").unwrap();

    let console = Arc::new(h.console);
    let monitor = InactivityMonitor::start(Duration::from_secs(30 * 60));
    let watcher = console.watch_session(&monitor);

    tokio::time::sleep(Duration::from_secs(30 * 60 + 1)).await;
    watcher.await.unwrap();

    assert!(!console.is_active());
    assert_eq!(console.faculty().state(), ModalState::Closed);
    assert!(console.faculty().repository().snapshot().is_empty());
    assert!(matches!(
        console.show_section(Section::Faculty).await,
        Err(CmsError::Unauthenticated)
    ));
    assert!(
        h.notices
            .take()
            .iter()
            .any(|n| n.text.starts_with("Session expired due to inactivity"))
    );
}

#[tokio::test]
async fn test_ended_session_ignores_late_listing() {
    let h = harness();
    seed_faculty(&h.gateway);
    h.gateway.hold_next(Operation::Query);

    let (refreshed, _) = tokio::join!(h.console.faculty().refresh(), async {
        while h.gateway.parked() == 0 {
            tokio::task::yield_now().await;
        }
        h.console.end_session();
        h.gateway.release();
    });

    refreshed.unwrap();
    assert!(!h.console.is_active());
    assert!(h.console.faculty().repository().snapshot().is_empty());
}

#[test]
fn test_console_requires_login() {
    let result = AdminConsole::open(
        &CmsConfig::default(),
        Arc::new(MemoryGateway::new()),
        Arc::new(MemorySurface::new()),
        Arc::new(NoticeLog::new()),
        &false,
        Arc::new(|_: &str| true),
    );
    assert!(matches!(result, Err(CmsError::Unauthenticated)));
}

// ============== Public Site ==============

#[tokio::test]
async fn test_public_site_reflects_admin_writes() {
    let h = harness();
    let gallery = h.console.gallery();
    for caption in ["Orientation", "Hackathon"] {
        gallery.open_add();
        gallery.set_fields(GalleryDraft {
            caption: Some(caption.to_string()),
            ..Default::default()
        });
        gallery.attach_image(photo());
        gallery.submit().await.unwrap();
    }

    let surface = Arc::new(MemorySurface::new());
    let report = PublicSiteLoader::new(&CmsConfig::default(), h.gateway.clone(), surface.clone())
        .load()
        .await;

    assert_eq!(report.gallery, SectionStatus::Rendered(2));
    assert_eq!(report.faculty, SectionStatus::Static);
    let track = surface.get(Region::PublicGalleryTrack).unwrap();
    assert!(track.find("Hackathon").unwrap() < track.find("Orientation").unwrap());
    let dots = surface.get(Region::PublicGalleryDots).unwrap();
    assert_eq!(dots.matches("data-slide").count(), 2);
}

// ============== Ordering Properties ==============

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(Config::with_cases(32))]

    #[test]
    fn leadership_lists_by_display_order(orders in proptest::collection::vec(-50i32..50, 1..12)) {
        let listed = runtime().block_on(async {
            let repo: Repository<Leadership> = Repository::new(Arc::new(MemoryGateway::new()));
            for (i, order) in orders.iter().enumerate() {
                let draft = LeadershipDraft {
                    name: format!("Member {}", i),
                    position: "Coordinator".to_string(),
                    display_order: *order,
                    photo_url: None,
                };
                repo.create(draft, None).await.unwrap();
            }
            repo.list().await.unwrap()
        });

        let mut expected = orders.clone();
        expected.sort();
        let actual: Vec<i32> = listed.iter().map(|l| l.display_order).collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn activities_list_newest_first_exactly_once(count in 1usize..10) {
        let listed = runtime().block_on(async {
            let repo: Repository<Activity> = Repository::new(Arc::new(MemoryGateway::new()));
            for i in 0..count {
                let draft = ActivityDraft {
                    title: format!("Event {}", i),
                    description: "Open to all".to_string(),
                    image_url: Some(format!("https://cdn.test/{}.png", i)),
                };
                repo.create(draft, None).await.unwrap();
            }
            repo.list().await.unwrap()
        });

        prop_assert_eq!(listed.len(), count);
        for pair in listed.windows(2) {
            prop_assert!(pair[0].created_at > pair[1].created_at);
        }
        let newest = format!("Event {}", count - 1);
        prop_assert_eq!(&listed[0].title, &newest);
    }
}
