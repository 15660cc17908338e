//! Admin console
//!
//! Wires repositories, form controllers, renderers and the command table for
//! every admin section, behind the authentication gate.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::CmsConfig;
use crate::content::{ContentRepository, StudentDirectory};
use crate::controller::{Confirm, ContentForm, FormController, RenderHook};
use crate::dispatch::{Action, CommandTable, FnCommandHandler};
use crate::error::{CmsError, Result};
use crate::gateway::Gateway;
use crate::model::{Achievement, Activity, Entity, Faculty, GalleryImage, Leadership};
use crate::notice::{Notice, Notifier};
use crate::render::{AdminViews, Region, Surface, View};
use crate::repository::Repository;
use crate::session::{AuthSignal, InactivityMonitor, SessionEvent};
use crate::stats::{DashboardStats, StatsService};

/// Admin navigation sections.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Section {
    Dashboard,
    Faculty,
    Students,
    Activities,
    Achievements,
    Gallery,
    Content,
    Leadership,
}

impl Section {
    /// Sections reachable with Alt+1 through Alt+7.
    const SHORTCUTS: [Section; 7] = [
        Section::Dashboard,
        Section::Faculty,
        Section::Students,
        Section::Activities,
        Section::Achievements,
        Section::Gallery,
        Section::Content,
    ];

    pub fn from_shortcut(key: char) -> Option<Section> {
        let index = key.to_digit(10)?.checked_sub(1)? as usize;
        Self::SHORTCUTS.get(index).copied()
    }

    pub fn title(&self) -> &'static str {
        match self {
            Section::Dashboard => "Dashboard",
            Section::Faculty => "Faculty Management",
            Section::Students => "Student Management",
            Section::Activities => "Activities Management",
            Section::Achievements => "Achievements Management",
            Section::Gallery => "Gallery Management",
            Section::Content => "Content Management",
            Section::Leadership => "Leadership Management",
        }
    }
}

pub struct AdminConsole {
    surface: Arc<dyn Surface>,
    notifier: Arc<dyn Notifier>,
    faculty: Arc<FormController<Faculty>>,
    activities: Arc<FormController<Activity>>,
    achievements: Arc<FormController<Achievement>>,
    gallery: Arc<FormController<GalleryImage>>,
    leadership: Arc<FormController<Leadership>>,
    content: ContentForm,
    students: StudentDirectory,
    stats: StatsService,
    commands: CommandTable,
    current: Mutex<Section>,
    active: AtomicBool,
}

impl AdminConsole {
    /// Open the console. Fails with [`CmsError::Unauthenticated`] unless the
    /// auth signal reports a logged-in user.
    pub fn open(
        config: &CmsConfig,
        gateway: Arc<dyn Gateway>,
        surface: Arc<dyn Surface>,
        notifier: Arc<dyn Notifier>,
        auth: &dyn AuthSignal,
        confirm: Arc<dyn Confirm>,
    ) -> Result<Self> {
        if !auth.is_authenticated() {
            warn!("Refusing to open admin console without authentication");
            return Err(CmsError::Unauthenticated);
        }

        let views = AdminViews::new(config.fallbacks.clone());
        let mut commands = CommandTable::new();

        let faculty = form_for::<Faculty>(config, &gateway, &surface, &notifier, &views);
        let activities = form_for::<Activity>(config, &gateway, &surface, &notifier, &views);
        let achievements = form_for::<Achievement>(config, &gateway, &surface, &notifier, &views);
        let gallery = form_for::<GalleryImage>(config, &gateway, &surface, &notifier, &views);
        let leadership = form_for::<Leadership>(config, &gateway, &surface, &notifier, &views);

        register(&mut commands, &faculty, &notifier, &confirm);
        register(&mut commands, &activities, &notifier, &confirm);
        register(&mut commands, &achievements, &notifier, &confirm);
        register(&mut commands, &gallery, &notifier, &confirm);
        register(&mut commands, &leadership, &notifier, &confirm);

        info!("Admin console opened");
        Ok(Self {
            surface,
            notifier: notifier.clone(),
            faculty,
            activities,
            achievements,
            gallery,
            leadership,
            content: ContentForm::new(ContentRepository::new(gateway.clone()), notifier),
            students: StudentDirectory::new(gateway.clone()),
            stats: StatsService::new(gateway),
            commands,
            current: Mutex::new(Section::Dashboard),
            active: AtomicBool::new(true),
        })
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn current_section(&self) -> Section {
        *self.current.lock()
    }

    pub fn faculty(&self) -> &FormController<Faculty> {
        &self.faculty
    }

    pub fn activities(&self) -> &FormController<Activity> {
        &self.activities
    }

    pub fn achievements(&self) -> &FormController<Achievement> {
        &self.achievements
    }

    pub fn gallery(&self) -> &FormController<GalleryImage> {
        &self.gallery
    }

    pub fn leadership(&self) -> &FormController<Leadership> {
        &self.leadership
    }

    pub fn content(&self) -> &ContentForm {
        &self.content
    }

    pub fn commands(&self) -> &CommandTable {
        &self.commands
    }

    /// Make `section` current and load its data.
    pub async fn show_section(&self, section: Section) -> Result<()> {
        self.ensure_active()?;
        *self.current.lock() = section;
        debug!("Switched to {}", section.title());

        let result = match section {
            Section::Dashboard => {
                self.refresh_stats().await;
                Ok(())
            }
            Section::Faculty => self.faculty.refresh().await,
            Section::Activities => self.activities.refresh().await,
            Section::Achievements => self.achievements.refresh().await,
            Section::Gallery => self.gallery.refresh().await,
            Section::Leadership => self.leadership.refresh().await,
            Section::Content => self.content.load().await,
            Section::Students => self.students.list().await.map(|students| {
                debug!("Student data loaded: {} students", students.len());
            }),
        };

        if let Err(e) = &result {
            error!("Error loading {}: {}", section.title(), e);
            self.notifier.notify(Notice::error(e));
        }
        result
    }

    /// Handle an Alt+digit shortcut. Unmapped keys do nothing.
    pub async fn shortcut(&self, key: char) -> Result<()> {
        match Section::from_shortcut(key) {
            Some(section) => self.show_section(section).await,
            None => Ok(()),
        }
    }

    /// Resolve a rendered affordance's data attributes.
    pub async fn dispatch(&self, kind: &str, action: &str, id: &str) -> Result<()> {
        self.ensure_active()?;
        self.commands.dispatch_attrs(kind, action, id).await
    }

    /// Fetch and display the dashboard counts.
    pub async fn refresh_stats(&self) -> DashboardStats {
        let stats = self.stats.load().await;
        let cards = [
            stats.students,
            stats.faculty,
            stats.activities,
            stats.achievements,
            stats.leadership,
        ];
        for (i, count) in cards.iter().enumerate() {
            self.surface
                .replace_text(Region::StatCard(i), &count.to_string());
        }
        stats
    }

    /// Close the escape-dismissable modals.
    pub fn escape(&self) {
        self.faculty.dismiss();
        self.activities.dismiss();
        self.achievements.dismiss();
        self.gallery.dismiss();
        self.leadership.dismiss();
    }

    /// Close every modal and discard every cache. The console stays unusable afterwards.
    pub fn end_session(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        self.escape();
        self.faculty.repository().clear();
        self.activities.repository().clear();
        self.achievements.repository().clear();
        self.gallery.repository().clear();
        self.leadership.repository().clear();
        self.content.clear();
        info!("Admin session ended");
    }

    /// End the session when `monitor` reports inactivity.
    pub fn watch_session(self: &Arc<Self>, monitor: &InactivityMonitor) -> JoinHandle<()> {
        let mut events = monitor.subscribe();
        let console = Arc::downgrade(self);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(SessionEvent::Expired) => {
                        if let Some(console) = console.upgrade() {
                            console.notifier.notify(Notice::warning(
                                "Session expired due to inactivity. Please login again.",
                            ));
                            console.end_session();
                        }
                        return;
                    }
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => return,
                }
            }
        })
    }

    fn ensure_active(&self) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(CmsError::Unauthenticated)
        }
    }
}

fn form_for<E>(
    config: &CmsConfig,
    gateway: &Arc<dyn Gateway>,
    surface: &Arc<dyn Surface>,
    notifier: &Arc<dyn Notifier>,
    views: &AdminViews,
) -> Arc<FormController<E>>
where
    E: Entity,
    AdminViews: View<E>,
{
    let repo = Repository::<E>::new(gateway.clone()).with_bucket(config.buckets.bucket_for(E::KIND));
    let mut controller = FormController::new(Arc::new(repo), notifier.clone());

    if let Some(region) = Region::admin_list(E::KIND) {
        let views = views.clone();
        let surface = surface.clone();
        let hook: RenderHook<E> = Arc::new(move |items: &[E]| {
            surface.replace_html(region, &View::<E>::render(&views, items));
        });
        controller = controller.with_render(hook);
    }

    Arc::new(controller)
}

fn register<E: Entity>(
    commands: &mut CommandTable,
    controller: &Arc<FormController<E>>,
    notifier: &Arc<dyn Notifier>,
    confirm: &Arc<dyn Confirm>,
) {
    let edit = {
        let controller = controller.clone();
        let notifier = notifier.clone();
        FnCommandHandler::new(move |id: String| {
            let result = controller.open_edit(&id);
            if let Err(e) = &result {
                notifier.notify(Notice::error(e));
            }
            futures::future::ready(result).boxed()
        })
    };

    let delete = {
        let controller = controller.clone();
        let confirm = confirm.clone();
        FnCommandHandler::new(move |id: String| {
            let controller = controller.clone();
            let confirm = confirm.clone();
            async move { controller.remove(&id, confirm.as_ref()).await.map(|_| ()) }.boxed()
        })
    };

    commands.register(E::KIND, Action::Edit, Arc::new(edit));
    commands.register(E::KIND, Action::Delete, Arc::new(delete));
}
