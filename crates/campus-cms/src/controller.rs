//! Form and modal controllers
//!
//! A [`FormController`] drives the add/edit modal of one entity kind:
//!
//! ```text
//! Closed -> Open(Add)              -> Submitting -> Closed
//! Closed -> Open(Edit{target_id})  -> Submitting -> Closed
//! ```
//!
//! A failed submission returns to `Open` with the fields intact. Dismissing
//! the modal (escape or backdrop) always forces `Closed`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::content::ContentRepository;
use crate::error::{CmsError, Result};
use crate::media::MediaFile;
use crate::model::{Entity, SiteContent};
use crate::notice::{Notice, Notifier};
use crate::repository::Repository;

/// Re-draws a listing from a freshly fetched collection.
pub type RenderHook<E> = Arc<dyn Fn(&[E]) + Send + Sync>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormMode {
    Add,
    Edit { target_id: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModalState {
    Closed,
    Open(FormMode),
    Submitting(FormMode),
}

#[derive(Debug)]
pub enum SubmitOutcome<E> {
    /// The record as stored.
    Saved(E),
    /// Another submission was in flight or the modal was not open.
    Ignored,
}

/// Asks staff to confirm a destructive action.
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

struct FormState<D> {
    modal: ModalState,
    fields: D,
    image: Option<MediaFile>,
}

/// Releases the submission guard however the submission ends.
struct SubmitGuard<'a>(&'a AtomicBool);

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct FormController<E: Entity> {
    repo: Arc<Repository<E>>,
    notifier: Arc<dyn Notifier>,
    render: Option<RenderHook<E>>,
    state: Mutex<FormState<E::Draft>>,
    submitting: AtomicBool,
}

impl<E: Entity> FormController<E> {
    pub fn new(repo: Arc<Repository<E>>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            repo,
            notifier,
            render: None,
            state: Mutex::new(FormState {
                modal: ModalState::Closed,
                fields: E::Draft::default(),
                image: None,
            }),
            submitting: AtomicBool::new(false),
        }
    }

    /// Re-draw through `hook` after every refresh.
    pub fn with_render(mut self, hook: RenderHook<E>) -> Self {
        self.render = Some(hook);
        self
    }

    pub fn repository(&self) -> &Arc<Repository<E>> {
        &self.repo
    }

    pub fn state(&self) -> ModalState {
        self.state.lock().modal.clone()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::SeqCst)
    }

    /// Modal heading for the current mode.
    pub fn title(&self) -> String {
        let verb = match self.state.lock().modal {
            ModalState::Open(FormMode::Edit { .. })
            | ModalState::Submitting(FormMode::Edit { .. }) => "Edit",
            _ => "Add",
        };
        format!("{} {}", verb, E::KIND.label())
    }

    pub fn fields(&self) -> E::Draft {
        self.state.lock().fields.clone()
    }

    pub fn set_fields(&self, fields: E::Draft) {
        self.state.lock().fields = fields;
    }

    pub fn edit_fields(&self, f: impl FnOnce(&mut E::Draft)) {
        f(&mut self.state.lock().fields);
    }

    pub fn attach_image(&self, file: MediaFile) {
        self.state.lock().image = Some(file);
    }

    pub fn image(&self) -> Option<MediaFile> {
        self.state.lock().image.clone()
    }

    /// Open an empty form for a new record.
    pub fn open_add(&self) {
        let mut state = self.state.lock();
        state.fields = E::Draft::default();
        state.image = None;
        state.modal = ModalState::Open(FormMode::Add);
        debug!("Opened {} form in add mode", E::KIND);
    }

    /// Open the form pre-filled from the cached record `id`.
    pub fn open_edit(&self, id: &str) -> Result<()> {
        let entity = self.repo.find(id).ok_or_else(|| {
            warn!("{} not found with id {}", E::KIND, id);
            CmsError::NotFound {
                kind: E::KIND,
                id: id.to_string(),
            }
        })?;

        let mut state = self.state.lock();
        state.fields = entity.to_draft();
        state.image = None;
        state.modal = ModalState::Open(FormMode::Edit {
            target_id: id.to_string(),
        });
        debug!("Opened {} form in edit mode for {}", E::KIND, id);
        Ok(())
    }

    /// Close the modal and discard unsaved edits.
    pub fn dismiss(&self) {
        let mut state = self.state.lock();
        state.modal = ModalState::Closed;
        state.fields = E::Draft::default();
        state.image = None;
    }

    /// Fetch the collection and re-draw it.
    pub async fn refresh(&self) -> Result<()> {
        self.repo.list().await?;
        self.redraw();
        Ok(())
    }

    /// Validate, upload, write, refetch, re-draw, then close.
    ///
    /// Only one submission runs at a time; a submit issued while another is
    /// in flight is ignored without reaching the gateway.
    pub async fn submit(&self) -> Result<SubmitOutcome<E>> {
        if self.submitting.swap(true, Ordering::SeqCst) {
            debug!("Ignoring {} submit while another is in flight", E::KIND);
            return Ok(SubmitOutcome::Ignored);
        }
        let _guard = SubmitGuard(&self.submitting);

        let (mode, draft, image) = {
            let mut state = self.state.lock();
            let mode = match &state.modal {
                ModalState::Open(mode) => mode.clone(),
                other => {
                    debug!("Ignoring {} submit in state {:?}", E::KIND, other);
                    return Ok(SubmitOutcome::Ignored);
                }
            };
            state.modal = ModalState::Submitting(mode.clone());
            (mode, state.fields.clone(), state.image.clone())
        };

        let result = match &mode {
            FormMode::Add => self.repo.create(draft, image.as_ref()).await,
            FormMode::Edit { target_id } => {
                self.repo.update(target_id, draft, image.as_ref()).await
            }
        };

        match result {
            Ok(outcome) => {
                self.redraw();
                self.finish(&mode, true);

                let verb = match mode {
                    FormMode::Add => "added",
                    FormMode::Edit { .. } => "updated",
                };
                info!("{} {} successfully", E::KIND, verb);
                for warning in &outcome.warnings {
                    self.notifier.notify(Notice::degraded(warning));
                }
                self.notifier.notify(Notice::success(format!(
                    "{} {} successfully!",
                    E::KIND.label(),
                    verb
                )));
                Ok(SubmitOutcome::Saved(outcome.value))
            }
            Err(e) => {
                self.finish(&mode, false);
                self.notifier.notify(Notice::error(&e));
                Err(e)
            }
        }
    }

    /// Ask for confirmation, delete `id`, then re-draw.
    ///
    /// Returns `false` when the confirmation was refused.
    pub async fn remove(&self, id: &str, confirm: &dyn Confirm) -> Result<bool> {
        let prompt = format!(
            "Are you sure you want to delete this {}?",
            E::KIND.label().to_lowercase()
        );
        if !confirm.confirm(&prompt) {
            debug!("Delete of {} {} cancelled", E::KIND, id);
            return Ok(false);
        }

        match self.repo.remove(id).await {
            Ok(outcome) => {
                self.redraw();
                for warning in &outcome.warnings {
                    self.notifier.notify(Notice::degraded(warning));
                }
                self.notifier.notify(Notice::success(format!(
                    "{} deleted successfully!",
                    E::KIND.label()
                )));
                Ok(true)
            }
            Err(e) => {
                self.notifier.notify(Notice::error(&e));
                Err(e)
            }
        }
    }

    fn redraw(&self) {
        if let Some(render) = &self.render {
            render(self.repo.snapshot().as_slice());
        }
    }

    /// Leave `Submitting`, unless the modal was dismissed or reopened meanwhile.
    fn finish(&self, mode: &FormMode, saved: bool) {
        let mut state = self.state.lock();
        if state.modal != ModalState::Submitting(mode.clone()) {
            return;
        }
        if saved {
            state.modal = ModalState::Closed;
            state.fields = E::Draft::default();
            state.image = None;
        } else {
            state.modal = ModalState::Open(mode.clone());
        }
    }
}

/// The site content form: load fills the fields, save upserts and reloads.
pub struct ContentForm {
    repo: ContentRepository,
    notifier: Arc<dyn Notifier>,
    fields: Mutex<SiteContent>,
}

impl ContentForm {
    pub fn new(repo: ContentRepository, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            repo,
            notifier,
            fields: Mutex::new(SiteContent::default()),
        }
    }

    pub fn fields(&self) -> SiteContent {
        self.fields.lock().clone()
    }

    pub fn set_fields(&self, content: SiteContent) {
        *self.fields.lock() = content;
    }

    /// Load the stored content into the fields. Missing content leaves them as they are.
    pub async fn load(&self) -> Result<()> {
        if let Some(content) = self.repo.load().await? {
            *self.fields.lock() = content;
        }
        Ok(())
    }

    pub async fn save(&self) -> Result<()> {
        let content = self.fields();
        match self.repo.save(&content).await {
            Ok(outcome) => {
                *self.fields.lock() = outcome.value;
                for warning in &outcome.warnings {
                    self.notifier.notify(Notice::degraded(warning));
                }
                self.notifier
                    .notify(Notice::success("Content saved successfully!"));
                Ok(())
            }
            Err(e) => {
                self.notifier.notify(Notice::error(&e));
                Err(e)
            }
        }
    }

    /// Forget loaded content and cached state.
    pub fn clear(&self) {
        self.repo.clear();
        *self.fields.lock() = SiteContent::default();
    }
}
