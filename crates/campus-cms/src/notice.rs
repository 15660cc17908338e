//! User-facing notices

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::error::CmsError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

/// A message for staff, shown by the UI collaborator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            text: text.into(),
        }
    }

    pub fn error(err: &CmsError) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: err.user_message(),
        }
    }

    /// Notice for a failure that did not stop the write.
    pub fn degraded(err: &CmsError) -> Self {
        match err {
            CmsError::Upload { .. } => {
                Self::warning(format!("{} Proceeding without photo.", err.user_message()))
            }
            other => Self::warning(format!(
                "Changes saved, but the list could not be refreshed. {}",
                other.user_message()
            )),
        }
    }
}

/// Receives notices, e.g. to show them as alerts or toasts.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Collects notices in memory.
#[derive(Default)]
pub struct NoticeLog {
    notices: Mutex<Vec<Notice>>,
}

impl NoticeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything collected so far.
    pub fn take(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.notices.lock())
    }
}

impl Notifier for NoticeLog {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => info!("{}", notice.text),
            _ => warn!("{}", notice.text),
        }
        self.notices.lock().push(notice);
    }
}
