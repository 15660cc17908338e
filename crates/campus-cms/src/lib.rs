//! Campus CMS - synchronization layer for a department website
//!
//! This crate provides:
//! - A gateway over the backend's query and object-storage APIs, with REST and in-memory transports
//! - Media uploads that run before any record write carrying an image
//! - Per-kind repositories with refresh-after-write caches
//! - Add/edit form controllers with a single-submission guard
//! - Admin and public renderers, a command table for record actions
//! - The admin console, dashboard statistics, and the public site loader

pub mod config;
pub mod console;
pub mod content;
pub mod controller;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod loader;
pub mod logging;
pub mod media;
pub mod model;
pub mod notice;
pub mod render;
pub mod repository;
pub mod session;
pub mod stats;

pub use config::{BackendConfig, BucketConfig, CmsConfig, FallbackImages};
pub use console::{AdminConsole, Section};
pub use content::{ContentRepository, StudentDirectory};
pub use controller::{Confirm, ContentForm, FormController, FormMode, ModalState, SubmitOutcome};
pub use dispatch::{Action, CommandHandler, CommandTable, FnCommandHandler};
pub use error::{CmsError, GatewayError, Result, UploadFailure};
pub use gateway::{Gateway, MemoryGateway, RestGateway};
pub use loader::{PublicLoadReport, PublicSiteLoader, SectionStatus};
pub use logging::{LoggingConfig, init_logging};
pub use media::{MediaFile, MediaUploader, UploadedMedia};
pub use model::*;
pub use notice::{Notice, NoticeLevel, NoticeLog, Notifier};
pub use render::{AdminViews, MemorySurface, PublicViews, Region, Surface, View};
pub use repository::{Listing, Repository, WriteOutcome};
pub use session::{AuthSignal, InactivityMonitor, SessionEvent};
pub use stats::{DashboardStats, StatsService};
