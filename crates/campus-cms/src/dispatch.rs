//! Command dispatch for record actions
//!
//! Rendered listings tag each affordance with `data-kind`, `data-action` and
//! `data-id`. The UI collaborator hands those attributes to a
//! [`CommandTable`], which routes them to the registered handler.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tracing::debug;

use crate::error::{CmsError, Result};
use crate::model::EntityKind;

/// Action offered on a rendered record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Edit,
    Delete,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Edit => "edit",
            Action::Delete => "delete",
        })
    }
}

impl FromStr for Action {
    type Err = CmsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "edit" => Ok(Action::Edit),
            "delete" => Ok(Action::Delete),
            other => Err(CmsError::validation(
                "action",
                format!("unknown action: {}", other),
            )),
        }
    }
}

/// Handles one action for one entity kind.
#[async_trait]
pub trait CommandHandler: Send + Sync + 'static {
    async fn handle(&self, id: &str) -> Result<()>;
}

/// A handler that invokes a closure returning a boxed future.
pub struct FnCommandHandler<F>
where
    F: Fn(String) -> BoxFuture<'static, Result<()>> + Send + Sync + 'static,
{
    f: F,
}

impl<F> FnCommandHandler<F>
where
    F: Fn(String) -> BoxFuture<'static, Result<()>> + Send + Sync + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F> CommandHandler for FnCommandHandler<F>
where
    F: Fn(String) -> BoxFuture<'static, Result<()>> + Send + Sync + 'static,
{
    async fn handle(&self, id: &str) -> Result<()> {
        (self.f)(id.to_string()).await
    }
}

/// `(kind, action) -> handler` routing table.
#[derive(Default)]
pub struct CommandTable {
    handlers: HashMap<(EntityKind, Action), Arc<dyn CommandHandler>>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler`, replacing any previous one for the pair.
    pub fn register(&mut self, kind: EntityKind, action: Action, handler: Arc<dyn CommandHandler>) {
        self.handlers.insert((kind, action), handler);
    }

    pub fn contains(&self, kind: EntityKind, action: Action) -> bool {
        self.handlers.contains_key(&(kind, action))
    }

    pub async fn dispatch(&self, kind: EntityKind, action: Action, id: &str) -> Result<()> {
        let handler = self
            .handlers
            .get(&(kind, action))
            .cloned()
            .ok_or(CmsError::UnknownCommand { kind, action })?;
        debug!("Dispatching {} {} id={}", action, kind, id);
        handler.handle(id).await
    }

    /// Dispatch from the raw `data-kind`/`data-action`/`data-id` attribute values.
    pub async fn dispatch_attrs(&self, kind: &str, action: &str, id: &str) -> Result<()> {
        self.dispatch(kind.parse()?, action.parse()?, id).await
    }
}
