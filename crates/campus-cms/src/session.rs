//! Admin session lifetime
//!
//! The console only opens behind an [`AuthSignal`], and an
//! [`InactivityMonitor`] announces when staff have been idle too long.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info};

/// Reports whether the current user is logged in.
pub trait AuthSignal: Send + Sync {
    fn is_authenticated(&self) -> bool;
}

impl AuthSignal for AtomicBool {
    fn is_authenticated(&self) -> bool {
        self.load(Ordering::SeqCst)
    }
}

impl AuthSignal for bool {
    fn is_authenticated(&self) -> bool {
        *self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// No activity within the timeout
    Expired,
}

/// Fires [`SessionEvent::Expired`] once no activity was reported for the timeout.
///
/// Must be started inside a tokio runtime. The timer task stops on expiry
/// or when the monitor is dropped.
pub struct InactivityMonitor {
    timeout: Duration,
    deadline: watch::Sender<Instant>,
    events: broadcast::Sender<SessionEvent>,
    task: JoinHandle<()>,
}

impl InactivityMonitor {
    pub fn start(timeout: Duration) -> Self {
        let (deadline, mut deadline_rx) = watch::channel(Instant::now() + timeout);
        let (events, _) = broadcast::channel(4);
        let expired = events.clone();

        let task = tokio::spawn(async move {
            loop {
                let current = *deadline_rx.borrow_and_update();
                tokio::select! {
                    _ = sleep_until(current) => {
                        if *deadline_rx.borrow() <= Instant::now() {
                            info!("Session expired due to inactivity");
                            let _ = expired.send(SessionEvent::Expired);
                            return;
                        }
                    }
                    changed = deadline_rx.changed() => {
                        if changed.is_err() {
                            return;
                        }
                    }
                }
            }
        });

        debug!("Inactivity monitor started with timeout {:?}", timeout);
        Self {
            timeout,
            deadline,
            events,
            task,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Record user activity and push the deadline out.
    pub fn touch(&self) {
        let _ = self.deadline.send(Instant::now() + self.timeout);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn is_expired(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for InactivityMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}
