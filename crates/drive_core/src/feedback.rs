//! User-facing error banner, external session hooks and the event feed.

use std::{sync::Arc, time::Duration};

use shared::domain::{DirectoryId, TempId};
use tokio::{
    sync::{broadcast, Mutex},
    time::Instant,
};
use tracing::{info, warn};

use crate::{error::DriveError, upload::UploadStatus};

/// Callbacks into the surrounding application (auth flow, notifications).
pub trait SessionHooks: Send + Sync {
    /// The session is gone; the host must send the user to its login flow.
    fn on_unauthorized(&self);
    fn on_mutation_error(&self, message: &str);
}

pub struct NoopHooks;

impl SessionHooks for NoopHooks {
    fn on_unauthorized(&self) {}
    fn on_mutation_error(&self, _message: &str) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorState {
    pub message: String,
    pub expires_at: Instant,
}

impl ErrorState {
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DriveEvent {
    ListingReloaded {
        dir_id: Option<DirectoryId>,
    },
    DirectoryUnavailable {
        dir_id: Option<DirectoryId>,
    },
    UploadProgress {
        temp_id: TempId,
        percent: f64,
    },
    UploadSettled {
        temp_id: TempId,
        status: UploadStatus,
    },
    Error(String),
    Unauthorized,
}

pub struct Feedback {
    hooks: Arc<dyn SessionHooks>,
    error: Mutex<Option<ErrorState>>,
    events: broadcast::Sender<DriveEvent>,
    display_for: Duration,
}

impl Feedback {
    pub fn new(hooks: Arc<dyn SessionHooks>, display_for: Duration) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            hooks,
            error: Mutex::new(None),
            events,
            display_for,
        }
    }

    pub fn publish(&self, event: DriveEvent) {
        let _ = self.events.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DriveEvent> {
        self.events.subscribe()
    }

    /// Routes a caught failure to the right surface. Cancellation stays silent.
    pub async fn report(&self, err: &DriveError) {
        if err.is_silent() {
            return;
        }
        if err.requires_reauth() {
            info!("session rejected by backend; handing off to login flow");
            self.hooks.on_unauthorized();
            self.publish(DriveEvent::Unauthorized);
            return;
        }
        warn!(error = %err, "operation failed");
        self.show(err.user_message()).await;
    }

    /// Shows `message` until the display deadline passes.
    pub async fn show(&self, message: impl Into<String>) {
        let message = message.into();
        self.hooks.on_mutation_error(&message);
        *self.error.lock().await = Some(ErrorState {
            message: message.clone(),
            expires_at: Instant::now() + self.display_for,
        });
        self.publish(DriveEvent::Error(message));
    }

    /// Current banner text; expired banners are dropped on read.
    pub async fn current(&self) -> Option<String> {
        let mut guard = self.error.lock().await;
        if guard
            .as_ref()
            .is_some_and(|state| state.is_expired(Instant::now()))
        {
            *guard = None;
        }
        guard.as_ref().map(|state| state.message.clone())
    }

    pub async fn clear(&self) {
        *self.error.lock().await = None;
    }
}
