//! Single-slot upload state machine.
//!
//! `Idle → Initiating → Transferring → Completing → Idle`. Failures leave from
//! any active state; cancellation only from `Transferring`. The slot is a
//! one-permit semaphore, so a second upload is rejected rather than queued.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use shared::{
    domain::{DirectoryId, FileId, TempId},
    protocol::UploadInitiateRequest,
};
use tokio::{
    sync::{Mutex, OwnedSemaphorePermit, Semaphore},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    backend::{DriveBackend, TransferEvent, TransferHandle, UploadFile},
    directory::{DirectoryStateController, UploadRow},
    error::{DriveError, DriveResult},
    feedback::{DriveEvent, Feedback},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    Initiating,
    Transferring,
    Completing,
    Committed,
    Failed,
    Cancelled,
}

impl UploadStatus {
    pub fn is_active(self) -> bool {
        matches!(
            self,
            UploadStatus::Initiating | UploadStatus::Transferring | UploadStatus::Completing
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadSession {
    pub temp_id: TempId,
    pub name: String,
    pub size: u64,
    pub content_type: String,
    pub parent_dir_id: Option<DirectoryId>,
    pub target_file_id: Option<FileId>,
    pub signed_url: Option<String>,
    /// Monotonic within a session, in `[0, 100]`.
    pub progress_percent: f64,
    pub status: UploadStatus,
    pub started_at: DateTime<Utc>,
}

impl UploadSession {
    pub fn placeholder(&self) -> UploadRow {
        UploadRow {
            temp_id: self.temp_id.clone(),
            parent_dir_id: self.parent_dir_id.clone(),
            name: self.name.clone(),
            size: self.size,
            percent: self.progress_percent,
        }
    }
}

struct ActiveUpload {
    session: UploadSession,
    permit: OwnedSemaphorePermit,
    worker: Option<JoinHandle<()>>,
}

#[derive(Default)]
struct UploadSlot {
    active: Option<ActiveUpload>,
    last: Option<UploadSession>,
}

pub struct UploadCoordinator {
    backend: Arc<dyn DriveBackend>,
    directory: Arc<DirectoryStateController>,
    feedback: Arc<Feedback>,
    lease: Arc<Semaphore>,
    slot: Mutex<UploadSlot>,
}

impl UploadCoordinator {
    pub fn new(
        backend: Arc<dyn DriveBackend>,
        directory: Arc<DirectoryStateController>,
        feedback: Arc<Feedback>,
    ) -> Arc<Self> {
        Arc::new(Self {
            backend,
            directory,
            feedback,
            lease: Arc::new(Semaphore::new(1)),
            slot: Mutex::new(UploadSlot::default()),
        })
    }

    pub async fn active(&self) -> Option<UploadSession> {
        let guard = self.slot.lock().await;
        guard.active.as_ref().map(|active| active.session.clone())
    }

    /// The most recent session that reached a terminal state.
    pub async fn last_outcome(&self) -> Option<UploadSession> {
        self.slot.lock().await.last.clone()
    }

    pub async fn placeholder(&self) -> Option<UploadRow> {
        let guard = self.slot.lock().await;
        guard
            .active
            .as_ref()
            .map(|active| active.session.placeholder())
    }

    pub async fn is_busy(&self) -> bool {
        self.slot.lock().await.active.is_some()
    }

    /// Starts uploading `file` into `parent_dir_id`. Returns once the transfer
    /// is under way; progress and the outcome arrive asynchronously.
    pub async fn begin_upload(
        self: &Arc<Self>,
        file: UploadFile,
        parent_dir_id: Option<DirectoryId>,
    ) -> DriveResult<TempId> {
        let Ok(lease) = Arc::clone(&self.lease).try_acquire_owned() else {
            debug!(name = %file.name, "rejecting upload while another is active");
            self.feedback.report(&DriveError::UploadBusy).await;
            return Err(DriveError::UploadBusy);
        };

        let session = UploadSession {
            temp_id: TempId::generate(),
            name: file.name.clone(),
            size: file.size(),
            content_type: file.content_type.clone(),
            parent_dir_id: parent_dir_id.clone(),
            target_file_id: None,
            signed_url: None,
            progress_percent: 0.0,
            status: UploadStatus::Initiating,
            started_at: Utc::now(),
        };
        let temp_id = session.temp_id.clone();
        info!(%temp_id, name = %session.name, size = session.size, "upload initiating");
        self.slot.lock().await.active = Some(ActiveUpload {
            session,
            permit: lease,
            worker: None,
        });

        let request = UploadInitiateRequest {
            name: file.name.clone(),
            size: file.size(),
            content_type: file.content_type.clone(),
            parent_dir_id,
        };
        let intent = match self.backend.initiate_upload(request).await {
            Ok(intent) => intent,
            Err(err) => {
                self.settle(&temp_id, UploadStatus::Failed).await;
                self.feedback.report(&err).await;
                return Err(err);
            }
        };

        let mut guard = self.slot.lock().await;
        let Some(active) = guard
            .active
            .as_mut()
            .filter(|active| active.session.temp_id == temp_id)
        else {
            return Err(DriveError::UserCancelled);
        };
        active.session.status = UploadStatus::Transferring;
        active.session.target_file_id = Some(intent.file_id.clone());
        active.session.signed_url = Some(intent.upload_signed_url.clone());

        let transfer = self.backend.start_transfer(&intent.upload_signed_url, file);
        // The worker needs the slot lock for every update, so it cannot
        // observe the session before its handle is stored.
        let worker = tokio::spawn(Arc::clone(self).drive_transfer(
            temp_id.clone(),
            intent.file_id.clone(),
            transfer,
        ));
        active.worker = Some(worker);
        drop(guard);

        info!(%temp_id, file_id = %intent.file_id, "upload transferring");
        Ok(temp_id)
    }

    /// Cancels the active upload if it is `temp_id` and still transferring.
    /// Local state is cleared immediately; the abort is not awaited.
    pub async fn cancel_upload(&self, temp_id: &TempId) -> bool {
        let mut guard = self.slot.lock().await;
        let cancellable = guard.active.as_ref().is_some_and(|active| {
            &active.session.temp_id == temp_id && active.session.status == UploadStatus::Transferring
        });
        if !cancellable {
            debug!(%temp_id, "cancel ignored; no matching transfer in flight");
            return false;
        }
        let Some(ActiveUpload { mut session, permit, worker }) = guard.active.take() else {
            return false;
        };
        if let Some(worker) = worker {
            worker.abort();
        }
        session.status = UploadStatus::Cancelled;
        guard.last = Some(session.clone());
        drop(guard);
        // Free the slot before anyone hears about it.
        drop(permit);

        info!(%temp_id, percent = session.progress_percent, "upload cancelled");
        self.feedback.publish(DriveEvent::UploadSettled {
            temp_id: temp_id.clone(),
            status: UploadStatus::Cancelled,
        });
        true
    }

    async fn drive_transfer(self: Arc<Self>, temp_id: TempId, file_id: FileId, mut transfer: TransferHandle) {
        let outcome = loop {
            match transfer.next().await {
                Some(TransferEvent::Progress { sent, total }) => {
                    self.record_progress(&temp_id, sent, total).await;
                }
                Some(TransferEvent::Finished(result)) => break result,
                None => {
                    break Err(DriveError::Transfer(
                        "transfer ended without a final status".into(),
                    ))
                }
            }
        };
        drop(transfer);

        if let Err(err) = outcome {
            warn!(%temp_id, error = %err, "upload transfer failed");
            if self.settle(&temp_id, UploadStatus::Failed).await {
                self.feedback.report(&err).await;
            }
            return;
        }

        if !self.mark_completing(&temp_id).await {
            debug!(%temp_id, "transfer finished after the session was cleared");
            return;
        }

        match self.backend.commit_upload(&file_id).await {
            Ok(()) => {
                info!(%temp_id, %file_id, "upload committed");
                self.settle(&temp_id, UploadStatus::Committed).await;
            }
            Err(err) => {
                warn!(%temp_id, %file_id, error = %err, "upload commit failed");
                self.settle(&temp_id, UploadStatus::Failed).await;
                self.feedback.report(&err).await;
            }
        }
        // Reload failures are surfaced by the directory controller.
        let _ = self.directory.reload().await;
    }

    async fn record_progress(&self, temp_id: &TempId, sent: u64, total: u64) {
        let percent = {
            let mut guard = self.slot.lock().await;
            let Some(active) = guard
                .active
                .as_mut()
                .filter(|active| &active.session.temp_id == temp_id)
            else {
                return;
            };
            let reported = if total == 0 {
                100.0
            } else {
                (sent as f64 * 100.0 / total as f64).clamp(0.0, 100.0)
            };
            if reported <= active.session.progress_percent {
                return;
            }
            active.session.progress_percent = reported;
            reported
        };
        self.feedback.publish(DriveEvent::UploadProgress {
            temp_id: temp_id.clone(),
            percent,
        });
    }

    /// Moves a transferring session to `Completing`. After this the session
    /// can no longer be cancelled.
    async fn mark_completing(&self, temp_id: &TempId) -> bool {
        let mut guard = self.slot.lock().await;
        match guard.active.as_mut() {
            Some(active)
                if &active.session.temp_id == temp_id
                    && active.session.status == UploadStatus::Transferring =>
            {
                active.session.status = UploadStatus::Completing;
                active.session.progress_percent = 100.0;
                true
            }
            _ => false,
        }
    }

    /// Ends the session `temp_id` in `status`, releasing the slot.
    async fn settle(&self, temp_id: &TempId, status: UploadStatus) -> bool {
        let mut guard = self.slot.lock().await;
        if !guard
            .active
            .as_ref()
            .is_some_and(|active| &active.session.temp_id == temp_id)
        {
            return false;
        }
        let Some(ActiveUpload { mut session, permit, .. }) = guard.active.take() else {
            return false;
        };
        session.status = status;
        guard.last = Some(session.clone());
        drop(guard);
        drop(permit);

        let elapsed_ms = (Utc::now() - session.started_at).num_milliseconds();
        debug!(%temp_id, ?status, elapsed_ms, "upload settled");
        self.feedback.publish(DriveEvent::UploadSettled {
            temp_id: temp_id.clone(),
            status,
        });
        true
    }
}

#[cfg(test)]
#[path = "tests/upload_tests.rs"]
mod tests;
