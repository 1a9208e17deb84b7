use std::sync::Arc;

use shared::domain::{DirectoryId, ItemRef, TempId};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};

pub mod backend;
pub mod config;
pub mod context_menu;
pub mod directory;
pub mod error;
pub mod feedback;
pub mod http;
pub mod modal;
pub mod upload;

pub use backend::{DriveBackend, TransferEvent, TransferHandle, UploadFile};
pub use config::{load_settings, EngineSettings};
pub use context_menu::{
    menu_entries, ContextMenuController, DismissReason, MenuAction, OverlayToken, PointerTarget,
};
pub use directory::{
    DirectoryAccess, DirectoryStateController, DirectoryView, ListEntry, UploadRow,
};
pub use error::{DriveError, DriveResult};
pub use feedback::{DriveEvent, Feedback, NoopHooks, SessionHooks};
pub use http::HttpDriveBackend;
pub use modal::{ActiveModal, Modal, ModalController, Submission};
pub use upload::{UploadCoordinator, UploadSession, UploadStatus};

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod tests_support;

/// Everything a presentation layer needs to render the current directory.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectorySnapshot {
    pub view: DirectoryView,
    pub upload: Option<UploadSession>,
    pub open_menu: Option<ItemRef>,
    pub modal: Option<ActiveModal>,
    pub error: Option<String>,
}

impl DirectorySnapshot {
    /// Create-folder and upload affordances.
    pub fn mutations_enabled(&self) -> bool {
        self.view.mutations_enabled()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// A menu is open, an upload is running, or the row is a placeholder.
    Suppressed,
    Navigated(DirectoryId),
    OpenFile(String),
}

/// Routes user intents to the controller that owns them.
pub struct DirectoryOrchestrator {
    backend: Arc<dyn DriveBackend>,
    feedback: Arc<Feedback>,
    directory: Arc<DirectoryStateController>,
    uploads: Arc<UploadCoordinator>,
    menu: Mutex<ContextMenuController>,
    modal: Mutex<ModalController>,
}

impl DirectoryOrchestrator {
    pub fn new(
        backend: Arc<dyn DriveBackend>,
        hooks: Arc<dyn SessionHooks>,
        settings: &EngineSettings,
    ) -> Arc<Self> {
        let feedback = Arc::new(Feedback::new(hooks, settings.error_display()));
        let directory = Arc::new(DirectoryStateController::new(
            Arc::clone(&backend),
            Arc::clone(&feedback),
            settings.root_label.clone(),
        ));
        let uploads = UploadCoordinator::new(
            Arc::clone(&backend),
            Arc::clone(&directory),
            Arc::clone(&feedback),
        );
        Arc::new(Self {
            backend,
            feedback,
            directory,
            uploads,
            menu: Mutex::new(ContextMenuController::new()),
            modal: Mutex::new(ModalController::new()),
        })
    }

    /// Orchestrator over the HTTP backend described by `settings`.
    pub fn connect(settings: &EngineSettings, hooks: Arc<dyn SessionHooks>) -> DriveResult<Arc<Self>> {
        let backend = HttpDriveBackend::new(settings)?;
        Ok(Self::new(Arc::new(backend), hooks, settings))
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<DriveEvent> {
        self.feedback.subscribe()
    }

    pub async fn current_dir(&self) -> Option<DirectoryId> {
        self.directory.current_dir().await
    }

    pub async fn navigate(&self, dir_id: Option<DirectoryId>) -> DriveResult<()> {
        self.menu.lock().await.close(DismissReason::Navigation);
        info!(dir_id = ?dir_id, "navigating");
        self.directory.load(dir_id).await
    }

    pub async fn reload(&self) -> DriveResult<()> {
        self.directory.reload().await
    }

    pub async fn snapshot(&self) -> DirectorySnapshot {
        let upload = self.uploads.active().await;
        let view = self
            .directory
            .view(upload.as_ref().map(UploadSession::placeholder))
            .await;
        DirectorySnapshot {
            view,
            upload,
            open_menu: self.menu.lock().await.open_item().cloned(),
            modal: self.modal.lock().await.current().cloned(),
            error: self.feedback.current().await,
        }
    }

    pub async fn upload_session(&self) -> Option<UploadSession> {
        self.uploads.active().await
    }

    pub async fn last_upload(&self) -> Option<UploadSession> {
        self.uploads.last_outcome().await
    }

    pub async fn error_message(&self) -> Option<String> {
        self.feedback.current().await
    }

    /// Primary action on a row: open a directory or resolve a file's URL.
    pub async fn activate(&self, item: &ItemRef) -> DriveResult<Activation> {
        let menu_open = self.menu.lock().await.open_item().is_some();
        if menu_open || self.uploads.is_busy().await {
            debug!(%item, "activation suppressed");
            return Ok(Activation::Suppressed);
        }
        match item {
            ItemRef::Directory(id) => {
                self.navigate(Some(id.clone())).await?;
                Ok(Activation::Navigated(id.clone()))
            }
            ItemRef::File(id) => Ok(Activation::OpenFile(self.backend.download_url(id))),
            ItemRef::Upload(_) => Ok(Activation::Suppressed),
        }
    }

    pub async fn toggle_menu(&self, item: ItemRef) -> Option<OverlayToken> {
        self.menu.lock().await.toggle(item)
    }

    pub async fn pointer_down(&self, target: &PointerTarget) -> bool {
        self.menu.lock().await.pointer_down(target)
    }

    /// Clears the menu if `token` still names its current opening.
    pub async fn clear_overlay(&self, token: OverlayToken) -> bool {
        self.menu.lock().await.clear_token(token)
    }

    pub fn menu_entries(&self, item: &ItemRef) -> Vec<MenuAction> {
        menu_entries(item)
    }

    /// Runs a context menu entry and closes the menu. Returns the URL to open
    /// for downloads.
    pub async fn choose_action(&self, item: &ItemRef, action: MenuAction) -> DriveResult<Option<String>> {
        self.menu.lock().await.close(DismissReason::ActionChosen);
        if !menu_entries(item).contains(&action) {
            debug!(%item, ?action, "action not offered for item");
            return Ok(None);
        }

        match (action, item) {
            (MenuAction::Download, ItemRef::File(id)) => Ok(Some(self.backend.download_url(id))),
            (MenuAction::CancelUpload, ItemRef::Upload(temp_id)) => {
                self.uploads.cancel_upload(temp_id).await;
                Ok(None)
            }
            (MenuAction::Share, _) => {
                debug!(%item, "share requested");
                Ok(None)
            }
            (MenuAction::Rename | MenuAction::Details | MenuAction::Delete, _) => {
                let view = self.directory.view(None).await;
                let Some(entry) = view.find(item) else {
                    debug!(%item, "item no longer listed");
                    return Ok(None);
                };
                let mut modal = self.modal.lock().await;
                match action {
                    MenuAction::Rename => {
                        modal.open_rename(item.clone(), entry.name());
                    }
                    MenuAction::Delete => {
                        modal.open_delete(item.clone(), entry.name());
                    }
                    _ => modal.open_details(entry.clone()),
                }
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    pub async fn open_create_folder(&self) -> bool {
        if self.directory.access().await == DirectoryAccess::Unavailable {
            return false;
        }
        self.modal.lock().await.open_create_folder();
        true
    }

    pub async fn edit_modal_input(&self, text: impl Into<String>) -> bool {
        self.modal.lock().await.set_input(text)
    }

    pub async fn dismiss_modal(&self) -> bool {
        self.modal.lock().await.dismiss()
    }

    /// Submits the active modal. Success closes it; failure leaves it open
    /// with the message inline.
    pub async fn submit_modal(&self) -> DriveResult<()> {
        let Some((ticket, submission)) = self.modal.lock().await.begin_submit() else {
            return Ok(());
        };
        let result = match &submission {
            Submission::CreateDirectory { name } => {
                let parent = self.directory.current_dir().await;
                self.directory.create_directory(parent.as_ref(), name).await
            }
            Submission::RenameDirectory { id, name } => {
                self.directory.rename_directory(id, name).await
            }
            Submission::RenameFile { id, name } => self.directory.rename_file(id, name).await,
            Submission::DeleteDirectory { id } => self.directory.delete_directory(id).await,
            Submission::DeleteFile { id } => self.directory.delete_file(id).await,
        };

        match &result {
            Ok(()) => {
                self.modal.lock().await.finish_submit(ticket, Ok(()));
                self.menu.lock().await.close(DismissReason::MutationSucceeded);
            }
            Err(err) => {
                self.modal
                    .lock()
                    .await
                    .finish_submit(ticket, Err(err.user_message()));
            }
        }
        result
    }

    /// Starts uploading into the current directory.
    pub async fn upload(&self, file: UploadFile) -> DriveResult<TempId> {
        if self.directory.access().await == DirectoryAccess::Unavailable {
            return Err(DriveError::NotFoundOrForbidden(
                "Directory not found or you do not have access to it!".into(),
            ));
        }
        let parent = self.directory.current_dir().await;
        let temp_id = self.uploads.begin_upload(file, parent).await?;
        self.menu.lock().await.close(DismissReason::MutationSucceeded);
        Ok(temp_id)
    }

    pub async fn cancel_upload(&self, temp_id: &TempId) -> bool {
        self.uploads.cancel_upload(temp_id).await
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
