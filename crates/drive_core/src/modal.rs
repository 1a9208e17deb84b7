use shared::domain::{DirectoryId, FileId, ItemKind, ItemRef};
use tracing::debug;

use crate::directory::ListEntry;

pub const DEFAULT_FOLDER_NAME: &str = "New Folder";

#[derive(Debug, Clone, PartialEq)]
pub enum Modal {
    CreateFolder { name: String },
    Rename { target: ItemRef, name: String },
    DeleteConfirm { target: ItemRef, name: String },
    Details { entry: ListEntry },
}

impl Modal {
    pub fn title(&self) -> &'static str {
        match self {
            Modal::CreateFolder { .. } => "Create Folder",
            Modal::Rename { target, .. } => match target {
                ItemRef::Directory(_) => "Rename Folder",
                _ => "Rename File",
            },
            Modal::DeleteConfirm { .. } => "Delete",
            Modal::Details { .. } => "Details",
        }
    }
}

/// Backend operation a submitted modal resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    CreateDirectory { name: String },
    RenameDirectory { id: DirectoryId, name: String },
    RenameFile { id: FileId, name: String },
    DeleteDirectory { id: DirectoryId },
    DeleteFile { id: FileId },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveModal {
    pub modal: Modal,
    pub error: Option<String>,
    pub submitting: bool,
    generation: u64,
}

/// Ties a submit result back to the modal it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitTicket(u64);

#[derive(Debug)]
pub struct ModalController {
    active: Option<ActiveModal>,
    folder_draft: String,
    generation: u64,
}

impl Default for ModalController {
    fn default() -> Self {
        Self {
            active: None,
            folder_draft: DEFAULT_FOLDER_NAME.to_string(),
            generation: 0,
        }
    }
}

impl ModalController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&ActiveModal> {
        self.active.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.active.is_some()
    }

    fn install(&mut self, modal: Modal) {
        if let Some(previous) = &self.active {
            debug!(previous = previous.modal.title(), "replacing active modal");
        }
        self.generation += 1;
        self.active = Some(ActiveModal {
            modal,
            error: None,
            submitting: false,
            generation: self.generation,
        });
    }

    pub fn open_create_folder(&mut self) {
        self.install(Modal::CreateFolder {
            name: self.folder_draft.clone(),
        });
    }

    /// Placeholders have no server identity yet and cannot be renamed.
    pub fn open_rename(&mut self, target: ItemRef, current_name: impl Into<String>) -> bool {
        if target.is_upload() {
            return false;
        }
        self.install(Modal::Rename {
            target,
            name: current_name.into(),
        });
        true
    }

    pub fn open_delete(&mut self, target: ItemRef, name: impl Into<String>) -> bool {
        if target.is_upload() {
            return false;
        }
        self.install(Modal::DeleteConfirm {
            target,
            name: name.into(),
        });
        true
    }

    pub fn open_details(&mut self, entry: ListEntry) {
        self.install(Modal::Details { entry });
    }

    /// Edits the name field of a create or rename modal.
    pub fn set_input(&mut self, text: impl Into<String>) -> bool {
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        let text = text.into();
        match &mut active.modal {
            Modal::CreateFolder { name } => {
                self.folder_draft = text.clone();
                *name = text;
            }
            Modal::Rename { name, .. } => *name = text,
            Modal::DeleteConfirm { .. } | Modal::Details { .. } => return false,
        }
        true
    }

    /// Marks the active modal as submitting and returns what to run.
    /// `None` when nothing is submittable or a submit is already in flight.
    pub fn begin_submit(&mut self) -> Option<(SubmitTicket, Submission)> {
        let active = self.active.as_mut()?;
        if active.submitting {
            return None;
        }
        let submission = match &active.modal {
            Modal::CreateFolder { name } => Submission::CreateDirectory {
                name: name.trim().to_string(),
            },
            Modal::Rename { target, name } => match target {
                ItemRef::Directory(id) => Submission::RenameDirectory {
                    id: id.clone(),
                    name: name.trim().to_string(),
                },
                ItemRef::File(id) => Submission::RenameFile {
                    id: id.clone(),
                    name: name.trim().to_string(),
                },
                ItemRef::Upload(_) => return None,
            },
            Modal::DeleteConfirm { target, .. } => match target {
                ItemRef::Directory(id) => Submission::DeleteDirectory { id: id.clone() },
                ItemRef::File(id) => Submission::DeleteFile { id: id.clone() },
                ItemRef::Upload(_) => return None,
            },
            Modal::Details { .. } => return None,
        };
        active.submitting = true;
        active.error = None;
        Some((SubmitTicket(active.generation), submission))
    }

    /// Closes on success; on failure keeps the modal open with the message
    /// inline. Results for a modal that has since been replaced are dropped.
    pub fn finish_submit(&mut self, ticket: SubmitTicket, outcome: Result<(), String>) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if active.generation != ticket.0 {
            return;
        }
        match outcome {
            Ok(()) => {
                if matches!(active.modal, Modal::CreateFolder { .. }) {
                    self.folder_draft = DEFAULT_FOLDER_NAME.to_string();
                }
                self.active = None;
            }
            Err(message) => {
                active.submitting = false;
                active.error = Some(message);
            }
        }
    }

    pub fn dismiss(&mut self) -> bool {
        self.active.take().is_some()
    }
}

impl Submission {
    pub fn kind(&self) -> ItemKind {
        match self {
            Submission::CreateDirectory { .. }
            | Submission::RenameDirectory { .. }
            | Submission::DeleteDirectory { .. } => ItemKind::Directory,
            Submission::RenameFile { .. } | Submission::DeleteFile { .. } => ItemKind::File,
        }
    }
}

#[cfg(test)]
#[path = "tests/modal_tests.rs"]
mod tests;
