use std::{future::Future, sync::Arc};

use shared::domain::{
    DirectoryId, DirectoryListing, DirectoryRef, FileId, FileRef, ItemRef, TempId,
};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{
    backend::DriveBackend,
    error::{DriveError, DriveResult},
    feedback::{DriveEvent, Feedback},
};

/// Synthetic row for an upload that has not been committed yet.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadRow {
    pub temp_id: TempId,
    /// Directory the upload lands in; the row is only shown there.
    pub parent_dir_id: Option<DirectoryId>,
    pub name: String,
    pub size: u64,
    pub percent: f64,
}

impl UploadRow {
    pub fn display_percent(&self) -> u8 {
        self.percent.floor().clamp(0.0, 100.0) as u8
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListEntry {
    Directory(DirectoryRef),
    File(FileRef),
    Upload(UploadRow),
}

impl ListEntry {
    pub fn item_ref(&self) -> ItemRef {
        match self {
            ListEntry::Directory(dir) => ItemRef::Directory(dir.id.clone()),
            ListEntry::File(file) => ItemRef::File(file.id.clone()),
            ListEntry::Upload(row) => ItemRef::Upload(row.temp_id.clone()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ListEntry::Directory(dir) => &dir.name,
            ListEntry::File(file) => &file.name,
            ListEntry::Upload(row) => &row.name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryAccess {
    Loading,
    Ready,
    /// The backend refused the listing. Mutating affordances are disabled.
    Unavailable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryView {
    pub dir_id: Option<DirectoryId>,
    pub name: String,
    pub access: DirectoryAccess,
    /// Directories first, then files; newest first, placeholder at the head
    /// of the files.
    pub entries: Vec<ListEntry>,
}

impl DirectoryView {
    pub fn mutations_enabled(&self) -> bool {
        self.access != DirectoryAccess::Unavailable
    }

    pub fn find(&self, item: &ItemRef) -> Option<&ListEntry> {
        self.entries.iter().find(|entry| &entry.item_ref() == item)
    }
}

struct DirectoryState {
    current: Option<DirectoryId>,
    listing: Option<DirectoryListing>,
    access: DirectoryAccess,
    issued: u64,
    applied: u64,
}

pub struct DirectoryStateController {
    backend: Arc<dyn DriveBackend>,
    feedback: Arc<Feedback>,
    root_label: String,
    state: Mutex<DirectoryState>,
}

impl DirectoryStateController {
    pub fn new(backend: Arc<dyn DriveBackend>, feedback: Arc<Feedback>, root_label: impl Into<String>) -> Self {
        Self {
            backend,
            feedback,
            root_label: root_label.into(),
            state: Mutex::new(DirectoryState {
                current: None,
                listing: None,
                access: DirectoryAccess::Loading,
                issued: 0,
                applied: 0,
            }),
        }
    }

    pub async fn current_dir(&self) -> Option<DirectoryId> {
        self.state.lock().await.current.clone()
    }

    pub async fn access(&self) -> DirectoryAccess {
        self.state.lock().await.access
    }

    /// Switches to `dir_id` and loads it.
    pub async fn load(&self, dir_id: Option<DirectoryId>) -> DriveResult<()> {
        {
            let mut guard = self.state.lock().await;
            if guard.current != dir_id {
                guard.current = dir_id;
                guard.listing = None;
                guard.access = DirectoryAccess::Loading;
            }
        }
        self.reload().await
    }

    /// Fetches the current directory again. A response is applied only if no
    /// newer load has been applied before it. Failed reloads leave the listing
    /// and the applied ticket untouched.
    pub async fn reload(&self) -> DriveResult<()> {
        let (ticket, dir_id) = {
            let mut guard = self.state.lock().await;
            guard.issued += 1;
            (guard.issued, guard.current.clone())
        };

        let result = self.backend.list_directory(dir_id.as_ref()).await;

        let mut guard = self.state.lock().await;
        if ticket <= guard.applied || guard.current != dir_id {
            debug!(ticket, applied = guard.applied, "discarding stale directory listing");
            return Ok(());
        }

        // Only responses that replace the listing advance `applied`; a failed
        // reload must not shadow an older one still in flight.
        match result {
            Ok(listing) => {
                guard.applied = ticket;
                debug!(
                    dir_id = ?dir_id,
                    directories = listing.directories.len(),
                    files = listing.files.len(),
                    "directory listing applied"
                );
                guard.listing = Some(listing);
                guard.access = DirectoryAccess::Ready;
                drop(guard);
                self.feedback.publish(DriveEvent::ListingReloaded { dir_id });
                Ok(())
            }
            Err(DriveError::NotFoundOrForbidden(message)) => {
                info!(dir_id = ?dir_id, %message, "directory unavailable");
                guard.applied = ticket;
                guard.listing = None;
                guard.access = DirectoryAccess::Unavailable;
                drop(guard);
                self.feedback
                    .publish(DriveEvent::DirectoryUnavailable { dir_id });
                Err(DriveError::NotFoundOrForbidden(message))
            }
            Err(err) => {
                drop(guard);
                self.feedback.report(&err).await;
                Err(err)
            }
        }
    }

    /// Runs one mutating call; on success the current directory is reloaded
    /// wholesale, on failure the listing is left alone and the error surfaced.
    async fn mutate<T, F>(&self, op: &'static str, call: F) -> DriveResult<()>
    where
        F: Future<Output = DriveResult<T>>,
    {
        match call.await {
            Ok(_) => {
                info!(op, "mutation succeeded; reloading listing");
                // Reload failures are surfaced by reload itself.
                let _ = self.reload().await;
                Ok(())
            }
            Err(err) => {
                self.feedback.report(&err).await;
                Err(err)
            }
        }
    }

    pub async fn create_directory(&self, parent_id: Option<&DirectoryId>, name: &str) -> DriveResult<()> {
        self.mutate("create_directory", self.backend.create_directory(parent_id, name))
            .await
    }

    pub async fn rename_directory(&self, id: &DirectoryId, name: &str) -> DriveResult<()> {
        self.mutate("rename_directory", self.backend.rename_directory(id, name))
            .await
    }

    pub async fn delete_directory(&self, id: &DirectoryId) -> DriveResult<()> {
        self.mutate("delete_directory", self.backend.delete_directory(id))
            .await
    }

    pub async fn rename_file(&self, id: &FileId, name: &str) -> DriveResult<()> {
        self.mutate("rename_file", self.backend.rename_file(id, name))
            .await
    }

    pub async fn delete_file(&self, id: &FileId) -> DriveResult<()> {
        self.mutate("delete_file", self.backend.delete_file(id))
            .await
    }

    /// The listing as presented, with `placeholder` merged at the head of the
    /// files when it targets the current directory.
    pub async fn view(&self, placeholder: Option<UploadRow>) -> DirectoryView {
        let guard = self.state.lock().await;
        let name = match (&guard.current, &guard.listing) {
            (None, _) => self.root_label.clone(),
            (Some(_), Some(listing)) => listing.name.clone(),
            (Some(id), None) => id.to_string(),
        };

        let mut entries = Vec::new();
        if let Some(listing) = &guard.listing {
            entries.extend(
                listing
                    .directories
                    .iter()
                    .rev()
                    .cloned()
                    .map(ListEntry::Directory),
            );
        }
        if let Some(row) = placeholder.filter(|row| row.parent_dir_id == guard.current) {
            entries.push(ListEntry::Upload(row));
        }
        if let Some(listing) = &guard.listing {
            entries.extend(listing.files.iter().rev().cloned().map(ListEntry::File));
        }

        DirectoryView {
            dir_id: guard.current.clone(),
            name,
            access: guard.access,
            entries,
        }
    }
}

#[cfg(test)]
#[path = "tests/directory_tests.rs"]
mod tests;
