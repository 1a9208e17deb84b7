//! In-memory backend whose slow paths are driven by the test.

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use shared::{
    domain::{DirectoryId, DirectoryListing, DirectoryRef, FileId, FileRef},
    protocol::{UploadInitiateRequest, UploadInitiateResponse},
};
use tokio::sync::{mpsc, oneshot};

use crate::{
    backend::{DriveBackend, TransferEvent, TransferHandle, UploadFile},
    error::{DriveError, DriveResult},
    feedback::SessionHooks,
};

struct PendingUpload {
    name: String,
    size: u64,
    parent: Option<DirectoryId>,
}

#[derive(Default)]
pub struct ScriptedBackend {
    listings: Mutex<HashMap<Option<DirectoryId>, DirectoryListing>>,
    pending_uploads: Mutex<HashMap<FileId, PendingUpload>>,
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashMap<&'static str, VecDeque<DriveError>>>,
    gate_lists: AtomicBool,
    list_gates: Mutex<Vec<Option<oneshot::Sender<()>>>>,
    gate_commits: AtomicBool,
    commit_gates: Mutex<Vec<Option<oneshot::Sender<()>>>>,
    transfers: Mutex<Vec<mpsc::UnboundedSender<TransferEvent>>>,
    next_id: AtomicU64,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        let backend = Self::default();
        backend.put_listing(None, DirectoryListing {
            name: "root".into(),
            ..DirectoryListing::default()
        });
        Arc::new(backend)
    }

    pub fn put_listing(&self, dir_id: Option<DirectoryId>, listing: DirectoryListing) {
        self.listings.lock().expect("listings").insert(dir_id, listing);
    }

    pub fn listing(&self, dir_id: Option<&DirectoryId>) -> DirectoryListing {
        self.listings
            .lock()
            .expect("listings")
            .get(&dir_id.cloned())
            .cloned()
            .unwrap_or_default()
    }

    /// Queues a failure for the next call of `op`.
    pub fn fail_next(&self, op: &'static str, err: DriveError) {
        self.failures
            .lock()
            .expect("failures")
            .entry(op)
            .or_default()
            .push_back(err);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls").clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|call| call.starts_with(prefix)).count()
    }

    /// From now on listings are computed at request time but only returned
    /// once released.
    pub fn hold_listings(&self) {
        self.gate_lists.store(true, Ordering::SeqCst);
    }

    pub fn held_listings(&self) -> usize {
        self.list_gates
            .lock()
            .expect("gates")
            .iter()
            .filter(|gate| gate.is_some())
            .count()
    }

    pub fn release_listing(&self, index: usize) {
        let gate = self.list_gates.lock().expect("gates")[index].take();
        if let Some(gate) = gate {
            let _ = gate.send(());
        }
    }

    pub fn hold_commits(&self) {
        self.gate_commits.store(true, Ordering::SeqCst);
    }

    pub fn held_commits(&self) -> usize {
        self.commit_gates
            .lock()
            .expect("gates")
            .iter()
            .filter(|gate| gate.is_some())
            .count()
    }

    pub fn release_commit(&self, index: usize) {
        let gate = self.commit_gates.lock().expect("gates")[index].take();
        if let Some(gate) = gate {
            let _ = gate.send(());
        }
    }

    /// Sender driving the `index`-th transfer started against this backend.
    pub fn transfer(&self, index: usize) -> mpsc::UnboundedSender<TransferEvent> {
        self.transfers.lock().expect("transfers")[index].clone()
    }

    /// Drops every stored sender so open transfer streams end without a
    /// final status.
    pub fn abandon_transfers(&self) {
        self.transfers.lock().expect("transfers").clear();
    }

    pub fn transfers_started(&self) -> usize {
        self.transfers.lock().expect("transfers").len()
    }

    fn record(&self, call: String) {
        self.calls.lock().expect("calls").push(call);
    }

    fn take_failure(&self, op: &'static str) -> DriveResult<()> {
        match self
            .failures
            .lock()
            .expect("failures")
            .get_mut(op)
            .and_then(VecDeque::pop_front)
        {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn fresh_id(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn with_all_listings(&self, mut f: impl FnMut(&mut DirectoryListing)) {
        for listing in self.listings.lock().expect("listings").values_mut() {
            f(listing);
        }
    }
}

fn label(dir_id: Option<&DirectoryId>) -> String {
    dir_id.map(ToString::to_string).unwrap_or_else(|| "root".into())
}

#[async_trait]
impl DriveBackend for ScriptedBackend {
    async fn list_directory(&self, dir_id: Option<&DirectoryId>) -> DriveResult<DirectoryListing> {
        self.record(format!("list:{}", label(dir_id)));
        let outcome = self.take_failure("list").map(|()| self.listing(dir_id));

        if self.gate_lists.load(Ordering::SeqCst) {
            let (tx, rx) = oneshot::channel();
            self.list_gates.lock().expect("gates").push(Some(tx));
            let _ = rx.await;
        }
        outcome
    }

    async fn create_directory(
        &self,
        parent_id: Option<&DirectoryId>,
        name: &str,
    ) -> DriveResult<Option<DirectoryRef>> {
        self.record(format!("create:{}:{name}", label(parent_id)));
        self.take_failure("create")?;
        let directory = DirectoryRef {
            id: DirectoryId::new(self.fresh_id("d")),
            name: name.to_string(),
            size: None,
            created_at: None,
            parent_dir_id: parent_id.cloned(),
        };
        self.listings
            .lock()
            .expect("listings")
            .entry(parent_id.cloned())
            .or_default()
            .directories
            .push(directory.clone());
        Ok(Some(directory))
    }

    async fn rename_directory(&self, id: &DirectoryId, name: &str) -> DriveResult<Option<DirectoryRef>> {
        self.record(format!("rename_dir:{id}:{name}"));
        self.take_failure("rename_dir")?;
        self.with_all_listings(|listing| {
            for dir in listing.directories.iter_mut().filter(|dir| &dir.id == id) {
                dir.name = name.to_string();
            }
        });
        Ok(None)
    }

    async fn delete_directory(&self, id: &DirectoryId) -> DriveResult<()> {
        self.record(format!("delete_dir:{id}"));
        self.take_failure("delete_dir")?;
        self.with_all_listings(|listing| listing.directories.retain(|dir| &dir.id != id));
        Ok(())
    }

    async fn rename_file(&self, id: &FileId, name: &str) -> DriveResult<Option<FileRef>> {
        self.record(format!("rename_file:{id}:{name}"));
        self.take_failure("rename_file")?;
        self.with_all_listings(|listing| {
            for file in listing.files.iter_mut().filter(|file| &file.id == id) {
                file.name = name.to_string();
            }
        });
        Ok(None)
    }

    async fn delete_file(&self, id: &FileId) -> DriveResult<()> {
        self.record(format!("delete_file:{id}"));
        self.take_failure("delete_file")?;
        self.with_all_listings(|listing| listing.files.retain(|file| &file.id != id));
        Ok(())
    }

    async fn initiate_upload(&self, request: UploadInitiateRequest) -> DriveResult<UploadInitiateResponse> {
        self.record(format!("initiate:{}", request.name));
        self.take_failure("initiate")?;
        let file_id = FileId::new(self.fresh_id("f"));
        self.pending_uploads.lock().expect("pending").insert(
            file_id.clone(),
            PendingUpload {
                name: request.name,
                size: request.size,
                parent: request.parent_dir_id,
            },
        );
        Ok(UploadInitiateResponse {
            upload_signed_url: format!("https://storage.test/{file_id}?sig=abc"),
            file_id,
        })
    }

    fn start_transfer(&self, signed_url: &str, file: UploadFile) -> TransferHandle {
        self.record(format!("transfer:{}:{signed_url}", file.name));
        let (tx, handle) = TransferHandle::channel();
        self.transfers.lock().expect("transfers").push(tx);
        handle
    }

    async fn commit_upload(&self, file_id: &FileId) -> DriveResult<()> {
        self.record(format!("commit:{file_id}"));
        if self.gate_commits.load(Ordering::SeqCst) {
            let (tx, rx) = oneshot::channel();
            self.commit_gates.lock().expect("gates").push(Some(tx));
            let _ = rx.await;
        }
        self.take_failure("commit")?;
        let pending = self.pending_uploads.lock().expect("pending").remove(file_id);
        if let Some(pending) = pending {
            self.listings
                .lock()
                .expect("listings")
                .entry(pending.parent.clone())
                .or_default()
                .files
                .push(FileRef {
                    id: file_id.clone(),
                    name: pending.name,
                    size: pending.size,
                    created_at: None,
                    parent_dir_id: pending.parent,
                });
        }
        Ok(())
    }

    fn download_url(&self, file_id: &FileId) -> String {
        format!("https://drive.test/file/{file_id}")
    }
}

#[derive(Default)]
pub struct RecordingHooks {
    pub unauthorized: AtomicU64,
    pub messages: Mutex<Vec<String>>,
}

impl RecordingHooks {
    pub fn unauthorized_calls(&self) -> u64 {
        self.unauthorized.load(Ordering::SeqCst)
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().expect("messages").clone()
    }
}

impl SessionHooks for RecordingHooks {
    fn on_unauthorized(&self) {
        self.unauthorized.fetch_add(1, Ordering::SeqCst);
    }

    fn on_mutation_error(&self, message: &str) {
        self.messages.lock().expect("messages").push(message.to_string());
    }
}

pub fn dir_ref(id: &str, name: &str) -> DirectoryRef {
    DirectoryRef {
        id: DirectoryId::new(id),
        name: name.to_string(),
        size: None,
        created_at: None,
        parent_dir_id: None,
    }
}

pub fn file_ref(id: &str, name: &str, size: u64) -> FileRef {
    FileRef {
        id: FileId::new(id),
        name: name.to_string(),
        size,
        created_at: None,
        parent_dir_id: None,
    }
}

/// Lets spawned tasks run until they block again.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
