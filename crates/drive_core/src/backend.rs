//! Transport seam between the engine and the remote store.

use std::{
    pin::Pin,
    task::{Context, Poll},
};

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use shared::{
    domain::{DirectoryId, DirectoryListing, DirectoryRef, FileId, FileRef},
    protocol::{UploadInitiateRequest, UploadInitiateResponse},
};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::error::DriveResult;

/// A local file picked for upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    Progress { sent: u64, total: u64 },
    Finished(DriveResult<()>),
}

/// Live byte transfer. Yields progress notifications followed by a single
/// `Finished`. Dropping the handle aborts the underlying request.
pub struct TransferHandle {
    events: UnboundedReceiverStream<TransferEvent>,
    worker: Option<JoinHandle<()>>,
}

impl TransferHandle {
    pub fn new(events: mpsc::UnboundedReceiver<TransferEvent>, worker: Option<JoinHandle<()>>) -> Self {
        Self {
            events: UnboundedReceiverStream::new(events),
            worker,
        }
    }

    /// Handle plus the sender that feeds it, for transports that push events
    /// from somewhere other than a spawned worker.
    pub fn channel() -> (mpsc::UnboundedSender<TransferEvent>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self::new(rx, None))
    }

    pub fn abort(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}

impl Stream for TransferHandle {
    type Item = TransferEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.events).poll_next(cx)
    }
}

impl Drop for TransferHandle {
    fn drop(&mut self) {
        self.abort();
    }
}

#[async_trait]
pub trait DriveBackend: Send + Sync {
    /// `None` lists the root directory.
    async fn list_directory(&self, dir_id: Option<&DirectoryId>) -> DriveResult<DirectoryListing>;
    async fn create_directory(
        &self,
        parent_id: Option<&DirectoryId>,
        name: &str,
    ) -> DriveResult<Option<DirectoryRef>>;
    async fn rename_directory(&self, id: &DirectoryId, name: &str) -> DriveResult<Option<DirectoryRef>>;
    async fn delete_directory(&self, id: &DirectoryId) -> DriveResult<()>;
    async fn rename_file(&self, id: &FileId, name: &str) -> DriveResult<Option<FileRef>>;
    async fn delete_file(&self, id: &FileId) -> DriveResult<()>;
    async fn initiate_upload(&self, request: UploadInitiateRequest) -> DriveResult<UploadInitiateResponse>;
    /// Starts the direct write and returns immediately.
    fn start_transfer(&self, signed_url: &str, file: UploadFile) -> TransferHandle;
    async fn commit_upload(&self, file_id: &FileId) -> DriveResult<()>;
    /// Where the file bytes can be fetched from; the server redirects.
    fn download_url(&self, file_id: &FileId) -> String;
}
