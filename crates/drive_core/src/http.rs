use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use reqwest::{
    header::{HeaderMap, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE, COOKIE},
    Body, Client, RequestBuilder, Response,
};
use serde::de::DeserializeOwned;
use shared::{
    domain::{DirectoryId, DirectoryListing, DirectoryRef, FileId, FileRef},
    protocol::{
        Ack, CreateDirectoryRequest, DirectorySummary, FileSummary, RenameRequest,
        UploadCompleteRequest, UploadInitiateRequest, UploadInitiateResponse,
    },
};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::{
    backend::{DriveBackend, TransferEvent, TransferHandle, UploadFile},
    config::EngineSettings,
    error::{DriveError, DriveResult},
};

/// Cookie-authenticated REST transport.
pub struct HttpDriveBackend {
    http: Client,
    // Signed URLs authorize on their own; session headers stay off this client.
    transfer_http: Client,
    server_url: String,
    chunk_bytes: usize,
}

impl HttpDriveBackend {
    pub fn new(settings: &EngineSettings) -> DriveResult<Self> {
        let mut headers = HeaderMap::new();
        if let Some(cookie) = &settings.session_cookie {
            let value = HeaderValue::from_str(cookie)
                .map_err(|err| DriveError::Config(format!("invalid session cookie: {err}")))?;
            headers.insert(COOKIE, value);
        }
        let http = Client::builder()
            .cookie_store(true)
            .default_headers(headers)
            .build()
            .map_err(|err| DriveError::Config(format!("failed to build http client: {err}")))?;
        Ok(Self {
            http,
            transfer_http: Client::new(),
            server_url: settings.base_url()?,
            chunk_bytes: settings.transfer_chunk_bytes.max(1),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.server_url)
    }

    fn directory_path(dir_id: Option<&DirectoryId>) -> String {
        match dir_id {
            Some(id) => format!("/directory/{id}"),
            None => "/directory/".to_string(),
        }
    }

    async fn send(&self, request: RequestBuilder) -> DriveResult<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let raw = response.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), "backend returned error status");
        Err(DriveError::from_status(status.as_u16(), &raw))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> DriveResult<T> {
        Ok(self.send(request).await?.json::<T>().await?)
    }

    /// Mutation responses are advisory; the engine reloads regardless.
    async fn send_lenient<T: DeserializeOwned>(&self, request: RequestBuilder) -> DriveResult<Option<T>> {
        let response = self.send(request).await?;
        let raw = response.bytes().await?;
        Ok(serde_json::from_slice::<T>(&raw).ok())
    }
}

#[async_trait]
impl DriveBackend for HttpDriveBackend {
    async fn list_directory(&self, dir_id: Option<&DirectoryId>) -> DriveResult<DirectoryListing> {
        self.send_json(self.http.get(self.url(&Self::directory_path(dir_id))))
            .await
    }

    async fn create_directory(
        &self,
        parent_id: Option<&DirectoryId>,
        name: &str,
    ) -> DriveResult<Option<DirectoryRef>> {
        let summary: Option<DirectorySummary> = self
            .send_lenient(
                self.http
                    .post(self.url(&Self::directory_path(parent_id)))
                    .json(&CreateDirectoryRequest {
                        name: name.to_string(),
                    }),
            )
            .await?;
        Ok(summary.map(DirectorySummary::into_inner))
    }

    async fn rename_directory(&self, id: &DirectoryId, name: &str) -> DriveResult<Option<DirectoryRef>> {
        let summary: Option<DirectorySummary> = self
            .send_lenient(
                self.http
                    .patch(self.url(&format!("/directory/{id}")))
                    .json(&RenameRequest {
                        name: name.to_string(),
                    }),
            )
            .await?;
        Ok(summary.map(DirectorySummary::into_inner))
    }

    async fn delete_directory(&self, id: &DirectoryId) -> DriveResult<()> {
        self.send(self.http.delete(self.url(&format!("/directory/{id}"))))
            .await?;
        Ok(())
    }

    async fn rename_file(&self, id: &FileId, name: &str) -> DriveResult<Option<FileRef>> {
        let summary: Option<FileSummary> = self
            .send_lenient(
                self.http
                    .patch(self.url(&format!("/file/{id}")))
                    .json(&RenameRequest {
                        name: name.to_string(),
                    }),
            )
            .await?;
        Ok(summary.map(FileSummary::into_inner))
    }

    async fn delete_file(&self, id: &FileId) -> DriveResult<()> {
        self.send(self.http.delete(self.url(&format!("/file/{id}"))))
            .await?;
        Ok(())
    }

    async fn initiate_upload(&self, request: UploadInitiateRequest) -> DriveResult<UploadInitiateResponse> {
        self.send_json(
            self.http
                .post(self.url("/file/upload/initiate"))
                .json(&request),
        )
        .await
    }

    fn start_transfer(&self, signed_url: &str, file: UploadFile) -> TransferHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let total = file.size();
        let chunks: Vec<Bytes> = (0..file.bytes.len())
            .step_by(self.chunk_bytes)
            .map(|start| {
                let end = (start + self.chunk_bytes).min(file.bytes.len());
                file.bytes.slice(start..end)
            })
            .collect();

        let progress_tx = tx.clone();
        let mut sent = 0u64;
        let body = stream::iter(chunks.into_iter().map(move |chunk| {
            sent += chunk.len() as u64;
            let _ = progress_tx.send(TransferEvent::Progress { sent, total });
            Ok::<Bytes, std::io::Error>(chunk)
        }));

        let request = self
            .transfer_http
            .put(signed_url)
            .header(CONTENT_TYPE, file.content_type.clone())
            .header(CONTENT_LENGTH, total)
            .body(Body::wrap_stream(body));

        let worker = tokio::spawn(async move {
            let outcome = match request.send().await {
                Ok(response) if response.status().is_success() => Ok(()),
                Ok(response) => {
                    let status = response.status();
                    let raw = response.text().await.unwrap_or_default();
                    warn!(status = status.as_u16(), body = %raw, "signed url rejected transfer");
                    Err(DriveError::Transfer(format!("storage responded with {status}")))
                }
                // Connection-level failures surface as the generic message.
                Err(err) => {
                    warn!(error = %err, "transfer request failed");
                    Err(DriveError::Transport(err.to_string()))
                }
            };
            let _ = tx.send(TransferEvent::Finished(outcome));
        });

        TransferHandle::new(rx, Some(worker))
    }

    async fn commit_upload(&self, file_id: &FileId) -> DriveResult<()> {
        let ack: Option<Ack> = self
            .send_lenient(
                self.http
                    .post(self.url("/file/upload/complete"))
                    .json(&UploadCompleteRequest {
                        file_id: file_id.clone(),
                    }),
            )
            .await?;
        if let Some(message) = ack.and_then(|ack| ack.message) {
            debug!(%file_id, %message, "upload commit acknowledged");
        }
        Ok(())
    }

    fn download_url(&self, file_id: &FileId) -> String {
        self.url(&format!("/file/{file_id}"))
    }
}

#[cfg(test)]
#[path = "tests/http_tests.rs"]
mod tests;
