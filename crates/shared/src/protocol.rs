use serde::{Deserialize, Serialize};

use crate::domain::{DirectoryId, DirectoryRef, FileId, FileRef};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDirectoryRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadInitiateRequest {
    pub name: String,
    pub size: u64,
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_dir_id: Option<DirectoryId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadInitiateResponse {
    pub upload_signed_url: String,
    pub file_id: FileId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadCompleteRequest {
    pub file_id: FileId,
}

/// Generic acknowledgment. The backend may attach a message we only log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ack {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DirectorySummary {
    Wrapped { directory: DirectoryRef },
    Bare(DirectoryRef),
}

impl DirectorySummary {
    pub fn into_inner(self) -> DirectoryRef {
        match self {
            DirectorySummary::Wrapped { directory } => directory,
            DirectorySummary::Bare(directory) => directory,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileSummary {
    Wrapped { file: FileRef },
    Bare(FileRef),
}

impl FileSummary {
    pub fn into_inner(self) -> FileRef {
        match self {
            FileSummary::Wrapped { file } => file,
            FileSummary::Bare(file) => file,
        }
    }
}
