use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_newtype!(DirectoryId);
id_newtype!(FileId);
id_newtype!(TempId);

const TEMP_ID_PREFIX: &str = "temp-";

impl TempId {
    /// Fresh local id for an upload placeholder. The prefix keeps it disjoint
    /// from anything the backend hands out.
    pub fn generate() -> Self {
        Self(format!("{TEMP_ID_PREFIX}{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn is_temp(raw: &str) -> bool {
        raw.starts_with(TEMP_ID_PREFIX)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Directory,
    File,
}

/// Addresses one row of a directory view. Upload placeholders are addressed
/// by their local id and never collide with committed entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemRef {
    Directory(DirectoryId),
    File(FileId),
    Upload(TempId),
}

impl ItemRef {
    pub fn raw_id(&self) -> &str {
        match self {
            ItemRef::Directory(id) => id.as_str(),
            ItemRef::File(id) => id.as_str(),
            ItemRef::Upload(id) => id.as_str(),
        }
    }

    pub fn is_upload(&self) -> bool {
        matches!(self, ItemRef::Upload(_))
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemRef::Directory(id) => write!(f, "directory:{id}"),
            ItemRef::File(id) => write!(f, "file:{id}"),
            ItemRef::Upload(id) => write!(f, "upload:{id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryRef {
    #[serde(alias = "_id")]
    pub id: DirectoryId,
    pub name: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub parent_dir_id: Option<DirectoryId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRef {
    #[serde(alias = "_id")]
    pub id: FileId,
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub parent_dir_id: Option<DirectoryId>,
}

impl FileRef {
    pub fn kind(&self) -> FileKind {
        FileKind::from_name(&self.name)
    }
}

/// One directory as the backend reports it. Replaced wholesale on reload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryListing {
    pub name: String,
    #[serde(default)]
    pub directories: Vec<DirectoryRef>,
    #[serde(default)]
    pub files: Vec<FileRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Image,
    Video,
    Archive,
    Code,
    Other,
}

impl FileKind {
    pub fn from_name(name: &str) -> Self {
        let Some((_, ext)) = name.rsplit_once('.') else {
            return FileKind::Other;
        };
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => FileKind::Pdf,
            "png" | "jpg" | "jpeg" | "gif" => FileKind::Image,
            "mp4" | "mov" | "avi" => FileKind::Video,
            "zip" | "rar" | "tar" | "gz" => FileKind::Archive,
            "js" | "jsx" | "ts" | "tsx" | "html" | "css" | "py" | "java" | "rs" => FileKind::Code,
            _ => FileKind::Other,
        }
    }
}
