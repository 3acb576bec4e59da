use crate::Photo;
use serde::Serialize;

/// A file picked for upload, fully read into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    #[must_use]
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    #[must_use]
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UploadStatus {
    Pending,
    Uploading,
    Success {
        photo: Photo,
    },
    Failed {
        reason: String,
        /// Object key of a blob that was written but has no photo record.
        orphaned_key: Option<String>,
    },
    Skipped {
        reason: String,
    },
}

impl UploadStatus {
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Success { .. } | Self::Failed { .. } | Self::Skipped { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadItem {
    pub file: UploadFile,
    pub status: UploadStatus,
}

/// Outcome of one upload batch, one entry per selected file in selection order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReport {
    pub items: Vec<UploadItem>,
}

impl UploadReport {
    /// True when at least one file failed. Skipped files are not failures.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.items
            .iter()
            .any(|item| matches!(item.status, UploadStatus::Failed { .. }))
    }

    #[must_use]
    pub fn uploaded(&self) -> Vec<&Photo> {
        self.items
            .iter()
            .filter_map(|item| match &item.status {
                UploadStatus::Success { photo } => Some(photo),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn count_skipped(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item.status, UploadStatus::Skipped { .. }))
            .count()
    }

    #[must_use]
    pub fn orphaned_keys(&self) -> Vec<&str> {
        self.items
            .iter()
            .filter_map(|item| match &item.status {
                UploadStatus::Failed {
                    orphaned_key: Some(key),
                    ..
                } => Some(key.as_str()),
                _ => None,
            })
            .collect()
    }
}
