use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Corresponds to the 'photos' table. The blob lives in the object store at `file_url`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Photo {
    pub id: Uuid,
    pub vault_id: Uuid,
    pub uploaded_by: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub file_url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, Builder)]
pub struct NewPhoto {
    pub vault_id: Uuid,
    pub uploaded_by: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub file_url: String,
}

/// Only title and description of a photo are editable.
#[derive(Debug, Clone, Serialize, Default, PartialEq, Eq, Builder)]
pub struct PhotoUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl PhotoUpdate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
    }
}
