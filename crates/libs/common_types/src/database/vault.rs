use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_VAULT_COLOR: &str = "blue";

/// Corresponds to the 'vaults' table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Vault {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Display tag, not interpreted here.
    #[serde(default)]
    pub color: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, Builder)]
pub struct NewVault {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[builder(default = DEFAULT_VAULT_COLOR.to_string())]
    pub color: String,
    pub created_by: Uuid,
}

#[derive(Debug, Clone, Serialize, Default, PartialEq, Eq, Builder)]
pub struct VaultUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl VaultUpdate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.color.is_none()
    }
}
