use crate::{Vault, VaultRole};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A vault as seen by one of its members, with the number of photos in it.
/// Derived on read, never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VaultView {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub role: VaultRole,
    pub photo_count: u64,
}

impl VaultView {
    #[must_use]
    pub fn new(vault: Vault, role: VaultRole, photo_count: u64) -> Self {
        Self {
            id: vault.id,
            name: vault.name,
            description: vault.description,
            color: vault.color,
            created_by: vault.created_by,
            created_at: vault.created_at,
            role,
            photo_count,
        }
    }
}

impl From<VaultView> for Vault {
    fn from(view: VaultView) -> Self {
        Self {
            id: view.id,
            name: view.name,
            description: view.description,
            color: view.color,
            created_by: view.created_by,
            created_at: view.created_at,
        }
    }
}
