use crate::backend::{BackendClient, DataError};
use crate::database::VAULTS;
use crate::database::stores::expect_one;
use crate::retry::with_retry;
use common_types::{NewVault, Vault, VaultUpdate};
use tracing::instrument;
use uuid::Uuid;

pub struct VaultStore;

impl VaultStore {
    /// Retrieves a single vault by its ID.
    #[instrument(skip(client))]
    pub async fn find_by_id(
        client: &BackendClient,
        vault_id: Uuid,
    ) -> Result<Option<Vault>, DataError> {
        let rows: Vec<Vault> = with_retry("fetch vault", client.retry_policy(), || {
            client.table(VAULTS).select("*").eq("id", vault_id).limit(1).fetch()
        })
        .await?;
        Ok(rows.into_iter().next())
    }

    /// Retrieves the vaults a user created, newest first.
    #[instrument(skip(client))]
    pub async fn list_created_by(
        client: &BackendClient,
        user_id: Uuid,
    ) -> Result<Vec<Vault>, DataError> {
        with_retry("list created vaults", client.retry_policy(), || {
            client
                .table(VAULTS)
                .select("*")
                .eq("created_by", user_id)
                .order("created_at", false)
                .fetch()
        })
        .await
    }

    /// Creates a new vault. Membership of the creator is handled by the vault service.
    #[instrument(skip(client))]
    pub async fn create(client: &BackendClient, new_vault: &NewVault) -> Result<Vault, DataError> {
        if new_vault.name.trim().is_empty() {
            return Err(DataError::Validation("Vault name cannot be empty".to_string()));
        }
        let rows = with_retry("create vault", client.retry_policy(), || {
            client.table(VAULTS).insert(new_vault)
        })
        .await?;
        expect_one(rows, "created vault")
    }

    /// Updates name, description and/or color of a vault.
    #[instrument(skip(client))]
    pub async fn update(
        client: &BackendClient,
        vault_id: Uuid,
        changes: &VaultUpdate,
    ) -> Result<Vault, DataError> {
        if changes.is_empty() {
            return Err(DataError::Validation("Vault update has no fields".to_string()));
        }
        if changes.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(DataError::Validation("Vault name cannot be empty".to_string()));
        }
        let rows = with_retry("update vault", client.retry_policy(), || {
            client.table(VAULTS).eq("id", vault_id).update(changes)
        })
        .await?;
        expect_one(rows, &format!("vault {vault_id}"))
    }

    /// Deletes a vault. Photos and memberships are removed by the backend's cascade.
    #[instrument(skip(client))]
    pub async fn delete(client: &BackendClient, vault_id: Uuid) -> Result<(), DataError> {
        with_retry("delete vault", client.retry_policy(), || {
            client.table(VAULTS).eq("id", vault_id).delete()
        })
        .await
    }
}
