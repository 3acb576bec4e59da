use crate::backend::{BackendClient, BackendFailure, DataError};
use crate::database::{VaultMemberStore, VaultStore};
use common_types::{NewVault, Vault, VaultMember, VaultRole, VaultUpdate};
use tracing::{instrument, warn};
use uuid::Uuid;

/// The user's role in the vault. A creator without a membership row, for instance because
/// adding it failed right after the vault was created, is still the owner.
#[instrument(skip(client))]
async fn effective_role(
    client: &BackendClient,
    vault_id: Uuid,
    user_id: Uuid,
) -> Result<Option<VaultRole>, DataError> {
    if let Some(role) = VaultMemberStore::find_role(client, vault_id, user_id).await? {
        return Ok(Some(role));
    }
    let vault = VaultStore::find_by_id(client, vault_id).await?;
    Ok(vault
        .filter(|vault| vault.created_by == user_id)
        .map(|_| VaultRole::Owner))
}

/// Fails with permission denied unless the user holds one of `allowed` in the vault.
#[instrument(skip(client))]
async fn require_role(
    client: &BackendClient,
    vault_id: Uuid,
    user_id: Uuid,
    allowed: &[VaultRole],
) -> Result<VaultRole, DataError> {
    match effective_role(client, vault_id, user_id).await? {
        Some(role) if allowed.contains(&role) => Ok(role),
        _ => Err(DataError::Backend(BackendFailure::permission_denied(format!(
            "User {user_id} may not do this in vault {vault_id}"
        )))),
    }
}

/// Creates a vault and makes its creator the owner. If the membership cannot be added the
/// vault is kept; its creator still counts as owner.
#[instrument(skip(client))]
pub async fn create_vault(
    client: &BackendClient,
    user_id: Uuid,
    name: &str,
    description: Option<String>,
    color: Option<String>,
) -> Result<Vault, DataError> {
    let new_vault = NewVault::builder()
        .name(name.trim().to_string())
        .maybe_description(description)
        .maybe_color(color)
        .created_by(user_id)
        .build();
    let vault = VaultStore::create(client, &new_vault).await?;

    if let Err(error) = VaultMemberStore::add(client, vault.id, user_id, VaultRole::Owner).await {
        warn!(vault_id = %vault.id, "Vault was created without an owner membership: {error}");
        return Err(error);
    }
    Ok(vault)
}

/// Owners and admins may edit the vault details.
#[instrument(skip(client))]
pub async fn update_vault(
    client: &BackendClient,
    user_id: Uuid,
    vault_id: Uuid,
    changes: &VaultUpdate,
) -> Result<Vault, DataError> {
    require_role(client, vault_id, user_id, &[VaultRole::Owner, VaultRole::Admin]).await?;
    VaultStore::update(client, vault_id, changes).await
}

/// Only the owner may delete a vault. Members and photos are removed by the backend.
#[instrument(skip(client))]
pub async fn delete_vault(
    client: &BackendClient,
    user_id: Uuid,
    vault_id: Uuid,
) -> Result<(), DataError> {
    require_role(client, vault_id, user_id, &[VaultRole::Owner]).await?;
    VaultStore::delete(client, vault_id).await
}

/// Adds a member or changes their role. Only an owner may hand out the owner role.
#[instrument(skip(client))]
pub async fn add_member(
    client: &BackendClient,
    user_id: Uuid,
    vault_id: Uuid,
    member_id: Uuid,
    role: VaultRole,
) -> Result<VaultMember, DataError> {
    let allowed: &[VaultRole] = if role == VaultRole::Owner {
        &[VaultRole::Owner]
    } else {
        &[VaultRole::Owner, VaultRole::Admin]
    };
    require_role(client, vault_id, user_id, allowed).await?;
    VaultMemberStore::add(client, vault_id, member_id, role).await
}

/// Members may always leave; removing someone else takes an owner or admin.
#[instrument(skip(client))]
pub async fn remove_member(
    client: &BackendClient,
    user_id: Uuid,
    vault_id: Uuid,
    member_id: Uuid,
) -> Result<(), DataError> {
    if member_id != user_id {
        require_role(client, vault_id, user_id, &[VaultRole::Owner, VaultRole::Admin]).await?;
    }
    VaultMemberStore::remove(client, vault_id, member_id).await
}

/// Lists the members of a vault the user belongs to.
#[instrument(skip(client))]
pub async fn list_members(
    client: &BackendClient,
    user_id: Uuid,
    vault_id: Uuid,
) -> Result<Vec<VaultMember>, DataError> {
    require_role(
        client,
        vault_id,
        user_id,
        &[VaultRole::Owner, VaultRole::Admin, VaultRole::Member],
    )
    .await?;
    VaultMemberStore::list_by_vault(client, vault_id).await
}
