use crate::backend::{BackendClient, DataError};
use crate::database::VAULT_MEMBERS;
use crate::membership::{OneOrMany, flatten_optional};
use crate::retry::with_retry;
use common_types::{Vault, VaultRole, VaultView};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};
use uuid::Uuid;

const MEMBERSHIP_SELECT: &str =
    "role,vaults(id,name,description,color,created_by,created_at,photos(count))";

#[derive(Debug, Deserialize)]
pub(crate) struct MembershipRow {
    role: VaultRole,
    #[serde(default)]
    vaults: Option<OneOrMany<VaultRow>>,
}

#[derive(Debug, Deserialize)]
struct VaultRow {
    #[serde(flatten)]
    vault: Vault,
    #[serde(default)]
    photos: Option<Value>,
}

/// Reads a `count` aggregate. The backend returns `[{"count": n}]`, but a bare object, a
/// number or a numeric string are accepted too. Anything else counts as zero.
pub(crate) fn aggregate_count(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Array(items)) => aggregate_count(items.first()),
        Some(Value::Object(fields)) => aggregate_count(fields.get("count")),
        Some(Value::Number(number)) => number.as_u64().unwrap_or(0),
        Some(Value::String(text)) => text.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// One view per embedded vault, in row order.
pub(crate) fn normalize_memberships(rows: Vec<MembershipRow>) -> Vec<VaultView> {
    rows.into_iter()
        .flat_map(|row| {
            let role = row.role;
            flatten_optional(row.vaults).into_iter().map(move |vault_row| {
                let photo_count = aggregate_count(vault_row.photos.as_ref());
                VaultView::new(vault_row.vault, role, photo_count)
            })
        })
        .collect()
}

/// All vaults the user is a member of, newest vault first, each with the user's role and the
/// vault's photo count.
#[instrument(skip(client))]
pub async fn get_user_vaults(
    client: &BackendClient,
    user_id: Uuid,
) -> Result<Vec<VaultView>, DataError> {
    let rows: Vec<MembershipRow> = with_retry("load user vaults", client.retry_policy(), || {
        client
            .table(VAULT_MEMBERS)
            .select(MEMBERSHIP_SELECT)
            .eq("user_id", user_id)
            .order("vaults(created_at)", false)
            .fetch()
    })
    .await?;

    let views = normalize_memberships(rows);
    debug!(count = views.len(), "Resolved user vaults");
    Ok(views)
}
