use crate::backend::{BackendClient, DataError};
use crate::database::VAULT_MEMBERS;
use crate::database::stores::expect_one;
use crate::retry::with_retry;
use common_types::{VaultMember, VaultRole};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

#[derive(Serialize)]
struct NewMembership {
    user_id: Uuid,
    vault_id: Uuid,
    role: VaultRole,
}

pub struct VaultMemberStore;

impl VaultMemberStore {
    /// Adds a user to a vault, or updates their role if they are already a member.
    #[instrument(skip(client))]
    pub async fn add(
        client: &BackendClient,
        vault_id: Uuid,
        user_id: Uuid,
        role: VaultRole,
    ) -> Result<VaultMember, DataError> {
        let row = NewMembership {
            user_id,
            vault_id,
            role,
        };
        let rows = with_retry("save vault member", client.retry_policy(), || {
            client
                .table(VAULT_MEMBERS)
                .on_conflict("user_id,vault_id")
                .upsert(&row)
        })
        .await?;
        expect_one(rows, "saved vault member")
    }

    #[instrument(skip(client))]
    pub async fn remove(
        client: &BackendClient,
        vault_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), DataError> {
        with_retry("remove vault member", client.retry_policy(), || {
            client
                .table(VAULT_MEMBERS)
                .eq("vault_id", vault_id)
                .eq("user_id", user_id)
                .delete()
        })
        .await
    }

    /// Gets the role of a user for a specific vault.
    #[instrument(skip(client))]
    pub async fn find_role(
        client: &BackendClient,
        vault_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<VaultRole>, DataError> {
        #[derive(Deserialize)]
        struct RoleRow {
            role: VaultRole,
        }

        let rows: Vec<RoleRow> = with_retry("fetch vault role", client.retry_policy(), || {
            client
                .table(VAULT_MEMBERS)
                .select("role")
                .eq("vault_id", vault_id)
                .eq("user_id", user_id)
                .limit(1)
                .fetch()
        })
        .await?;
        Ok(rows.into_iter().next().map(|row| row.role))
    }

    /// Retrieves all members of a vault, oldest membership first.
    #[instrument(skip(client))]
    pub async fn list_by_vault(
        client: &BackendClient,
        vault_id: Uuid,
    ) -> Result<Vec<VaultMember>, DataError> {
        with_retry("list vault members", client.retry_policy(), || {
            client
                .table(VAULT_MEMBERS)
                .select("*")
                .eq("vault_id", vault_id)
                .order("created_at", true)
                .fetch()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RequestBody;
    use crate::test_support::{FakeTransport, json_response, test_client};
    use serde_json::json;

    #[tokio::test]
    async fn add_targets_the_unique_pair() {
        let (vault_id, user_id) = (Uuid::new_v4(), Uuid::new_v4());
        let transport = FakeTransport::new(move |_| {
            json_response(
                201,
                json!([{
                    "user_id": user_id,
                    "vault_id": vault_id,
                    "role": "owner",
                    "created_at": "2024-03-03T12:00:00Z"
                }]),
            )
        });
        let client = test_client(transport.clone());

        let member = VaultMemberStore::add(&client, vault_id, user_id, VaultRole::Owner)
            .await
            .expect("upsert");
        assert_eq!(member.role, VaultRole::Owner);

        let request = transport.last_request();
        assert_eq!(request.query_param("on_conflict").as_deref(), Some("user_id,vault_id"));
        assert_eq!(
            request.body,
            RequestBody::Json(json!({"user_id": user_id, "vault_id": vault_id, "role": "owner"}))
        );
    }

    #[tokio::test]
    async fn find_role_is_none_for_non_members() {
        let transport = FakeTransport::new(|_| json_response(200, json!([])));
        let client = test_client(transport);

        let role = VaultMemberStore::find_role(&client, Uuid::new_v4(), Uuid::new_v4())
            .await
            .expect("query");
        assert_eq!(role, None);
    }

    #[tokio::test]
    async fn remove_filters_on_both_keys() {
        let (vault_id, user_id) = (Uuid::new_v4(), Uuid::new_v4());
        let transport = FakeTransport::new(|_| json_response(204, serde_json::Value::Null));
        let client = test_client(transport.clone());

        VaultMemberStore::remove(&client, vault_id, user_id).await.expect("remove");
        let request = transport.last_request();
        assert_eq!(request.query_param("vault_id"), Some(format!("eq.{vault_id}")));
        assert_eq!(request.query_param("user_id"), Some(format!("eq.{user_id}")));
    }
}
