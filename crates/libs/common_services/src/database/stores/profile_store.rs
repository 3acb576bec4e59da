use crate::backend::{BackendClient, DataError};
use crate::database::PROFILES;
use crate::database::stores::expect_one;
use crate::retry::with_retry;
use common_types::{Profile, ProfileUpdate};
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

#[derive(Serialize)]
struct ProfileUpsert<'a> {
    id: Uuid,
    #[serde(flatten)]
    fields: &'a ProfileUpdate,
}

pub struct ProfileStore;

impl ProfileStore {
    #[instrument(skip(client))]
    pub async fn find_by_id(
        client: &BackendClient,
        user_id: Uuid,
    ) -> Result<Option<Profile>, DataError> {
        let rows: Vec<Profile> = with_retry("fetch profile", client.retry_policy(), || {
            client.table(PROFILES).select("*").eq("id", user_id).limit(1).fetch()
        })
        .await?;
        Ok(rows.into_iter().next())
    }

    /// Saves a profile, creating it on first save.
    #[instrument(skip(client))]
    pub async fn upsert(
        client: &BackendClient,
        user_id: Uuid,
        fields: &ProfileUpdate,
    ) -> Result<Profile, DataError> {
        let row = ProfileUpsert { id: user_id, fields };
        let rows = with_retry("save profile", client.retry_policy(), || {
            client.table(PROFILES).on_conflict("id").upsert(&row)
        })
        .await?;
        expect_one(rows, "saved profile")
    }

    /// Partial update of an existing profile.
    #[instrument(skip(client))]
    pub async fn update(
        client: &BackendClient,
        user_id: Uuid,
        changes: &ProfileUpdate,
    ) -> Result<Profile, DataError> {
        if changes.is_empty() {
            return Err(DataError::Validation("Profile update has no fields".to_string()));
        }
        let rows = with_retry("update profile", client.retry_policy(), || {
            client.table(PROFILES).eq("id", user_id).update(changes)
        })
        .await?;
        expect_one(rows, &format!("profile {user_id}"))
    }
}
