use crate::backend::{BackendClient, DataError};
use crate::database::PHOTOS;
use crate::database::stores::expect_one;
use crate::retry::with_retry;
use common_types::{NewPhoto, Photo, PhotoUpdate};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

pub struct PhotoStore;

impl PhotoStore {
    #[instrument(skip(client))]
    pub async fn find_by_id(
        client: &BackendClient,
        photo_id: Uuid,
    ) -> Result<Option<Photo>, DataError> {
        let rows: Vec<Photo> = with_retry("fetch photo", client.retry_policy(), || {
            client.table(PHOTOS).select("*").eq("id", photo_id).limit(1).fetch()
        })
        .await?;
        Ok(rows.into_iter().next())
    }

    /// All photos of a vault, newest first.
    #[instrument(skip(client))]
    pub async fn list_by_vault(
        client: &BackendClient,
        vault_id: Uuid,
    ) -> Result<Vec<Photo>, DataError> {
        with_retry("list vault photos", client.retry_policy(), || {
            client
                .table(PHOTOS)
                .select("*")
                .eq("vault_id", vault_id)
                .order("created_at", false)
                .fetch()
        })
        .await
    }

    #[instrument(skip(client))]
    pub async fn count_by_vault(client: &BackendClient, vault_id: Uuid) -> Result<u64, DataError> {
        #[derive(Deserialize)]
        struct CountRow {
            count: u64,
        }

        let rows: Vec<CountRow> = with_retry("count vault photos", client.retry_policy(), || {
            client.table(PHOTOS).select("count()").eq("vault_id", vault_id).fetch()
        })
        .await?;
        Ok(rows.first().map_or(0, |row| row.count))
    }

    /// Inserts the record for an already stored blob.
    #[instrument(skip(client))]
    pub async fn create(client: &BackendClient, new_photo: &NewPhoto) -> Result<Photo, DataError> {
        if new_photo.file_url.is_empty() {
            return Err(DataError::Validation("Photo needs a file URL".to_string()));
        }
        let rows = with_retry("create photo", client.retry_policy(), || {
            client.table(PHOTOS).insert(new_photo)
        })
        .await?;
        expect_one(rows, "created photo")
    }

    /// Edits title and/or description.
    #[instrument(skip(client))]
    pub async fn update(
        client: &BackendClient,
        photo_id: Uuid,
        changes: &PhotoUpdate,
    ) -> Result<Photo, DataError> {
        if changes.is_empty() {
            return Err(DataError::Validation("Photo update has no fields".to_string()));
        }
        let rows = with_retry("update photo", client.retry_policy(), || {
            client.table(PHOTOS).eq("id", photo_id).update(changes)
        })
        .await?;
        expect_one(rows, &format!("photo {photo_id}"))
    }

    /// Deletes the record only; the blob stays in the object store.
    #[instrument(skip(client))]
    pub async fn delete(client: &BackendClient, photo_id: Uuid) -> Result<(), DataError> {
        with_retry("delete photo", client.retry_policy(), || {
            client.table(PHOTOS).eq("id", photo_id).delete()
        })
        .await
    }
}
