use crate::backend::{BackendClient, DataError};
use crate::membership::get_user_vaults;
use app_state::StorageConstants;
use common_types::StorageEstimate;
use tracing::instrument;
use uuid::Uuid;

/// Estimate with the default 2.5 MB per photo and 1 GB quota.
#[must_use]
pub fn estimate_storage(total_photos: u64) -> StorageEstimate {
    let defaults = StorageConstants::default();
    estimate_storage_with(total_photos, defaults.per_photo_mb, defaults.quota_mb)
}

/// `available_mb` is not clamped and goes negative once the quota is exceeded. A non-positive
/// quota reports 100% usage.
#[must_use]
pub fn estimate_storage_with(
    total_photos: u64,
    per_photo_mb: f64,
    quota_mb: f64,
) -> StorageEstimate {
    let used_mb = total_photos as f64 * per_photo_mb;
    let used_percentage = if quota_mb > 0.0 {
        (used_mb / quota_mb * 100.0).min(100.0)
    } else {
        100.0
    };
    StorageEstimate {
        used_mb,
        total_mb: quota_mb,
        used_percentage,
        available_mb: quota_mb - used_mb,
    }
}

/// Storage estimate over all photos in all vaults the user is a member of.
#[instrument(skip(client, constants))]
pub async fn get_user_storage(
    client: &BackendClient,
    user_id: Uuid,
    constants: &StorageConstants,
) -> Result<StorageEstimate, DataError> {
    let vaults = get_user_vaults(client, user_id).await?;
    let total_photos = vaults.iter().map(|vault| vault.photo_count).sum();
    Ok(estimate_storage_with(
        total_photos,
        constants.per_photo_mb,
        constants.quota_mb,
    ))
}
