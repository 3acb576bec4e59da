use crate::api::upload::select_files;
use crate::backend::{BackendClient, BackendErrorKind, DataError};
use crate::database::PhotoStore;
use crate::retry::with_retry;
use crate::utils::{file_extension, object_key};
use app_state::UploadConstants;
use chrono::Utc;
use common_types::{NewPhoto, Photo, UploadFile, UploadItem, UploadReport, UploadStatus};
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

const CANCELLED_REASON: &str = "upload cancelled";

/// Where the upload of a single file stopped. `orphaned_key` is set when a blob was, or may
/// have been, written without a photo record pointing at it.
struct UploadFailure {
    error: DataError,
    orphaned_key: Option<String>,
}

impl From<UploadFailure> for UploadStatus {
    fn from(failure: UploadFailure) -> Self {
        Self::Failed {
            reason: failure.error.to_string(),
            orphaned_key: failure.orphaned_key,
        }
    }
}

/// Hands out millisecond timestamps that are unique within one batch.
struct KeyClock {
    last: i64,
}

impl KeyClock {
    const fn new() -> Self {
        Self { last: i64::MIN }
    }

    fn next(&mut self) -> i64 {
        self.last = Utc::now().timestamp_millis().max(self.last.saturating_add(1));
        self.last
    }
}

fn photo_title(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.trim().is_empty())
        .unwrap_or(file_name)
        .to_string()
}

/// Store the blob, then create the photo record that points at it.
async fn upload_one(
    client: &BackendClient,
    user_id: Uuid,
    vault_id: Uuid,
    file: &UploadFile,
    bucket: &str,
    timestamp_ms: i64,
) -> Result<Photo, UploadFailure> {
    let key = object_key(
        user_id,
        vault_id,
        timestamp_ms,
        &file_extension(&file.file_name, &file.mime_type),
    );
    let store = client.storage(bucket);

    // The key is unique to this batch, so a conflict on a repeated attempt means an earlier
    // attempt stored the file before its response was lost.
    let mut attempts = 0_u32;
    let written = with_retry("upload photo file", client.retry_policy(), || {
        attempts += 1;
        let is_repeat = attempts > 1;
        let (store, key) = (&store, &key);
        async move {
            match store.upload(key, file.bytes.clone(), &file.mime_type).await {
                Err(error)
                    if is_repeat && error.backend_kind() == Some(BackendErrorKind::Conflict) =>
                {
                    debug!(%key, "File was stored by an earlier attempt");
                    Ok(())
                }
                result => result,
            }
        }
    })
    .await;
    if let Err(error) = written {
        let orphaned_key = (attempts > 1).then(|| key.clone());
        if orphaned_key.is_some() {
            warn!(%key, "File upload failed after retrying, it may be stored anyway: {error}");
        }
        return Err(UploadFailure {
            error,
            orphaned_key,
        });
    }

    let record = store.public_url(&key).map(|file_url| {
        NewPhoto::builder()
            .vault_id(vault_id)
            .uploaded_by(user_id)
            .title(photo_title(&file.file_name))
            .file_url(file_url)
            .build()
    });
    let result = match record {
        Ok(new_photo) => PhotoStore::create(client, &new_photo).await,
        Err(error) => Err(error),
    };
    result.map_err(|error| {
        warn!(%key, "Photo record was not created, stored file is orphaned: {error}");
        UploadFailure {
            error,
            orphaned_key: Some(key),
        }
    })
}

/// Upload the pending items one at a time. Items that are not pending are passed through
/// untouched. Once `cancel` fires, the remaining pending items are skipped; the file being
/// uploaded at that moment is finished first.
pub async fn upload_photos(
    client: &BackendClient,
    user_id: Uuid,
    vault_id: Uuid,
    items: Vec<UploadItem>,
    constants: &UploadConstants,
    cancel: &CancellationToken,
) -> UploadReport {
    upload_photos_with_progress(client, user_id, vault_id, items, constants, cancel, |_, _| {})
        .await
}

/// Like [`upload_photos`], calling `on_progress` with the item's index every time the status
/// of a pending item changes.
#[instrument(skip_all, fields(files = items.len()))]
pub async fn upload_photos_with_progress(
    client: &BackendClient,
    user_id: Uuid,
    vault_id: Uuid,
    mut items: Vec<UploadItem>,
    constants: &UploadConstants,
    cancel: &CancellationToken,
    mut on_progress: impl FnMut(usize, &UploadItem),
) -> UploadReport {
    let mut clock = KeyClock::new();

    for (index, item) in items.iter_mut().enumerate() {
        if item.status != UploadStatus::Pending {
            continue;
        }
        if cancel.is_cancelled() {
            item.status = UploadStatus::Skipped {
                reason: CANCELLED_REASON.to_string(),
            };
            on_progress(index, item);
            continue;
        }

        item.status = UploadStatus::Uploading;
        on_progress(index, item);
        info!(file = %item.file.file_name, bytes = item.file.size(), "Uploading");
        item.status = match upload_one(
            client,
            user_id,
            vault_id,
            &item.file,
            &constants.bucket,
            clock.next(),
        )
        .await
        {
            Ok(photo) => UploadStatus::Success { photo },
            Err(failure) => failure.into(),
        };
        on_progress(index, item);
    }

    let report = UploadReport { items };
    info!(
        uploaded = report.uploaded().len(),
        skipped = report.count_skipped(),
        failed = report.has_failures(),
        "Upload batch finished"
    );
    report
}

/// Select and upload in one go.
pub async fn upload_files(
    client: &BackendClient,
    user_id: Uuid,
    vault_id: Uuid,
    files: Vec<UploadFile>,
    constants: &UploadConstants,
    cancel: &CancellationToken,
) -> UploadReport {
    let items = select_files(files, constants);
    upload_photos(client, user_id, vault_id, items, constants, cancel).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendRequest, BackendResponse, RequestBody};
    use crate::test_support::{FakeTransport, json_response, test_client};
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn echo_photo(request: &BackendRequest) -> Result<BackendResponse, DataError> {
        let RequestBody::Json(Value::Object(fields)) = &request.body else {
            return json_response(400, json!({"message": "expected a json body"}));
        };
        let mut photo = fields.clone();
        photo.insert("id".to_string(), json!(Uuid::new_v4()));
        photo.insert("description".to_string(), Value::Null);
        photo.insert("created_at".to_string(), json!("2024-08-01T12:00:00Z"));
        json_response(201, json!([photo]))
    }

    fn is_blob_write(request: &BackendRequest) -> bool {
        request.url.path().starts_with("/storage/v1/object/photos/")
    }

    fn image(name: &str) -> UploadFile {
        UploadFile::new(name, "image/jpeg", vec![7; 64])
    }

    #[tokio::test]
    async fn uploads_blob_then_record() {
        let transport = FakeTransport::new(|request| {
            if is_blob_write(request) {
                json_response(200, json!({"Key": "ok"}))
            } else {
                echo_photo(request)
            }
        });
        let client = test_client(transport.clone());
        let (user_id, vault_id) = (Uuid::new_v4(), Uuid::new_v4());

        let report = upload_files(
            &client,
            user_id,
            vault_id,
            vec![image("beach.jpg"), image("hills.jpg")],
            &UploadConstants::default(),
            &CancellationToken::new(),
        )
        .await;

        assert!(!report.has_failures());
        let photos = report.uploaded();
        assert_eq!(photos.len(), 2);
        assert_eq!(photos[0].title, "beach");
        assert_eq!(photos[0].vault_id, vault_id);
        assert_eq!(photos[0].uploaded_by, user_id);
        let prefix =
            format!("https://backend.test/storage/v1/object/public/photos/{user_id}/{vault_id}/");
        assert!(photos[0].file_url.starts_with(&prefix));
        assert!(photos[0].file_url.ends_with(".jpg"));
        assert_ne!(photos[0].file_url, photos[1].file_url);

        let methods: Vec<bool> = transport.requests().iter().map(is_blob_write).collect();
        assert_eq!(methods, [true, false, true, false]);
    }

    #[tokio::test]
    async fn rejected_files_never_reach_the_network() {
        let transport = FakeTransport::new(|_| json_response(500, json!({})));
        let client = test_client(transport.clone());

        let report = upload_files(
            &client,
            Uuid::new_v4(),
            Uuid::new_v4(),
            vec![
                UploadFile::new("big.jpg", "image/jpeg", vec![0; 11 * 1024 * 1024]),
                UploadFile::new("notes.txt", "text/plain", b"hello".to_vec()),
            ],
            &UploadConstants::default(),
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(report.count_skipped(), 2);
        assert!(!report.has_failures());
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn failed_record_reports_the_orphaned_blob() {
        let transport = FakeTransport::new(|request| {
            if is_blob_write(request) {
                json_response(200, json!({"Key": "ok"}))
            } else {
                json_response(
                    403,
                    json!({
                        "code": "42501",
                        "message": "new row violates row-level security policy"
                    }),
                )
            }
        });
        let client = test_client(transport.clone());
        let (user_id, vault_id) = (Uuid::new_v4(), Uuid::new_v4());

        let report = upload_files(
            &client,
            user_id,
            vault_id,
            vec![image("denied.jpg")],
            &UploadConstants::default(),
            &CancellationToken::new(),
        )
        .await;

        assert!(report.has_failures());
        let orphaned = report.orphaned_keys();
        assert_eq!(orphaned.len(), 1);
        assert!(orphaned[0].starts_with(&format!("{user_id}/{vault_id}/")));
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn one_failure_does_not_stop_the_batch() {
        let transport = FakeTransport::new(|request| {
            if !is_blob_write(request) {
                return echo_photo(request);
            }
            if request.url.path().ends_with(".png") {
                json_response(409, json!({"message": "The resource already exists"}))
            } else {
                json_response(200, json!({"Key": "ok"}))
            }
        });
        let client = test_client(transport);

        let report = upload_files(
            &client,
            Uuid::new_v4(),
            Uuid::new_v4(),
            vec![
                UploadFile::new("clash.png", "image/png", vec![1; 8]),
                image("fine.jpg"),
            ],
            &UploadConstants::default(),
            &CancellationToken::new(),
        )
        .await;

        assert!(matches!(
            report.items[0].status,
            UploadStatus::Failed { orphaned_key: None, .. }
        ));
        assert!(matches!(report.items[1].status, UploadStatus::Success { .. }));
    }

    #[tokio::test]
    async fn cancelled_batch_skips_pending_files() {
        let transport = FakeTransport::new(|_| json_response(200, json!({})));
        let client = test_client(transport.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = upload_files(
            &client,
            Uuid::new_v4(),
            Uuid::new_v4(),
            vec![image("one.jpg"), UploadFile::new("two.gif", "text/html", vec![1])],
            &UploadConstants::default(),
            &cancel,
        )
        .await;

        assert_eq!(
            report.items[0].status,
            UploadStatus::Skipped {
                reason: CANCELLED_REASON.to_string()
            }
        );
        assert!(matches!(
            &report.items[1].status,
            UploadStatus::Skipped { reason } if reason != CANCELLED_REASON
        ));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn conflict_after_a_lost_response_counts_as_stored() {
        let blob_writes = Arc::new(AtomicU32::new(0));
        let counter = blob_writes.clone();
        let transport = FakeTransport::new(move |request| {
            if !is_blob_write(request) {
                return echo_photo(request);
            }
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(DataError::TransientNetwork("connection reset by peer".to_string()))
            } else {
                json_response(409, json!({"message": "The resource already exists"}))
            }
        });
        let client = test_client(transport.clone());

        let report = upload_files(
            &client,
            Uuid::new_v4(),
            Uuid::new_v4(),
            vec![image("flaky.jpg")],
            &UploadConstants::default(),
            &CancellationToken::new(),
        )
        .await;

        assert!(!report.has_failures(), "{:?}", report.items[0].status);
        assert_eq!(report.uploaded().len(), 1);
        assert_eq!(blob_writes.load(Ordering::SeqCst), 2);
        assert_eq!(transport.request_count(), 3);
    }

    #[tokio::test]
    async fn exhausted_blob_retries_report_the_key_as_possibly_orphaned() {
        let transport = FakeTransport::new(|request| {
            if is_blob_write(request) {
                Err(DataError::TransientNetwork("socket closed".to_string()))
            } else {
                echo_photo(request)
            }
        });
        let client = test_client(transport.clone());
        let (user_id, vault_id) = (Uuid::new_v4(), Uuid::new_v4());

        let report = upload_files(
            &client,
            user_id,
            vault_id,
            vec![image("lost.jpg")],
            &UploadConstants::default(),
            &CancellationToken::new(),
        )
        .await;

        assert!(report.has_failures());
        let orphaned = report.orphaned_keys();
        assert_eq!(orphaned.len(), 1);
        assert!(orphaned[0].starts_with(&format!("{user_id}/{vault_id}/")));
        assert_eq!(transport.request_count(), 3);
    }

    #[tokio::test]
    async fn first_attempt_rejection_leaves_nothing_behind() {
        let transport = FakeTransport::new(|_| {
            json_response(403, json!({"message": "new row violates row-level security policy"}))
        });
        let client = test_client(transport.clone());

        let report = upload_files(
            &client,
            Uuid::new_v4(),
            Uuid::new_v4(),
            vec![image("denied.jpg")],
            &UploadConstants::default(),
            &CancellationToken::new(),
        )
        .await;

        assert!(report.has_failures());
        assert!(report.orphaned_keys().is_empty());
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn progress_reports_uploading_before_the_outcome() {
        let transport = FakeTransport::new(|request| {
            if is_blob_write(request) {
                json_response(200, json!({"Key": "ok"}))
            } else {
                echo_photo(request)
            }
        });
        let client = test_client(transport);
        let constants = UploadConstants::default();
        let items = select_files(
            vec![image("a.jpg"), UploadFile::new("b.txt", "text/plain", vec![1])],
            &constants,
        );

        let mut seen = Vec::new();
        let report = upload_photos_with_progress(
            &client,
            Uuid::new_v4(),
            Uuid::new_v4(),
            items,
            &constants,
            &CancellationToken::new(),
            |index, item| {
                let label = match item.status {
                    UploadStatus::Uploading => "uploading",
                    UploadStatus::Success { .. } => "success",
                    _ => "other",
                };
                seen.push((index, label));
            },
        )
        .await;

        assert_eq!(seen, [(0, "uploading"), (0, "success")]);
        assert_eq!(report.count_skipped(), 1);
    }
}
