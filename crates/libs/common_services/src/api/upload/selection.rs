use app_state::UploadConstants;
use common_types::{UploadFile, UploadItem, UploadStatus};
use tracing::debug;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Why a file may not be uploaded, if it may not.
#[must_use]
pub fn rejection_reason(file: &UploadFile, constants: &UploadConstants) -> Option<String> {
    let mime_type = file.mime_type.trim().to_ascii_lowercase();
    if !mime_type.starts_with(&constants.allowed_mime_prefix.to_ascii_lowercase()) {
        return Some(format!(
            "'{}' is not an image (type '{}')",
            file.file_name, file.mime_type
        ));
    }
    size_rejection(&file.file_name, file.size(), constants)
}

/// Size check on its own, usable before a file is read.
#[must_use]
pub fn size_rejection(file_name: &str, size: u64, constants: &UploadConstants) -> Option<String> {
    (size > constants.max_file_bytes).then(|| {
        format!(
            "'{file_name}' is {:.1} MB, the limit is {:.1} MB",
            size as f64 / BYTES_PER_MB,
            constants.max_file_bytes as f64 / BYTES_PER_MB
        )
    })
}

/// Turn one picked file into an upload item, skipped if it breaks the type or size limits.
#[must_use]
pub fn select_file(file: UploadFile, constants: &UploadConstants) -> UploadItem {
    let status = match rejection_reason(&file, constants) {
        Some(reason) => {
            debug!(file = %file.file_name, %reason, "Skipping file");
            UploadStatus::Skipped { reason }
        }
        None => UploadStatus::Pending,
    };
    UploadItem { file, status }
}

/// Turn picked files into upload items. Files that break the type or size limits are marked
/// skipped and never reach the network.
#[must_use]
pub fn select_files(files: Vec<UploadFile>, constants: &UploadConstants) -> Vec<UploadItem> {
    files
        .into_iter()
        .map(|file| select_file(file, constants))
        .collect()
}
