use std::path::Path;
use uuid::Uuid;

const FALLBACK_EXTENSION: &str = "bin";

/// Object key for an uploaded photo: `{user_id}/{vault_id}/{timestamp_ms}.{ext}`.
#[must_use]
pub fn object_key(user_id: Uuid, vault_id: Uuid, timestamp_ms: i64, extension: &str) -> String {
    format!("{user_id}/{vault_id}/{timestamp_ms}.{extension}")
}

/// Lowercased extension of `file_name`, or one derived from the MIME type when the name has
/// none.
#[must_use]
pub fn file_extension(file_name: &str, mime_type: &str) -> String {
    let from_name = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));
    if let Some(ext) = from_name {
        return ext.to_ascii_lowercase();
    }

    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if let Some(ext) = image_extension(&essence) {
        return ext.to_string();
    }
    mime_guess::get_mime_extensions_str(&essence)
        .and_then(|extensions| extensions.first())
        .map_or_else(|| FALLBACK_EXTENSION.to_string(), |ext| (*ext).to_string())
}

/// Usual extension for the common photo formats, where the MIME registry lists rarer ones first.
fn image_extension(essence: &str) -> Option<&'static str> {
    let ext = match essence {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/heic" => "heic",
        "image/heif" => "heif",
        "image/avif" => "avif",
        "image/tiff" => "tiff",
        "image/bmp" => "bmp",
        "image/svg+xml" => "svg",
        _ => return None,
    };
    Some(ext)
}
