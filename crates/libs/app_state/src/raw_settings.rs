use serde::Deserialize;

/// Settings as they come out of `config/settings.yaml` and the `APP__*` environment.
/// Nothing here is validated yet, see [`crate::AppSettings::resolve`].
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct RawSettings {
    pub backend: RawBackendSettings,
    pub constants: RawConstants,
}

/// Connection settings for the remote relational + object storage service.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RawBackendSettings {
    /// Base URL of the service, e.g. `https://xyz.example.co`.
    pub url: Option<String>,
    /// Public anonymous API key sent with every request.
    pub anon_key: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for RawBackendSettings {
    fn default() -> Self {
        Self {
            url: None,
            anon_key: None,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct RawConstants {
    pub retry: RetryConstants,
    pub health: HealthConstants,
    pub upload: UploadConstants,
    pub storage: StorageConstants,
}

/// Retry behaviour for every remote operation.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct RetryConstants {
    /// Additional attempts after the first one.
    pub max_retries: u32,
    /// Delay before the second attempt, doubled for every attempt after that.
    pub base_delay_ms: u64,
}

impl Default for RetryConstants {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 1_000,
        }
    }
}

/// Startup connectivity probe.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct HealthConstants {
    pub probe_delay_ms: u64,
    pub probe_max_retries: u32,
}

impl Default for HealthConstants {
    fn default() -> Self {
        Self {
            probe_delay_ms: 1_000,
            probe_max_retries: 2,
        }
    }
}

/// Limits enforced before a file may enter the upload phase.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct UploadConstants {
    pub bucket: String,
    pub max_file_bytes: u64,
    pub allowed_mime_prefix: String,
}

impl Default for UploadConstants {
    fn default() -> Self {
        Self {
            bucket: "photos".to_string(),
            max_file_bytes: 10 * 1024 * 1024,
            allowed_mime_prefix: "image/".to_string(),
        }
    }
}

/// Inputs for the storage usage estimate.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct StorageConstants {
    pub per_photo_mb: f64,
    pub quota_mb: f64,
}

impl Default for StorageConstants {
    fn default() -> Self {
        Self {
            per_photo_mb: 2.5,
            quota_mb: 1024.0,
        }
    }
}
