use crate::{AppConstants, ConfigError, RawBackendSettings, RawSettings};
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

pub const PLACEHOLDER_BACKEND_URL: &str = "https://placeholder.invalid";
pub const PLACEHOLDER_ANON_KEY: &str = "placeholder-anon-key";

/// How to treat missing connection settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigMode {
    /// Interactive use. Missing settings are a fatal startup error.
    #[default]
    Strict,
    /// Non-networked contexts (builds, docs, dry runs). Missing settings become inert placeholders.
    Permissive,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct BackendSettings {
    /// Base URL without a trailing slash.
    pub url: String,
    pub anon_key: String,
    pub request_timeout_secs: u64,
    /// Set when placeholders were substituted for missing values.
    pub is_placeholder: bool,
}

impl BackendSettings {
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Resolve raw backend settings according to `mode`.
    pub fn resolve(raw: RawBackendSettings, mode: ConfigMode) -> Result<Self, ConfigError> {
        let url = non_empty(raw.url);
        let anon_key = non_empty(raw.anon_key);

        let (url, anon_key, is_placeholder) = match (url, anon_key, mode) {
            (Some(url), Some(key), _) => (url, key, false),
            (None, _, ConfigMode::Strict) => return Err(ConfigError::Missing("backend.url")),
            (_, None, ConfigMode::Strict) => return Err(ConfigError::Missing("backend.anon_key")),
            (url, key, ConfigMode::Permissive) => {
                warn!(
                    "Backend settings incomplete, using placeholder values. Remote calls will fail."
                );
                (
                    url.unwrap_or_else(|| PLACEHOLDER_BACKEND_URL.to_string()),
                    key.unwrap_or_else(|| PLACEHOLDER_ANON_KEY.to_string()),
                    true,
                )
            }
        };

        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                key: "backend.url",
                reason: format!("'{url}' is not an http(s) URL"),
            });
        }

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            anon_key,
            request_timeout_secs: raw.request_timeout_secs,
            is_placeholder,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub backend: BackendSettings,
    pub constants: AppConstants,
}

impl AppSettings {
    pub fn resolve(raw: RawSettings, mode: ConfigMode) -> Result<Self, ConfigError> {
        Ok(Self {
            backend: BackendSettings::resolve(raw.backend, mode)?,
            constants: raw.constants.into(),
        })
    }
}
