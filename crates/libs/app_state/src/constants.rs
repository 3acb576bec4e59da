use crate::{HealthConstants, RawConstants, RetryConstants, StorageConstants, UploadConstants};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct AppConstants {
    pub retry: RetryConstants,
    pub health: HealthConstants,
    pub upload: UploadConstants,
    pub storage: StorageConstants,
}

impl From<RawConstants> for AppConstants {
    fn from(raw: RawConstants) -> Self {
        Self {
            retry: raw.retry,
            health: raw.health,
            upload: raw.upload,
            storage: raw.storage,
        }
    }
}

impl RetryConstants {
    #[must_use]
    pub const fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

impl HealthConstants {
    #[must_use]
    pub const fn probe_delay(&self) -> Duration {
        Duration::from_millis(self.probe_delay_ms)
    }
}
