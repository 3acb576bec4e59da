use serde::{Deserialize, Serialize};

/// Approximate storage usage, in megabytes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct StorageEstimate {
    pub used_mb: f64,
    pub total_mb: f64,
    /// Clamped to 100.
    pub used_percentage: f64,
    /// Negative when over quota.
    pub available_mb: f64,
}

impl StorageEstimate {
    #[must_use]
    pub fn is_over_quota(&self) -> bool {
        self.available_mb < 0.0
    }
}
