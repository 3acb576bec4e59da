mod photo_store;
mod profile_store;
mod vault_member_store;
mod vault_store;

pub use photo_store::*;
pub use profile_store::*;
pub use vault_member_store::*;
pub use vault_store::*;

use crate::backend::{BackendFailure, DataError};

/// Writes that return the affected rows are expected to touch exactly one.
pub(crate) fn expect_one<T>(rows: Vec<T>, what: &str) -> Result<T, DataError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| DataError::Backend(BackendFailure::not_found(format!("{what} not found"))))
}
