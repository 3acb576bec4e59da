use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity handed to us by the external auth provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub user_id: Uuid,
    pub access_token: String,
}
