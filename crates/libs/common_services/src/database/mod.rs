mod stores;

pub use stores::*;

pub const PROFILES: &str = "profiles";
pub const VAULTS: &str = "vaults";
pub const VAULT_MEMBERS: &str = "vault_members";
pub const PHOTOS: &str = "photos";
