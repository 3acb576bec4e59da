mod photo;
mod profile;
mod vault;
mod vault_member;

pub use photo::*;
pub use profile::*;
pub use vault::*;
pub use vault_member::*;
