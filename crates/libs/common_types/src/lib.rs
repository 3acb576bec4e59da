#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::struct_excessive_bools
)]
mod database;
mod session;
mod storage;
mod upload;
mod vault_view;

pub use database::*;
pub use session::*;
pub use storage::*;
pub use upload::*;
pub use vault_view::*;
