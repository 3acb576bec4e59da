mod client;
mod connector;
mod error;
mod health;
mod query;
mod storage;
mod transport;

pub use client::*;
pub use connector::*;
pub use error::*;
pub use health::*;
pub use query::*;
pub use storage::*;
pub use transport::*;
