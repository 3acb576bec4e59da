mod selection;
mod service;

pub use selection::*;
pub use service::*;
