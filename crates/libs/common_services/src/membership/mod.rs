mod one_or_many;
mod resolver;

pub use one_or_many::*;
pub use resolver::*;
