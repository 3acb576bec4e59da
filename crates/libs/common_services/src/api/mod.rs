pub mod storage;
pub mod upload;
pub mod vault;
