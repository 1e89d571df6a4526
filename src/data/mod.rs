pub mod client;
pub mod frames;
pub mod storage;
