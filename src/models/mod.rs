pub mod candle;
pub mod config;
pub mod snapshot;
