pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod normalize;
pub mod pipeline;
pub mod source;
pub mod storage;
pub mod types;
