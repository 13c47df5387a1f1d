pub mod config;
pub mod error_log;
pub mod logging;
pub mod scheduler;
pub mod source;
pub mod upload;
