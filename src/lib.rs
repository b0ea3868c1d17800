pub mod backup;
pub mod cli;
pub mod config;
pub mod error;
pub mod lock;
pub mod progress;
pub mod signal_handler;
pub mod types;
pub mod util;
