//! Telemetry and logging infrastructure

pub mod logging;

pub use logging::{init_logging, level_filter, LogConfig, LogGuard};
