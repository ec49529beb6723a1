//! Observability for the walker CLI.
//!
//! - Structured logging configuration
//! - A walk observer that reports progress through `tracing`

mod logging;
mod progress;

pub use logging::{init_logging, parse_log_level, LoggingConfig};
pub use progress::LoggingObserver;
