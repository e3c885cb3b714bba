//! # kinfo Utilities
//!
//! Shared logging and configuration for the kinfo workspace.
//!
//! The decoding library only emits `tracing` events; this crate owns the
//! subscriber that turns them into output, configured from the environment
//! and from command-line flags.

pub mod config;
pub mod logging;

pub use config::LogConfig;
// Re-export commonly used logging functions for convenience
pub use logging::{init_logging, LogFormat, LogLevel, LoggingError, LoggingGuard};
pub use tracing::{debug, error, info, trace, warn};
