//! # Polycheck Utilities
//!
//! Shared helpers for the polycheck workspace. Currently this is the
//! logging setup used by the CLI and by hosts embedding the checker.

pub mod logging;

// Re-export commonly used logging items for convenience
pub use logging::{LogFormat, LogLevel, LoggingConfig, LoggingError, LoggingGuard, init_logging, init_logging_from_env};
pub use tracing::{debug, error, info, trace, warn};
