//! # Symbo Utilities
//!
//! Shared utilities for the Symbo workspace, chiefly the `tracing`
//! subscriber setup used by the command-line front end.

pub mod logging;

pub use logging::{init_logging, init_logging_to_file, init_logging_with_level, LogFormat, LogLevel, LoggingError};
pub use tracing::{debug, error, info, trace, warn};
