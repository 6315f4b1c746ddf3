//! # Error Types
//!
//! General error handling for Symbo.
//!
//! Only the report input errors (`ReadReport`, `EmptyReport`, `Translation`)
//! ever stop a report from being processed. Everything else is recovered where
//! it happens and surfaced through the [`LogSink`](crate::LogSink) and the
//! aggregate success flags.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for Symbo operations
///
/// ## Error Categories
///
/// 1. **Input errors**: ReadReport, EmptyReport, Translation
/// 2. **Model errors**: InvalidUuid, InvalidFrame
/// 3. **Bundle errors**: BundleLoad
/// 4. **Tool errors**: ToolLaunch, ToolFailed
/// 5. **Search errors**: SearchStrategy
/// 6. **Configuration errors**: InvalidConfig
/// 7. **I/O errors**: Io
#[derive(Error, Debug)]
pub enum SymboError
{
    /// The report file could not be read
    #[error("Failed to read report {}: {source}", path.display())]
    ReadReport
    {
        /// Path that was being read
        path: PathBuf,
        /// Underlying I/O failure
        source: std::io::Error,
    },

    /// The report has no content besides whitespace
    #[error("Report is empty")]
    EmptyReport,

    /// The structured report format could not be translated to text
    #[error("Failed to translate report: {0}")]
    Translation(String),

    /// A string could not be parsed as a binary UUID
    #[error("Invalid UUID: {0}")]
    InvalidUuid(String),

    /// A stack frame could not be constructed
    #[error("Invalid stack frame: {0}")]
    InvalidFrame(String),

    /// A dSYM bundle could not be loaded
    ///
    /// Raised when the UUID dump tool only wrote to stderr, or the bundle
    /// contents could not be read at all.
    #[error("Failed to load dSYM at {}: {reason}", path.display())]
    BundleLoad
    {
        /// Bundle root
        path: PathBuf,
        /// Tool output or read failure
        reason: String,
    },

    /// An external program could not be started
    #[error("Failed to launch {program}: {source}")]
    ToolLaunch
    {
        /// Program that was being spawned
        program: String,
        /// Spawn failure
        source: std::io::Error,
    },

    /// An external program ran but reported a failure
    #[error("{program} failed: {stderr}")]
    ToolFailed
    {
        /// Program that failed
        program: String,
        /// Captured stderr
        stderr: String,
    },

    /// A dSYM search strategy failed
    ///
    /// Never fatal to the whole search; sibling strategies keep running.
    #[error("{strategy} search failed: {reason}")]
    SearchStrategy
    {
        /// Strategy name
        strategy: &'static str,
        /// Failure details
        reason: String,
    },

    /// A configuration value could not be used
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for `Result<T, SymboError>`
///
/// ```rust
/// use symbo_core::error::SymboResult;
/// fn foo() -> SymboResult<()>
/// {
///     Ok(())
/// }
/// ```
pub type SymboResult<T> = std::result::Result<T, SymboError>;
