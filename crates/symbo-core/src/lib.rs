//! # symbo-core
//!
//! Crash report symbolication for Apple platforms.
//!
//! This crate provides the whole pipeline behind the `symbo` binary:
//! - Parsing crash reports into processes, binary images and stack frames
//! - Loading dSYM bundles and picking the right binary slice
//! - Searching the disk for missing dSYMs (Spotlight, report folder, Xcode archives)
//! - Resolving frames with `atos` or the built-in DWARF resolver
//! - Rewriting the report text with the resolved symbols
//!
//! ## Pipeline
//!
//! ```text
//! report text ─► ReportFile ─► UUIDs needed ─► DsymSearch ─► DsymFile[]
//!                    │                                          │
//!                    └──────────────► Symbolicator ◄────────────┘
//!                                          │
//!                                          ▼
//!                            symbolicated text + LogSink + success flag
//! ```
//!
//! Only the report input errors (unreadable, empty, untranslatable) are
//! returned as [`SymboError`]. Everything after that is recovered and reported
//! through the [`LogSink`] and the success flags.

pub mod config;
pub mod dsym;
pub mod error;
pub mod log;
pub mod prelude;
pub mod report;
pub mod search;
pub mod session;
pub mod symbolicate;
pub mod tool;
pub mod types;

pub use config::SymboConfig;
pub use dsym::DsymFile;
// Re-export commonly used types
pub use error::{SymboError, SymboResult};
pub use log::LogSink;
pub use report::ReportFile;
pub use search::{DsymSearch, SearchOutcome, SearchResult};
pub use session::SymbolicationSession;
pub use symbolicate::Symbolicator;
pub use types::{Architecture, BinaryImage, BinaryUuid, ReportProcess, StackFrame};
