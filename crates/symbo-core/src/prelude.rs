//! Common module for library exports

pub use crate::config::SymboConfig;
pub use crate::dsym::{DsymFile, DwarfdumpTool, ObjectUuidReader, UuidDumper};
pub use crate::error::{SymboError, SymboResult};
pub use crate::log::LogSink;
pub use crate::report::{CommandTranslator, NoTranslator, ReportFile, TranslateSource, Translator};
pub use crate::search::{DsymSearch, SearchOutcome, SearchResult, SearchStrategy};
pub use crate::session::SymbolicationSession;
pub use crate::symbolicate::{AddressResolver, AtosResolver, DwarfResolver, ResolveRequest, ResolverOutput, Symbolicator};
pub use crate::types::{Architecture, BinaryImage, BinaryUuid, ReportProcess, StackFrame};
