//! # Types
//!
//! Value types shared by the parser, the dSYM model and the symbolication
//! engine: build identifiers, architectures, binary images, stack frames and
//! processes.

pub mod architecture;
pub mod frame;
pub mod identifier;
pub mod image;
pub mod process;

// Re-export all public types
pub use architecture::Architecture;
pub use frame::StackFrame;
pub use identifier::BinaryUuid;
pub use image::BinaryImage;
pub use process::ReportProcess;
