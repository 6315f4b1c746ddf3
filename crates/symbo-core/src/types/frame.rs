//! Stack frame types.

use std::sync::Arc;

use once_cell::sync::OnceCell;

use super::BinaryImage;

/// One stack frame line of a crash report
///
/// A frame always points at a [`BinaryImage`] of its process; the image is
/// shared between all frames of that binary. The resolved symbol starts empty
/// and can be set exactly once, by the symbolication engine.
#[derive(Debug, Clone)]
pub struct StackFrame
{
    original_line: String,
    cryptic_address: String,
    byte_offset: String,
    binary_image: Arc<BinaryImage>,
    resolved_symbol: OnceCell<String>,
}

impl StackFrame
{
    /// Build a frame from its already-split components.
    pub fn new(
        original_line: impl Into<String>,
        cryptic_address: impl Into<String>,
        byte_offset: impl Into<String>,
        binary_image: Arc<BinaryImage>,
    ) -> Self
    {
        Self {
            original_line: original_line.into(),
            cryptic_address: cryptic_address.into(),
            byte_offset: byte_offset.into(),
            binary_image,
            resolved_symbol: OnceCell::new(),
        }
    }

    /// The report line, verbatim.
    pub fn original_line(&self) -> &str
    {
        &self.original_line
    }

    /// Absolute runtime address (`0x000000010000a1b2`).
    pub fn cryptic_address(&self) -> &str
    {
        &self.cryptic_address
    }

    /// Offset token after the `+`.
    pub fn byte_offset(&self) -> &str
    {
        &self.byte_offset
    }

    /// Image this frame executes in.
    pub fn binary_image(&self) -> &BinaryImage
    {
        &self.binary_image
    }

    /// Shared handle to the image.
    pub fn binary_image_arc(&self) -> &Arc<BinaryImage>
    {
        &self.binary_image
    }

    /// Symbol text produced by the resolver, if any.
    pub fn resolved_symbol(&self) -> Option<&str>
    {
        self.resolved_symbol.get().map(String::as_str)
    }

    /// Store the resolver output.
    ///
    /// Returns `false` (and keeps the old value) if the frame was already resolved.
    pub fn set_resolved_symbol(&self, symbol: impl Into<String>) -> bool
    {
        self.resolved_symbol.set(symbol.into()).is_ok()
    }

    /// Returns `true` once a symbol has been stored.
    pub fn is_resolved(&self) -> bool
    {
        self.resolved_symbol.get().is_some()
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::types::BinaryUuid;

    #[test]
    fn test_resolved_symbol_is_set_once()
    {
        let image = Arc::new(BinaryImage::new(
            "MyApp",
            "0x1000",
            BinaryUuid::parse("6a8cb81345f63652ad33778fd1eab196").unwrap(),
        ));
        let frame = StackFrame::new("0 MyApp 0x1010 0x1000 + 16", "0x1010", "16", image);

        assert!(!frame.is_resolved());
        assert!(frame.set_resolved_symbol("main (in MyApp) (main.swift:3)"));
        assert!(!frame.set_resolved_symbol("other"));
        assert_eq!(frame.resolved_symbol(), Some("main (in MyApp) (main.swift:3)"));
    }
}
