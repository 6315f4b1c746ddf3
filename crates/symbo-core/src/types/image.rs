//! Binary images loaded in a crashed process.

use std::hash::{Hash, Hasher};

use super::BinaryUuid;

/// One binary mapped into the crashed process
///
/// `load_address` is kept exactly as the report printed it: it is handed
/// verbatim to the address resolver and it is the join key between stack
/// frames and dSYM bundles.
///
/// Identity is the `(name, load_address, uuid)` triple; `path` is extra
/// context and does not take part in equality.
#[derive(Debug, Clone)]
pub struct BinaryImage
{
    /// File name of the binary (`MyApp`, `libswiftCore.dylib`)
    pub name: String,
    /// Runtime base address as printed (`0x100000000`)
    pub load_address: String,
    /// Build UUID
    pub uuid: BinaryUuid,
    /// Full on-device path, when the report lists one
    pub path: Option<String>,
}

impl BinaryImage
{
    /// Build an image with no on-device path.
    pub fn new(name: impl Into<String>, load_address: impl Into<String>, uuid: BinaryUuid) -> Self
    {
        Self {
            name: name.into(),
            load_address: load_address.into(),
            uuid,
            path: None,
        }
    }

    /// Numeric value of the load address.
    ///
    /// `None` if the report printed something that is not hex.
    #[must_use]
    pub fn load_address_value(&self) -> Option<u64>
    {
        parse_hex(&self.load_address)
    }
}

impl PartialEq for BinaryImage
{
    fn eq(&self, other: &Self) -> bool
    {
        self.name == other.name && self.load_address == other.load_address && self.uuid == other.uuid
    }
}

impl Eq for BinaryImage {}

impl Hash for BinaryImage
{
    fn hash<H: Hasher>(&self, state: &mut H)
    {
        self.name.hash(state);
        self.load_address.hash(state);
        self.uuid.hash(state);
    }
}

/// Parse `0x`-prefixed (or bare) hex.
pub(crate) fn parse_hex(text: &str) -> Option<u64>
{
    let trimmed = text.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    u64::from_str_radix(digits, 16).ok()
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn uuid() -> BinaryUuid
    {
        BinaryUuid::parse("6A8CB813-45F6-3652-AD33-778FD1EAB196").unwrap()
    }

    #[test]
    fn test_identity_ignores_path()
    {
        let mut a = BinaryImage::new("MyApp", "0x100000000", uuid());
        let b = BinaryImage::new("MyApp", "0x100000000", uuid());
        a.path = Some("/Applications/MyApp.app/Contents/MacOS/MyApp".to_string());
        assert_eq!(a, b);

        let c = BinaryImage::new("MyApp", "0x200000000", uuid());
        assert_ne!(a, c);
    }

    #[test]
    fn test_load_address_value()
    {
        assert_eq!(BinaryImage::new("A", "0x1000", uuid()).load_address_value(), Some(0x1000));
        assert_eq!(BinaryImage::new("A", "0X00001000", uuid()).load_address_value(), Some(0x1000));
        assert_eq!(BinaryImage::new("A", "nope", uuid()).load_address_value(), None);
    }
}
