//! Binary build identifiers.

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

use crate::error::{SymboError, SymboResult};

/// Build UUID embedded in a Mach-O binary and in its dSYM.
///
/// Reports print these in several shapes: hyphenated upper case in macOS
/// reports (`6A8CB813-45F6-3652-AD33-778FD1EAB196`), plain lower case hex in
/// iOS reports (`6a8cb81345f63652ad33778fd1eab196`). All of them parse to the
/// same value, so equality and hashing ignore case and hyphenation.
///
/// ## Example
///
/// ```rust
/// use symbo_core::types::BinaryUuid;
///
/// let a = BinaryUuid::parse("6a8cb81345f63652ad33778fd1eab196")?;
/// let b = BinaryUuid::parse("6A8CB813-45F6-3652-AD33-778FD1EAB196")?;
/// assert_eq!(a, b);
/// assert_eq!(a.to_string(), "6A8CB813-45F6-3652-AD33-778FD1EAB196");
/// # Ok::<(), symbo_core::SymboError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BinaryUuid(Uuid);

impl BinaryUuid
{
    /// Parse a UUID-like string.
    ///
    /// Surrounding whitespace and angle brackets are ignored.
    ///
    /// ## Errors
    ///
    /// Returns [`SymboError::InvalidUuid`] if the string is not 32 hex digits,
    /// with or without the standard hyphens.
    pub fn parse(raw: &str) -> SymboResult<Self>
    {
        let trimmed = raw.trim().trim_start_matches('<').trim_end_matches('>');
        Uuid::try_parse(trimmed)
            .map(BinaryUuid)
            .map_err(|_| SymboError::InvalidUuid(raw.to_string()))
    }

    /// Canonical hyphenated, upper case form.
    #[must_use]
    pub fn pretty(&self) -> String
    {
        self.to_string()
    }

    /// Raw 16 bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 16]
    {
        self.0.as_bytes()
    }
}

impl From<[u8; 16]> for BinaryUuid
{
    fn from(bytes: [u8; 16]) -> Self
    {
        BinaryUuid(Uuid::from_bytes(bytes))
    }
}

impl FromStr for BinaryUuid
{
    type Err = SymboError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        Self::parse(s)
    }
}

impl fmt::Display for BinaryUuid
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{:X}", self.0.hyphenated())
    }
}

#[cfg(test)]
mod tests
{
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_parse_is_case_and_format_insensitive()
    {
        let forms = [
            "6A8CB813-45F6-3652-AD33-778FD1EAB196",
            "6a8cb813-45f6-3652-ad33-778fd1eab196",
            "6a8cb81345f63652ad33778fd1eab196",
            "<6a8cb81345f63652ad33778fd1eab196>",
            "  6A8CB81345F63652AD33778FD1EAB196 ",
        ];
        let parsed: HashSet<BinaryUuid> = forms.iter().map(|form| BinaryUuid::parse(form).unwrap()).collect();
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn test_display_is_canonical()
    {
        let uuid = BinaryUuid::parse("6a8cb81345f63652ad33778fd1eab196").unwrap();
        assert_eq!(uuid.pretty(), "6A8CB813-45F6-3652-AD33-778FD1EAB196");
    }

    #[test]
    fn test_parse_rejects_malformed()
    {
        assert!(matches!(BinaryUuid::parse(""), Err(SymboError::InvalidUuid(_))));
        assert!(BinaryUuid::parse("6a8cb813").is_err());
        assert!(BinaryUuid::parse("zzzzzzzz-45f6-3652-ad33-778fd1eab196").is_err());
    }

    #[test]
    fn test_from_bytes_round_trips()
    {
        let uuid = BinaryUuid::parse("00112233-4455-6677-8899-AABBCCDDEEFF").unwrap();
        assert_eq!(BinaryUuid::from(*uuid.as_bytes()), uuid);
    }
}
