//! CPU architecture tags.

use std::fmt;

/// CPU architecture of a crashed process or a binary slice
///
/// Crash reports name architectures in several dialects (`X86-64`, `ARM-64`,
/// `arm64e`). [`Architecture::from_tag`] folds them into one variant each, and
/// [`Architecture::resolver_arg`] gives the spelling the address resolver
/// expects after `-arch`.
///
/// ## Example
///
/// ```rust
/// use symbo_core::types::Architecture;
///
/// assert_eq!(Architecture::from_tag("ARM-64"), Architecture::Arm64);
/// assert_eq!(Architecture::Arm64.resolver_arg(), Some("arm64"));
/// assert_eq!(Architecture::from_tag("PPC").resolver_arg(), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Architecture
{
    /// 32-bit Intel
    X86,
    /// 64-bit Intel
    X86_64,
    /// 64-bit Intel, Haswell and later
    X86_64h,
    /// 64-bit ARM (Apple Silicon, iOS devices)
    Arm64,
    /// 64-bit ARM with pointer authentication
    Arm64e,
    /// ARM64 with 32-bit pointers (watchOS)
    Arm64_32,
    /// 32-bit ARMv7
    Armv7,
    /// 32-bit ARMv7s
    Armv7s,
    /// Anything the resolver has no `-arch` spelling for
    Unknown,
}

impl Architecture
{
    /// Fold an architecture tag as printed by crash reports or `dwarfdump`.
    ///
    /// Matching is case-insensitive and treats `-` and `_` alike.
    #[must_use]
    pub fn from_tag(tag: &str) -> Self
    {
        let normalized = tag.trim().to_lowercase().replace('-', "_");
        match normalized.as_str() {
            "x86" | "i386" | "i686" => Architecture::X86,
            "x86_64" | "amd64" => Architecture::X86_64,
            "x86_64h" => Architecture::X86_64h,
            "arm64" | "arm_64" | "aarch64" => Architecture::Arm64,
            "arm64e" => Architecture::Arm64e,
            "arm64_32" => Architecture::Arm64_32,
            "armv7" | "arm" => Architecture::Armv7,
            "armv7s" => Architecture::Armv7s,
            _ => Architecture::Unknown,
        }
    }

    /// Argument passed to the address resolver's `-arch` flag.
    ///
    /// `None` for [`Architecture::Unknown`].
    #[must_use]
    pub const fn resolver_arg(self) -> Option<&'static str>
    {
        match self {
            Architecture::X86 => Some("i386"),
            Architecture::X86_64 => Some("x86_64"),
            Architecture::X86_64h => Some("x86_64h"),
            Architecture::Arm64 => Some("arm64"),
            Architecture::Arm64e => Some("arm64e"),
            Architecture::Arm64_32 => Some("arm64_32"),
            Architecture::Armv7 => Some("armv7"),
            Architecture::Armv7s => Some("armv7s"),
            Architecture::Unknown => None,
        }
    }

    /// Returns `true` for any variant other than [`Architecture::Unknown`].
    #[must_use]
    pub const fn is_known(self) -> bool
    {
        !matches!(self, Architecture::Unknown)
    }

    /// Map an `object` architecture onto ours.
    ///
    /// `object` does not distinguish the arm64e/x86_64h subtypes, so those come
    /// back as their base variant.
    pub(crate) fn from_object(arch: object::Architecture) -> Self
    {
        match arch {
            object::Architecture::I386 => Architecture::X86,
            object::Architecture::X86_64 => Architecture::X86_64,
            object::Architecture::Aarch64 => Architecture::Arm64,
            object::Architecture::Aarch64_Ilp32 => Architecture::Arm64_32,
            object::Architecture::Arm => Architecture::Armv7,
            _ => Architecture::Unknown,
        }
    }
}

impl fmt::Display for Architecture
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(self.resolver_arg().unwrap_or("unknown"))
    }
}
