//! Symbol name cleanup for the native resolver.
//!
//! Mach-O symbol tables prefix C-level names with `_`, which the report
//! format does not show. Rust names are demangled without their hash suffix.
//! Swift and C++ names are left alone.

use rustc_demangle::try_demangle;

/// Human-readable form of a raw symbol name.
///
/// `from_symbol_table` strips the Mach-O leading underscore; DWARF names do not
/// carry it.
pub(crate) fn display_symbol(raw: &str, from_symbol_table: bool) -> String
{
    let name = if from_symbol_table {
        raw.strip_prefix('_').unwrap_or(raw)
    } else {
        raw
    };

    match try_demangle(name) {
        Ok(demangled) => format!("{demangled:#}"),
        Err(_) => name.to_string(),
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_rust_symbols_are_demangled()
    {
        assert_eq!(
            display_symbol("__ZN4core9panicking5panic17h0123456789abcdefE", true),
            "core::panicking::panic"
        );
        assert_eq!(display_symbol("_ZN3foo3barE", false), "foo::bar");
    }

    #[test]
    fn test_c_and_swift_symbols_keep_their_name()
    {
        assert_eq!(display_symbol("_main", true), "main");
        assert_eq!(display_symbol("main", false), "main");
        assert_eq!(display_symbol("$s5MyApp4mainyyF", false), "$s5MyApp4mainyyF");
    }
}
