//! UUID dumps of dSYM bundles.
//!
//! A dump is text in the shape printed by `dwarfdump --uuid`, one line per
//! binary slice:
//!
//! ```text
//! UUID: 6A8CB813-45F6-3652-AD33-778FD1EAB196 (arm64) /tmp/MyApp.app.dSYM/Contents/Resources/DWARF/MyApp
//! ```
//!
//! Lines that do not have this shape are ignored.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use super::macho;
use crate::error::{SymboError, SymboResult};
use crate::tool::CommandLine;
use crate::types::{Architecture, BinaryUuid};

static UUID_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^UUID: (.*?) \((.*?)\) (.*?)\s*$").expect("valid regex"));

/// Produces the UUID dump of a bundle or binary
pub trait UuidDumper: Send + Sync
{
    /// Dump the UUIDs of every slice under `path`.
    ///
    /// Empty output (with no error) means the bundle holds no usable slices.
    ///
    /// ## Errors
    ///
    /// Returns [`SymboError::BundleLoad`] if `path` cannot be inspected at all.
    fn dump(&self, path: &Path) -> SymboResult<String>;
}

/// One parsed dump line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpedSlice
{
    pub uuid: BinaryUuid,
    pub architecture: Architecture,
    pub binary: String,
}

/// Parse every well-formed line of a dump.
pub fn parse_uuid_dump(text: &str) -> Vec<DumpedSlice>
{
    UUID_LINE
        .captures_iter(text)
        .filter_map(|captures| {
            let uuid = BinaryUuid::parse(captures.get(1)?.as_str()).ok()?;
            Some(DumpedSlice {
                uuid,
                architecture: Architecture::from_tag(captures.get(2)?.as_str()),
                binary: captures.get(3)?.as_str().to_string(),
            })
        })
        .collect()
}

/// `dwarfdump --uuid` (or a compatible command)
#[derive(Debug, Clone)]
pub struct DwarfdumpTool
{
    command: CommandLine,
}

impl DwarfdumpTool
{
    pub fn new(command: CommandLine) -> Self
    {
        Self { command }
    }
}

impl UuidDumper for DwarfdumpTool
{
    fn dump(&self, path: &Path) -> SymboResult<String>
    {
        let output = self.command.run(&[path.to_string_lossy()]).map_err(|err| SymboError::BundleLoad {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;

        if output.stdout_trimmed().is_empty() && !output.stderr_trimmed().is_empty() {
            return Err(SymboError::BundleLoad {
                path: path.to_path_buf(),
                reason: output.stderr_trimmed().to_string(),
            });
        }

        Ok(output.stdout)
    }
}

/// Reads `LC_UUID` load commands directly with `object`
///
/// Looks at every file in the bundle's `Contents/Resources/DWARF` directory,
/// or at `path` itself when it is a plain file. Files that are not Mach-O are
/// skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectUuidReader;

impl UuidDumper for ObjectUuidReader
{
    fn dump(&self, path: &Path) -> SymboResult<String>
    {
        let load_error = |reason: String| SymboError::BundleLoad {
            path: path.to_path_buf(),
            reason,
        };

        let dwarf_dir = super::dwarf_dir(path);
        let candidates: Vec<PathBuf> = if dwarf_dir.is_dir() {
            super::list_binaries(&dwarf_dir).map_err(|err| load_error(err.to_string()))?
        } else if path.is_file() {
            vec![path.to_path_buf()]
        } else {
            return Err(load_error("not a dSYM bundle or Mach-O file".to_string()));
        };

        let mut text = String::new();
        for candidate in candidates {
            let data = fs::read(&candidate).map_err(|err| load_error(err.to_string()))?;
            match macho::slices(&data) {
                Ok(slices) => {
                    for slice in slices {
                        if let Some(uuid) = slice.uuid {
                            let _ = writeln!(text, "UUID: {uuid} ({}) {}", slice.architecture, candidate.display());
                        }
                    }
                }
                Err(err) => {
                    tracing::debug!(path = %candidate.display(), error = %err, "skipping unreadable binary");
                }
            }
        }

        Ok(text)
    }
}
