//! In-process address resolver built on `object`, `gimli` and `addr2line`.
//!
//! Produces the same line shape as `atos`:
//!
//! ```text
//! main (in MyApp) (main.swift:3)
//! -[AppDelegate crash:] (in MyApp) + 24
//! ```
//!
//! Runtime addresses are turned into file addresses through the `__TEXT`
//! segment: `file = runtime - load_address + __TEXT.vmaddr`. DWARF line info
//! is tried first, then the Mach-O symbol table.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use addr2line::Context;
use gimli::{Dwarf, EndianArcSlice, RunTimeEndian, SectionId};
use object::{Object, ObjectSection, ObjectSegment, ObjectSymbol, SymbolKind};

use super::demangle::display_symbol;
use super::resolver::{AddressResolver, ResolveRequest, ResolverOutput};
use crate::dsym::macho::{self, MachSlice};
use crate::error::{SymboError, SymboResult};
use crate::types::image::parse_hex;
use crate::types::Architecture;

type OwnedReader = EndianArcSlice<RunTimeEndian>;

const PROGRAM: &str = "symbo-resolve";

const DWARF_SECTIONS: &[(&str, &[&str])] = &[
    (".debug_abbrev", &[".debug_abbrev", "__debug_abbrev"]),
    (".debug_addr", &[".debug_addr", "__debug_addr"]),
    (".debug_aranges", &[".debug_aranges", "__debug_aranges"]),
    (".debug_info", &[".debug_info", "__debug_info"]),
    (".debug_line", &[".debug_line", "__debug_line"]),
    (".debug_line_str", &[".debug_line_str", "__debug_line_str"]),
    (".debug_ranges", &[".debug_ranges", "__debug_ranges"]),
    (".debug_rnglists", &[".debug_rnglists", "__debug_rnglists"]),
    (".debug_str", &[".debug_str", "__debug_str"]),
    (".debug_str_offsets", &[".debug_str_offsets", "__debug_str_offs"]),
];

/// Debug data of one binary slice, kept between lookups.
struct LoadedSlice
{
    text_vmaddr: u64,
    /// Function symbols sorted by address
    symbols: Vec<(u64, String)>,
    /// Built once per slice; `None` without debug sections
    context: Option<Mutex<Context<OwnedReader>>>,
}

impl LoadedSlice
{
    fn parse(slice: &MachSlice<'_>, path: &Path) -> SymboResult<Self>
    {
        let file = object::File::parse(slice.data).map_err(|err| failure(path, &err))?;

        let endian = if file.is_little_endian() {
            RunTimeEndian::Little
        } else {
            RunTimeEndian::Big
        };

        let text_vmaddr = file
            .segments()
            .find(|segment| matches!(segment.name(), Ok(Some("__TEXT"))))
            .map(|segment| segment.address())
            .ok_or_else(|| failure(path, &"missing __TEXT segment"))?;

        let mut debug_sections = HashMap::new();
        for (canonical, aliases) in DWARF_SECTIONS {
            if let Some(data) = load_section_bytes(&file, aliases).map_err(|err| failure(path, &err))? {
                debug_sections.insert(*canonical, data);
            }
        }

        let mut symbols: Vec<(u64, String)> = file
            .symbols()
            .filter(|symbol| symbol.kind() == SymbolKind::Text && symbol.is_definition())
            .filter_map(|symbol| Some((symbol.address(), symbol.name().ok()?.to_string())))
            .filter(|(_, name)| !name.is_empty())
            .collect();
        symbols.sort_by_key(|(address, _)| *address);

        let context = if debug_sections.is_empty() {
            None
        } else {
            match build_context(&debug_sections, endian) {
                Ok(context) => Some(Mutex::new(context)),
                Err(err) => {
                    tracing::debug!(path = %path.display(), error = %err, "unusable DWARF, falling back to symbols");
                    None
                }
            }
        };

        Ok(Self {
            text_vmaddr,
            symbols,
            context,
        })
    }

    /// `(symbol, file, line)` from DWARF, innermost inlined frame first.
    fn lookup_dwarf(&self, file_address: u64) -> Option<(String, Option<(String, u32)>)>
    {
        let context = self.context.as_ref()?.lock().unwrap_or_else(PoisonError::into_inner);
        let mut frames = context.find_frames(file_address).skip_all_loads().ok()?;

        while let Ok(Some(frame)) = frames.next() {
            let Some(name) = frame.function.as_ref().and_then(|function| function.raw_name().ok()) else {
                continue;
            };
            let location = frame.location.and_then(|location| {
                let file = location.file?;
                let file_name = Path::new(file).file_name().map_or(Cow::Borrowed(file), |n| n.to_string_lossy());
                Some((file_name.into_owned(), location.line?))
            });
            return Some((display_symbol(&name, false), location));
        }
        None
    }

    /// `(symbol, offset)` from the symbol table.
    fn lookup_symbol(&self, file_address: u64) -> Option<(String, u64)>
    {
        let index = self.symbols.partition_point(|(address, _)| *address <= file_address);
        let (address, name) = self.symbols.get(index.checked_sub(1)?)?;
        Some((display_symbol(name, true), file_address - address))
    }
}

/// Resolves addresses by reading the dSYM directly
///
/// Parsed slices are cached per (binary, architecture), so resolving many
/// frames of one image reads the file once.
#[derive(Default)]
pub struct DwarfResolver
{
    cache: Mutex<HashMap<(PathBuf, Architecture), Arc<LoadedSlice>>>,
}

impl DwarfResolver
{
    pub fn new() -> Self
    {
        Self::default()
    }

    fn load(&self, path: &Path, architecture: Architecture) -> SymboResult<Arc<LoadedSlice>>
    {
        let key = (path.to_path_buf(), architecture);
        if let Some(loaded) = self.cache.lock().unwrap_or_else(PoisonError::into_inner).get(&key) {
            return Ok(Arc::clone(loaded));
        }

        let data = fs::read(path).map_err(|err| failure(path, &err))?;
        let slices = macho::slices(&data).map_err(|err| failure(path, &err))?;
        let slice = pick_slice(&slices, architecture)
            .ok_or_else(|| failure(path, &format!("no {architecture} slice")))?;
        let loaded = Arc::new(LoadedSlice::parse(slice, path)?);

        tracing::debug!(path = %path.display(), %architecture, symbols = loaded.symbols.len(), "loaded debug binary");
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, Arc::clone(&loaded));
        Ok(loaded)
    }
}

impl AddressResolver for DwarfResolver
{
    fn describe(&self, request: &ResolveRequest<'_>) -> String
    {
        format!(
            "{PROGRAM} -o \"{}\" -arch {} -l {} {}",
            request.binary.display(),
            request.architecture,
            request.load_address,
            request.address
        )
    }

    fn resolve(&self, request: &ResolveRequest<'_>) -> SymboResult<ResolverOutput>
    {
        let unresolved = |reason: String| ResolverOutput {
            stdout: String::new(),
            stderr: reason,
        };

        let (Some(load_address), Some(address)) = (parse_hex(request.load_address), parse_hex(request.address)) else {
            return Ok(unresolved(format!(
                "cannot parse addresses {} / {}",
                request.load_address, request.address
            )));
        };
        let Some(offset) = address.checked_sub(load_address) else {
            return Ok(unresolved(format!("{} is below the load address", request.address)));
        };

        let loaded = self.load(request.binary, request.architecture)?;
        let file_address = loaded.text_vmaddr.wrapping_add(offset);
        let binary_name = request
            .binary
            .file_name()
            .map_or_else(|| request.binary.display().to_string(), |name| name.to_string_lossy().into_owned());

        if let Some((symbol, location)) = loaded.lookup_dwarf(file_address) {
            let line = match location {
                Some((file, line)) => format!("{symbol} (in {binary_name}) ({file}:{line})\n"),
                None => format!("{symbol} (in {binary_name})\n"),
            };
            return Ok(ResolverOutput {
                stdout: line,
                stderr: String::new(),
            });
        }

        if let Some((symbol, offset)) = loaded.lookup_symbol(file_address) {
            return Ok(ResolverOutput {
                stdout: format!("{symbol} (in {binary_name}) + {offset}\n"),
                stderr: String::new(),
            });
        }

        Ok(unresolved(format!("no symbol covers {file_address:#x}")))
    }
}

impl std::fmt::Debug for DwarfResolver
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        let cached = self.cache.lock().unwrap_or_else(PoisonError::into_inner).len();
        f.debug_struct("DwarfResolver").field("cached", &cached).finish()
    }
}

/// Exact architecture first, then the same base architecture, then the only slice.
fn pick_slice<'a, 'data>(slices: &'a [MachSlice<'data>], architecture: Architecture) -> Option<&'a MachSlice<'data>>
{
    slices
        .iter()
        .find(|slice| slice.architecture == architecture)
        .or_else(|| {
            slices
                .iter()
                .find(|slice| base_architecture(slice.architecture) == base_architecture(architecture))
        })
        .or_else(|| match slices {
            [only] => Some(only),
            _ => None,
        })
}

fn base_architecture(architecture: Architecture) -> Architecture
{
    match architecture {
        Architecture::Arm64e => Architecture::Arm64,
        Architecture::X86_64h => Architecture::X86_64,
        Architecture::Armv7s => Architecture::Armv7,
        other => other,
    }
}

fn build_context(
    debug_sections: &HashMap<&'static str, Arc<[u8]>>,
    endian: RunTimeEndian,
) -> Result<Context<OwnedReader>, gimli::Error>
{
    let section_reader = |id: SectionId| {
        let data = debug_sections
            .get(id.name())
            .cloned()
            .unwrap_or_else(|| Arc::<[u8]>::from(Vec::new()));
        EndianArcSlice::new(data, endian)
    };
    let dwarf = Dwarf::load(|section| Ok::<_, gimli::Error>(section_reader(section)))?;
    Context::from_dwarf(dwarf)
}

fn load_section_bytes(file: &object::File<'_>, names: &[&str]) -> object::Result<Option<Arc<[u8]>>>
{
    for name in names {
        if let Some(section) = file.section_by_name(name) {
            let data = section.uncompressed_data()?;
            return Ok(Some(match data {
                Cow::Borrowed(bytes) => Arc::<[u8]>::from(bytes),
                Cow::Owned(vec) => vec.into(),
            }));
        }
    }
    Ok(None)
}

fn failure(path: &Path, reason: &dyn std::fmt::Display) -> SymboError
{
    SymboError::ToolFailed {
        program: PROGRAM.to_string(),
        stderr: format!("{}: {reason}", path.display()),
    }
}
