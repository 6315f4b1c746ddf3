//! # Configuration
//!
//! Tool command lines, search roots and limits.
//!
//! [`SymboConfig::default`] gives the stock macOS setup. [`SymboConfig::from_env`]
//! applies `SYMBO_*` overrides on top, and the command-line front end applies
//! its flags on top of that.
//!
//! ## Environment Variables
//!
//! - `SYMBO_DWARFDUMP`: UUID dump command (default: `dwarfdump --uuid`)
//! - `SYMBO_ATOS`: address resolver command (default: `xcrun atos`)
//! - `SYMBO_MDFIND`: content index query command (default: `mdfind`)
//! - `SYMBO_TRANSLATOR`: command converting `.ips` reports to text (default: none)
//! - `SYMBO_ARCHIVES_DIR`: root of the recursive search (default: `~/Library/Developer/Xcode/Archives`)
//! - `SYMBO_SEARCH_TIMEOUT_SECS`: global dSYM search timeout (default: `300`)
//! - `SYMBO_NATIVE_TOOLS`: use the built-in UUID reader and resolver instead of
//!   `dwarfdump`/`atos` (default: on everywhere except macOS)

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{SymboError, SymboResult};
use crate::tool::CommandLine;

/// Default global timeout for the dSYM search.
pub const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(300);

/// Everything the pipeline needs to know about its environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymboConfig
{
    /// Command printing `UUID: <uuid> (<arch>) <binary>` lines for a bundle
    pub uuid_tool: CommandLine,
    /// Command resolving one address (`atos` compatible flags)
    pub resolver_tool: CommandLine,
    /// Command querying the content index (`mdfind` compatible)
    pub index_tool: CommandLine,
    /// Command translating the structured report format to text
    pub translator: Option<CommandLine>,
    /// Root of the recursive bundle search
    pub archives_dir: Option<PathBuf>,
    /// Global ceiling on the bundle search
    pub search_timeout: Duration,
    /// Use the in-process UUID reader and resolver
    pub native_tools: bool,
}

impl Default for SymboConfig
{
    fn default() -> Self
    {
        Self {
            uuid_tool: CommandLine::new("dwarfdump", ["--uuid"]),
            resolver_tool: CommandLine::new("xcrun", ["atos"]),
            index_tool: CommandLine::new("mdfind", Vec::<String>::new()),
            translator: None,
            archives_dir: default_archives_dir(),
            search_timeout: DEFAULT_SEARCH_TIMEOUT,
            native_tools: !cfg!(target_os = "macos"),
        }
    }
}

impl SymboConfig
{
    /// Defaults with `SYMBO_*` environment overrides applied.
    ///
    /// ## Errors
    ///
    /// Returns [`SymboError::InvalidConfig`] if a variable is set to something unusable.
    pub fn from_env() -> SymboResult<Self>
    {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`SymboConfig::from_env`] with an arbitrary variable source.
    ///
    /// ## Errors
    ///
    /// Returns [`SymboError::InvalidConfig`] if a variable is set to something unusable.
    pub fn from_lookup<F>(lookup: F) -> SymboResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("SYMBO_DWARFDUMP") {
            config.uuid_tool = CommandLine::parse(&value)?;
        }
        if let Some(value) = lookup("SYMBO_ATOS") {
            config.resolver_tool = CommandLine::parse(&value)?;
        }
        if let Some(value) = lookup("SYMBO_MDFIND") {
            config.index_tool = CommandLine::parse(&value)?;
        }
        if let Some(value) = lookup("SYMBO_TRANSLATOR") {
            config.translator = Some(CommandLine::parse(&value)?);
        }
        if let Some(value) = lookup("SYMBO_ARCHIVES_DIR") {
            config.archives_dir = Some(PathBuf::from(value));
        }
        if let Some(value) = lookup("SYMBO_SEARCH_TIMEOUT_SECS") {
            let seconds = value.trim().parse::<u64>().map_err(|err| {
                SymboError::InvalidConfig(format!("SYMBO_SEARCH_TIMEOUT_SECS={value}: {err}"))
            })?;
            config.search_timeout = Duration::from_secs(seconds);
        }
        if let Some(value) = lookup("SYMBO_NATIVE_TOOLS") {
            config.native_tools = parse_flag(&value)
                .ok_or_else(|| SymboError::InvalidConfig(format!("SYMBO_NATIVE_TOOLS={value}: expected a boolean")))?;
        }

        Ok(config)
    }
}

fn default_archives_dir() -> Option<PathBuf>
{
    env::var_os("HOME").map(|home| PathBuf::from(home).join("Library/Developer/Xcode/Archives"))
}

fn parse_flag(value: &str) -> Option<bool>
{
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
