//! Address resolvers.
//!
//! A resolver turns one runtime address into a symbol line given the debug
//! binary, the architecture and the image load address. Its stdout is the
//! symbol; blank stdout means the address could not be resolved.

use std::path::Path;

use crate::error::SymboResult;
use crate::tool::CommandLine;
use crate::types::Architecture;

/// One resolver invocation.
#[derive(Debug, Clone, Copy)]
pub struct ResolveRequest<'a>
{
    /// Debug binary inside the dSYM
    pub binary: &'a Path,
    /// Architecture of the crashed process
    pub architecture: Architecture,
    /// Load address of the image, as printed in the report
    pub load_address: &'a str,
    /// Runtime address to resolve, as printed in the report
    pub address: &'a str,
}

/// What a resolver printed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolverOutput
{
    pub stdout: String,
    pub stderr: String,
}

impl ResolverOutput
{
    /// Trimmed stdout, `None` if blank.
    pub fn symbol(&self) -> Option<&str>
    {
        let trimmed = self.stdout.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

/// Maps (binary, architecture, load address, address) to a symbol line
pub trait AddressResolver: Send + Sync
{
    /// Command-line rendering of `request` for the diagnostic log.
    fn describe(&self, request: &ResolveRequest<'_>) -> String;

    /// Resolve one address.
    ///
    /// ## Errors
    ///
    /// Returns an error only if the resolver could not run. An address that
    /// cannot be resolved gives blank stdout instead.
    fn resolve(&self, request: &ResolveRequest<'_>) -> SymboResult<ResolverOutput>;
}

/// `atos` (or a compatible command)
///
/// Invoked as `<command> -o <binary> -arch <arch> -l <load address> <address>`.
#[derive(Debug, Clone)]
pub struct AtosResolver
{
    command: CommandLine,
}

impl AtosResolver
{
    pub fn new(command: CommandLine) -> Self
    {
        Self { command }
    }

    fn arguments(request: &ResolveRequest<'_>) -> Vec<String>
    {
        vec![
            "-o".to_string(),
            request.binary.to_string_lossy().into_owned(),
            "-arch".to_string(),
            request.architecture.to_string(),
            "-l".to_string(),
            request.load_address.to_string(),
            request.address.to_string(),
        ]
    }
}

impl AddressResolver for AtosResolver
{
    fn describe(&self, request: &ResolveRequest<'_>) -> String
    {
        self.command.describe(&Self::arguments(request))
    }

    fn resolve(&self, request: &ResolveRequest<'_>) -> SymboResult<ResolverOutput>
    {
        let output = self.command.run(&Self::arguments(request))?;
        Ok(ResolverOutput {
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}
