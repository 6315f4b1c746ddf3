//! # Symbolication
//!
//! [`Symbolicator`] matches a report's binary images to loaded dSYMs, resolves
//! every frame it can, and rewrites the report text.
//!
//! ## Failure Semantics
//!
//! Processes are handled independently. A process fails when:
//!
//! - its architecture is unknown
//! - it has frames but no binary images (usually a crash during launch)
//! - a matched dSYM has no binary for a frame's image
//! - the resolver prints nothing for a frame
//!
//! Images without a dSYM are logged but are not failures. The overall result is
//! `true` only if no process failed; the rewritten text is produced either way.

pub(crate) mod demangle;
pub mod dwarf;
pub mod resolver;
pub mod rewrite;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

pub use dwarf::DwarfResolver;
pub use resolver::{AddressResolver, AtosResolver, ResolveRequest, ResolverOutput};

use crate::config::SymboConfig;
use crate::dsym::DsymFile;
use crate::log::LogSink;
use crate::report::ReportFile;
use crate::types::{Architecture, BinaryUuid, ReportProcess, StackFrame};

/// Drives an [`AddressResolver`] over a report
#[derive(Clone)]
pub struct Symbolicator
{
    resolver: Arc<dyn AddressResolver>,
}

impl Symbolicator
{
    pub fn new(resolver: Arc<dyn AddressResolver>) -> Self
    {
        Self { resolver }
    }

    /// `atos`, or the in-process resolver when `config.native_tools` is set.
    pub fn from_config(config: &SymboConfig) -> Self
    {
        if config.native_tools {
            Self::new(Arc::new(DwarfResolver::new()))
        } else {
            Self::new(Arc::new(AtosResolver::new(config.resolver_tool.clone())))
        }
    }

    /// Symbolicate every process of `report` with `bundles`.
    ///
    /// Frames resolved by an earlier run are left as they are. Sets
    /// `report.symbolicated_content` and returns `true` if no process failed.
    pub fn symbolicate(&self, report: &mut ReportFile, bundles: &[DsymFile], logs: &LogSink) -> bool
    {
        let mut success = true;
        for process in &report.processes {
            if !self.symbolicate_process(process, bundles, logs) {
                success = false;
            }
        }

        report.symbolicated_content = Some(rewrite::rewrite_content(report.content(), &report.processes));
        tracing::info!(success, processes = report.processes.len(), "symbolication finished");
        success
    }

    /// Symbolicate one process. Returns `false` if it failed.
    pub fn symbolicate_process(&self, process: &ReportProcess, bundles: &[DsymFile], logs: &LogSink) -> bool
    {
        let name = process.display_name();
        logs.add(format!("* Symbolicating process {name}"));

        let Some(architecture) = process.architecture.filter(|arch| arch.is_known()) else {
            logs.add("Could not detect process architecture.");
            return false;
        };

        if !process.stack_frames.is_empty() && process.binary_images.is_empty() {
            logs.add(format!(
                "Could not detect application binary images for reported process {name}. \
                 Application might have crashed during launch."
            ));
            return false;
        }

        if process.stack_frames.is_empty() {
            logs.add(format!("Did not find anything to symbolicate for process {name}."));
            return true;
        }

        let by_load_address = Self::bundles_by_load_address(process, bundles);
        for image in &process.binary_images {
            if !by_load_address.contains_key(image.load_address.as_str()) {
                logs.add(format!("Missing dSYM for binary: {}, {}", image.name, image.uuid.pretty()));
            }
        }

        if by_load_address.is_empty() {
            logs.add(format!("No matching dSYMs found for symbolicating {name}"));
            return true;
        }

        let mut success = true;
        for frame in &process.stack_frames {
            if frame.is_resolved() {
                continue;
            }
            let image = frame.binary_image();
            let Some(bundle) = by_load_address.get(image.load_address.as_str()) else {
                continue;
            };

            let Some(binary) = bundle.select_binary(&image.name, Some(&image.uuid), Some(architecture)) else {
                logs.add(format!("No matching DWARF binary found for process: {}", image.name));
                success = false;
                continue;
            };

            if !self.symbolicate_frame(frame, binary, architecture, logs) {
                success = false;
            }
        }

        tracing::debug!(process = name, success, "process symbolicated");
        success
    }

    /// `load address → bundle` for the images of `process`.
    ///
    /// When several bundles carry the same UUID the last one wins.
    fn bundles_by_load_address<'p, 'a>(
        process: &'p ReportProcess,
        bundles: &'a [DsymFile],
    ) -> HashMap<&'p str, &'a DsymFile>
    {
        let mut by_uuid: HashMap<BinaryUuid, &'a DsymFile> = HashMap::new();
        for bundle in bundles {
            for uuid in bundle.uuids().keys() {
                by_uuid.insert(*uuid, bundle);
            }
        }

        process
            .binary_images
            .iter()
            .filter_map(|image| Some((image.load_address.as_str(), *by_uuid.get(&image.uuid)?)))
            .collect()
    }

    fn symbolicate_frame(
        &self,
        frame: &StackFrame,
        binary: &Path,
        architecture: Architecture,
        logs: &LogSink,
    ) -> bool
    {
        let request = ResolveRequest {
            binary,
            architecture,
            load_address: &frame.binary_image().load_address,
            address: frame.cryptic_address(),
        };
        logs.add(format!("Running command: {}", self.resolver.describe(&request)));

        let output = match self.resolver.resolve(&request) {
            Ok(output) => output,
            Err(err) => {
                tracing::warn!(error = %err, address = frame.cryptic_address(), "resolver failed to run");
                ResolverOutput {
                    stdout: String::new(),
                    stderr: err.to_string(),
                }
            }
        };

        logs.add_all([
            format!("STDOUT:\n{}", output.stdout.trim()),
            format!("STDERR:\n{}", output.stderr.trim()),
        ]);

        match output.symbol() {
            Some(symbol) => {
                frame.set_resolved_symbol(symbol);
                true
            }
            None => {
                logs.add(format!("Symbolication failed for address: {}", frame.cryptic_address()));
                false
            }
        }
    }
}

impl std::fmt::Debug for Symbolicator
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("Symbolicator").finish_non_exhaustive()
    }
}
