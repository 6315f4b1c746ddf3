//! File system walks for dSYM bundles.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use walkdir::WalkDir;

use super::{SearchResult, SearchStrategy};
use crate::dsym::{has_dsym_extension, DsymFile, UuidDumper};
use crate::error::SymboResult;
use crate::log::LogSink;
use crate::types::BinaryUuid;

/// Bundles directly inside the report's directory
pub struct NonRecursiveSearch
{
    dumper: Arc<dyn UuidDumper>,
}

impl NonRecursiveSearch
{
    pub fn new(dumper: Arc<dyn UuidDumper>) -> Self
    {
        Self { dumper }
    }
}

impl SearchStrategy for NonRecursiveSearch
{
    fn name(&self) -> &'static str
    {
        "non-recursive"
    }

    fn search(
        &self,
        wanted: &BTreeSet<BinaryUuid>,
        hint_dir: Option<&Path>,
        logs: &LogSink,
    ) -> SymboResult<Vec<SearchResult>>
    {
        let Some(directory) = hint_dir else {
            logs.add("Non-recursive file search skipped: the report has no directory.");
            return Ok(Vec::new());
        };
        logs.add(format!("Non-recursive file search starting at {}", directory.display()));

        let mut bundles: Vec<PathBuf> = match fs::read_dir(directory) {
            Ok(entries) => entries
                .filter_map(Result::ok)
                .map(|entry| entry.path())
                .filter(|path| has_dsym_extension(path))
                .collect(),
            Err(err) => {
                logs.add(format!("Could not list {}: {err}", directory.display()));
                Vec::new()
            }
        };
        bundles.sort();

        let results = matching(&bundles, wanted, self.dumper.as_ref());
        logs.add(format!("Non-recursive search completed. Found {} results.", results.len()));
        Ok(results)
    }
}

/// Bundles anywhere below a root directory
///
/// Bundles are not descended into, so a dSYM nested inside another dSYM is
/// not reported twice.
pub struct RecursiveSearch
{
    root: Option<PathBuf>,
    dumper: Arc<dyn UuidDumper>,
}

impl RecursiveSearch
{
    pub fn new(root: Option<PathBuf>, dumper: Arc<dyn UuidDumper>) -> Self
    {
        Self { root, dumper }
    }
}

impl SearchStrategy for RecursiveSearch
{
    fn name(&self) -> &'static str
    {
        "recursive"
    }

    fn search(
        &self,
        wanted: &BTreeSet<BinaryUuid>,
        _hint_dir: Option<&Path>,
        logs: &LogSink,
    ) -> SymboResult<Vec<SearchResult>>
    {
        let Some(root) = self.root.as_deref() else {
            logs.add("Recursive file search skipped: no archives directory configured.");
            return Ok(Vec::new());
        };
        if !root.is_dir() {
            logs.add(format!("Recursive file search skipped: {} does not exist.", root.display()));
            return Ok(Vec::new());
        }
        logs.add(format!("Recursive file search starting at {}", root.display()));

        let mut bundles = Vec::new();
        let mut walker = WalkDir::new(root).follow_links(false).into_iter();
        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!(error = %err, "skipping unreadable entry");
                    continue;
                }
            };
            if entry.depth() > 0 && has_dsym_extension(entry.path()) {
                bundles.push(entry.path().to_path_buf());
                if entry.file_type().is_dir() {
                    walker.skip_current_dir();
                }
            }
        }
        bundles.sort();

        let results = matching(&bundles, wanted, self.dumper.as_ref());
        logs.add(format!("Recursive search completed. Found {} results.", results.len()));
        Ok(results)
    }
}

/// Load each bundle and keep one result per wanted UUID it carries.
fn matching(bundles: &[PathBuf], wanted: &BTreeSet<BinaryUuid>, dumper: &dyn UuidDumper) -> Vec<SearchResult>
{
    let mut results = Vec::new();
    for path in bundles {
        let file = match DsymFile::load(path, dumper) {
            Ok(file) => file,
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "skipping unloadable dSYM");
                continue;
            }
        };
        results.extend(
            file.uuids()
                .keys()
                .filter(|uuid| wanted.contains(uuid))
                .map(|uuid| SearchResult {
                    path: path.clone(),
                    matched_uuid: *uuid,
                }),
        );
    }
    results
}
