//! Spotlight lookup of dSYM bundles.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use super::{SearchResult, SearchStrategy};
use crate::error::{SymboError, SymboResult};
use crate::log::LogSink;
use crate::tool::CommandLine;
use crate::types::BinaryUuid;

/// Queries the content index for bundles whose `com_apple_xcode_dsym_uuids`
/// attribute holds a wanted UUID
///
/// The indexer records that attribute for every dSYM it sees, so this finds
/// bundles anywhere on indexed volumes. One query runs per UUID.
#[derive(Debug, Clone)]
pub struct IndexSearch
{
    command: CommandLine,
}

impl IndexSearch
{
    pub fn new(command: CommandLine) -> Self
    {
        Self { command }
    }

    /// Query text for one UUID.
    pub fn query(uuid: &BinaryUuid) -> String
    {
        format!("com_apple_xcode_dsym_uuids == {}", uuid.pretty())
    }
}

impl SearchStrategy for IndexSearch
{
    fn name(&self) -> &'static str
    {
        "spotlight"
    }

    fn search(
        &self,
        wanted: &BTreeSet<BinaryUuid>,
        _hint_dir: Option<&Path>,
        logs: &LogSink,
    ) -> SymboResult<Vec<SearchResult>>
    {
        logs.add(format!("Searching Spotlight for {} UUIDs", wanted.len()));

        let mut results = Vec::new();
        for uuid in wanted {
            let output = self.command.run(&[Self::query(uuid)]).map_err(|err| {
                logs.add("Spotlight query could not be started.");
                SymboError::SearchStrategy {
                    strategy: self.name(),
                    reason: err.to_string(),
                }
            })?;

            if !output.success() && !output.stderr_trimmed().is_empty() {
                tracing::debug!(uuid = %uuid, stderr = output.stderr_trimmed(), "index query reported an error");
            }

            results.extend(
                output
                    .stdout
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(|line| SearchResult {
                        path: PathBuf::from(line),
                        matched_uuid: *uuid,
                    }),
            );
        }

        logs.add(format!("Spotlight search completed. Found {} results.", results.len()));
        Ok(results)
    }
}
