//! # dSYM Search
//!
//! Finds bundles for UUIDs the loaded dSYMs do not cover yet.
//!
//! ## Strategies
//!
//! [`DsymSearch::standard`] runs three [`SearchStrategy`] implementations at
//! the same time:
//!
//! 1. [`IndexSearch`]: Spotlight (`mdfind`) lookup by dSYM UUID metadata
//! 2. [`NonRecursiveSearch`]: bundles directly inside the report's directory
//! 3. [`RecursiveSearch`]: bundles anywhere below the Xcode archives folder
//!
//! Strategies run on the blocking thread pool and know nothing about each
//! other. Results are collected in one place as strategies finish, progress is
//! reported after each one, and the whole search gives up after the
//! configured timeout with whatever it has.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::collections::BTreeSet;
//! use std::sync::Arc;
//!
//! use symbo_core::config::SymboConfig;
//! use symbo_core::dsym::ObjectUuidReader;
//! use symbo_core::search::DsymSearch;
//! use symbo_core::LogSink;
//!
//! # async fn run() -> symbo_core::SymboResult<()> {
//! let config = SymboConfig::from_env()?;
//! let search = DsymSearch::standard(&config, Arc::new(ObjectUuidReader));
//! let wanted = BTreeSet::new();
//! let outcome = search.search(&wanted, None, &LogSink::new(), |_| {}).await;
//! assert!(outcome.succeeded);
//! # Ok(())
//! # }
//! ```

mod files;
mod index;

use std::collections::BTreeSet;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub use files::{NonRecursiveSearch, RecursiveSearch};
pub use index::IndexSearch;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::config::SymboConfig;
use crate::dsym::UuidDumper;
use crate::error::{SymboError, SymboResult};
use crate::log::LogSink;
use crate::types::BinaryUuid;

/// A bundle found for one of the wanted UUIDs
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SearchResult
{
    /// Bundle root
    pub path: PathBuf,
    /// Wanted UUID the bundle carries
    pub matched_uuid: BinaryUuid,
}

/// Aggregate result of [`DsymSearch::search`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOutcome
{
    /// `false` if any strategy reported an error
    pub succeeded: bool,
    /// Results of every strategy that finished, in strategy order
    ///
    /// The same bundle can show up once per strategy that found it.
    pub results: Vec<SearchResult>,
    /// `true` if the timeout expired before every strategy finished
    pub timed_out: bool,
}

/// One independent way of finding bundles
///
/// Implementations block; the engine calls them from the blocking pool.
pub trait SearchStrategy: Send + Sync
{
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Find bundles carrying any of `wanted`.
    ///
    /// `hint_dir` is the directory holding the crash report, if known.
    ///
    /// ## Errors
    ///
    /// Returns [`SymboError::SearchStrategy`] if the strategy could not run at
    /// all. Sibling strategies are not affected.
    fn search(
        &self,
        wanted: &BTreeSet<BinaryUuid>,
        hint_dir: Option<&Path>,
        logs: &LogSink,
    ) -> SymboResult<Vec<SearchResult>>;
}

/// Concurrent multi-strategy bundle search with a global timeout
#[derive(Clone)]
pub struct DsymSearch
{
    strategies: Vec<Arc<dyn SearchStrategy>>,
    timeout: Duration,
}

impl DsymSearch
{
    /// Search with arbitrary strategies.
    pub fn new(strategies: Vec<Arc<dyn SearchStrategy>>, timeout: Duration) -> Self
    {
        Self { strategies, timeout }
    }

    /// Spotlight, report directory and archives folder, configured from `config`.
    pub fn standard(config: &SymboConfig, dumper: Arc<dyn UuidDumper>) -> Self
    {
        let strategies: Vec<Arc<dyn SearchStrategy>> = vec![
            Arc::new(IndexSearch::new(config.index_tool.clone())),
            Arc::new(NonRecursiveSearch::new(Arc::clone(&dumper))),
            Arc::new(RecursiveSearch::new(config.archives_dir.clone(), dumper)),
        ];
        Self::new(strategies, config.search_timeout)
    }

    /// Configured timeout.
    pub fn timeout(&self) -> Duration
    {
        self.timeout
    }

    /// Names of the configured strategies, in order.
    pub fn strategy_names(&self) -> Vec<&'static str>
    {
        self.strategies.iter().map(|strategy| strategy.name()).collect()
    }

    /// Run every strategy for `wanted` and collect what they find.
    ///
    /// `progress` receives `finished / total` after each strategy finishes, in
    /// completion order. An empty `wanted` set returns a successful, empty
    /// outcome without running anything.
    pub async fn search<F>(
        &self,
        wanted: &BTreeSet<BinaryUuid>,
        hint_dir: Option<&Path>,
        logs: &LogSink,
        mut progress: F,
    ) -> SearchOutcome
    where
        F: FnMut(f32),
    {
        if wanted.is_empty() {
            return SearchOutcome {
                succeeded: true,
                ..SearchOutcome::default()
            };
        }

        let total = self.strategies.len();
        let wanted_list = wanted.iter().map(BinaryUuid::pretty).collect::<Vec<_>>().join(", ");
        tracing::info!(uuids = wanted.len(), strategies = total, "starting dSYM search");
        logs.add(format!("Searching for dSYMs with UUIDs: {wanted_list}"));

        let shared_wanted = Arc::new(wanted.clone());
        let hint_dir: Option<PathBuf> = hint_dir.map(Path::to_path_buf);

        let mut set = JoinSet::new();
        for (index, strategy) in self.strategies.iter().enumerate() {
            let strategy = Arc::clone(strategy);
            let wanted = Arc::clone(&shared_wanted);
            let hint_dir = hint_dir.clone();
            let logs = logs.clone();
            set.spawn_blocking(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    strategy.search(&wanted, hint_dir.as_deref(), &logs)
                }))
                .unwrap_or_else(|_| {
                    Err(SymboError::SearchStrategy {
                        strategy: strategy.name(),
                        reason: "strategy panicked".to_string(),
                    })
                });
                (index, outcome)
            });
        }

        let mut per_strategy: Vec<Option<Vec<SearchResult>>> = vec![None; total];
        let mut errors: Vec<String> = Vec::new();
        let mut completed = 0usize;
        let mut timed_out = false;
        let deadline = Instant::now() + self.timeout;

        loop {
            match tokio::time::timeout_at(deadline, set.join_next()).await {
                Ok(Some(Ok((index, Ok(results))))) => {
                    tracing::debug!(strategy = self.strategies[index].name(), found = results.len(), "strategy finished");
                    per_strategy[index] = Some(results);
                }
                Ok(Some(Ok((index, Err(err))))) => {
                    tracing::warn!(strategy = self.strategies[index].name(), error = %err, "strategy failed");
                    errors.push(err.to_string());
                }
                Ok(Some(Err(err))) => {
                    tracing::warn!(error = %err, "search task failed");
                    errors.push(err.to_string());
                }
                Ok(None) => break,
                Err(_) => {
                    logs.add(format!("dSYM search timed out after {} seconds.", self.timeout.as_secs()));
                    tracing::warn!(timeout = ?self.timeout, pending = set.len(), "dSYM search timed out");
                    set.detach_all();
                    timed_out = true;
                    break;
                }
            }

            completed += 1;
            progress(fraction(completed, total));
        }

        if !errors.is_empty() {
            logs.add(format!("Errors occurred during dSYM search: {}", errors.join("; ")));
        }

        let results: Vec<SearchResult> = per_strategy.into_iter().flatten().flatten().collect();
        tracing::info!(found = results.len(), errors = errors.len(), timed_out, "dSYM search finished");

        SearchOutcome {
            succeeded: errors.is_empty(),
            results,
            timed_out,
        }
    }
}

impl std::fmt::Debug for DsymSearch
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("DsymSearch")
            .field("strategies", &self.strategy_names())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[allow(clippy::cast_precision_loss)]
fn fraction(completed: usize, total: usize) -> f32
{
    completed as f32 / total.max(1) as f32
}
