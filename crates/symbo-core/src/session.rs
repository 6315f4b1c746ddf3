//! One report, the dSYMs collected for it, and its diagnostic log.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::dsym::{DsymFile, UuidDumper};
use crate::log::LogSink;
use crate::report::ReportFile;
use crate::search::{DsymSearch, SearchOutcome};
use crate::symbolicate::Symbolicator;
use crate::types::BinaryUuid;

/// Accumulates dSYMs for a report until it can be symbolicated
///
/// Bundles come from explicit paths ([`SymbolicationSession::add_bundles_from`])
/// and from the search engine ([`SymbolicationSession::search_missing`]). A
/// bundle path is only ever loaded once.
///
/// ## Example
///
/// ```rust,no_run
/// use std::sync::Arc;
///
/// use symbo_core::config::SymboConfig;
/// use symbo_core::dsym::ObjectUuidReader;
/// use symbo_core::report::{NoTranslator, ReportFile};
/// use symbo_core::search::DsymSearch;
/// use symbo_core::session::SymbolicationSession;
/// use symbo_core::symbolicate::Symbolicator;
///
/// # async fn run() -> symbo_core::SymboResult<()> {
/// let config = SymboConfig::from_env()?;
/// let report = ReportFile::open("MyApp.crash", &NoTranslator)?;
/// let mut session = SymbolicationSession::new(report, Arc::new(ObjectUuidReader));
///
/// session.add_bundles_from("MyApp.app.dSYM".as_ref());
/// session.search_missing(&DsymSearch::standard(&config, Arc::new(ObjectUuidReader)), |_| {}).await;
/// let ok = session.symbolicate(&Symbolicator::from_config(&config));
/// println!("{ok}: {}", session.symbolicated_content().unwrap_or_default());
/// # Ok(())
/// # }
/// ```
pub struct SymbolicationSession
{
    report: ReportFile,
    bundles: Vec<DsymFile>,
    dumper: Arc<dyn UuidDumper>,
    logs: LogSink,
}

impl SymbolicationSession
{
    pub fn new(report: ReportFile, dumper: Arc<dyn UuidDumper>) -> Self
    {
        Self {
            report,
            bundles: Vec::new(),
            dumper,
            logs: LogSink::new(),
        }
    }

    pub fn report(&self) -> &ReportFile
    {
        &self.report
    }

    /// Consume the session, keeping the report.
    pub fn into_report(self) -> ReportFile
    {
        self.report
    }

    /// Bundles loaded so far, in load order.
    pub fn bundles(&self) -> &[DsymFile]
    {
        &self.bundles
    }

    /// Diagnostic log shared by every step.
    pub fn logs(&self) -> &LogSink
    {
        &self.logs
    }

    /// UUIDs the report needs.
    pub fn expected_uuids(&self) -> BTreeSet<BinaryUuid>
    {
        self.report.uuids_for_symbolication()
    }

    /// Needed UUIDs some loaded bundle carries.
    pub fn found_uuids(&self) -> BTreeSet<BinaryUuid>
    {
        self.expected_uuids()
            .into_iter()
            .filter(|uuid| self.bundles.iter().any(|bundle| bundle.contains(uuid)))
            .collect()
    }

    /// Needed UUIDs no loaded bundle carries.
    pub fn remaining_uuids(&self) -> BTreeSet<BinaryUuid>
    {
        let found = self.found_uuids();
        self.expected_uuids().difference(&found).copied().collect()
    }

    /// Add one loaded bundle. Returns `false` if its path was already loaded.
    pub fn add_bundle(&mut self, bundle: DsymFile) -> bool
    {
        if self.bundles.iter().any(|existing| existing.path() == bundle.path()) {
            return false;
        }
        tracing::debug!(path = %bundle.path().display(), uuids = bundle.uuids().len(), "added dSYM");
        self.bundles.push(bundle);
        true
    }

    /// Load every bundle at `path` (a bundle, or a folder of bundles).
    ///
    /// Returns how many new bundles were added.
    pub fn add_bundles_from(&mut self, path: &Path) -> usize
    {
        if self.bundles.iter().any(|existing| existing.path() == path) {
            return 0;
        }

        let found = DsymFile::dsym_files_from(path, self.dumper.as_ref());
        if found.is_empty() {
            self.logs.add(format!("Could not load a dSYM from {}", path.display()));
            return 0;
        }
        found.into_iter().filter(|bundle| self.add_bundle(bundle.clone())).count()
    }

    /// Search for bundles carrying [`SymbolicationSession::remaining_uuids`] and
    /// load every one found.
    ///
    /// The report's directory is the search hint.
    pub async fn search_missing<F>(&mut self, search: &DsymSearch, progress: F) -> SearchOutcome
    where
        F: FnMut(f32),
    {
        let remaining = self.remaining_uuids();
        let hint_dir: Option<PathBuf> = self.report.directory().map(Path::to_path_buf);
        let outcome = search.search(&remaining, hint_dir.as_deref(), &self.logs, progress).await;

        let paths: BTreeSet<&Path> = outcome.results.iter().map(|result| result.path.as_path()).collect();
        let added: usize = paths.into_iter().map(|path| self.add_bundles_from(path)).sum();
        tracing::info!(added, remaining = self.remaining_uuids().len(), "search results loaded");

        outcome
    }

    /// Symbolicate the report with every loaded bundle.
    ///
    /// Running again after adding bundles only resolves frames that are still
    /// unresolved.
    pub fn symbolicate(&mut self, symbolicator: &Symbolicator) -> bool
    {
        symbolicator.symbolicate(&mut self.report, &self.bundles, &self.logs)
    }

    /// Rewritten report text, after [`SymbolicationSession::symbolicate`].
    pub fn symbolicated_content(&self) -> Option<&str>
    {
        self.report.symbolicated_content.as_deref()
    }

    /// `Found n/m` over the needed UUIDs; `None` if nothing is needed.
    pub fn status_line(&self) -> Option<String>
    {
        let expected = self.expected_uuids().len();
        if expected == 0 {
            return None;
        }
        Some(format!("Found {}/{expected}", self.found_uuids().len()))
    }

    /// How many dSYMs the report needs, for display.
    pub fn needed_summary(&self) -> String
    {
        match self.expected_uuids().len() {
            0 => "(Symbolication not needed)".to_string(),
            1 => "(1 dSYM needed)".to_string(),
            count => format!("({count} dSYMs needed)"),
        }
    }
}

impl std::fmt::Debug for SymbolicationSession
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("SymbolicationSession")
            .field("report", &self.report.path)
            .field("bundles", &self.bundles.len())
            .field("logs", &self.logs.len())
            .finish_non_exhaustive()
    }
}
