//! # Crash Reports
//!
//! [`ReportFile`] owns a report's text and the processes parsed out of it.
//!
//! ## Construction
//!
//! There is one constructor, [`ReportFile::new`], taking the text and the path
//! it came from (if any). [`ReportFile::open`] reads a file and hands off to
//! it. Construction fails only for the input errors:
//!
//! - the file cannot be read ([`SymboError::ReadReport`])
//! - the text is blank ([`SymboError::EmptyReport`])
//! - the text is in the structured format and translation fails
//!   ([`SymboError::Translation`])

pub mod parser;
pub mod translate;

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

pub use translate::{CommandTranslator, NoTranslator, TranslateSource, Translator};

use crate::error::{SymboError, SymboResult};
use crate::types::{BinaryUuid, ReportProcess};

/// A crash report and its parsed processes
#[derive(Debug, Clone)]
pub struct ReportFile
{
    /// File the report was read from
    pub path: Option<PathBuf>,
    content: String,
    /// Every named `Process:` section, in report order
    pub processes: Vec<ReportProcess>,
    /// Rewritten text, filled in by the symbolicator
    pub symbolicated_content: Option<String>,
}

impl ReportFile
{
    /// Build a report from text.
    ///
    /// Line endings are normalised to `\n`. Structured reports are passed to
    /// `translator` (by path when `path` is known) before parsing.
    ///
    /// ## Errors
    ///
    /// Returns [`SymboError::EmptyReport`] for blank text and
    /// [`SymboError::Translation`] if a structured report cannot be converted.
    pub fn new(content: impl Into<String>, path: Option<PathBuf>, translator: &dyn Translator) -> SymboResult<Self>
    {
        let mut content = normalize(content.into());
        if content.trim().is_empty() {
            return Err(SymboError::EmptyReport);
        }

        if translate::is_structured(&content) {
            let source = match &path {
                Some(path) => TranslateSource::Path(path),
                None => TranslateSource::Content(&content),
            };
            let translated = normalize(translator.translate(source)?);
            if translated.trim().is_empty() {
                return Err(SymboError::Translation("translator returned empty text".to_string()));
            }
            tracing::debug!(path = ?path, "translated structured report");
            content = translated;
        }

        let processes = parser::parse(&content);
        tracing::info!(path = ?path, processes = processes.len(), "loaded crash report");

        Ok(Self {
            path,
            content,
            processes,
            symbolicated_content: None,
        })
    }

    /// Read and parse a report file.
    ///
    /// ## Errors
    ///
    /// Returns [`SymboError::ReadReport`] if the file cannot be read, plus
    /// everything [`ReportFile::new`] returns.
    pub fn open(path: impl AsRef<Path>, translator: &dyn Translator) -> SymboResult<Self>
    {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| SymboError::ReadReport {
            path: path.to_path_buf(),
            source,
        })?;
        Self::new(String::from_utf8_lossy(&bytes), Some(path.to_path_buf()), translator)
    }

    /// Normalised report text, as parsed.
    pub fn content(&self) -> &str
    {
        &self.content
    }

    /// Directory holding the report file.
    pub fn directory(&self) -> Option<&Path>
    {
        self.path.as_deref().and_then(Path::parent)
    }

    /// Suggested output file: `[S] <name>.txt` next to the report.
    ///
    /// `None` for reports without a file.
    pub fn save_location(&self) -> Option<PathBuf>
    {
        let path = self.path.as_deref()?;
        let stem = path.file_stem()?.to_string_lossy();
        let file_name = format!("[S] {stem}.txt");
        Some(match path.parent() {
            Some(parent) => parent.join(file_name),
            None => PathBuf::from(file_name),
        })
    }

    /// UUIDs referenced by frames of any process.
    pub fn uuids_for_symbolication(&self) -> BTreeSet<BinaryUuid>
    {
        self.processes.iter().flat_map(ReportProcess::uuids_for_symbolication).collect()
    }
}

fn normalize(content: String) -> String
{
    if content.contains('\r') {
        content.replace("\r\n", "\n")
    } else {
        content
    }
}
