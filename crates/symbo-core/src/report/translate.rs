//! Conversion of structured (JSON) crash reports to the text format.
//!
//! Newer OS releases write `.ips` reports: a one-line JSON header followed by
//! a JSON body. The parser only understands the classic text layout, so those
//! reports go through a [`Translator`] first.

use std::path::Path;

use crate::error::{SymboError, SymboResult};
use crate::tool::CommandLine;

/// What the translator should read.
#[derive(Debug, Clone, Copy)]
pub enum TranslateSource<'a>
{
    /// A report file on disk
    Path(&'a Path),
    /// Report text that has no backing file
    Content(&'a str),
}

/// Turns a structured report into classic report text
pub trait Translator: Send + Sync
{
    /// Translate `source`.
    ///
    /// ## Errors
    ///
    /// Returns [`SymboError::Translation`] with a human-readable reason.
    fn translate(&self, source: TranslateSource<'_>) -> SymboResult<String>;
}

/// Runs an external converter
///
/// Files are passed as the last argument; detached content is fed on stdin.
/// The converter must print the text report on stdout.
#[derive(Debug, Clone)]
pub struct CommandTranslator
{
    command: CommandLine,
}

impl CommandTranslator
{
    /// Wrap a converter command.
    pub fn new(command: CommandLine) -> Self
    {
        Self { command }
    }
}

impl Translator for CommandTranslator
{
    fn translate(&self, source: TranslateSource<'_>) -> SymboResult<String>
    {
        let output = match source {
            TranslateSource::Path(path) => self.command.run(&[path.to_string_lossy()]),
            TranslateSource::Content(content) => self.command.run_with_stdin::<&str>(&[], content),
        }
        .map_err(|err| SymboError::Translation(err.to_string()))?;

        if output.stdout_trimmed().is_empty() {
            let reason = if output.stderr_trimmed().is_empty() {
                format!("{} produced no output", self.command.program())
            } else {
                output.stderr_trimmed().to_string()
            };
            return Err(SymboError::Translation(reason));
        }

        Ok(output.stdout)
    }
}

/// Translator used when no converter is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTranslator;

impl Translator for NoTranslator
{
    fn translate(&self, _source: TranslateSource<'_>) -> SymboResult<String>
    {
        Err(SymboError::Translation(
            "structured (.ips) reports need a translator; set SYMBO_TRANSLATOR".to_string(),
        ))
    }
}

/// Returns `true` if `content` is the structured report format.
pub fn is_structured(content: &str) -> bool
{
    content.trim_start().starts_with('{')
}
