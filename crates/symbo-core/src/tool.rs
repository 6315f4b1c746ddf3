//! Running external programs.
//!
//! `dwarfdump`, `atos`, `mdfind` and the report translator are all driven
//! through [`CommandLine`]. The caller decides what a failure means; this
//! module only reports what the program printed.

use std::fmt;
use std::io::{self, Write};
use std::process::{Command, Stdio};
use std::thread;

use crate::error::{SymboError, SymboResult};

/// Captured result of one external program run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput
{
    /// Everything written to stdout, lossily decoded
    pub stdout: String,
    /// Everything written to stderr, lossily decoded
    pub stderr: String,
    /// Exit code, `None` if killed by a signal
    pub status: Option<i32>,
}

impl ToolOutput
{
    /// Stdout without surrounding whitespace.
    pub fn stdout_trimmed(&self) -> &str
    {
        self.stdout.trim()
    }

    /// Stderr without surrounding whitespace.
    pub fn stderr_trimmed(&self) -> &str
    {
        self.stderr.trim()
    }

    /// Returns `true` if the program exited with status 0.
    pub fn success(&self) -> bool
    {
        self.status == Some(0)
    }
}

/// A program plus the arguments that always precede the per-call ones
///
/// ```rust
/// use symbo_core::tool::CommandLine;
///
/// let atos = CommandLine::parse("xcrun atos")?;
/// assert_eq!(atos.program(), "xcrun");
/// assert_eq!(atos.to_string(), "xcrun atos");
/// # Ok::<(), symbo_core::SymboError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine
{
    program: String,
    args: Vec<String>,
}

impl CommandLine
{
    /// Build from a program and leading arguments.
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Split a whitespace-separated command line.
    ///
    /// ## Errors
    ///
    /// Returns [`SymboError::InvalidConfig`] for an empty string.
    pub fn parse(line: &str) -> SymboResult<Self>
    {
        let mut parts = line.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| SymboError::InvalidConfig("empty command line".to_string()))?;
        Ok(Self::new(program, parts))
    }

    /// Program name or path.
    pub fn program(&self) -> &str
    {
        &self.program
    }

    /// Leading arguments.
    pub fn args(&self) -> &[String]
    {
        &self.args
    }

    /// Render the full invocation for logs, quoting arguments with spaces.
    pub fn describe<S: AsRef<str>>(&self, extra: &[S]) -> String
    {
        let mut rendered = self.to_string();
        for arg in extra {
            let arg = arg.as_ref();
            rendered.push(' ');
            if arg.contains(char::is_whitespace) {
                rendered.push('"');
                rendered.push_str(arg);
                rendered.push('"');
            } else {
                rendered.push_str(arg);
            }
        }
        rendered
    }

    /// Run with extra arguments and capture both output streams.
    ///
    /// ## Errors
    ///
    /// Returns [`SymboError::ToolLaunch`] if the program cannot be spawned.
    /// A non-zero exit status is not an error.
    pub fn run<S: AsRef<str>>(&self, extra: &[S]) -> SymboResult<ToolOutput>
    {
        tracing::trace!(command = %self.describe(extra), "running tool");
        let output = Command::new(&self.program)
            .args(&self.args)
            .args(extra.iter().map(AsRef::as_ref))
            .stdin(Stdio::null())
            .output()
            .map_err(|source| self.launch_error(source))?;

        Ok(ToolOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            status: output.status.code(),
        })
    }

    /// Like [`CommandLine::run`], feeding `input` on stdin.
    ///
    /// ## Errors
    ///
    /// Returns [`SymboError::ToolLaunch`] if the program cannot be spawned, or
    /// [`SymboError::Io`] if stdin cannot be written.
    pub fn run_with_stdin<S: AsRef<str>>(&self, extra: &[S], input: &str) -> SymboResult<ToolOutput>
    {
        tracing::trace!(command = %self.describe(extra), bytes = input.len(), "running tool with stdin");
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .args(extra.iter().map(AsRef::as_ref))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| self.launch_error(source))?;

        // Fed from its own thread so a child filling stdout cannot stall the write.
        let writer = child.stdin.take().map(|mut stdin| {
            let input = input.to_owned();
            thread::spawn(move || stdin.write_all(input.as_bytes()))
        });
        let output = child.wait_with_output()?;

        if let Some(writer) = writer {
            match writer.join() {
                Ok(Ok(())) => {}
                // The child may exit without reading everything.
                Ok(Err(err)) if err.kind() == io::ErrorKind::BrokenPipe => {}
                Ok(Err(err)) => return Err(err.into()),
                Err(_) => return Err(io::Error::other("stdin writer panicked").into()),
            }
        }

        Ok(ToolOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            status: output.status.code(),
        })
    }

    fn launch_error(&self, source: std::io::Error) -> SymboError
    {
        SymboError::ToolLaunch {
            program: self.program.clone(),
            source,
        }
    }
}

impl fmt::Display for CommandLine
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}
