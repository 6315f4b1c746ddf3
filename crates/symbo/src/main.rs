use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use symbo_core::dsym::{DsymFile, DwarfdumpTool, ObjectUuidReader, UuidDumper};
use symbo_core::report::{CommandTranslator, NoTranslator, Translator};
use symbo_core::types::BinaryUuid;
use symbo_core::{DsymSearch, LogSink, ReportFile, SymboConfig, SymboResult, SymbolicationSession, Symbolicator};
use symbo_utils::{info, init_logging, init_logging_to_file, warn};

/// Exit status when some frames could not be symbolicated.
const EXIT_PARTIAL: i32 = 2;

/// Symbolicate Apple crash reports against dSYM bundles.
#[derive(Parser, Debug)]
#[command(name = "symbo")]
#[command(version)]
#[command(about = "Symbolicate Apple crash reports against dSYM bundles", long_about = None)]
struct Cli
{
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Symbolicate a crash report
    Symbolicate
    {
        /// Crash report (`.crash`, `.txt` or `.ips`)
        report: PathBuf,
        /// dSYM bundle, or folder of bundles, to use (repeatable)
        #[arg(long = "dsym", value_name = "PATH")]
        dsyms: Vec<PathBuf>,
        /// Only use the bundles given with --dsym
        #[arg(long, default_value_t = false)]
        no_search: bool,
        /// Output file, or `-` for stdout (default: `[S] <report>.txt` next to the report)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
        /// Use the built-in UUID reader and resolver instead of dwarfdump/atos
        #[arg(long, default_value_t = false)]
        native: bool,
        /// dSYM search timeout in seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
        /// Root of the recursive dSYM search
        #[arg(long, value_name = "DIR")]
        archives_dir: Option<PathBuf>,
        /// Print the diagnostic log after symbolicating
        #[arg(long, default_value_t = false)]
        show_logs: bool,
    },
    /// List the binary UUIDs a crash report needs
    Uuids
    {
        /// Crash report
        report: PathBuf,
    },
    /// Search the disk for dSYMs carrying the given UUIDs
    Search
    {
        /// Binary UUIDs, hyphenated or plain hex
        #[arg(required = true)]
        uuids: Vec<String>,
        /// Folder to look in besides the index and the archives
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,
        /// Use the built-in UUID reader instead of dwarfdump
        #[arg(long, default_value_t = false)]
        native: bool,
    },
    /// Show the UUIDs and binaries of a dSYM bundle
    Inspect
    {
        /// dSYM bundle, or folder of bundles
        dsym: PathBuf,
        /// Use the built-in UUID reader instead of dwarfdump
        #[arg(long, default_value_t = false)]
        native: bool,
    },
}

fn main()
{
    let cli = Cli::parse();

    // Report text on stdout must not be interleaved with log lines.
    let logging = if streams_to_stdout(&cli.command) {
        init_logging_to_file(None).map(|_| ())
    } else {
        init_logging()
    };
    if let Err(e) = logging {
        eprintln!("Failed to initialize logging: {e}");
        process::exit(1);
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start runtime: {e}");
            process::exit(1);
        }
    };

    let result = runtime.block_on(run_command(cli));
    // Search strategies still blocking after a timeout are abandoned.
    runtime.shutdown_background();

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

fn streams_to_stdout(command: &Commands) -> bool
{
    matches!(command, Commands::Symbolicate { output: Some(path), .. } if path.as_os_str() == "-")
}

async fn run_command(cli: Cli) -> Result<i32, Box<dyn std::error::Error>>
{
    let mut config = SymboConfig::from_env()?;

    match cli.command {
        Commands::Symbolicate {
            report,
            dsyms,
            no_search,
            output,
            native,
            timeout,
            archives_dir,
            show_logs,
        } => {
            config.native_tools |= native;
            if let Some(seconds) = timeout {
                config.search_timeout = Duration::from_secs(seconds);
            }
            if archives_dir.is_some() {
                config.archives_dir = archives_dir;
            }

            let report = ReportFile::open(&report, translator(&config).as_ref())?;
            let mut session = SymbolicationSession::new(report, uuid_dumper(&config));
            info!(path = ?session.report().path, needed = %session.needed_summary(), "report loaded");

            for path in &dsyms {
                session.add_bundles_from(path);
            }

            if !no_search && !session.remaining_uuids().is_empty() {
                let search = DsymSearch::standard(&config, uuid_dumper(&config));
                let outcome = session.search_missing(&search, |_| {}).await;
                if outcome.timed_out {
                    warn!(timeout = ?search.timeout(), "dSYM search timed out");
                }
            }

            let success = session.symbolicate(&Symbolicator::from_config(&config));
            let text = session.symbolicated_content().unwrap_or_default();

            let destination = output.or_else(|| session.report().save_location());
            match destination {
                Some(path) if path.as_os_str() != "-" => {
                    fs::write(&path, text)?;
                    eprintln!("Symbolicated report written to {}", path.display());
                }
                _ => print!("{text}"),
            }

            if let Some(status) = session.status_line() {
                eprintln!("{status} {}", session.needed_summary());
            } else {
                eprintln!("{}", session.needed_summary());
            }
            if show_logs || !success {
                eprintln!("{}", session.logs().joined());
            }

            Ok(if success { 0 } else { EXIT_PARTIAL })
        }
        Commands::Uuids { report } => {
            let report = ReportFile::open(&report, translator(&config).as_ref())?;
            for process in &report.processes {
                println!("{} ({})", process.display_name(), display_arch(process.architecture));
                for image in process.binaries_for_symbolication() {
                    println!("  {} {} {}", image.uuid, image.load_address, image.name);
                }
            }
            Ok(0)
        }
        Commands::Search { uuids, dir, native } => {
            config.native_tools |= native;
            let wanted = uuids
                .iter()
                .map(|raw| BinaryUuid::parse(raw))
                .collect::<SymboResult<BTreeSet<_>>>()?;

            let search = DsymSearch::standard(&config, uuid_dumper(&config));
            let logs = LogSink::new();
            let outcome = search
                .search(&wanted, dir.as_deref(), &logs, |fraction| {
                    eprintln!("Searching... {:>3.0}%", fraction * 100.0);
                })
                .await;

            for result in &outcome.results {
                println!("{} {}", result.matched_uuid, result.path.display());
            }
            if !outcome.succeeded || outcome.timed_out {
                eprintln!("{}", logs.joined());
            }
            Ok(if outcome.succeeded && !outcome.timed_out { 0 } else { EXIT_PARTIAL })
        }
        Commands::Inspect { dsym, native } => {
            config.native_tools |= native;
            let files = DsymFile::dsym_files_from(&dsym, uuid_dumper(&config).as_ref());
            if files.is_empty() {
                return Err(format!("no dSYM bundle found at {}", dsym.display()).into());
            }
            for file in &files {
                print_bundle(file);
            }
            Ok(0)
        }
    }
}

fn translator(config: &SymboConfig) -> Box<dyn Translator>
{
    match &config.translator {
        Some(command) => Box::new(CommandTranslator::new(command.clone())),
        None => Box::new(NoTranslator),
    }
}

fn uuid_dumper(config: &SymboConfig) -> Arc<dyn UuidDumper>
{
    if config.native_tools {
        Arc::new(ObjectUuidReader)
    } else {
        Arc::new(DwarfdumpTool::new(config.uuid_tool.clone()))
    }
}

fn display_arch(architecture: Option<symbo_core::Architecture>) -> String
{
    architecture.map_or_else(|| "unknown".to_string(), |arch| arch.to_string())
}

fn print_bundle(file: &DsymFile)
{
    println!("{}", file.path().display());
    for slice in file.slices() {
        println!("  {} ({}) {}", slice.uuid, slice.architecture, slice.binary);
    }
    for binary in file.binary_paths() {
        println!("  binary: {}", relative_to(binary, file.path()).display());
    }
}

fn relative_to<'a>(path: &'a Path, base: &Path) -> &'a Path
{
    path.strip_prefix(base).unwrap_or(path)
}
