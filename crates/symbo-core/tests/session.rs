//! Tests for a symbolication session across search and symbolication

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use symbo_core::dsym::{has_dsym_extension, UuidDumper};
use symbo_core::report::{NoTranslator, ReportFile};
use symbo_core::search::{DsymSearch, SearchResult, SearchStrategy};
use symbo_core::session::SymbolicationSession;
use symbo_core::symbolicate::{AddressResolver, ResolveRequest, ResolverOutput, Symbolicator};
use symbo_core::types::BinaryUuid;
use symbo_core::{LogSink, SymboError, SymboResult};

const APP_UUID: &str = "6A8CB813-45F6-3652-AD33-778FD1EAB196";
const KIT_UUID: &str = "0F1E2D3C-4B5A-6978-8796-A5B4C3D2E1F0";

const REPORT: &str = "\
Process:               MyApp [4242]
Code Type:             X86-64 (Native)

Thread 0 Crashed:
0   MyApp                         0x0000000100001f00 0x100000000 + 7936
1   MyAppKit                      0x0000000100104000 0x100100000 + 16384

Binary Images:
       0x100000000 -        0x100003fff +MyApp (1.0 - 1) <6A8CB813-45F6-3652-AD33-778FD1EAB196> /Applications/MyApp.app/Contents/MacOS/MyApp
       0x100100000 -        0x100107fff +MyAppKit (1.0 - 1) <0F1E2D3C-4B5A-6978-8796-A5B4C3D2E1F0> /Applications/MyApp.app/Contents/Frameworks/MyAppKit.framework/MyAppKit
";

/// One x86_64 slice per DWARF binary; the UUID is chosen by binary name.
struct NameDumper;

impl UuidDumper for NameDumper
{
    fn dump(&self, path: &Path) -> SymboResult<String>
    {
        if !has_dsym_extension(path) {
            return Err(SymboError::BundleLoad {
                path: path.to_path_buf(),
                reason: "not a dSYM".to_string(),
            });
        }
        let mut text = String::new();
        for entry in fs::read_dir(path.join("Contents/Resources/DWARF"))? {
            let binary = entry?.path();
            let uuid = if binary.ends_with("MyAppKit") { KIT_UUID } else { APP_UUID };
            text.push_str(&format!("UUID: {uuid} (x86_64) {}\n", binary.display()));
        }
        Ok(text)
    }
}

struct Found(Vec<SearchResult>);

impl SearchStrategy for Found
{
    fn name(&self) -> &'static str
    {
        "found"
    }

    fn search(&self, wanted: &BTreeSet<BinaryUuid>, _hint_dir: Option<&Path>, _logs: &LogSink) -> SymboResult<Vec<SearchResult>>
    {
        Ok(self.0.iter().filter(|result| wanted.contains(&result.matched_uuid)).cloned().collect())
    }
}

struct Echo;

impl AddressResolver for Echo
{
    fn describe(&self, request: &ResolveRequest<'_>) -> String
    {
        format!("echo {}", request.address)
    }

    fn resolve(&self, request: &ResolveRequest<'_>) -> SymboResult<ResolverOutput>
    {
        let name = request.binary.file_name().unwrap().to_string_lossy();
        Ok(ResolverOutput {
            stdout: format!("{name}_entry (in {name})"),
            stderr: String::new(),
        })
    }
}

fn make_bundle(parent: &Path, bundle: &str, binary: &str) -> PathBuf
{
    let root = parent.join(bundle);
    let dwarf = root.join("Contents/Resources/DWARF");
    fs::create_dir_all(&dwarf).unwrap();
    fs::write(dwarf.join(binary), b"").unwrap();
    root
}

fn session() -> SymbolicationSession
{
    let report = ReportFile::new(REPORT, None, &NoTranslator).unwrap();
    SymbolicationSession::new(report, Arc::new(NameDumper))
}

#[test]
fn test_status_tracks_found_uuids()
{
    let dir = tempfile::tempdir().unwrap();
    let mut session = session();
    assert_eq!(session.needed_summary(), "(2 dSYMs needed)");
    assert_eq!(session.status_line().as_deref(), Some("Found 0/2"));

    let app = make_bundle(dir.path(), "MyApp.app.dSYM", "MyApp");
    assert_eq!(session.add_bundles_from(&app), 1);
    assert_eq!(session.add_bundles_from(&app), 0);
    assert_eq!(session.status_line().as_deref(), Some("Found 1/2"));
    assert_eq!(
        session.remaining_uuids().into_iter().collect::<Vec<_>>(),
        vec![BinaryUuid::parse(KIT_UUID).unwrap()]
    );
}

#[test]
fn test_unloadable_path_is_logged()
{
    let dir = tempfile::tempdir().unwrap();
    let mut session = session();
    assert_eq!(session.add_bundles_from(dir.path()), 0);
    assert!(session.logs().contains("Could not load a dSYM from"));
}

#[tokio::test]
async fn test_search_then_symbolicate()
{
    let dir = tempfile::tempdir().unwrap();
    let app = make_bundle(dir.path(), "MyApp.app.dSYM", "MyApp");
    let kit = make_bundle(dir.path(), "MyAppKit.framework.dSYM", "MyAppKit");

    let mut session = session();
    session.add_bundles_from(&app);

    let search = DsymSearch::new(
        vec![Arc::new(Found(vec![
            SearchResult {
                path: app.clone(),
                matched_uuid: BinaryUuid::parse(APP_UUID).unwrap(),
            },
            SearchResult {
                path: kit.clone(),
                matched_uuid: BinaryUuid::parse(KIT_UUID).unwrap(),
            },
        ]))],
        Duration::from_secs(5),
    );
    let outcome = session.search_missing(&search, |_| {}).await;
    assert!(outcome.succeeded);
    assert_eq!(outcome.results.len(), 1);
    assert_eq!(session.bundles().len(), 2);
    assert_eq!(session.status_line().as_deref(), Some("Found 2/2"));

    assert!(session.symbolicate(&Symbolicator::new(Arc::new(Echo))));
    let content = session.symbolicated_content().unwrap();
    assert!(content.contains(">>>> 0x0000000100001f00 MyApp_entry (in MyApp) + 7936"));
    assert!(content.contains(">>>> 0x0000000100104000 MyAppKit_entry (in MyAppKit) + 16384"));
}

#[test]
fn test_summary_without_frames()
{
    let report = ReportFile::new("Process: Idle [1]\nCode Type: X86-64\n", None, &NoTranslator).unwrap();
    let session = SymbolicationSession::new(report, Arc::new(NameDumper));
    assert_eq!(session.needed_summary(), "(Symbolication not needed)");
    assert_eq!(session.status_line(), None);
}

#[test]
fn test_error_messages()
{
    assert_eq!(SymboError::EmptyReport.to_string(), "Report is empty");
    assert_eq!(
        SymboError::InvalidUuid("nope".to_string()).to_string(),
        "Invalid UUID: nope"
    );
    let err = SymboError::SearchStrategy {
        strategy: "spotlight",
        reason: "mdfind missing".to_string(),
    };
    assert_eq!(err.to_string(), "spotlight search failed: mdfind missing");
}
