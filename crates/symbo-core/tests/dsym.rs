//! Tests for dSYM loading and binary selection

use std::fs;
use std::path::{Path, PathBuf};

use symbo_core::dsym::{has_dsym_extension, DsymFile, UuidDumper};
use symbo_core::types::{Architecture, BinaryUuid};
use symbo_core::{SymboError, SymboResult};

const APP_UUID: &str = "6A8CB813-45F6-3652-AD33-778FD1EAB196";
const KIT_UUID: &str = "0F1E2D3C-4B5A-6978-8796-A5B4C3D2E1F0";

/// Pretends every `.dSYM` directory holds one arm64 slice per DWARF binary,
/// with UUIDs from `uuid_for`.
struct DirectoryDumper;

impl UuidDumper for DirectoryDumper
{
    fn dump(&self, path: &Path) -> SymboResult<String>
    {
        if !has_dsym_extension(path) || !path.is_dir() {
            return Err(SymboError::BundleLoad {
                path: path.to_path_buf(),
                reason: "error: not a dSYM".to_string(),
            });
        }
        let dwarf = path.join("Contents/Resources/DWARF");
        let mut text = String::new();
        for entry in fs::read_dir(&dwarf)? {
            let binary = entry?.path();
            let name = binary.file_name().unwrap().to_string_lossy().into_owned();
            text.push_str(&format!("UUID: {} (arm64) {}\n", uuid_for(&name), binary.display()));
        }
        Ok(text)
    }
}

fn uuid_for(name: &str) -> &'static str
{
    if name.starts_with("MyAppKit") {
        KIT_UUID
    } else {
        APP_UUID
    }
}

fn make_bundle(parent: &Path, bundle: &str, binaries: &[&str]) -> PathBuf
{
    let root = parent.join(bundle);
    let dwarf = root.join("Contents/Resources/DWARF");
    fs::create_dir_all(&dwarf).unwrap();
    for binary in binaries {
        fs::write(dwarf.join(binary), b"").unwrap();
    }
    root
}

#[test]
fn test_load_single_bundle()
{
    let dir = tempfile::tempdir().unwrap();
    let root = make_bundle(dir.path(), "MyApp.app.dSYM", &["MyApp"]);

    let files = DsymFile::dsym_files_from(&root, &DirectoryDumper);
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].filename(), "MyApp.app.dSYM");
    assert!(files[0].contains(&BinaryUuid::parse(APP_UUID).unwrap()));
    assert_eq!(files[0].binary_paths().len(), 1);
}

#[test]
fn test_wrapper_directory_yields_nested_bundles()
{
    let dir = tempfile::tempdir().unwrap();
    let wrapper = dir.path().join("Symbols");
    fs::create_dir_all(&wrapper).unwrap();
    make_bundle(&wrapper, "MyApp.app.dSYM", &["MyApp"]);
    make_bundle(&wrapper, "MyAppKit.framework.DSYM", &["MyAppKit"]);
    fs::write(wrapper.join("README.txt"), b"not a bundle").unwrap();
    // Named like a bundle but not a directory: the dumper rejects it.
    fs::write(wrapper.join("Broken.dSYM"), b"").unwrap();

    let files = DsymFile::dsym_files_from(&wrapper, &DirectoryDumper);
    let names: Vec<String> = files.iter().map(DsymFile::filename).collect();
    assert_eq!(names, vec!["MyApp.app.dSYM", "MyAppKit.framework.DSYM"]);
}

#[test]
fn test_nothing_loadable_yields_nothing()
{
    let dir = tempfile::tempdir().unwrap();
    assert!(DsymFile::dsym_files_from(dir.path(), &DirectoryDumper).is_empty());
    assert!(DsymFile::dsym_files_from(&dir.path().join("missing"), &DirectoryDumper).is_empty());
}

#[test]
fn test_select_binary_is_deterministic()
{
    let dir = tempfile::tempdir().unwrap();
    let root = make_bundle(dir.path(), "MyApp.app.dSYM", &["MyApp", "MyAppKit"]);
    let file = DsymFile::load(&root, &DirectoryDumper).unwrap();
    let app = BinaryUuid::parse(APP_UUID).unwrap();
    let kit = BinaryUuid::parse(KIT_UUID).unwrap();

    let first = file.select_binary("MyApp", Some(&app), Some(Architecture::Arm64));
    for _ in 0..8 {
        assert_eq!(file.select_binary("MyApp", Some(&app), Some(Architecture::Arm64)), first);
    }
    assert!(first.unwrap().ends_with("MyApp"));

    let selected = file.select_binary("MyAppKit", Some(&kit), Some(Architecture::X86_64));
    assert!(selected.unwrap().ends_with("MyAppKit"));
}

#[test]
fn test_bundles_compare_by_path_and_uuids()
{
    let dir = tempfile::tempdir().unwrap();
    let root = make_bundle(dir.path(), "MyApp.app.dSYM", &["MyApp"]);
    let first = DsymFile::load(&root, &DirectoryDumper).unwrap();
    let second = DsymFile::load(&root, &DirectoryDumper).unwrap();
    assert_eq!(first, second);

    let other = make_bundle(dir.path(), "Copy.dSYM", &["MyApp"]);
    assert_ne!(first, DsymFile::load(&other, &DirectoryDumper).unwrap());
}
