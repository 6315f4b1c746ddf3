//! # dSYM Bundles
//!
//! A dSYM is a directory tree holding the debug info of one or more binaries:
//!
//! ```text
//! MyApp.app.dSYM/
//! └── Contents/
//!     └── Resources/
//!         └── DWARF/
//!             └── MyApp        (thin or universal Mach-O)
//! ```
//!
//! [`DsymFile::load`] asks a [`UuidDumper`] which UUIDs the bundle carries and
//! lists the `DWARF` directory for the binary slices. Some packaging tools
//! zip bundles inside a wrapper directory; [`DsymFile::dsym_files_from`]
//! looks one level into such wrappers.

pub mod dump;
pub(crate) mod macho;

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub use dump::{parse_uuid_dump, DumpedSlice, DwarfdumpTool, ObjectUuidReader, UuidDumper};

use crate::error::SymboResult;
use crate::types::{Architecture, BinaryUuid};

/// One loaded debug-symbol bundle
///
/// Read-only after [`DsymFile::load`]. Binary selection is a pure query.
#[derive(Debug, Clone)]
pub struct DsymFile
{
    path: PathBuf,
    slices: Vec<DumpedSlice>,
    uuids: BTreeMap<BinaryUuid, String>,
    binary_paths: Vec<PathBuf>,
}

impl DsymFile
{
    /// Load the bundle rooted at `path`.
    ///
    /// A dump with no UUID lines gives a bundle without usable slices rather
    /// than an error.
    ///
    /// ## Errors
    ///
    /// Returns whatever `dumper` returns, normally
    /// [`SymboError::BundleLoad`](crate::SymboError::BundleLoad).
    pub fn load(path: impl Into<PathBuf>, dumper: &dyn UuidDumper) -> SymboResult<Self>
    {
        let path = path.into();
        let text = dumper.dump(&path)?;
        let slices = parse_uuid_dump(&text);
        let uuids = slices.iter().map(|slice| (slice.uuid, slice.binary.clone())).collect();

        let dwarf_dir = dwarf_dir(&path);
        let binary_paths = match list_binaries(&dwarf_dir) {
            Ok(paths) if !paths.is_empty() => paths,
            _ => vec![path.clone()],
        };

        tracing::debug!(
            path = %path.display(),
            slices = slices.len(),
            binaries = binary_paths.len(),
            "loaded dSYM"
        );

        Ok(Self {
            path,
            slices,
            uuids,
            binary_paths,
        })
    }

    /// Every bundle reachable from `path`.
    ///
    /// If `path` loads as a bundle, that bundle alone. Otherwise each direct
    /// child whose name ends in `.dSYM` (any case) that loads. Other children
    /// and load failures are skipped.
    pub fn dsym_files_from(path: &Path, dumper: &dyn UuidDumper) -> Vec<DsymFile>
    {
        if let Ok(file) = DsymFile::load(path, dumper) {
            return vec![file];
        }

        let Ok(entries) = fs::read_dir(path) else {
            tracing::debug!(path = %path.display(), "not a dSYM and not a directory");
            return Vec::new();
        };

        let mut children: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|child| has_dsym_extension(child))
            .collect();
        children.sort();

        children
            .into_iter()
            .filter_map(|child| match DsymFile::load(&child, dumper) {
                Ok(file) => Some(file),
                Err(err) => {
                    tracing::debug!(path = %child.display(), error = %err, "skipping nested dSYM");
                    None
                }
            })
            .collect()
    }

    /// Bundle root.
    pub fn path(&self) -> &Path
    {
        &self.path
    }

    /// Last component of the bundle root.
    pub fn filename(&self) -> String
    {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// UUID to binary name, as reported by the dump.
    pub fn uuids(&self) -> &BTreeMap<BinaryUuid, String>
    {
        &self.uuids
    }

    /// Parsed dump lines, in dump order.
    pub fn slices(&self) -> &[DumpedSlice]
    {
        &self.slices
    }

    /// Binaries inside the bundle, sorted; the root itself if the bundle has no
    /// `DWARF` directory.
    pub fn binary_paths(&self) -> &[PathBuf]
    {
        &self.binary_paths
    }

    /// Returns `true` if the bundle carries `uuid`.
    pub fn contains(&self, uuid: &BinaryUuid) -> bool
    {
        self.uuids.contains_key(uuid)
    }

    /// Pick the binary to hand to the resolver for an image named `name`.
    ///
    /// 1. Binaries whose file name is `name` are the candidates.
    /// 2. With a `uuid`, the binary the dump lists for that UUID wins, even
    ///    when no candidate matched by name.
    /// 3. With an `architecture`, a candidate holding a slice of that
    ///    architecture wins.
    /// 4. Otherwise the first candidate.
    ///
    /// The result depends only on the bundle contents and the arguments.
    pub fn select_binary(
        &self,
        name: &str,
        uuid: Option<&BinaryUuid>,
        architecture: Option<Architecture>,
    ) -> Option<&Path>
    {
        let candidates: Vec<&Path> = self
            .binary_paths
            .iter()
            .map(PathBuf::as_path)
            .filter(|path| file_name(path) == Some(name))
            .collect();

        if let Some(binary) = uuid.and_then(|uuid| self.uuids.get(uuid)) {
            let wanted = file_name(Path::new(binary));
            if let Some(path) = candidates.iter().copied().find(|path| file_name(path) == wanted) {
                return Some(path);
            }
            if candidates.is_empty() {
                if let Some(path) = self.binary_paths.iter().find(|path| file_name(path) == wanted) {
                    return Some(path.as_path());
                }
            }
        }

        if let Some(architecture) = architecture {
            let holds_arch = |path: &Path| {
                self.slices
                    .iter()
                    .any(|slice| slice.architecture == architecture && file_name(Path::new(&slice.binary)) == file_name(path))
            };
            if let Some(path) = candidates.iter().copied().find(|path| holds_arch(*path)) {
                return Some(path);
            }
        }

        candidates.first().copied()
    }
}

impl PartialEq for DsymFile
{
    fn eq(&self, other: &Self) -> bool
    {
        self.path == other.path && self.uuids == other.uuids
    }
}

impl Eq for DsymFile {}

/// `Contents/Resources/DWARF` under a bundle root.
pub(crate) fn dwarf_dir(root: &Path) -> PathBuf
{
    root.join("Contents").join("Resources").join("DWARF")
}

/// Sorted regular files in `dir`, hidden files excluded.
pub(crate) fn list_binaries(dir: &Path) -> io::Result<Vec<PathBuf>>
{
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if !hidden && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Returns `true` if `path` ends in `.dSYM`, ignoring case.
pub fn has_dsym_extension(path: &Path) -> bool
{
    path.extension()
        .is_some_and(|extension| extension.to_string_lossy().eq_ignore_ascii_case("dsym"))
}

fn file_name(path: &Path) -> Option<&str>
{
    path.file_name().and_then(|name| name.to_str())
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::SymboError;

    struct CannedDumper(String);

    impl UuidDumper for CannedDumper
    {
        fn dump(&self, _path: &Path) -> SymboResult<String>
        {
            Ok(self.0.clone())
        }
    }

    struct FailingDumper;

    impl UuidDumper for FailingDumper
    {
        fn dump(&self, path: &Path) -> SymboResult<String>
        {
            Err(SymboError::BundleLoad {
                path: path.to_path_buf(),
                reason: "error: not a Mach-O file".to_string(),
            })
        }
    }

    fn bundle_with(binaries: &[&str]) -> (tempfile::TempDir, PathBuf)
    {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("MyApp.app.dSYM");
        let dwarf = dwarf_dir(&root);
        fs::create_dir_all(&dwarf).unwrap();
        for binary in binaries {
            fs::write(dwarf.join(binary), b"").unwrap();
        }
        (dir, root)
    }

    #[test]
    fn test_load_lists_dwarf_binaries()
    {
        let (_dir, root) = bundle_with(&["MyApp", "MyAppKit", ".DS_Store"]);
        let dump = format!(
            "UUID: 6A8CB813-45F6-3652-AD33-778FD1EAB196 (arm64) {}\n",
            dwarf_dir(&root).join("MyApp").display()
        );
        let file = DsymFile::load(&root, &CannedDumper(dump)).unwrap();

        assert_eq!(file.filename(), "MyApp.app.dSYM");
        assert_eq!(file.binary_paths().len(), 2);
        assert_eq!(file.uuids().len(), 1);
        assert!(file.contains(&BinaryUuid::parse("6a8cb81345f63652ad33778fd1eab196").unwrap()));
    }

    #[test]
    fn test_load_without_dwarf_dir_falls_back_to_root()
    {
        let dir = tempfile::tempdir().unwrap();
        let file = DsymFile::load(dir.path(), &CannedDumper(String::new())).unwrap();
        assert!(file.uuids().is_empty());
        assert_eq!(file.binary_paths(), [dir.path().to_path_buf()]);
    }

    #[test]
    fn test_load_failure()
    {
        assert!(matches!(
            DsymFile::load("/tmp/whatever.dSYM", &FailingDumper),
            Err(SymboError::BundleLoad { .. })
        ));
    }

    #[test]
    fn test_select_binary_by_name()
    {
        let (_dir, root) = bundle_with(&["MyApp", "MyAppKit"]);
        let file = DsymFile::load(&root, &CannedDumper(String::new())).unwrap();

        let selected = file.select_binary("MyAppKit", None, None).unwrap();
        assert!(selected.ends_with("MyAppKit"));
        assert_eq!(file.select_binary("MyAppKit", None, None), Some(selected));
        assert_eq!(file.select_binary("Other", None, None), None);
    }

    #[test]
    fn test_select_binary_uuid_fallback()
    {
        let (_dir, root) = bundle_with(&["MyApp"]);
        let dump = "UUID: 6A8CB813-45F6-3652-AD33-778FD1EAB196 (arm64) /elsewhere/MyApp\n".to_string();
        let file = DsymFile::load(&root, &CannedDumper(dump)).unwrap();
        let uuid = BinaryUuid::parse("6A8CB813-45F6-3652-AD33-778FD1EAB196").unwrap();

        // The image was renamed in the report but the UUID still points at the binary.
        let selected = file.select_binary("MyApp-Renamed", Some(&uuid), Some(Architecture::Arm64));
        assert!(selected.unwrap().ends_with("MyApp"));

        let unknown = BinaryUuid::parse("00000000-0000-0000-0000-000000000001").unwrap();
        assert_eq!(file.select_binary("MyApp-Renamed", Some(&unknown), None), None);
    }

    #[test]
    fn test_equality_ignores_slice_order()
    {
        let (_dir, root) = bundle_with(&["MyApp"]);
        let a = "UUID: 11111111-1111-1111-1111-111111111111 (x86_64) MyApp\nUUID: 22222222-2222-2222-2222-222222222222 (arm64) MyApp\n";
        let b = "UUID: 22222222-2222-2222-2222-222222222222 (arm64) MyApp\nUUID: 11111111-1111-1111-1111-111111111111 (x86_64) MyApp\n";
        let first = DsymFile::load(&root, &CannedDumper(a.to_string())).unwrap();
        let second = DsymFile::load(&root, &CannedDumper(b.to_string())).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_dsym_extension()
    {
        assert!(has_dsym_extension(Path::new("/a/App.app.dSYM")));
        assert!(has_dsym_extension(Path::new("/a/App.DSYM")));
        assert!(!has_dsym_extension(Path::new("/a/App.app")));
    }
}
