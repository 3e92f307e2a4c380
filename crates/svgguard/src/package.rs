//! Packages: where candidate SVG files come from and where warnings go

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tempfile::NamedTempFile;
use tracing::warn;

const SKIPPED_DIRS: &[&str] = &["node_modules"];

/// An SVG file inside a package, identified by its package-relative path
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CandidateFile {
    relative_path: String,
}

impl CandidateFile {
    pub fn new(relative_path: impl Into<String>) -> Self {
        Self {
            relative_path: relative_path.into(),
        }
    }

    /// Path relative to the package root, `/`-separated
    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }
}

/// A part of the package that could not be inspected while listing it
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct WalkFailure {
    /// Package-relative path of the directory or entry, `.` for the root
    pub relative_path: String,
    pub reason: String,
}

/// SVG files found in a package plus everything the walk could not enter
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Listing {
    /// Candidates in a stable order
    pub files: Vec<CandidateFile>,
    pub failures: Vec<WalkFailure>,
}

impl Listing {
    fn record_failure(&mut self, relative_path: &str, err: &io::Error) {
        let relative_path = if relative_path.is_empty() {
            "."
        } else {
            relative_path
        };
        warn!(path = relative_path, %err, "could not list package entry");
        self.failures.push(WalkFailure {
            relative_path: relative_path.to_string(),
            reason: err.to_string(),
        });
    }
}

/// Source of candidate files and sink for human-readable warnings
///
/// Implementations are shared across worker threads.
pub trait Package: Sync {
    /// Every SVG file in the package; an unreadable directory never hides its siblings
    fn svg_files(&self) -> Listing;

    fn read(&self, file: &CandidateFile) -> io::Result<String>;

    /// Replace the file's content; a failed write must leave the old content in place
    fn write(&self, file: &CandidateFile, markup: &str) -> io::Result<()>;

    fn push_warning(&self, warning: String);
}

/// Package backed by a directory tree
#[derive(Debug)]
pub struct DirPackage {
    root: PathBuf,
    warnings: Mutex<Vec<String>>,
}

impl DirPackage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            warnings: Mutex::new(Vec::new()),
        }
    }

    pub fn path_of(&self, file: &CandidateFile) -> PathBuf {
        file.relative_path()
            .split('/')
            .fold(self.root.clone(), |path, part| path.join(part))
    }

    /// Warnings collected so far
    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().clone()
    }

    fn collect(&self, dir: &Path, prefix: &str, listing: &mut Listing) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => return listing.record_failure(prefix, &err),
        };
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    listing.record_failure(prefix, &err);
                    continue;
                }
            };
            let name = entry.file_name().to_string_lossy().into_owned();
            let relative = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}/{name}")
            };
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(err) => {
                    listing.record_failure(&relative, &err);
                    continue;
                }
            };
            if file_type.is_dir() {
                if name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_str()) {
                    continue;
                }
                self.collect(&entry.path(), &relative, listing);
            } else if file_type.is_file() && is_svg(&name) {
                listing.files.push(CandidateFile::new(relative));
            }
        }
    }
}

impl Package for DirPackage {
    fn svg_files(&self) -> Listing {
        let mut listing = Listing::default();
        self.collect(&self.root, "", &mut listing);
        listing.files.sort();
        listing.failures.sort();
        listing
    }

    fn read(&self, file: &CandidateFile) -> io::Result<String> {
        fs::read_to_string(self.path_of(file))
    }

    fn write(&self, file: &CandidateFile, markup: &str) -> io::Result<()> {
        let path = self.path_of(file);
        let dir = path.parent().unwrap_or(&self.root);
        // write next to the target and rename so readers never see a partial file
        let mut staged = NamedTempFile::new_in(dir)?;
        staged.write_all(markup.as_bytes())?;
        // staged files are created owner-only; the replacement keeps the asset's mode
        if let Ok(existing) = fs::metadata(&path) {
            staged.as_file().set_permissions(existing.permissions())?;
        }
        staged.as_file().sync_all()?;
        staged.persist(&path).map_err(|err| err.error)?;
        Ok(())
    }

    fn push_warning(&self, warning: String) {
        self.warnings.lock().push(warning);
    }
}

fn is_svg(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"))
}

/// In-memory package, useful for embedding and tests
#[derive(Debug, Default)]
pub struct MemoryPackage {
    files: Mutex<BTreeMap<String, String>>,
    read_only: HashSet<String>,
    warnings: Mutex<Vec<String>>,
}

impl MemoryPackage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, relative_path: &str, markup: &str) -> Self {
        self.files
            .lock()
            .insert(relative_path.to_string(), markup.to_string());
        self
    }

    /// Make writes to `relative_path` fail with `PermissionDenied`
    pub fn with_read_only(mut self, relative_path: &str) -> Self {
        self.read_only.insert(relative_path.to_string());
        self
    }

    pub fn content(&self, relative_path: &str) -> Option<String> {
        self.files.lock().get(relative_path).cloned()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().clone()
    }
}

impl Package for MemoryPackage {
    fn svg_files(&self) -> Listing {
        let files = self
            .files
            .lock()
            .keys()
            .filter(|path| is_svg(path))
            .map(|path| CandidateFile::new(path.as_str()))
            .collect();
        Listing {
            files,
            failures: Vec::new(),
        }
    }

    fn read(&self, file: &CandidateFile) -> io::Result<String> {
        self.content(file.relative_path())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, file.relative_path()))
    }

    fn write(&self, file: &CandidateFile, markup: &str) -> io::Result<()> {
        if self.read_only.contains(file.relative_path()) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                file.relative_path(),
            ));
        }
        self.files
            .lock()
            .insert(file.relative_path().to_string(), markup.to_string());
        Ok(())
    }

    fn push_warning(&self, warning: String) {
        self.warnings.lock().push(warning);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dir_package_finds_svgs_sorted() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        fs::create_dir_all(dir.path().join("assets/icons"))?;
        fs::create_dir_all(dir.path().join("node_modules/pkg"))?;
        fs::create_dir_all(dir.path().join(".git"))?;
        fs::write(dir.path().join("assets/logo.svg"), "<svg/>")?;
        fs::write(dir.path().join("assets/icons/b.SVG"), "<svg/>")?;
        fs::write(dir.path().join("assets/readme.txt"), "text")?;
        fs::write(dir.path().join("node_modules/pkg/x.svg"), "<svg/>")?;
        fs::write(dir.path().join(".git/y.svg"), "<svg/>")?;

        let package = DirPackage::new(dir.path());
        let files: Vec<String> = package
            .svg_files()
            .files
            .iter()
            .map(|file| file.relative_path().to_string())
            .collect();
        assert_eq!(files, vec!["assets/icons/b.SVG", "assets/logo.svg"]);
        Ok(())
    }

    #[test]
    fn test_dir_package_write_replaces_content() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        fs::create_dir_all(dir.path().join("assets"))?;
        fs::write(dir.path().join("assets/logo.svg"), "<svg onload=\"x\"/>")?;

        let package = DirPackage::new(dir.path());
        let file = CandidateFile::new("assets/logo.svg");
        package.write(&file, "<svg/>")?;
        assert_eq!(package.read(&file)?, "<svg/>");
        assert_eq!(fs::read_dir(dir.path().join("assets"))?.count(), 1);
        Ok(())
    }

    #[test]
    fn test_dir_package_write_into_missing_dir_fails() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        let package = DirPackage::new(dir.path());
        assert!(package
            .write(&CandidateFile::new("missing/logo.svg"), "<svg/>")
            .is_err());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_dir_package_write_keeps_permissions() -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir()?;
        let path = dir.path().join("icon.svg");
        fs::write(&path, "<svg onload=\"x\"><g/></svg>")?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644))?;

        let package = DirPackage::new(dir.path());
        package.write(&CandidateFile::new("icon.svg"), "<svg><g/></svg>")?;
        assert_eq!(fs::read_to_string(&path)?, "<svg><g/></svg>");
        assert_eq!(fs::metadata(&path)?.permissions().mode() & 0o777, 0o644);
        Ok(())
    }

    #[test]
    fn test_unlistable_root_is_reported() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        let not_a_dir = dir.path().join("icon.svg");
        fs::write(&not_a_dir, "<svg/>")?;

        let listing = DirPackage::new(&not_a_dir).svg_files();
        assert!(listing.files.is_empty());
        assert_eq!(listing.failures.len(), 1);
        assert_eq!(
            listing.failures.first().map(|failure| failure.relative_path.as_str()),
            Some(".")
        );
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_does_not_hide_siblings() -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir()?;
        for sub in ["a", "b_locked", "c"] {
            fs::create_dir_all(dir.path().join(sub))?;
            fs::write(dir.path().join(sub).join("icon.svg"), "<svg/>")?;
        }
        let locked = dir.path().join("b_locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000))?;
        // privileged users read through the mode bits; nothing fails then
        let enforced = fs::read_dir(&locked).is_err();

        let listing = DirPackage::new(dir.path()).svg_files();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755))?;

        let files: Vec<&str> = listing.files.iter().map(CandidateFile::relative_path).collect();
        if enforced {
            assert_eq!(files, vec!["a/icon.svg", "c/icon.svg"]);
            assert_eq!(
                listing.failures.first().map(|failure| failure.relative_path.as_str()),
                Some("b_locked")
            );
        } else {
            assert_eq!(files, vec!["a/icon.svg", "b_locked/icon.svg", "c/icon.svg"]);
            assert!(listing.failures.is_empty());
        }
        Ok(())
    }

    #[test]
    fn test_memory_package_read_only() {
        let package = MemoryPackage::new()
            .with_file("a.svg", "<svg/>")
            .with_file("b.js", "x")
            .with_read_only("a.svg");
        assert_eq!(package.svg_files().files, vec![CandidateFile::new("a.svg")]);
        assert!(package.write(&CandidateFile::new("a.svg"), "<g/>").is_err());
        assert_eq!(package.content("a.svg").as_deref(), Some("<svg/>"));
    }
}
