//! # File-System Port
//!
//! The thin seam between the store and the physical file system. Every
//! path passed in is absolute and already contained in a store root; the
//! port does no validation of its own.
//!
//! [`LocalFs`] is the production implementation over `std::fs`. Tests and
//! embedders can substitute their own [`FileSystemPort`].

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;

/// Kind of entry found at a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Nothing exists at the path.
    None,
    File,
    Directory,
}

impl EntryKind {
    pub fn is_file(&self) -> bool {
        matches!(self, Self::File)
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Directory)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::File => "file",
            Self::Directory => "directory",
        }
    }
}

/// One child of a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntryInfo {
    pub name: String,
    pub kind: EntryKind,
}

/// Physical file-system operations consumed by the store.
///
/// Each method should have at least the atomicity of a single local
/// file-system call. Errors are returned unchanged; the store decides which
/// conditions it translates.
pub trait FileSystemPort: Send + Sync + std::fmt::Debug {
    /// Create `path` and any missing ancestors. Succeeds if it already exists.
    fn mkdir_all(&self, path: &Path) -> io::Result<()>;

    /// Remove an empty directory.
    fn rmdir(&self, path: &Path) -> io::Result<()>;

    /// Remove a file.
    fn unlink(&self, path: &Path) -> io::Result<()>;

    /// What, if anything, exists at `path`.
    fn exists(&self, path: &Path) -> io::Result<EntryKind>;

    /// Open a byte stream on `path`.
    fn open(&self, path: &Path, options: &OpenOptions) -> io::Result<File>;

    /// Content length of the file at `path`.
    fn len(&self, path: &Path) -> io::Result<u64>;

    /// Children of the directory at `path`, in no particular order.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntryInfo>>;

    /// Recursively delete the tree at `path`.
    fn remove_dir_all(&self, path: &Path) -> io::Result<()>;

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Copy file content, returning the number of bytes copied.
    fn copy(&self, from: &Path, to: &Path) -> io::Result<u64>;
}

// ---------------------------------------------------------------------------
// LocalFs
// ---------------------------------------------------------------------------

/// `ENOTDIR` on Linux and the BSDs. `io::ErrorKind::NotADirectory` would
/// replace this check but is newer than the supported toolchain.
#[cfg(unix)]
const ENOTDIR: i32 = 20;

/// Whether `err` means an ancestor of the path is a file.
fn is_not_a_directory(err: &io::Error) -> bool {
    #[cfg(unix)]
    {
        err.raw_os_error() == Some(ENOTDIR)
    }
    #[cfg(not(unix))]
    {
        let _ = err;
        false
    }
}

/// [`FileSystemPort`] over the local file system.
///
/// Symbolic links are not followed when classifying entries: a link is
/// reported as a file, so directory operations never traverse out of the
/// store through one.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl FileSystemPort for LocalFs {
    fn mkdir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn rmdir(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir(path)
    }

    fn unlink(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn exists(&self, path: &Path) -> io::Result<EntryKind> {
        match fs::symlink_metadata(path) {
            Ok(meta) if meta.is_dir() => Ok(EntryKind::Directory),
            Ok(_) => Ok(EntryKind::File),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(EntryKind::None),
            Err(e) if is_not_a_directory(&e) => Ok(EntryKind::None),
            Err(e) => Err(e),
        }
    }

    fn open(&self, path: &Path, options: &OpenOptions) -> io::Result<File> {
        options.open(path)
    }

    fn len(&self, path: &Path) -> io::Result<u64> {
        Ok(fs::symlink_metadata(path)?.len())
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntryInfo>> {
        let mut out = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let Ok(name) = entry.file_name().into_string() else {
                tracing::warn!(dir = %path.display(), "skipping entry with a non-UTF-8 name");
                continue;
            };
            let kind = if entry.file_type()?.is_dir() {
                EntryKind::Directory
            } else {
                EntryKind::File
            };
            out.push(DirEntryInfo { name, kind });
        }
        Ok(out)
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir_all(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<u64> {
        fs::copy(from, to)
    }
}

/// Total content length of every file under `root`.
///
/// Unreadable entries are logged and skipped rather than failing the scan. A
/// missing root counts as empty.
pub fn tree_size(fs: &dyn FileSystemPort, root: &Path) -> io::Result<u64> {
    let mut total: u64 = 0;
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = match fs.read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) if dir == root => return Err(e),
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "skipping unreadable directory in usage scan");
                continue;
            }
        };
        for entry in entries {
            let path = dir.join(&entry.name);
            match entry.kind {
                EntryKind::Directory => pending.push(path),
                EntryKind::File => match fs.len(&path) {
                    Ok(len) => total = total.saturating_add(len),
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "skipping unreadable file in usage scan");
                    }
                },
                EntryKind::None => {}
            }
        }
    }
    Ok(total)
}
