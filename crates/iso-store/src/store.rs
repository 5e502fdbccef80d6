//! # Isolated Store Handle
//!
//! [`IsolatedStore`] is the handle callers work with. Every operation runs
//! the same pipeline:
//!
//! ```text
//! argument check ─▶ lifecycle gate ─▶ path containment ─▶ liveness guard
//!                ─▶ path lock ─▶ quota reservation ─▶ file-system port
//! ```
//!
//! and reports the first failure in that order. Handles are `Send + Sync`;
//! every operation takes `&self`.
//!
//! Dropping a handle disposes it.

use std::fs::OpenOptions;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use iso_core::{
    require_argument, ContainedPath, IsoError, IsoResult, ScopeDescriptor, ScopeId, StoreRoot,
};
use iso_state::{HandleId, Lifecycle, LifecycleState, TransitionRecord};

use crate::fs_port::{EntryKind, FileSystemPort};
use crate::registry::{SharedStore, StoreRegistry};
use crate::stream::{FileAccess, IsolatedFileStream};

/// How [`IsolatedStore::open_file`] treats an existing or absent file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileMode {
    /// Create a new file; fail if it exists.
    CreateNew,
    /// Create a new file, truncating any existing one.
    Create,
    /// Open an existing file; fail if it is absent.
    Open,
    /// Open the file, creating it if absent.
    OpenOrCreate,
    /// Open an existing file and truncate it to zero length.
    Truncate,
    /// Open or create the file and write at its end.
    Append,
}

impl FileMode {
    /// Whether this mode can only be used with write access.
    pub fn requires_write(&self) -> bool {
        matches!(
            self,
            Self::CreateNew | Self::Create | Self::Truncate | Self::Append
        )
    }

    /// Whether this mode discards existing content.
    pub fn truncates(&self) -> bool {
        matches!(self, Self::Create | Self::Truncate)
    }
}

#[derive(Debug)]
struct HandleState {
    lifecycle: Lifecycle,
    shared: Option<Arc<SharedStore>>,
}

/// A handle on one isolated store.
#[derive(Debug)]
pub struct IsolatedStore {
    id: HandleId,
    root: StoreRoot,
    fs: Arc<dyn FileSystemPort>,
    registry: Arc<StoreRegistry>,
    inner: Mutex<HandleState>,
}

impl IsolatedStore {
    pub(crate) fn new(
        root: StoreRoot,
        shared: Arc<SharedStore>,
        fs: Arc<dyn FileSystemPort>,
        registry: Arc<StoreRegistry>,
    ) -> Self {
        Self {
            id: HandleId::new(),
            root,
            fs,
            registry,
            inner: Mutex::new(HandleState {
                lifecycle: Lifecycle::new(),
                shared: Some(shared),
            }),
        }
    }

    // ─── Introspection ──────────────────────────────────────────────

    pub fn id(&self) -> HandleId {
        self.id
    }

    pub fn scope_id(&self) -> &ScopeId {
        self.root.scope()
    }

    /// The descriptor this store was opened with.
    pub fn scope(&self) -> ScopeDescriptor {
        self.root.descriptor()
    }

    pub fn root(&self) -> &StoreRoot {
        &self.root
    }

    /// The state a caller observes, including removal through a sibling handle.
    pub fn state(&self) -> LifecycleState {
        let inner = self.inner.lock();
        let removed = inner.shared.as_ref().is_some_and(|s| s.is_removed());
        inner.lifecycle.observed(removed)
    }

    pub fn transitions(&self) -> Vec<TransitionRecord> {
        self.inner.lock().lifecycle.transitions().to_vec()
    }

    // ─── Lifecycle ──────────────────────────────────────────────────

    /// Close the handle. Idempotent; the store itself is untouched.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        if inner.lifecycle.close() {
            tracing::debug!(handle = %self.id, scope = %self.root.scope(), "store handle closed");
        }
    }

    /// Dispose the handle and release its shared-state reference. Idempotent.
    pub fn dispose(&self) {
        let mut inner = self.inner.lock();
        if inner.lifecycle.dispose() {
            inner.shared = None;
            tracing::debug!(handle = %self.id, scope = %self.root.scope(), "store handle disposed");
        }
    }

    /// Delete the whole store.
    ///
    /// Every handle on the same root observes the removal from this point on.
    /// The quota entry is destroyed; a later open of the scope starts afresh.
    ///
    /// # Errors
    ///
    /// The lifecycle errors of any operation, or [`IsoError::Io`] if the tree
    /// cannot be deleted. A failed deletion leaves the store live.
    pub fn remove(&self) -> IsoResult<()> {
        let shared = self.live()?;
        {
            let mut removal = shared.liveness().begin_removal();
            if removal.is_removed() {
                return Err(IsoError::failed("the store has been removed"));
            }
            match self.fs.remove_dir_all(self.root.path()) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
            removal.mark_removed();
        }
        self.registry.evict(&shared);

        let mut inner = self.inner.lock();
        if inner.lifecycle.state().is_open() {
            inner.lifecycle.mark_removed(false)?;
        }
        tracing::info!(handle = %self.id, scope = %self.root.scope(), "store removed");
        Ok(())
    }

    // ─── Directories ────────────────────────────────────────────────

    /// Create `path` and any missing ancestors. A no-op if it already exists.
    pub fn create_directory(&self, path: &str) -> IsoResult<()> {
        let (shared, path) = self.prepare("path", path)?;
        let _live = shared.enter()?;
        if path.is_root() {
            return Ok(());
        }
        let _lock = shared.lock_path(&path);
        match self.kind_of(&path)? {
            EntryKind::Directory => return Ok(()),
            EntryKind::File => return Err(IsoError::failed(format!("{path} is a file"))),
            EntryKind::None => {}
        }
        self.require_no_file_ancestor(&path)?;
        self.fs
            .mkdir_all(&self.abs(&path))
            .map_err(|e| fs_error("create directory", &path, e))
    }

    /// Delete the empty directory at `path`. Never recursive.
    ///
    /// # Errors
    ///
    /// [`IsoError::OperationFailed`] if the directory is absent, is not a
    /// directory, has children, or is the store root.
    pub fn delete_directory(&self, path: &str) -> IsoResult<()> {
        let (shared, path) = self.prepare("path", path)?;
        let _live = shared.enter()?;
        if path.is_root() {
            return Err(IsoError::failed(
                "the store root cannot be deleted as a directory",
            ));
        }
        let _lock = shared.lock_path(&path);
        let abs = self.abs(&path);
        match self.fs.exists(&abs)? {
            EntryKind::None => {
                return Err(IsoError::failed(format!("directory {path} does not exist")))
            }
            EntryKind::File => return Err(IsoError::failed(format!("{path} is not a directory"))),
            EntryKind::Directory => {}
        }
        if !self.fs.read_dir(&abs)?.is_empty() {
            return Err(IsoError::failed(format!("directory {path} is not empty")));
        }
        match self.fs.rmdir(&abs) {
            Ok(()) => Ok(()),
            // A child created after the listing above.
            Err(e) if self.has_children(&abs) => {
                tracing::debug!(path = %path, error = %e, "directory filled before removal");
                Err(IsoError::failed(format!("directory {path} is not empty")))
            }
            Err(e) => Err(fs_error("delete directory", &path, e)),
        }
    }

    pub fn directory_exists(&self, path: &str) -> IsoResult<bool> {
        let (shared, path) = self.prepare("path", path)?;
        let _live = shared.enter()?;
        Ok(path.is_root() || self.kind_of(&path)?.is_dir())
    }

    // ─── Files ──────────────────────────────────────────────────────

    pub fn file_exists(&self, path: &str) -> IsoResult<bool> {
        let (shared, path) = self.prepare("path", path)?;
        let _live = shared.enter()?;
        Ok(!path.is_root() && self.kind_of(&path)?.is_file())
    }

    /// Delete the file at `path` and release its size. An absent file is a no-op.
    ///
    /// # Errors
    ///
    /// [`IsoError::OperationFailed`] if `path` is a directory.
    pub fn delete_file(&self, path: &str) -> IsoResult<()> {
        let (shared, path) = self.prepare("path", path)?;
        let _live = shared.enter()?;
        if path.is_root() {
            return Err(IsoError::failed("the store root is not a file"));
        }
        let _lock = shared.lock_path(&path);
        let abs = self.abs(&path);
        match self.fs.exists(&abs)? {
            EntryKind::None => Ok(()),
            EntryKind::Directory => Err(IsoError::failed(format!("{path} is a directory"))),
            EntryKind::File => {
                let len = self.fs.len(&abs)?;
                match self.fs.unlink(&abs) {
                    Ok(()) => {
                        shared.detach_streams(&path);
                        shared.quota().release(len);
                        Ok(())
                    }
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {
                        shared.detach_streams(&path);
                        Ok(())
                    }
                    Err(e) => Err(e.into()),
                }
            }
        }
    }

    /// Open a stream on the file at `path`.
    ///
    /// Truncating modes release the old length. The returned stream charges
    /// every byte that extends the file.
    ///
    /// # Errors
    ///
    /// - [`IsoError::InvalidArgument`] for read-only access with a mode that writes.
    /// - [`IsoError::OperationFailed`] for a directory, a missing parent
    ///   directory, `Open`/`Truncate` on an absent file, or `CreateNew` on an
    ///   existing one.
    pub fn open_file(
        &self,
        path: &str,
        mode: FileMode,
        access: FileAccess,
    ) -> IsoResult<IsolatedFileStream> {
        let raw = require_argument("path", path)?;
        if mode.requires_write() && !access.can_write() {
            return Err(IsoError::InvalidArgument(format!(
                "{mode:?} requires write access"
            )));
        }
        let (shared, path) = self.prepare("path", raw)?;
        let _live = shared.enter()?;
        if path.is_root() {
            return Err(IsoError::failed("the store root is not a file"));
        }
        let _lock = shared.lock_path(&path);
        let abs = self.abs(&path);

        let existing = self.fs.exists(&abs)?;
        if existing.is_dir() {
            return Err(IsoError::failed(format!("{path} is a directory")));
        }
        self.require_parent_dir(&path)?;
        match (mode, existing.is_file()) {
            (FileMode::CreateNew, true) => {
                return Err(IsoError::failed(format!("{path} already exists")))
            }
            (FileMode::Open | FileMode::Truncate, false) => {
                return Err(IsoError::failed(format!("{path} does not exist")))
            }
            _ => {}
        }

        let old_len = if existing.is_file() && mode.truncates() {
            self.fs.len(&abs)?
        } else {
            0
        };

        if mode == FileMode::OpenOrCreate && !existing.is_file() && !access.can_write() {
            self.fs
                .open(&abs, OpenOptions::new().write(true).create(true))
                .map_err(|e| fs_error("create", &path, e))?;
        }

        let mut options = OpenOptions::new();
        options.read(access.can_read()).write(access.can_write());
        match mode {
            FileMode::CreateNew => {
                options.create_new(true);
            }
            FileMode::Create => {
                options.create(true).truncate(true);
            }
            FileMode::Open => {}
            FileMode::OpenOrCreate => {
                options.create(access.can_write());
            }
            FileMode::Truncate => {
                options.truncate(true);
            }
            FileMode::Append => {
                options.create(true).append(true);
            }
        }
        let file = self
            .fs
            .open(&abs, &options)
            .map_err(|e| fs_error("open", &path, e))?;
        shared.quota().release(old_len);
        let ticket = shared.register_stream(&path);

        tracing::trace!(handle = %self.id, path = %path, ?mode, ?access, "opened file");
        Ok(IsolatedFileStream::new(
            file,
            Arc::clone(&shared),
            ticket,
            access,
            mode == FileMode::Append,
        ))
    }

    /// Shorthand for `open_file(path, Create, ReadWrite)`.
    pub fn create_file(&self, path: &str) -> IsoResult<IsolatedFileStream> {
        self.open_file(path, FileMode::Create, FileAccess::ReadWrite)
    }

    /// Write `data` as the whole content of `path`, creating or replacing it.
    ///
    /// The size change is reserved before anything is written. On
    /// [`IsoError::QuotaExceeded`] the store is unchanged.
    pub fn write_file(&self, path: &str, data: &[u8]) -> IsoResult<()> {
        let (shared, path) = self.prepare("path", path)?;
        let _live = shared.enter()?;
        if path.is_root() {
            return Err(IsoError::failed("the store root is not a file"));
        }
        let _lock = shared.lock_path(&path);
        let abs = self.abs(&path);

        let existing = self.fs.exists(&abs)?;
        if existing.is_dir() {
            return Err(IsoError::failed(format!("{path} is a directory")));
        }
        self.require_parent_dir(&path)?;
        let old_len = if existing.is_file() { self.fs.len(&abs)? } else { 0 };
        let new_len = data.len() as u64;
        shared.quota().resize(old_len, new_len)?;

        let written = self
            .fs
            .open(&abs, OpenOptions::new().write(true).create(true).truncate(true))
            .and_then(|mut file| file.write_all(data));
        if let Err(e) = written {
            self.reconcile(&shared, &path, new_len);
            return Err(fs_error("write", &path, e));
        }
        Ok(())
    }

    /// The whole content of the file at `path`.
    pub fn read_file(&self, path: &str) -> IsoResult<Vec<u8>> {
        let (shared, path) = self.prepare("path", path)?;
        let _live = shared.enter()?;
        self.require_file(&path)?;
        let mut file = self
            .fs
            .open(&self.abs(&path), OpenOptions::new().read(true))
            .map_err(|e| fs_error("read", &path, e))?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)?;
        Ok(buf)
    }

    pub fn file_length(&self, path: &str) -> IsoResult<u64> {
        let (shared, path) = self.prepare("path", path)?;
        let _live = shared.enter()?;
        self.require_file(&path)?;
        Ok(self.fs.len(&self.abs(&path))?)
    }

    /// Copy a file inside the store, reserving the destination's growth first.
    ///
    /// # Errors
    ///
    /// [`IsoError::OperationFailed`] if the source is not a file, the
    /// destination is a directory, or the destination exists and
    /// `overwrite` is false.
    pub fn copy_file(&self, source: &str, destination: &str, overwrite: bool) -> IsoResult<()> {
        let (shared, src, dst) = self.prepare_pair(source, destination)?;
        let _live = shared.enter()?;
        if src == dst {
            return Err(IsoError::failed(format!(
                "{src} cannot be copied onto itself"
            )));
        }
        let _locks = shared.lock_paths(&src, &dst);
        self.require_file(&src)?;
        if dst.is_root() {
            return Err(IsoError::failed("the store root is not a file"));
        }
        let dst_abs = self.abs(&dst);
        let dst_kind = self.fs.exists(&dst_abs)?;
        match dst_kind {
            EntryKind::Directory => {
                return Err(IsoError::failed(format!("{dst} is a directory")))
            }
            EntryKind::File if !overwrite => {
                return Err(IsoError::failed(format!("{dst} already exists")))
            }
            _ => {}
        }
        self.require_parent_dir(&dst)?;

        let src_abs = self.abs(&src);
        let src_len = self.fs.len(&src_abs)?;
        let old_len = if dst_kind.is_file() { self.fs.len(&dst_abs)? } else { 0 };
        shared.quota().resize(old_len, src_len)?;
        if let Err(e) = self.fs.copy(&src_abs, &dst_abs) {
            self.reconcile(&shared, &dst, src_len);
            return Err(fs_error("copy", &src, e));
        }
        Ok(())
    }

    /// Rename a file inside the store. The destination must not exist.
    pub fn move_file(&self, source: &str, destination: &str) -> IsoResult<()> {
        let (shared, src, dst) = self.prepare_pair(source, destination)?;
        let _live = shared.enter()?;
        let _locks = shared.lock_paths(&src, &dst);
        self.require_file(&src)?;
        self.require_vacant(&dst)?;
        self.fs
            .rename(&self.abs(&src), &self.abs(&dst))
            .map_err(|e| fs_error("move", &src, e))?;
        shared.retarget_streams(&src, &dst);
        Ok(())
    }

    /// Rename a directory inside the store. The destination must not exist
    /// and must not lie inside the source.
    ///
    /// Every path lock is held for the rename, since any stream or file
    /// operation below the source is affected by it.
    pub fn move_directory(&self, source: &str, destination: &str) -> IsoResult<()> {
        let (shared, src, dst) = self.prepare_pair(source, destination)?;
        let _live = shared.enter()?;
        if src.is_root() {
            return Err(IsoError::failed("the store root cannot be moved"));
        }
        if dst.starts_with(&src) {
            return Err(IsoError::failed(format!(
                "{src} cannot be moved inside itself"
            )));
        }
        let _locks = shared.lock_all();
        match self.kind_of(&src)? {
            EntryKind::Directory => {}
            EntryKind::File => return Err(IsoError::failed(format!("{src} is not a directory"))),
            EntryKind::None => {
                return Err(IsoError::failed(format!("directory {src} does not exist")))
            }
        }
        self.require_vacant(&dst)?;
        self.fs
            .rename(&self.abs(&src), &self.abs(&dst))
            .map_err(|e| fs_error("move", &src, e))?;
        shared.retarget_streams(&src, &dst);
        Ok(())
    }

    // ─── Enumeration ────────────────────────────────────────────────

    /// Names of the files matching `pattern`, sorted.
    ///
    /// The last segment of `pattern` may contain `*` and `?`; earlier
    /// segments name a directory. A missing directory yields no names.
    pub fn file_names(&self, pattern: &str) -> IsoResult<Vec<String>> {
        self.list(pattern, EntryKind::File)
    }

    /// Names of the directories matching `pattern`, sorted.
    pub fn directory_names(&self, pattern: &str) -> IsoResult<Vec<String>> {
        self.list(pattern, EntryKind::Directory)
    }

    fn list(&self, raw: &str, kind: EntryKind) -> IsoResult<Vec<String>> {
        let (shared, pattern) = self.prepare("pattern", raw)?;
        let _live = shared.enter()?;
        let (dir, last) = match (pattern.parent(), pattern.file_name()) {
            (Some(parent), Some(name)) => (parent, name.to_string()),
            _ => (ContainedPath::root(), "*".to_string()),
        };
        if dir.segments().iter().any(|s| s.contains(['*', '?'])) {
            return Err(IsoError::invalid_path(
                raw,
                "wildcards are only allowed in the last segment",
            ));
        }
        let matcher = wildcard(raw, &last)?;
        let abs = self.abs(&dir);
        if !self.fs.exists(&abs)?.is_dir() {
            return Ok(Vec::new());
        }
        let options = glob::MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };
        let mut names: Vec<String> = self
            .fs
            .read_dir(&abs)?
            .into_iter()
            .filter(|e| e.kind == kind && matcher.matches_with(&e.name, options))
            .map(|e| e.name)
            .collect();
        names.sort();
        Ok(names)
    }

    // ─── Quota ──────────────────────────────────────────────────────

    /// Byte ceiling of the store.
    pub fn quota(&self) -> IsoResult<u64> {
        Ok(self.live()?.quota().usage().quota)
    }

    /// Bytes currently charged to the store.
    pub fn used_size(&self) -> IsoResult<u64> {
        Ok(self.live()?.quota().usage().used)
    }

    pub fn available_free_space(&self) -> IsoResult<u64> {
        Ok(self.live()?.quota().usage().available())
    }

    /// Raise the store's ceiling. Visible to every handle on the store.
    ///
    /// # Errors
    ///
    /// [`IsoError::InvalidArgument`] unless `new_quota` exceeds the current ceiling.
    pub fn increase_quota_to(&self, new_quota: u64) -> IsoResult<()> {
        let shared = self.live()?;
        let _live = shared.enter()?;
        shared.quota().increase_quota_to(new_quota)
    }

    // ─── Internals ──────────────────────────────────────────────────

    /// Lifecycle gate. Returns the shared state for an open handle.
    fn live(&self) -> IsoResult<Arc<SharedStore>> {
        let inner = self.inner.lock();
        let removed = inner.shared.as_ref().is_some_and(|s| s.is_removed());
        inner.lifecycle.check(removed)?;
        inner.shared.clone().ok_or(IsoError::ObjectDisposed)
    }

    fn prepare(&self, name: &str, raw: &str) -> IsoResult<(Arc<SharedStore>, ContainedPath)> {
        let raw = require_argument(name, raw)?;
        let shared = self.live()?;
        let path = ContainedPath::new(raw)?;
        Ok((shared, path))
    }

    fn prepare_pair(
        &self,
        source: &str,
        destination: &str,
    ) -> IsoResult<(Arc<SharedStore>, ContainedPath, ContainedPath)> {
        let source = require_argument("source", source)?;
        let destination = require_argument("destination", destination)?;
        let shared = self.live()?;
        let src = ContainedPath::new(source)?;
        let dst = ContainedPath::new(destination)?;
        Ok((shared, src, dst))
    }

    fn abs(&self, path: &ContainedPath) -> PathBuf {
        path.join_onto(self.root.path())
    }

    fn kind_of(&self, path: &ContainedPath) -> IsoResult<EntryKind> {
        Ok(self.fs.exists(&self.abs(path))?)
    }

    fn require_file(&self, path: &ContainedPath) -> IsoResult<()> {
        if path.is_root() {
            return Err(IsoError::failed("the store root is not a file"));
        }
        match self.kind_of(path)? {
            EntryKind::File => Ok(()),
            EntryKind::Directory => Err(IsoError::failed(format!("{path} is a directory"))),
            EntryKind::None => Err(IsoError::failed(format!("{path} does not exist"))),
        }
    }

    fn require_parent_dir(&self, path: &ContainedPath) -> IsoResult<()> {
        match path.parent() {
            Some(parent) if !parent.is_root() => {
                if self.kind_of(&parent)?.is_dir() {
                    Ok(())
                } else {
                    Err(IsoError::failed(format!("directory {parent} does not exist")))
                }
            }
            _ => Ok(()),
        }
    }

    fn require_vacant(&self, path: &ContainedPath) -> IsoResult<()> {
        if path.is_root() || !matches!(self.kind_of(path)?, EntryKind::None) {
            return Err(IsoError::failed(format!("{path} already exists")));
        }
        self.require_parent_dir(path)
    }

    fn has_children(&self, abs: &Path) -> bool {
        self.fs.read_dir(abs).map(|e| !e.is_empty()).unwrap_or(false)
    }

    fn require_no_file_ancestor(&self, path: &ContainedPath) -> IsoResult<()> {
        let mut current = path.parent();
        while let Some(dir) = current {
            if dir.is_root() {
                break;
            }
            if self.kind_of(&dir)?.is_file() {
                return Err(IsoError::failed(format!("{dir} is a file")));
            }
            current = dir.parent();
        }
        Ok(())
    }

    /// Bring the ledger back in line with the on-disk length after a failed
    /// write that had been charged for `charged_len`.
    fn reconcile(&self, shared: &SharedStore, path: &ContainedPath, charged_len: u64) {
        let actual = self.fs.len(&self.abs(path)).unwrap_or(0);
        if actual == charged_len {
            return;
        }
        tracing::warn!(path = %path, charged = charged_len, actual, "reconciling quota after failed write");
        if let Err(e) = shared.quota().resize(charged_len, actual) {
            tracing::warn!(path = %path, error = %e, "quota left short of on-disk length");
        }
    }
}

impl Drop for IsolatedStore {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Translate expected file-system conditions; pass the rest through.
fn fs_error(op: &str, path: &ContainedPath, err: io::Error) -> IsoError {
    match err.kind() {
        io::ErrorKind::NotFound => IsoError::failed(format!("{op} {path}: not found")),
        io::ErrorKind::AlreadyExists => IsoError::failed(format!("{op} {path}: already exists")),
        _ => IsoError::Io(err),
    }
}

fn wildcard(raw: &str, segment: &str) -> IsoResult<glob::Pattern> {
    let mut escaped = String::with_capacity(segment.len());
    for c in segment.chars() {
        match c {
            '[' => escaped.push_str("[[]"),
            ']' => escaped.push_str("[]]"),
            c => escaped.push(c),
        }
    }
    glob::Pattern::new(&escaped).map_err(|e| IsoError::invalid_path(raw, e.msg))
}
