//! # Quota-Reconciling File Stream
//!
//! [`IsolatedFileStream`] wraps an open file inside a store. Reads and seeks
//! pass straight through. Every write that extends the file reserves the
//! growth from the store's quota entry first; a write the quota cannot
//! cover fails with an `io::Error` wrapping [`IsoError::QuotaExceeded`] and
//! leaves the file untouched. Truncation through
//! [`set_len()`](IsolatedFileStream::set_len) releases the shrinkage.
//!
//! Growth is measured against the file's current on-disk length while the
//! file's path stripe is held, so several streams on one file never charge
//! the same bytes twice. A stream follows its file through moves. Once the
//! file is deleted, writes and resizes fail with
//! [`IsoError::OperationFailed`]; reads keep working on the open handle.
//!
//! A stream outlives the handle that opened it: closing or disposing the
//! handle does not invalidate open streams. Removing the store does, for
//! every operation that changes the file's length.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::Arc;

use iso_core::{ContainedPath, IsoError};

use crate::registry::{FileTicket, SharedStore};

/// How a stream may access its file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileAccess {
    Read,
    Write,
    ReadWrite,
}

impl FileAccess {
    pub fn can_read(&self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }

    pub fn can_write(&self) -> bool {
        matches!(self, Self::Write | Self::ReadWrite)
    }
}

/// An open byte stream on a file inside a store.
#[derive(Debug)]
pub struct IsolatedFileStream {
    file: File,
    store: Arc<SharedStore>,
    ticket: Arc<FileTicket>,
    access: FileAccess,
    append: bool,
}

impl IsolatedFileStream {
    pub(crate) fn new(
        file: File,
        store: Arc<SharedStore>,
        ticket: Arc<FileTicket>,
        access: FileAccess,
        append: bool,
    ) -> Self {
        Self {
            file,
            store,
            ticket,
            access,
            append,
        }
    }

    /// Current store-relative path of the file.
    pub fn path(&self) -> ContainedPath {
        self.ticket.path()
    }

    pub fn access(&self) -> FileAccess {
        self.access
    }

    /// Current on-disk length of the file.
    pub fn len(&self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    pub fn is_empty(&self) -> io::Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Resize the file, reserving growth or releasing shrinkage.
    ///
    /// # Errors
    ///
    /// An `io::Error` wrapping [`IsoError::QuotaExceeded`] if growth does
    /// not fit, [`IsoError::InvalidOperation`] on a read-only stream, or
    /// [`IsoError::OperationFailed`] once the file has been deleted.
    pub fn set_len(&mut self, new_len: u64) -> io::Result<()> {
        self.require_write()?;
        let _live = self.store.enter().map_err(to_io)?;
        let _lock = self.store.lock_ticket(&self.ticket).map_err(to_io)?;
        let old_len = self.file.metadata()?.len();
        self.store.quota().resize(old_len, new_len).map_err(to_io)?;
        if let Err(e) = self.file.set_len(new_len) {
            self.reconcile(new_len);
            return Err(e);
        }
        Ok(())
    }

    /// Flush file content and metadata to disk.
    pub fn sync_all(&self) -> io::Result<()> {
        self.file.sync_all()
    }

    fn require_write(&self) -> io::Result<()> {
        if self.access.can_write() {
            Ok(())
        } else {
            Err(to_io(IsoError::InvalidOperation(format!(
                "{} was opened read-only",
                self.path()
            ))))
        }
    }

    fn require_read(&self) -> io::Result<()> {
        if self.access.can_read() {
            Ok(())
        } else {
            Err(to_io(IsoError::InvalidOperation(format!(
                "{} was opened write-only",
                self.path()
            ))))
        }
    }

    /// Re-align the ledger with the actual length after a failed resize
    /// that had charged for `charged_len`.
    fn reconcile(&self, charged_len: u64) {
        let actual = self.file.metadata().map(|m| m.len()).unwrap_or(charged_len);
        if actual != charged_len {
            tracing::warn!(
                path = %self.path(),
                charged = charged_len,
                actual,
                "reconciling quota after failed resize"
            );
            if let Err(e) = self.store.quota().resize(charged_len, actual) {
                tracing::warn!(path = %self.path(), error = %e, "quota left short of on-disk length");
            }
        }
    }
}

impl Read for IsolatedFileStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.require_read()?;
        self.file.read(buf)
    }
}

impl Write for IsolatedFileStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.require_write()?;
        if buf.is_empty() {
            return Ok(0);
        }
        let _live = self.store.enter().map_err(to_io)?;
        let _lock = self.store.lock_ticket(&self.ticket).map_err(to_io)?;

        let current_len = self.file.metadata()?.len();
        let start = if self.append {
            current_len
        } else {
            self.file.stream_position()?
        };
        let end = start
            .checked_add(buf.len() as u64)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "write past u64::MAX"))?;
        let growth = end.saturating_sub(current_len);
        self.store.quota().reserve(growth).map_err(to_io)?;

        match self.file.write(buf) {
            Ok(written) => {
                let used = (start + written as u64).saturating_sub(current_len);
                if used < growth {
                    self.store.quota().release(growth - used);
                }
                Ok(written)
            }
            Err(e) => {
                if growth > 0 {
                    tracing::warn!(path = %self.ticket.path(), bytes = growth, error = %e, "releasing quota after failed write");
                    self.store.quota().release(growth);
                }
                Err(e)
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Seek for IsolatedFileStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

fn to_io(err: IsoError) -> io::Error {
    match err {
        IsoError::Io(e) => e,
        other => io::Error::other(other),
    }
}

/// The store error carried by an `io::Error` from a stream, if any.
pub fn iso_error(err: &io::Error) -> Option<&IsoError> {
    err.get_ref().and_then(|inner| inner.downcast_ref::<IsoError>())
}
