//! # Error Types — Isolated Storage Failure Taxonomy
//!
//! Defines the single error type surfaced by every store operation. All
//! errors use `thiserror` for derive-based `Display` and `Error`.
//!
//! ## Precedence
//!
//! When several failures apply to one call, the store reports them in a
//! fixed order: a missing argument (`InvalidArgument`) first, then handle
//! lifecycle (`ObjectDisposed`, `InvalidOperation`, a removed store as
//! `OperationFailed`), then path syntax (`InvalidPath`), then file-system
//! outcomes. Callers may rely on this order.

use std::io;

use thiserror::Error;

/// Convenience alias used across the workspace.
pub type IsoResult<T> = Result<T, IsoError>;

/// Top-level error type for isolated storage.
#[derive(Error, Debug)]
pub enum IsoError {
    /// A required argument was not supplied.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A path is syntactically illegal or escapes the store root.
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath {
        /// The path as supplied by the caller.
        path: String,
        /// Why the path was rejected.
        reason: String,
    },

    /// The handle has been disposed.
    #[error("store handle has been disposed")]
    ObjectDisposed,

    /// The handle has been closed.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// An identity dimension required by the requested scope cannot be resolved.
    #[error("isolated storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A store-level operation failed: removed store, non-empty directory,
    /// missing target, or file/directory kind mismatch.
    #[error("isolated storage operation failed: {0}")]
    OperationFailed(String),

    /// A size-increasing operation would exceed the scope's byte ceiling.
    #[error("quota exceeded: requested {requested} bytes with {used} of {quota} bytes used")]
    QuotaExceeded {
        /// Bytes the operation tried to reserve.
        requested: u64,
        /// Bytes in use when the reservation was attempted.
        used: u64,
        /// The scope's byte ceiling.
        quota: u64,
    },

    /// Unexpected file-system failure, passed through unchanged.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Payload-free discriminant of [`IsoError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    InvalidPath,
    ObjectDisposed,
    InvalidOperation,
    StorageUnavailable,
    OperationFailed,
    QuotaExceeded,
    Io,
}

impl IsoError {
    /// The taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::InvalidPath { .. } => ErrorKind::InvalidPath,
            Self::ObjectDisposed => ErrorKind::ObjectDisposed,
            Self::InvalidOperation(_) => ErrorKind::InvalidOperation,
            Self::StorageUnavailable(_) => ErrorKind::StorageUnavailable,
            Self::OperationFailed(_) => ErrorKind::OperationFailed,
            Self::QuotaExceeded { .. } => ErrorKind::QuotaExceeded,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// Shorthand for an [`IsoError::InvalidPath`].
    pub fn invalid_path(path: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    /// Shorthand for an [`IsoError::OperationFailed`].
    pub fn failed(detail: impl Into<String>) -> Self {
        Self::OperationFailed(detail.into())
    }
}

impl ErrorKind {
    /// The canonical string name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::InvalidPath => "INVALID_PATH",
            Self::ObjectDisposed => "OBJECT_DISPOSED",
            Self::InvalidOperation => "INVALID_OPERATION",
            Self::StorageUnavailable => "STORAGE_UNAVAILABLE",
            Self::OperationFailed => "OPERATION_FAILED",
            Self::QuotaExceeded => "QUOTA_EXCEEDED",
            Self::Io => "IO",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        assert_eq!(
            IsoError::InvalidArgument("path".into()).kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(IsoError::ObjectDisposed.kind(), ErrorKind::ObjectDisposed);
        assert_eq!(
            IsoError::invalid_path("\0bad", "contains NUL").kind(),
            ErrorKind::InvalidPath
        );
        assert_eq!(IsoError::failed("gone").kind(), ErrorKind::OperationFailed);
        assert_eq!(
            IsoError::QuotaExceeded {
                requested: 10,
                used: 5,
                quota: 8
            }
            .kind(),
            ErrorKind::QuotaExceeded
        );
    }

    #[test]
    fn io_errors_convert() {
        let err: IsoError = io::Error::new(io::ErrorKind::PermissionDenied, "denied").into();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn quota_message_carries_numbers() {
        let err = IsoError::QuotaExceeded {
            requested: 4096,
            used: 1000,
            quota: 2048,
        };
        let msg = err.to_string();
        assert!(msg.contains("4096"));
        assert!(msg.contains("1000"));
        assert!(msg.contains("2048"));
    }

    #[test]
    fn kind_display_is_screaming_snake() {
        assert_eq!(ErrorKind::OperationFailed.to_string(), "OPERATION_FAILED");
        assert_eq!(ErrorKind::Io.as_str(), "IO");
    }
}
