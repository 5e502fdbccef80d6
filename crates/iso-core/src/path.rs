//! # Path Containment — Store-Relative Paths
//!
//! `ContainedPath` is the sole construction path for locations inside a
//! store. It is pure: no file-system access, no state.
//!
//! ## Containment Invariant
//!
//! A `ContainedPath` is a sequence of plain segments: no empty segment, no
//! `.` or `..`, no separator or `:`, no control character. Joining it onto a store
//! root therefore always yields a path at or below that root.
//!
//! ## Normalization Rules
//!
//! 1. `/` and `\` are both separators.
//! 2. NUL and every other C0 control character is rejected.
//! 3. A leading separator, a drive prefix (`C:`) or a UNC prefix is rejected.
//!    A `:` anywhere in a segment is rejected too, so no later segment can
//!    carry a drive or stream prefix into the join.
//! 4. Empty segments and `.` are dropped.
//! 5. `..` removes the previous segment; removing past the root is rejected.
//!
//! A path that normalizes to nothing (`"."`, `"a/.."`) denotes the store
//! root itself.

use std::path::{Path, PathBuf};

use crate::error::IsoError;

/// Reject a missing path argument.
///
/// An empty string is how a caller omits a path. This check runs before any
/// lifecycle or syntax check.
///
/// # Errors
///
/// Returns [`IsoError::InvalidArgument`] if `raw` is empty.
pub fn require_argument<'a>(name: &str, raw: &'a str) -> Result<&'a str, IsoError> {
    if raw.is_empty() {
        return Err(IsoError::InvalidArgument(format!("{name} is required")));
    }
    Ok(raw)
}

/// A validated, normalized path relative to a store root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainedPath {
    segments: Vec<String>,
}

impl ContainedPath {
    /// Validate and normalize a store-relative path.
    ///
    /// # Errors
    ///
    /// Returns [`IsoError::InvalidArgument`] for an empty input and
    /// [`IsoError::InvalidPath`] for forbidden characters, rooted paths, or
    /// traversal above the store root.
    pub fn new(raw: &str) -> Result<Self, IsoError> {
        require_argument("path", raw)?;

        if let Some(c) = raw.chars().find(|c| c.is_ascii_control() && *c != '\u{7f}') {
            let reason = if c == '\0' {
                "contains NUL".to_string()
            } else {
                format!("contains control character {:#04x}", c as u32)
            };
            return Err(IsoError::invalid_path(raw, reason));
        }
        if raw.starts_with('/') || raw.starts_with('\\') {
            return Err(IsoError::invalid_path(raw, "absolute paths are not allowed"));
        }
        if has_drive_prefix(raw) {
            return Err(IsoError::invalid_path(raw, "drive prefixes are not allowed"));
        }

        let mut segments: Vec<String> = Vec::new();
        for segment in raw.split(['/', '\\']) {
            match segment {
                "" | "." => {}
                ".." => {
                    if segments.pop().is_none() {
                        return Err(IsoError::invalid_path(raw, "path escapes the store root"));
                    }
                }
                s if s.contains(':') => {
                    return Err(IsoError::invalid_path(
                        raw,
                        format!("segment {s:?} contains ':'"),
                    ));
                }
                s => segments.push(s.to_string()),
            }
        }

        Ok(Self { segments })
    }

    /// The store root itself.
    pub fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Whether this path denotes the store root.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The final segment, or `None` for the root.
    pub fn file_name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// The containing directory, or `None` for the root.
    pub fn parent(&self) -> Option<ContainedPath> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Append a single validated segment.
    ///
    /// # Errors
    ///
    /// Returns [`IsoError::InvalidPath`] if `name` is not exactly one plain segment.
    pub fn child(&self, name: &str) -> Result<ContainedPath, IsoError> {
        let parsed = ContainedPath::new(name)?;
        if parsed.segments.len() != 1 || name.contains(['/', '\\']) {
            return Err(IsoError::invalid_path(name, "expected a single path segment"));
        }
        let mut segments = self.segments.clone();
        segments.extend(parsed.segments);
        Ok(Self { segments })
    }

    /// Whether `self` is `ancestor` or lies below it.
    pub fn starts_with(&self, ancestor: &ContainedPath) -> bool {
        self.segments.starts_with(&ancestor.segments)
    }

    /// Replace the `from` prefix of this path with `to`.
    ///
    /// Returns `None` if the path does not lie at or below `from`.
    pub fn rebase(&self, from: &ContainedPath, to: &ContainedPath) -> Option<ContainedPath> {
        let rest = self.segments.strip_prefix(from.segments.as_slice())?;
        let mut segments = to.segments.clone();
        segments.extend_from_slice(rest);
        Some(Self { segments })
    }

    /// Normalized form with `/` separators; empty for the root.
    pub fn as_str(&self) -> String {
        self.segments.join("/")
    }

    /// Absolute location of this path under `root`.
    pub fn join_onto(&self, root: &Path) -> PathBuf {
        let mut out = root.to_path_buf();
        for segment in &self.segments {
            out.push(segment);
        }
        out
    }
}

impl std::fmt::Display for ContainedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.segments.is_empty() {
            f.write_str(".")
        } else {
            f.write_str(&self.as_str())
        }
    }
}

fn has_drive_prefix(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}
