//! # Scope Resolver
//!
//! Maps a scope descriptor to the on-disk [`StoreRoot`] for the current
//! identity. Resolution is deterministic: identical descriptors and
//! evidence always yield the identical root, so repeated opens land on the
//! same store.
//!
//! The root directory is created on first successful resolution. An
//! existing root is left as is.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use iso_core::{IsoError, PresetScope, ScopeDescriptor, ScopeOwner, StoreRoot};

use crate::fs_port::FileSystemPort;
use crate::identity::IdentitySource;

/// Resolves scope descriptors against one identity source and owner roots.
#[derive(Debug, Clone)]
pub struct ScopeResolver {
    user_root: PathBuf,
    machine_root: PathBuf,
    identity: Arc<dyn IdentitySource>,
    fs: Arc<dyn FileSystemPort>,
}

impl ScopeResolver {
    pub fn new(
        user_root: PathBuf,
        machine_root: PathBuf,
        identity: Arc<dyn IdentitySource>,
        fs: Arc<dyn FileSystemPort>,
    ) -> Self {
        Self {
            user_root,
            machine_root,
            identity,
            fs,
        }
    }

    pub fn with_file_system(mut self, fs: Arc<dyn FileSystemPort>) -> Self {
        self.fs = fs;
        self
    }

    /// Parent directory for stores of `owner`.
    pub fn owner_root(&self, owner: ScopeOwner) -> &Path {
        match owner {
            ScopeOwner::User => &self.user_root,
            ScopeOwner::Machine => &self.machine_root,
        }
    }

    /// Compute the root for `descriptor` without touching the file system.
    ///
    /// # Errors
    ///
    /// [`IsoError::StorageUnavailable`] if the identity source cannot supply
    /// a dimension the descriptor requires.
    pub fn locate(&self, descriptor: ScopeDescriptor) -> Result<StoreRoot, IsoError> {
        let evidence = self.identity.evidence()?;
        let scope = descriptor.scope_id(&evidence)?;
        Ok(StoreRoot::under(
            self.owner_root(descriptor.owner()),
            descriptor,
            scope,
        ))
    }

    /// Compute the root for `descriptor` and make sure its directory exists.
    ///
    /// # Errors
    ///
    /// As [`locate()`](Self::locate), plus [`IsoError::Io`] if the root
    /// directory cannot be created.
    pub fn resolve(&self, descriptor: ScopeDescriptor) -> Result<StoreRoot, IsoError> {
        let root = self.locate(descriptor)?;
        self.fs.mkdir_all(root.path())?;
        Ok(root)
    }

    pub fn resolve_preset(&self, preset: PresetScope) -> Result<StoreRoot, IsoError> {
        self.resolve(preset.descriptor())
    }
}
