//! Shared fixtures for store integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use iso_store::{
    ErrorKind, IsoError, IsoResult, PresetScope, StaticIdentity, StoreConfig, StoreFactory,
    StoreRegistry,
};

/// A factory over a private temp directory and its own registry.
pub struct Fixture {
    pub dir: tempfile::TempDir,
    pub factory: StoreFactory,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_quota(iso_store::config::DEFAULT_QUOTA_BYTES)
    }

    pub fn with_quota(bytes: u64) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::rooted_at(dir.path()).with_quota(bytes);
        let identity = StaticIdentity::full("alice", "corp.example", "tool.exe", "suite").unwrap();
        let factory = StoreFactory::new(&config, Arc::new(identity))
            .unwrap()
            .with_registry(Arc::new(StoreRegistry::new()));
        Self { dir, factory }
    }

    pub fn open(&self, preset: PresetScope) -> iso_store::IsolatedStore {
        self.factory.open(preset).unwrap()
    }

    pub fn store(&self) -> iso_store::IsolatedStore {
        self.open(PresetScope::UserStoreForAssembly)
    }
}

/// The error kind of a failed result.
pub fn kind_of<T: std::fmt::Debug>(result: IsoResult<T>) -> ErrorKind {
    match result {
        Ok(v) => panic!("expected an error, got Ok({v:?})"),
        Err(e) => e.kind(),
    }
}

pub fn is_kind(err: &IsoError, kind: ErrorKind) -> bool {
    err.kind() == kind
}
