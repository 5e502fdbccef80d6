//! # Store Factory
//!
//! Scope acquisition entry points. A factory binds a configuration, an
//! identity source, a quota policy and a file-system port, and opens
//! [`IsolatedStore`] handles by preset or by explicit descriptor.
//!
//! Factories share the process-wide [`StoreRegistry`] unless given their
//! own, so handles opened through different factories on the same root
//! still share one quota entry and one removal flag. The first open of a
//! root fixes its initial ceiling.

use std::sync::Arc;

use iso_core::{IsoResult, PresetScope, ScopeDescriptor};
use iso_quota::{FixedQuota, QuotaPolicy};

use crate::config::{ConfigError, StoreConfig};
use crate::fs_port::{FileSystemPort, LocalFs};
use crate::identity::IdentitySource;
use crate::registry::StoreRegistry;
use crate::resolver::ScopeResolver;
use crate::store::IsolatedStore;

/// Opens store handles.
#[derive(Debug, Clone)]
pub struct StoreFactory {
    resolver: ScopeResolver,
    policy: Arc<dyn QuotaPolicy>,
    fs: Arc<dyn FileSystemPort>,
    registry: Arc<StoreRegistry>,
}

impl StoreFactory {
    /// A factory over the local file system with a fixed default quota.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`] from [`StoreConfig::validate`].
    pub fn new(config: &StoreConfig, identity: Arc<dyn IdentitySource>) -> Result<Self, ConfigError> {
        config.validate()?;
        let fs: Arc<dyn FileSystemPort> = Arc::new(LocalFs);
        Ok(Self {
            resolver: ScopeResolver::new(
                config.user_root.clone(),
                config.machine_root.clone(),
                identity,
                Arc::clone(&fs),
            ),
            policy: Arc::new(FixedQuota(config.default_quota_bytes)),
            fs,
            registry: StoreRegistry::global(),
        })
    }

    pub fn with_policy(mut self, policy: Arc<dyn QuotaPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_registry(mut self, registry: Arc<StoreRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_file_system(mut self, fs: Arc<dyn FileSystemPort>) -> Self {
        self.resolver = self.resolver.with_file_system(Arc::clone(&fs));
        self.fs = fs;
        self
    }

    pub fn resolver(&self) -> &ScopeResolver {
        &self.resolver
    }

    pub fn registry(&self) -> &Arc<StoreRegistry> {
        &self.registry
    }

    /// Open the store selected by `preset`.
    ///
    /// # Errors
    ///
    /// `StorageUnavailable` if an identity dimension the preset needs is
    /// missing; `Io` if the root cannot be created or scanned.
    pub fn open(&self, preset: PresetScope) -> IsoResult<IsolatedStore> {
        self.open_scope(preset.descriptor())
    }

    /// Open the store for an explicit descriptor.
    pub fn open_scope(&self, descriptor: ScopeDescriptor) -> IsoResult<IsolatedStore> {
        let root = self.resolver.resolve(descriptor)?;
        let shared = self
            .registry
            .attach(&root, self.policy.as_ref(), self.fs.as_ref())?;
        let store = IsolatedStore::new(
            root,
            shared,
            Arc::clone(&self.fs),
            Arc::clone(&self.registry),
        );
        tracing::debug!(
            handle = %store.id(),
            scope = %store.scope_id(),
            descriptor = %descriptor,
            "opened store"
        );
        Ok(store)
    }

    pub fn user_store_for_assembly(&self) -> IsoResult<IsolatedStore> {
        self.open(PresetScope::UserStoreForAssembly)
    }

    pub fn user_store_for_domain(&self) -> IsoResult<IsolatedStore> {
        self.open(PresetScope::UserStoreForDomain)
    }

    pub fn user_store_for_application(&self) -> IsoResult<IsolatedStore> {
        self.open(PresetScope::UserStoreForApplication)
    }

    pub fn machine_store_for_assembly(&self) -> IsoResult<IsolatedStore> {
        self.open(PresetScope::MachineStoreForAssembly)
    }

    pub fn machine_store_for_domain(&self) -> IsoResult<IsolatedStore> {
        self.open(PresetScope::MachineStoreForDomain)
    }

    pub fn machine_store_for_application(&self) -> IsoResult<IsolatedStore> {
        self.open(PresetScope::MachineStoreForApplication)
    }
}
