//! # Store Selection Options
//!
//! Global flags that pick the configuration, the scope and the identity a
//! command runs under. Identity flags override what the host process
//! reports, one dimension at a time.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};

use iso_core::{ApplicationId, AssemblyId, DomainId, IdentityEvidence, UserId};
use iso_store::{
    IdentitySource, IsolatedStore, PresetScope, ProcessIdentity, StaticIdentity, StoreConfig,
    StoreFactory,
};

/// Preset scope names accepted by `--scope`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScopeArg {
    UserStoreForAssembly,
    UserStoreForDomain,
    UserStoreForApplication,
    MachineStoreForAssembly,
    MachineStoreForDomain,
    MachineStoreForApplication,
}

impl From<ScopeArg> for PresetScope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::UserStoreForAssembly => Self::UserStoreForAssembly,
            ScopeArg::UserStoreForDomain => Self::UserStoreForDomain,
            ScopeArg::UserStoreForApplication => Self::UserStoreForApplication,
            ScopeArg::MachineStoreForAssembly => Self::MachineStoreForAssembly,
            ScopeArg::MachineStoreForDomain => Self::MachineStoreForDomain,
            ScopeArg::MachineStoreForApplication => Self::MachineStoreForApplication,
        }
    }
}

/// Flags shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct StoreOptions {
    /// YAML configuration file. Defaults to the environment.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Place user and machine roots under this directory.
    #[arg(long, global = true)]
    pub base_dir: Option<PathBuf>,

    /// Default quota in bytes for stores opened by this invocation.
    #[arg(long, global = true)]
    pub quota: Option<u64>,

    /// Scope of the store to open.
    #[arg(long, value_enum, global = true, default_value = "user-store-for-assembly")]
    pub scope: ScopeArg,

    /// Override the user identity.
    #[arg(long, global = true)]
    pub user: Option<String>,

    /// Override the domain identity.
    #[arg(long, global = true)]
    pub domain: Option<String>,

    /// Override the assembly identity.
    #[arg(long, global = true)]
    pub assembly: Option<String>,

    /// Override the application identity.
    #[arg(long, global = true)]
    pub application: Option<String>,
}

impl StoreOptions {
    /// Configuration from `--config` or the environment, then `--base-dir`
    /// and `--quota` on top.
    pub fn load_config(&self) -> Result<StoreConfig> {
        let mut config = match &self.config {
            Some(path) => StoreConfig::from_yaml_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => StoreConfig::from_env().context("reading configuration from the environment")?,
        };
        if let Some(dir) = &self.base_dir {
            let quota = config.default_quota_bytes;
            config = StoreConfig::rooted_at(dir).with_quota(quota);
        }
        if let Some(quota) = self.quota {
            config = config.with_quota(quota);
        }
        Ok(config)
    }

    /// Process identity with any flag overrides applied.
    pub fn identity(&self) -> Result<StaticIdentity> {
        let mut evidence = ProcessIdentity.evidence()?;
        apply_overrides(&mut evidence, self)?;
        Ok(StaticIdentity::new(evidence))
    }

    pub fn factory(&self) -> Result<StoreFactory> {
        let config = self.load_config()?;
        let identity = self.identity()?;
        tracing::debug!(
            user_root = %config.user_root.display(),
            machine_root = %config.machine_root.display(),
            quota = config.default_quota_bytes,
            "store configuration"
        );
        Ok(StoreFactory::new(&config, Arc::new(identity))?)
    }

    /// Open the store selected by `--scope`.
    pub fn open(&self) -> Result<IsolatedStore> {
        let preset = PresetScope::from(self.scope);
        self.factory()?
            .open(preset)
            .with_context(|| format!("opening {preset}"))
    }
}

fn apply_overrides(evidence: &mut IdentityEvidence, opts: &StoreOptions) -> Result<()> {
    if let Some(v) = &opts.user {
        evidence.user = Some(UserId::new(v.as_str())?);
    }
    if let Some(v) = &opts.domain {
        evidence.domain = Some(DomainId::new(v.as_str())?);
    }
    if let Some(v) = &opts.assembly {
        evidence.assembly = Some(AssemblyId::new(v.as_str())?);
    }
    if let Some(v) = &opts.application {
        evidence.application = Some(ApplicationId::new(v.as_str())?);
    }
    Ok(())
}
