//! # iso-store — Isolated Storage
//!
//! Identity-scoped, quota-limited file storage. A store is a private
//! directory tree selected by a scope (user or machine, plus any of domain,
//! assembly, application). Callers address it only through store-relative
//! paths and can never reach outside it.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use iso_store::{ProcessIdentity, StoreConfig, StoreFactory};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let factory = StoreFactory::new(&StoreConfig::from_env()?, Arc::new(ProcessIdentity))?;
//! let store = factory.user_store_for_assembly()?;
//! store.create_directory("settings")?;
//! store.write_file("settings/app.yaml", b"theme: dark\n")?;
//! assert!(store.file_exists("settings/app.yaml")?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`factory`]: scope acquisition by preset or descriptor
//! - [`store`]: the [`IsolatedStore`] handle
//! - [`stream`]: quota-reconciling file streams
//! - [`registry`]: shared per-root state (quota entry, liveness, path locks)
//! - [`resolver`]: descriptor to on-disk root
//! - [`identity`]: identity evidence sources
//! - [`fs_port`]: the file-system seam
//! - [`config`]: roots and default quota

pub mod config;
pub mod factory;
pub mod fs_port;
pub mod identity;
pub mod registry;
pub mod resolver;
pub mod store;
pub mod stream;

pub use config::{ConfigError, StoreConfig};
pub use factory::StoreFactory;
pub use fs_port::{EntryKind, FileSystemPort, LocalFs};
pub use identity::{IdentitySource, ProcessIdentity, StaticIdentity};
pub use registry::{SharedStore, StoreRegistry};
pub use resolver::ScopeResolver;
pub use store::{FileMode, IsolatedStore};
pub use stream::{iso_error, FileAccess, IsolatedFileStream};

pub use iso_core::{ErrorKind, IsoError, IsoResult, PresetScope, ScopeDescriptor, ScopeId, ScopeOwner};
pub use iso_quota::{FixedQuota, QuotaPolicy, ScopedQuota};
pub use iso_state::LifecycleState;
